use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{
    ExamResult, ExamResultId, NewExamResult, Question, QuestionId, UserId, UserProfile, UserRole,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Repository contract for the question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Persist or replace a question together with its answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Fetch a question by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError>;

    /// All questions ordered by id, answers in their stored order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_questions(&self) -> Result<Vec<Question>, StorageError>;

    /// Remove a question and its answers.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the question does not exist.
    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError>;
}

/// Append-only log of submitted exam results.
#[async_trait]
pub trait ExamResultRepository: Send + Sync {
    /// Append a result and return its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the student does not exist, or other
    /// storage errors.
    async fn append_result(&self, result: &NewExamResult) -> Result<ExamResultId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_result(&self, id: ExamResultId) -> Result<Option<ExamResult>, StorageError>;

    /// Results of one student, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_results_for_student(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<Vec<ExamResult>, StorageError>;

    /// Results across all students, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ExamResult>, StorageError>;
}

/// User accounts. Names are unique across all roles.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Persist or update a user profile. `created_at` is kept from the first insert.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if another user already has this name,
    /// or other storage errors.
    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StorageError>;

    /// Insert a user under the next free id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the name is taken.
    async fn create_user(
        &self,
        name: &str,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> Result<UserProfile, StorageError>;

    /// Change the name and role of an existing user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist and
    /// `StorageError::Conflict` if another user has this name.
    async fn update_user(
        &self,
        id: UserId,
        name: &str,
        role: UserRole,
    ) -> Result<UserProfile, StorageError>;

    /// Remove a user together with their exam results.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the user does not exist.
    async fn delete_user(&self, id: UserId) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError>;

    /// Users ordered by id, optionally restricted to one role.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on connection or mapping failures.
    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<UserProfile>, StorageError>;
}

fn newest_first(results: &mut [ExamResult]) {
    results.sort_by(|a, b| {
        b.created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id()))
    });
}

fn limit_to_len(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

fn name_taken(
    users: &HashMap<UserId, UserProfile>,
    name: &str,
    except: Option<UserId>,
) -> bool {
    users
        .values()
        .any(|u| u.name == name && Some(u.user_id) != except)
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    questions: Arc<Mutex<BTreeMap<QuestionId, Question>>>,
    results: Arc<Mutex<Vec<ExamResult>>>,
    users: Arc<Mutex<HashMap<UserId, UserProfile>>>,
    fail_result_writes: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `append_result` fail with a connection error.
    ///
    /// Shared by all clones of this repository.
    pub fn set_fail_result_writes(&self, fail: bool) {
        self.fail_result_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.values().cloned().collect())
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let mut guard = self
            .questions
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&id).map(|_| ()).ok_or(StorageError::NotFound)
    }
}

#[async_trait]
impl ExamResultRepository for InMemoryRepository {
    async fn append_result(&self, result: &NewExamResult) -> Result<ExamResultId, StorageError> {
        if self.fail_result_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("result writes disabled".into()));
        }
        let known_student = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .contains_key(&result.student_id());
        if !known_student {
            return Err(StorageError::Conflict);
        }

        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let next = guard.iter().map(|r| r.id().value()).max().unwrap_or(0) + 1;
        let id = ExamResultId::new(next);
        // Same bounds the SQLite CHECK constraints enforce.
        let stored = ExamResult::from_persisted(
            id,
            result.student_id(),
            result.exam_title().to_owned(),
            result.score(),
            result.max_score(),
            result.created_at(),
        )
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
        guard.push(stored);
        Ok(id)
    }

    async fn get_result(&self, id: ExamResultId) -> Result<Option<ExamResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.iter().find(|r| r.id() == id).cloned())
    }

    async fn list_results_for_student(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<Vec<ExamResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<_> = guard
            .iter()
            .filter(|r| r.student_id() == student_id)
            .cloned()
            .collect();
        newest_first(&mut out);
        out.truncate(limit_to_len(limit));
        Ok(out)
    }

    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ExamResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out = guard.clone();
        newest_first(&mut out);
        out.truncate(limit_to_len(limit));
        Ok(out)
    }
}

#[async_trait]
impl UserRepository for InMemoryRepository {
    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if name_taken(&guard, &user.name, Some(user.user_id)) {
            return Err(StorageError::Conflict);
        }
        let created_at = guard
            .get(&user.user_id)
            .map_or(user.created_at, |existing| existing.created_at);
        guard.insert(
            user.user_id,
            UserProfile {
                created_at,
                ..user.clone()
            },
        );
        Ok(())
    }

    async fn create_user(
        &self,
        name: &str,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> Result<UserProfile, StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if name_taken(&guard, name, None) {
            return Err(StorageError::Conflict);
        }
        let next = guard.keys().map(|id| id.value()).max().unwrap_or(0) + 1;
        let user = UserProfile {
            user_id: UserId::new(next),
            name: name.to_owned(),
            role,
            created_at,
        };
        guard.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: UserId,
        name: &str,
        role: UserRole,
    ) -> Result<UserProfile, StorageError> {
        let mut guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if !guard.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        if name_taken(&guard, name, Some(id)) {
            return Err(StorageError::Conflict);
        }
        let user = guard.get_mut(&id).ok_or(StorageError::NotFound)?;
        user.name = name.to_owned();
        user.role = role;
        Ok(user.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        self.users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .remove(&id)
            .ok_or(StorageError::NotFound)?;
        self.results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?
            .retain(|r| r.student_id() != id);
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<UserProfile>, StorageError> {
        let guard = self
            .users
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut out: Vec<_> = guard
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        out.sort_by_key(|u| u.user_id);
        Ok(out)
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub results: Arc<dyn ExamResultRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_in_memory(&InMemoryRepository::new())
    }

    /// Wrap an existing in-memory repository, keeping a handle for test switches.
    #[must_use]
    pub fn from_in_memory(repo: &InMemoryRepository) -> Self {
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo.clone());
        let users: Arc<dyn UserRepository> = Arc::new(repo.clone());
        Self {
            questions,
            results,
            users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{Answer, AnswerId, ScoreReport};
    use quiz_core::time::fixed_now;

    fn build_question(id: u64, topic: Option<&str>) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Question {id}"),
            topic.map(str::to_owned),
            vec![
                Answer::correct(AnswerId::new(id * 10), "yes"),
                Answer::wrong(AnswerId::new(id * 10 + 1), "no"),
            ],
        )
        .unwrap()
    }

    fn student(id: u64) -> UserProfile {
        UserProfile {
            user_id: UserId::new(id),
            name: format!("Student {id}"),
            role: UserRole::Student,
            created_at: fixed_now(),
        }
    }

    fn result_for(student: u64, correct: u32, minutes: i64) -> NewExamResult {
        NewExamResult::from_report(
            UserId::new(student),
            "Operating Systems",
            &ScoreReport::new(correct, 3).unwrap(),
            fixed_now() + Duration::minutes(minutes),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn questions_list_in_id_order_and_delete() {
        let repo = InMemoryRepository::new();
        repo.upsert_question(&build_question(2, None)).await.unwrap();
        repo.upsert_question(&build_question(1, Some("Memory")))
            .await
            .unwrap();

        let ids: Vec<_> = repo
            .list_questions()
            .await
            .unwrap()
            .iter()
            .map(Question::id)
            .collect();
        assert_eq!(ids, vec![QuestionId::new(1), QuestionId::new(2)]);

        repo.delete_question(QuestionId::new(1)).await.unwrap();
        assert!(matches!(
            repo.delete_question(QuestionId::new(1)).await,
            Err(StorageError::NotFound)
        ));
        assert!(
            repo.get_question(QuestionId::new(1))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn results_are_newest_first_per_student() {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&student(1)).await.unwrap();
        repo.upsert_user(&student(2)).await.unwrap();

        repo.append_result(&result_for(1, 1, 0)).await.unwrap();
        let latest = repo.append_result(&result_for(1, 3, 10)).await.unwrap();
        repo.append_result(&result_for(2, 2, 5)).await.unwrap();

        let mine = repo
            .list_results_for_student(UserId::new(1), 10)
            .await
            .unwrap();
        assert_eq!(mine.len(), 2);
        assert_eq!(mine[0].id(), latest);
        assert_eq!(mine[0].score(), 3);

        let recent = repo.list_recent_results(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].student_id(), UserId::new(2));
    }

    #[tokio::test]
    async fn unknown_student_is_a_conflict() {
        let repo = InMemoryRepository::new();
        assert!(matches!(
            repo.append_result(&result_for(9, 1, 0)).await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn failure_switch_is_shared_across_clones() {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&student(1)).await.unwrap();
        let storage = Storage::from_in_memory(&repo);

        repo.set_fail_result_writes(true);
        assert!(matches!(
            storage.results.append_result(&result_for(1, 1, 0)).await,
            Err(StorageError::Connection(_))
        ));

        repo.set_fail_result_writes(false);
        assert!(storage.results.append_result(&result_for(1, 1, 0)).await.is_ok());
    }

    #[tokio::test]
    async fn upsert_user_keeps_first_created_at() {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&student(1)).await.unwrap();
        let renamed = UserProfile {
            name: "Renamed".into(),
            created_at: fixed_now() + Duration::days(3),
            ..student(1)
        };
        repo.upsert_user(&renamed).await.unwrap();

        let stored = repo.get_user(UserId::new(1)).await.unwrap().unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.created_at, fixed_now());
        assert_eq!(
            repo.list_users(Some(UserRole::Professor))
                .await
                .unwrap()
                .len(),
            0
        );
    }

    #[tokio::test]
    async fn user_names_are_unique() {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&student(1)).await.unwrap();
        let clash = UserProfile {
            name: "Student 1".into(),
            ..student(2)
        };
        assert!(matches!(
            repo.upsert_user(&clash).await,
            Err(StorageError::Conflict)
        ));
        assert!(matches!(
            repo.create_user("Student 1", UserRole::Professor, fixed_now())
                .await,
            Err(StorageError::Conflict)
        ));

        let created = repo
            .create_user("Lucia", UserRole::Student, fixed_now())
            .await
            .unwrap();
        assert_eq!(created.user_id, UserId::new(2));
        assert!(matches!(
            repo.update_user(created.user_id, "Student 1", UserRole::Student)
                .await,
            Err(StorageError::Conflict)
        ));
    }

    #[tokio::test]
    async fn update_user_changes_name_and_role_only() {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&student(1)).await.unwrap();

        let updated = repo
            .update_user(UserId::new(1), "Student 1", UserRole::Professor)
            .await
            .unwrap();
        assert_eq!(updated.role, UserRole::Professor);
        assert_eq!(updated.created_at, fixed_now());
        assert!(matches!(
            repo.update_user(UserId::new(5), "Ghost", UserRole::Student)
                .await,
            Err(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn delete_user_drops_their_results() {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&student(1)).await.unwrap();
        repo.upsert_user(&student(2)).await.unwrap();
        repo.append_result(&result_for(1, 1, 0)).await.unwrap();
        repo.append_result(&result_for(2, 2, 5)).await.unwrap();

        repo.delete_user(UserId::new(1)).await.unwrap();

        assert!(repo.get_user(UserId::new(1)).await.unwrap().is_none());
        let recent = repo.list_recent_results(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].student_id(), UserId::new(2));
        assert!(matches!(
            repo.delete_user(UserId::new(1)).await,
            Err(StorageError::NotFound)
        ));
    }
}
