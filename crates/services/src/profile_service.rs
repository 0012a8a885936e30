use std::sync::Arc;

use quiz_core::model::{ExamResult, Identity, UserId, UserProfile, UserRole};
use storage::repository::{ExamResultRepository, StorageError, UserRepository};

use crate::Clock;
use crate::error::ProfileError;

/// Number of results shown on a profile page.
pub const PROFILE_RESULT_LIMIT: u32 = 50;

/// A stored profile plus the results visible to its owner.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileView {
    pub profile: UserProfile,
    /// Newest first; always empty for professors.
    pub results: Vec<ExamResult>,
}

/// One row of the professor's student overview.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentScores {
    pub profile: UserProfile,
    pub results: Vec<ExamResult>,
}

/// Views over users and their exam results, plus account management for
/// professors.
#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    results: Arc<dyn ExamResultRepository>,
    clock: Clock,
}

impl ProfileService {
    #[must_use]
    pub fn new(users: Arc<dyn UserRepository>, results: Arc<dyn ExamResultRepository>) -> Self {
        Self::with_clock(users, results, Clock::default())
    }

    #[must_use]
    pub fn with_clock(
        users: Arc<dyn UserRepository>,
        results: Arc<dyn ExamResultRepository>,
        clock: Clock,
    ) -> Self {
        Self {
            users,
            results,
            clock,
        }
    }

    /// Resolve a stored user into the identity the other services expect.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotFound` when no user has this id.
    pub async fn identify(&self, user_id: UserId) -> Result<Identity, ProfileError> {
        let profile = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(ProfileError::NotFound)?;
        Ok(profile.identity())
    }

    /// Profile of the acting user.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::NotFound` when the user is unknown,
    /// `ProfileError::Forbidden` when the stored role differs from the claimed one.
    pub async fn profile(&self, identity: &Identity) -> Result<ProfileView, ProfileError> {
        let profile = self.verify(identity).await?;
        let results = match profile.role {
            UserRole::Student => {
                self.results
                    .list_results_for_student(profile.user_id, PROFILE_RESULT_LIMIT)
                    .await?
            }
            UserRole::Professor => Vec::new(),
        };
        Ok(ProfileView { profile, results })
    }

    /// The acting student's own results, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Forbidden` unless the identity is a verified student.
    pub async fn student_results(
        &self,
        identity: &Identity,
        limit: u32,
    ) -> Result<Vec<ExamResult>, ProfileError> {
        let profile = self.verify_role(identity, UserRole::Student).await?;
        Ok(self
            .results
            .list_results_for_student(profile.user_id, limit)
            .await?)
    }

    /// Latest results across all students.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Forbidden` unless the identity is a verified professor.
    pub async fn recent_results(
        &self,
        identity: &Identity,
        limit: u32,
    ) -> Result<Vec<ExamResult>, ProfileError> {
        self.verify_role(identity, UserRole::Professor).await?;
        Ok(self.results.list_recent_results(limit).await?)
    }

    /// Every student with their results, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Forbidden` unless the identity is a verified professor.
    pub async fn students_overview(
        &self,
        identity: &Identity,
        results_per_student: u32,
    ) -> Result<Vec<StudentScores>, ProfileError> {
        self.verify_role(identity, UserRole::Professor).await?;

        let mut students = self.users.list_users(Some(UserRole::Student)).await?;
        students.sort_by(|a, b| a.name.cmp(&b.name).then(a.user_id.cmp(&b.user_id)));

        let mut out = Vec::with_capacity(students.len());
        for profile in students {
            let results = self
                .results
                .list_results_for_student(profile.user_id, results_per_student)
                .await?;
            out.push(StudentScores { profile, results });
        }
        Ok(out)
    }

    /// Register a new account under the next free id.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Forbidden` unless the identity is a verified
    /// professor, `BlankName` for an empty name and `NameTaken` when another
    /// account already uses it.
    pub async fn create_account(
        &self,
        identity: &Identity,
        name: &str,
        role: UserRole,
    ) -> Result<UserProfile, ProfileError> {
        self.verify_role(identity, UserRole::Professor).await?;
        let name = clean_name(name)?;
        let created = self
            .users
            .create_user(name, role, self.clock.now())
            .await
            .map_err(|e| name_error(e, name))?;
        tracing::info!(
            "{} created {} account {} ({})",
            identity.name,
            created.role,
            created.user_id,
            created.name
        );
        Ok(created)
    }

    /// Rename an account, optionally changing its role. `None` keeps the
    /// stored role.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Forbidden` unless the identity is a verified
    /// professor, `NotFound` for an unknown account, `BlankName` and `NameTaken`
    /// as for [`ProfileService::create_account`].
    pub async fn update_account(
        &self,
        identity: &Identity,
        user_id: UserId,
        name: &str,
        role: Option<UserRole>,
    ) -> Result<UserProfile, ProfileError> {
        self.verify_role(identity, UserRole::Professor).await?;
        let name = clean_name(name)?;
        let role = match role {
            Some(role) => role,
            None => {
                self.users
                    .get_user(user_id)
                    .await?
                    .ok_or(ProfileError::NotFound)?
                    .role
            }
        };
        let updated = self
            .users
            .update_user(user_id, name, role)
            .await
            .map_err(|e| name_error(e, name))?;
        tracing::info!("{} updated account {}", identity.name, user_id);
        Ok(updated)
    }

    /// Delete an account and every exam result it owns.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::Forbidden` unless the identity is a verified
    /// professor, `SelfDelete` when it targets the acting professor and
    /// `NotFound` for an unknown account.
    pub async fn delete_account(
        &self,
        identity: &Identity,
        user_id: UserId,
    ) -> Result<(), ProfileError> {
        self.verify_role(identity, UserRole::Professor).await?;
        if user_id == identity.user_id {
            return Err(ProfileError::SelfDelete);
        }
        self.users.delete_user(user_id).await.map_err(|e| match e {
            StorageError::NotFound => ProfileError::NotFound,
            other => ProfileError::Storage(other),
        })?;
        tracing::info!("{} deleted account {}", identity.name, user_id);
        Ok(())
    }

    async fn verify(&self, identity: &Identity) -> Result<UserProfile, ProfileError> {
        let profile = self
            .users
            .get_user(identity.user_id)
            .await?
            .ok_or(ProfileError::NotFound)?;
        if profile.role != identity.role {
            tracing::warn!(
                "Role mismatch for user {}: claimed {}, stored {}",
                identity.user_id,
                identity.role,
                profile.role
            );
            return Err(ProfileError::Forbidden);
        }
        Ok(profile)
    }

    async fn verify_role(
        &self,
        identity: &Identity,
        required: UserRole,
    ) -> Result<UserProfile, ProfileError> {
        if identity.role != required {
            return Err(ProfileError::Forbidden);
        }
        self.verify(identity).await
    }
}

fn clean_name(name: &str) -> Result<&str, ProfileError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ProfileError::BlankName);
    }
    Ok(name)
}

fn name_error(err: StorageError, name: &str) -> ProfileError {
    match err {
        StorageError::Conflict => ProfileError::NameTaken(name.to_owned()),
        StorageError::NotFound => ProfileError::NotFound,
        other => ProfileError::Storage(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use quiz_core::model::{NewExamResult, ScoreReport};
    use quiz_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn user(id: u64, name: &str, role: UserRole) -> UserProfile {
        UserProfile {
            user_id: UserId::new(id),
            name: name.into(),
            role,
            created_at: fixed_now(),
        }
    }

    async fn seeded() -> (InMemoryRepository, ProfileService) {
        let repo = InMemoryRepository::new();
        repo.upsert_user(&user(1, "Prof", UserRole::Professor))
            .await
            .unwrap();
        repo.upsert_user(&user(2, "Zoe", UserRole::Student))
            .await
            .unwrap();
        repo.upsert_user(&user(3, "Ana", UserRole::Student))
            .await
            .unwrap();
        for (student, correct, minutes) in [(2, 1, 0), (2, 2, 10), (3, 3, 5)] {
            let result = NewExamResult::from_report(
                UserId::new(student),
                "Quiz",
                &ScoreReport::new(correct, 3).unwrap(),
                fixed_now() + Duration::minutes(minutes),
            )
            .unwrap();
            repo.append_result(&result).await.unwrap();
        }
        let service = ProfileService::with_clock(
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            fixed_clock(),
        );
        (repo, service)
    }

    #[tokio::test]
    async fn student_profile_lists_own_results_newest_first() {
        let (_repo, service) = seeded().await;
        let view = service
            .profile(&Identity::student(UserId::new(2), "Zoe"))
            .await
            .unwrap();

        let scores: Vec<_> = view.results.iter().map(ExamResult::score).collect();
        assert_eq!(scores, vec![2, 1]);
    }

    #[tokio::test]
    async fn role_mismatch_is_forbidden_and_unknown_is_not_found() {
        let (_repo, service) = seeded().await;

        assert!(matches!(
            service
                .profile(&Identity::professor(UserId::new(2), "Zoe"))
                .await,
            Err(ProfileError::Forbidden)
        ));
        assert!(matches!(
            service
                .profile(&Identity::student(UserId::new(99), "Ghost"))
                .await,
            Err(ProfileError::NotFound)
        ));
    }

    #[tokio::test]
    async fn identify_uses_stored_role() {
        let (_repo, service) = seeded().await;
        let identity = service.identify(UserId::new(1)).await.unwrap();
        assert_eq!(identity.role, UserRole::Professor);
        assert_eq!(identity.name, "Prof");
        assert!(matches!(
            service.identify(UserId::new(42)).await,
            Err(ProfileError::NotFound)
        ));
    }

    #[tokio::test]
    async fn professor_profile_has_no_results() {
        let (_repo, service) = seeded().await;
        let view = service
            .profile(&Identity::professor(UserId::new(1), "Prof"))
            .await
            .unwrap();
        assert!(view.results.is_empty());
    }

    #[tokio::test]
    async fn recent_results_require_professor() {
        let (_repo, service) = seeded().await;

        assert!(matches!(
            service
                .recent_results(&Identity::student(UserId::new(2), "Zoe"), 10)
                .await,
            Err(ProfileError::Forbidden)
        ));
        let recent = service
            .recent_results(&Identity::professor(UserId::new(1), "Prof"), 2)
            .await
            .unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].score(), 2);
    }

    #[tokio::test]
    async fn overview_sorts_students_by_name() {
        let (_repo, service) = seeded().await;
        let overview = service
            .students_overview(&Identity::professor(UserId::new(1), "Prof"), 10)
            .await
            .unwrap();

        let names: Vec<_> = overview.iter().map(|s| s.profile.name.as_str()).collect();
        assert_eq!(names, vec!["Ana", "Zoe"]);
        assert_eq!(overview[1].results.len(), 2);
    }

    #[tokio::test]
    async fn student_results_respect_limit() {
        let (_repo, service) = seeded().await;
        let results = service
            .student_results(&Identity::student(UserId::new(2), "Zoe"), 1)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score(), 2);
    }

    fn prof() -> Identity {
        Identity::professor(UserId::new(1), "Prof")
    }

    #[tokio::test]
    async fn account_changes_require_a_professor() {
        let (_repo, service) = seeded().await;
        let zoe = Identity::student(UserId::new(2), "Zoe");

        assert!(matches!(
            service.create_account(&zoe, "Lucia", UserRole::Student).await,
            Err(ProfileError::Forbidden)
        ));
        assert!(matches!(
            service
                .update_account(&zoe, UserId::new(3), "Ana B", None)
                .await,
            Err(ProfileError::Forbidden)
        ));
        assert!(matches!(
            service.delete_account(&zoe, UserId::new(3)).await,
            Err(ProfileError::Forbidden)
        ));
        // A student claiming the professor role is caught by the stored role.
        assert!(matches!(
            service
                .delete_account(&Identity::professor(UserId::new(2), "Zoe"), UserId::new(3))
                .await,
            Err(ProfileError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn professor_creates_and_renames_accounts() {
        let (repo, service) = seeded().await;

        let created = service
            .create_account(&prof(), "  Lucia ", UserRole::Student)
            .await
            .unwrap();
        assert_eq!(created.name, "Lucia");
        assert_eq!(created.user_id, UserId::new(4));
        assert_eq!(created.created_at, fixed_now());

        let renamed = service
            .update_account(&prof(), created.user_id, "Lucia M", None)
            .await
            .unwrap();
        assert_eq!(renamed.name, "Lucia M");
        assert_eq!(renamed.role, UserRole::Student);
        assert_eq!(
            repo.get_user(created.user_id).await.unwrap().unwrap().name,
            "Lucia M"
        );
    }

    #[tokio::test]
    async fn taken_or_blank_names_are_rejected() {
        let (_repo, service) = seeded().await;

        assert!(matches!(
            service.create_account(&prof(), "Zoe", UserRole::Student).await,
            Err(ProfileError::NameTaken(name)) if name == "Zoe"
        ));
        assert!(matches!(
            service
                .update_account(&prof(), UserId::new(3), "Zoe", Some(UserRole::Student))
                .await,
            Err(ProfileError::NameTaken(_))
        ));
        assert!(matches!(
            service.create_account(&prof(), "   ", UserRole::Student).await,
            Err(ProfileError::BlankName)
        ));
        assert!(matches!(
            service
                .update_account(&prof(), UserId::new(77), "Ghost", None)
                .await,
            Err(ProfileError::NotFound)
        ));
    }

    #[tokio::test]
    async fn deleting_a_student_removes_their_results() {
        let (repo, service) = seeded().await;

        service.delete_account(&prof(), UserId::new(2)).await.unwrap();

        assert!(repo.get_user(UserId::new(2)).await.unwrap().is_none());
        let left = repo.list_recent_results(10).await.unwrap();
        assert!(left.iter().all(|r| r.student_id() == UserId::new(3)));
        assert!(matches!(
            service.delete_account(&prof(), UserId::new(2)).await,
            Err(ProfileError::NotFound)
        ));
        assert!(matches!(
            service.delete_account(&prof(), UserId::new(1)).await,
            Err(ProfileError::SelfDelete)
        ));
    }
}
