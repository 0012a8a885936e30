use std::sync::Arc;

use quiz_core::model::{ExamResultId, Identity, NewExamResult, ScoreReport, UserRole};
use quiz_core::session::{Advance, Cursor, QuizSession};
use rand::Rng;
use storage::repository::{ExamResultRepository, QuestionRepository};

use crate::Clock;
use crate::error::QuizServiceError;

/// Title stored with every exam result unless overridden.
pub const DEFAULT_EXAM_TITLE: &str = "Operating Systems Quiz";

/// Result of submitting a quiz.
///
/// The score is final even when saving it failed; `warning` then carries the
/// reason and the caller may retry with [`QuizService::persist_report`].
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub report: ScoreReport,
    pub result_id: Option<ExamResultId>,
    pub warning: Option<String>,
}

impl SubmissionOutcome {
    #[must_use]
    pub fn is_persisted(&self) -> bool {
        self.result_id.is_some()
    }
}

/// Result of moving forward through a quiz.
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    Moved(Cursor),
    Completed(SubmissionOutcome),
}

/// Loads question snapshots, drives sessions for students and records scores.
#[derive(Clone)]
pub struct QuizService {
    clock: Clock,
    exam_title: String,
    questions: Arc<dyn QuestionRepository>,
    results: Arc<dyn ExamResultRepository>,
}

impl QuizService {
    #[must_use]
    pub fn new(
        clock: Clock,
        questions: Arc<dyn QuestionRepository>,
        results: Arc<dyn ExamResultRepository>,
    ) -> Self {
        Self {
            clock,
            exam_title: DEFAULT_EXAM_TITLE.to_owned(),
            questions,
            results,
        }
    }

    #[must_use]
    pub fn with_exam_title(mut self, exam_title: impl Into<String>) -> Self {
        self.exam_title = exam_title.into();
        self
    }

    #[must_use]
    pub fn exam_title(&self) -> &str {
        &self.exam_title
    }

    /// Snapshot the question bank into a new, not yet started session.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Storage` if the questions cannot be loaded.
    pub async fn load_session(&self) -> Result<QuizSession, QuizServiceError> {
        let questions = self.questions.list_questions().await?;
        tracing::debug!("Loaded {} questions for a new session", questions.len());
        Ok(QuizSession::new(questions))
    }

    /// Start `session` for a student.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Forbidden` for professors, or the session's
    /// own error when it cannot start.
    pub fn start(
        &self,
        identity: &Identity,
        session: &mut QuizSession,
    ) -> Result<Cursor, QuizServiceError> {
        self.start_with_rng(identity, session, &mut rand::rng())
    }

    /// Like [`QuizService::start`] with a caller-supplied shuffle source.
    ///
    /// # Errors
    ///
    /// See [`QuizService::start`].
    pub fn start_with_rng<R: Rng + ?Sized>(
        &self,
        identity: &Identity,
        session: &mut QuizSession,
        rng: &mut R,
    ) -> Result<Cursor, QuizServiceError> {
        ensure_student(identity)?;
        let cursor = session.start_with_rng(rng)?;
        tracing::info!(
            "Quiz started: user={}, questions={}, topics={}",
            identity.user_id,
            session.total_questions(),
            session.topics().len()
        );
        Ok(cursor)
    }

    /// Move forward; on the last question this submits and records the score.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Forbidden` for professors, or the session's
    /// own error when not in progress.
    pub async fn advance(
        &self,
        identity: &Identity,
        session: &mut QuizSession,
    ) -> Result<AdvanceOutcome, QuizServiceError> {
        ensure_student(identity)?;
        match session.advance()? {
            Advance::Moved(cursor) => Ok(AdvanceOutcome::Moved(cursor)),
            Advance::Completed(report) => Ok(AdvanceOutcome::Completed(
                self.record(identity, report).await,
            )),
        }
    }

    /// Score the session and record the result.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError::Forbidden` for professors, or the session's
    /// own error when not in progress. Persistence failures are reported in
    /// [`SubmissionOutcome::warning`] instead.
    pub async fn submit(
        &self,
        identity: &Identity,
        session: &mut QuizSession,
    ) -> Result<SubmissionOutcome, QuizServiceError> {
        ensure_student(identity)?;
        let report = session.submit()?;
        Ok(self.record(identity, report).await)
    }

    /// Store a score report as an exam result for `identity`.
    ///
    /// # Errors
    ///
    /// Returns `QuizServiceError` if the identity is not a student, the title is
    /// blank, or storage fails.
    pub async fn persist_report(
        &self,
        identity: &Identity,
        report: &ScoreReport,
    ) -> Result<ExamResultId, QuizServiceError> {
        ensure_student(identity)?;
        let result =
            NewExamResult::from_report(identity.user_id, &self.exam_title, report, self.clock.now())?;
        let id = self.results.append_result(&result).await?;
        Ok(id)
    }

    async fn record(&self, identity: &Identity, report: ScoreReport) -> SubmissionOutcome {
        tracing::info!(
            "Quiz submitted: user={}, score={}/{}",
            identity.user_id,
            report.correct_count(),
            report.total_count()
        );
        match self.persist_report(identity, &report).await {
            Ok(id) => SubmissionOutcome {
                report,
                result_id: Some(id),
                warning: None,
            },
            Err(err) => {
                tracing::warn!(
                    "Failed to save exam result for user {}: {}",
                    identity.user_id,
                    err
                );
                SubmissionOutcome {
                    report,
                    result_id: None,
                    warning: Some(format!("score could not be saved: {err}")),
                }
            }
        }
    }
}

fn ensure_student(identity: &Identity) -> Result<(), QuizServiceError> {
    match identity.role {
        UserRole::Student => Ok(()),
        role @ UserRole::Professor => Err(QuizServiceError::Forbidden { role }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{Answer, AnswerId, Question, QuestionId, UserId, UserProfile};
    use quiz_core::session::SessionStateKind;
    use quiz_core::time::{fixed_clock, fixed_now};
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use storage::repository::{InMemoryRepository, UserRepository};

    fn question(id: u64, topic: Option<&str>) -> Question {
        Question::new(
            QuestionId::new(id),
            format!("Q{id}"),
            topic.map(str::to_owned),
            vec![
                Answer::correct(AnswerId::new(id * 10), "right"),
                Answer::wrong(AnswerId::new(id * 10 + 1), "wrong"),
            ],
        )
        .unwrap()
    }

    async fn service_with(repo: &InMemoryRepository) -> QuizService {
        for (id, topic) in [(1, Some("CPU Scheduling")), (2, None)] {
            repo.upsert_question(&question(id, topic)).await.unwrap();
        }
        repo.upsert_user(&UserProfile {
            user_id: UserId::new(5),
            name: "Ana".into(),
            role: UserRole::Student,
            created_at: fixed_now(),
        })
        .await
        .unwrap();
        QuizService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn professor_cannot_start() {
        let repo = InMemoryRepository::new();
        let service = service_with(&repo).await;
        let mut session = service.load_session().await.unwrap();

        let err = service
            .start(&Identity::professor(UserId::new(1), "Prof"), &mut session)
            .unwrap_err();

        assert!(matches!(
            err,
            QuizServiceError::Forbidden {
                role: UserRole::Professor
            }
        ));
        assert_eq!(session.state(), SessionStateKind::NotStarted);
    }

    #[tokio::test]
    async fn submit_persists_result_with_title_and_clock() {
        let repo = InMemoryRepository::new();
        let service = service_with(&repo).await.with_exam_title("Midterm");
        let student = Identity::student(UserId::new(5), "Ana");
        let mut session = service.load_session().await.unwrap();
        service
            .start_with_rng(&student, &mut session, &mut StdRng::seed_from_u64(1))
            .unwrap();
        session
            .select_answer(QuestionId::new(1), AnswerId::new(10))
            .unwrap();

        let outcome = service.submit(&student, &mut session).await.unwrap();

        assert_eq!(outcome.report, ScoreReport::new(1, 2).unwrap());
        let id = outcome.result_id.expect("persisted");
        let stored = repo.get_result(id).await.unwrap().unwrap();
        assert_eq!(stored.exam_title(), "Midterm");
        assert_eq!(stored.score(), 1);
        assert_eq!(stored.max_score(), 2);
        assert_eq!(stored.created_at(), fixed_now());
    }

    #[tokio::test]
    async fn failed_save_keeps_report_and_warns() {
        let repo = InMemoryRepository::new();
        let service = service_with(&repo).await;
        let student = Identity::student(UserId::new(5), "Ana");
        let mut session = service.load_session().await.unwrap();
        service.start(&student, &mut session).unwrap();
        repo.set_fail_result_writes(true);

        let outcome = service.submit(&student, &mut session).await.unwrap();

        assert!(!outcome.is_persisted());
        assert!(outcome.warning.is_some());
        assert_eq!(session.report(), Some(outcome.report));

        repo.set_fail_result_writes(false);
        assert!(service.persist_report(&student, &outcome.report).await.is_ok());
    }

    #[tokio::test]
    async fn advancing_past_last_question_records_score() {
        let repo = InMemoryRepository::new();
        let service = service_with(&repo).await;
        let student = Identity::student(UserId::new(5), "Ana");
        let mut session = service.load_session().await.unwrap();
        service.start(&student, &mut session).unwrap();

        let mut outcome = service.advance(&student, &mut session).await.unwrap();
        while let AdvanceOutcome::Moved(_) = outcome {
            outcome = service.advance(&student, &mut session).await.unwrap();
        }

        let AdvanceOutcome::Completed(submission) = outcome else {
            unreachable!();
        };
        assert!(submission.is_persisted());
        assert_eq!(submission.report.total_count(), 2);
    }
}
