use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::ai::AiQuizService;
use crate::error::AppServicesError;
use crate::profile_service::ProfileService;
use crate::quiz_service::QuizService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz: Arc<QuizService>,
    profiles: Arc<ProfileService>,
    ai: Arc<AiQuizService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        exam_title: Option<String>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(
            &storage,
            clock,
            exam_title,
            AiQuizService::from_env(clock),
        ))
    }

    /// Build services over an existing storage handle.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        exam_title: Option<String>,
        ai: AiQuizService,
    ) -> Self {
        let mut quiz = QuizService::new(
            clock,
            Arc::clone(&storage.questions),
            Arc::clone(&storage.results),
        );
        if let Some(title) = exam_title.filter(|t| !t.trim().is_empty()) {
            quiz = quiz.with_exam_title(title);
        }
        let profiles = ProfileService::with_clock(
            Arc::clone(&storage.users),
            Arc::clone(&storage.results),
            clock,
        );

        Self {
            quiz: Arc::new(quiz),
            profiles: Arc::new(profiles),
            ai: Arc::new(ai),
        }
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizService> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn profiles(&self) -> Arc<ProfileService> {
        Arc::clone(&self.profiles)
    }

    #[must_use]
    pub fn ai(&self) -> Arc<AiQuizService> {
        Arc::clone(&self.ai)
    }
}
