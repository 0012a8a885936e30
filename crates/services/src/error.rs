//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::{ExamResultError, UserRole};
use quiz_core::session::QuizSessionError;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `AiQuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiQuizError {
    #[error("AI questions are not configured")]
    Disabled,
    #[error("invalid AI request: {0}")]
    InvalidRequest(String),
    #[error("AI service returned an empty response")]
    EmptyResponse,
    #[error("AI request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("AI response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error(transparent)]
    Http(reqwest::Error),
}

impl From<reqwest::Error> for AiQuizError {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err.without_url())
    }
}

/// Errors emitted by `QuizService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("{role} accounts cannot take the quiz")]
    Forbidden { role: UserRole },
    #[error(transparent)]
    Session(#[from] QuizSessionError),
    #[error(transparent)]
    ExamResult(#[from] ExamResultError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProfileService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    #[error("user not found")]
    NotFound,
    #[error("not authorized for this view")]
    Forbidden,
    #[error("user name must not be blank")]
    BlankName,
    #[error("user name {0:?} is already taken")]
    NameTaken(String),
    #[error("professors cannot delete their own account")]
    SelfDelete,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
