use thiserror::Error;

use crate::model::{ExamResultError, QuestionError, ScoreError};
use crate::session::QuizSessionError;

/// Any domain error raised by this crate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    ExamResult(#[from] ExamResultError),
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Session(#[from] QuizSessionError),
}
