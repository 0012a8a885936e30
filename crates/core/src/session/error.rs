use std::fmt;
use thiserror::Error;

use crate::model::{AnswerId, QuestionId};

/// Lifecycle state of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionStateKind {
    NotStarted,
    InProgress,
    Completed,
}

impl fmt::Display for SessionStateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionStateKind::NotStarted => "not started",
            SessionStateKind::InProgress => "in progress",
            SessionStateKind::Completed => "completed",
        })
    }
}

/// Session transitions, used to report which call was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Start,
    SelectAnswer,
    Advance,
    Retreat,
    JumpToTopic,
    Submit,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Start => "start",
            Operation::SelectAnswer => "select an answer",
            Operation::Advance => "advance",
            Operation::Retreat => "retreat",
            Operation::JumpToTopic => "jump to a topic",
            Operation::Submit => "submit",
        })
    }
}

/// Errors reported synchronously by [`QuizSession`](super::QuizSession) transitions.
///
/// None of these leave the session modified.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizSessionError {
    #[error("cannot {operation} while the session is {state}")]
    InvalidState {
        operation: Operation,
        state: SessionStateKind,
    },

    #[error("no questions available to start the quiz")]
    EmptyQuestionSet,

    #[error("question {0} appears more than once in the question set")]
    DuplicateQuestion(QuestionId),

    #[error("topic index {index} is out of range ({len} topics)")]
    InvalidTopicIndex { index: usize, len: usize },

    #[error("question {0} is not part of this session")]
    UnknownQuestion(QuestionId),

    #[error("answer {answer} does not belong to question {question}")]
    AnswerMismatch {
        question: QuestionId,
        answer: AnswerId,
    },
}
