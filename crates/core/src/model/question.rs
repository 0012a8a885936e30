use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{AnswerId, QuestionId};

/// Bucket name used for questions that carry no topic label.
pub const DEFAULT_TOPIC: &str = "General";

//
// ─── ANSWER ────────────────────────────────────────────────────────────────────
//

/// A candidate answer, scoped to the question that owns it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub text: String,
    pub is_correct: bool,
}

impl Answer {
    #[must_use]
    pub fn new(id: AnswerId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            is_correct,
        }
    }

    #[must_use]
    pub fn correct(id: AnswerId, text: impl Into<String>) -> Self {
        Self::new(id, text, true)
    }

    #[must_use]
    pub fn wrong(id: AnswerId, text: impl Into<String>) -> Self {
        Self::new(id, text, false)
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question text cannot be empty")]
    EmptyText,

    #[error("question {id} needs at least two answers, got {count}")]
    TooFewAnswers { id: QuestionId, count: usize },

    #[error("answer {answer} appears more than once in question {id}")]
    DuplicateAnswer { id: QuestionId, answer: AnswerId },

    #[error("question {id} has no answer marked correct")]
    NoCorrectAnswer { id: QuestionId },

    #[error("question {id} has {count} answers marked correct, expected exactly one")]
    MultipleCorrectAnswers { id: QuestionId, count: usize },
}

/// A multiple-choice question with exactly one correct answer.
///
/// Questions are immutable once built; the only way in is [`Question::new`],
/// which enforces the single-correct-answer rule so scoring is never ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    text: String,
    topic: Option<String>,
    answers: Vec<Answer>,
    correct: AnswerId,
}

impl Question {
    /// Build and validate a question.
    ///
    /// Blank topics are normalized to `None` so they land in the default bucket.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the text is blank, fewer than two answers are
    /// supplied, answer ids repeat, or the number of correct answers is not one.
    pub fn new(
        id: QuestionId,
        text: impl Into<String>,
        topic: Option<String>,
        answers: Vec<Answer>,
    ) -> Result<Self, QuestionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(QuestionError::EmptyText);
        }
        if answers.len() < 2 {
            return Err(QuestionError::TooFewAnswers {
                id,
                count: answers.len(),
            });
        }

        let mut seen = HashSet::with_capacity(answers.len());
        for answer in &answers {
            if !seen.insert(answer.id) {
                return Err(QuestionError::DuplicateAnswer {
                    id,
                    answer: answer.id,
                });
            }
        }

        let mut correct = answers.iter().filter(|a| a.is_correct);
        let Some(first) = correct.next() else {
            return Err(QuestionError::NoCorrectAnswer { id });
        };
        let extra = correct.count();
        if extra > 0 {
            return Err(QuestionError::MultipleCorrectAnswers {
                id,
                count: extra + 1,
            });
        }
        let correct = first.id;

        let topic = topic
            .map(|t| t.trim().to_owned())
            .filter(|t| !t.is_empty());

        Ok(Self {
            id,
            text,
            topic,
            answers,
            correct,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn topic(&self) -> Option<&str> {
        self.topic.as_deref()
    }

    /// Grouping key: the topic label, or [`DEFAULT_TOPIC`] when absent.
    #[must_use]
    pub fn topic_key(&self) -> &str {
        self.topic.as_deref().unwrap_or(DEFAULT_TOPIC)
    }

    #[must_use]
    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    #[must_use]
    pub fn correct_answer_id(&self) -> AnswerId {
        self.correct
    }

    #[must_use]
    pub fn has_answer(&self, answer: AnswerId) -> bool {
        self.answers.iter().any(|a| a.id == answer)
    }

    #[must_use]
    pub fn answer(&self, answer: AnswerId) -> Option<&Answer> {
        self.answers.iter().find(|a| a.id == answer)
    }

    #[must_use]
    pub fn is_correct(&self, answer: AnswerId) -> bool {
        self.correct == answer
    }
}
