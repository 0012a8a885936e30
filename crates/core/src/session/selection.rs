use std::collections::HashMap;

use crate::model::{AnswerId, QuestionId};

/// The user's current answer choice per question.
///
/// One entry per question; selecting again overwrites. A missing entry means
/// the question is unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionRecord {
    choices: HashMap<QuestionId, AnswerId>,
}

impl SelectionRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `answer` for `question`, returning the previous choice if any.
    pub fn select(&mut self, question: QuestionId, answer: AnswerId) -> Option<AnswerId> {
        self.choices.insert(question, answer)
    }

    #[must_use]
    pub fn get(&self, question: QuestionId) -> Option<AnswerId> {
        self.choices.get(&question).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.choices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn clear(&mut self) {
        self.choices.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (QuestionId, AnswerId)> + '_ {
        self.choices.iter().map(|(q, a)| (*q, *a))
    }
}
