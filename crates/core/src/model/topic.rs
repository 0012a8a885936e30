use std::collections::HashMap;

use crate::model::question::Question;

/// A named group of questions presented together as one step of a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBucket {
    name: String,
    questions: Vec<Question>,
}

impl TopicBucket {
    #[must_use]
    pub fn new(name: impl Into<String>, questions: Vec<Question>) -> Self {
        Self {
            name: name.into(),
            questions,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub(crate) fn map_questions(self, f: impl FnOnce(Vec<Question>) -> Vec<Question>) -> Self {
        Self {
            name: self.name,
            questions: f(self.questions),
        }
    }
}

/// Partition questions by [`Question::topic_key`], keeping first-seen topic order
/// and the input order within each bucket.
#[must_use]
pub fn group_by_topic(questions: &[Question]) -> Vec<TopicBucket> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut buckets: Vec<TopicBucket> = Vec::new();

    for question in questions {
        let key = question.topic_key();
        let slot = *index.entry(key).or_insert_with(|| {
            buckets.push(TopicBucket::new(key, Vec::new()));
            buckets.len() - 1
        });
        buckets[slot].questions.push(question.clone());
    }

    buckets
}
