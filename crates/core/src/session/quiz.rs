use rand::Rng;
use std::collections::HashSet;
use std::fmt;

use crate::model::{AnswerId, Question, QuestionId, ScoreReport, TopicBucket, group_by_topic};

use super::error::{Operation, QuizSessionError, SessionStateKind};
use super::selection::SelectionRecord;
use super::shuffle::shuffled;

//
// ─── CURSOR ────────────────────────────────────────────────────────────────────
//

/// Position inside an in-progress attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Cursor {
    pub topic_index: usize,
    pub question_index: usize,
}

impl Cursor {
    #[must_use]
    pub const fn new(topic_index: usize, question_index: usize) -> Self {
        Self {
            topic_index,
            question_index,
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.topic_index, self.question_index)
    }
}

/// Outcome of moving forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Moved(Cursor),
    Completed(ScoreReport),
}

/// Answered/total counts for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizProgress {
    pub answered: usize,
    pub total: usize,
    pub topic_index: usize,
    pub topic_count: usize,
}

//
// ─── ATTEMPT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone)]
struct Attempt {
    topics: Vec<TopicBucket>,
    cursor: Cursor,
    selections: SelectionRecord,
}

impl Attempt {
    fn question(&self, id: QuestionId) -> Option<&Question> {
        self.topics
            .iter()
            .flat_map(TopicBucket::questions)
            .find(|q| q.id() == id)
    }

    fn current_question(&self) -> Option<&Question> {
        self.topics
            .get(self.cursor.topic_index)?
            .questions()
            .get(self.cursor.question_index)
    }

    fn total(&self) -> usize {
        self.topics.iter().map(TopicBucket::len).sum()
    }

    fn next_cursor(&self) -> Option<Cursor> {
        let Cursor {
            topic_index,
            question_index,
        } = self.cursor;
        let topic_len = self.topics.get(topic_index).map_or(0, TopicBucket::len);

        if question_index + 1 < topic_len {
            Some(Cursor::new(topic_index, question_index + 1))
        } else if topic_index + 1 < self.topics.len() {
            Some(Cursor::new(topic_index + 1, 0))
        } else {
            None
        }
    }

    fn previous_cursor(&self) -> Option<Cursor> {
        let Cursor {
            topic_index,
            question_index,
        } = self.cursor;

        if question_index > 0 {
            Some(Cursor::new(topic_index, question_index - 1))
        } else if topic_index > 0 {
            let previous_len = self.topics[topic_index - 1].len();
            Some(Cursor::new(topic_index - 1, previous_len.saturating_sub(1)))
        } else {
            None
        }
    }

    /// Unanswered questions count as incorrect.
    fn score(&self) -> ScoreReport {
        let correct = self
            .topics
            .iter()
            .flat_map(TopicBucket::questions)
            .filter(|q| self.selections.get(q.id()) == Some(q.correct_answer_id()))
            .count();
        ScoreReport::from_counts(correct, self.total())
    }
}

enum Phase {
    NotStarted,
    InProgress(Attempt),
    Completed { attempt: Attempt, report: ScoreReport },
}

impl Phase {
    fn kind(&self) -> SessionStateKind {
        match self {
            Phase::NotStarted => SessionStateKind::NotStarted,
            Phase::InProgress(_) => SessionStateKind::InProgress,
            Phase::Completed { .. } => SessionStateKind::Completed,
        }
    }

    fn attempt(&self) -> Option<&Attempt> {
        match self {
            Phase::NotStarted => None,
            Phase::InProgress(attempt) | Phase::Completed { attempt, .. } => Some(attempt),
        }
    }
}

impl Clone for Phase {
    fn clone(&self) -> Self {
        match self {
            Phase::NotStarted => Phase::NotStarted,
            Phase::InProgress(attempt) => Phase::InProgress(attempt.clone()),
            Phase::Completed { attempt, report } => Phase::Completed {
                attempt: attempt.clone(),
                report: *report,
            },
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state of one quiz attempt, from start to scored completion.
///
/// The session owns a snapshot of the question list and never performs I/O.
/// Every transition either succeeds or returns a [`QuizSessionError`] with
/// the session left exactly as it was.
#[derive(Clone)]
pub struct QuizSession {
    questions: Vec<Question>,
    phase: Phase,
}

impl QuizSession {
    /// Create a session in the `NotStarted` state holding `questions`.
    #[must_use]
    pub fn new(questions: Vec<Question>) -> Self {
        Self {
            questions,
            phase: Phase::NotStarted,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionStateKind {
        self.phase.kind()
    }

    /// The question snapshot, in the order it was supplied.
    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Topic buckets of the current or completed attempt; empty before start.
    #[must_use]
    pub fn topics(&self) -> &[TopicBucket] {
        self.phase
            .attempt()
            .map(|a| a.topics.as_slice())
            .unwrap_or(&[])
    }

    /// Cursor while in progress.
    #[must_use]
    pub fn cursor(&self) -> Option<Cursor> {
        match &self.phase {
            Phase::InProgress(attempt) => Some(attempt.cursor),
            Phase::NotStarted | Phase::Completed { .. } => None,
        }
    }

    #[must_use]
    pub fn current_topic(&self) -> Option<&TopicBucket> {
        match &self.phase {
            Phase::InProgress(attempt) => attempt.topics.get(attempt.cursor.topic_index),
            Phase::NotStarted | Phase::Completed { .. } => None,
        }
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match &self.phase {
            Phase::InProgress(attempt) => attempt.current_question(),
            Phase::NotStarted | Phase::Completed { .. } => None,
        }
    }

    #[must_use]
    pub fn selection_for(&self, question: QuestionId) -> Option<AnswerId> {
        self.phase.attempt()?.selections.get(question)
    }

    #[must_use]
    pub fn selections(&self) -> Option<&SelectionRecord> {
        self.phase.attempt().map(|a| &a.selections)
    }

    /// The final report once completed.
    #[must_use]
    pub fn report(&self) -> Option<ScoreReport> {
        match &self.phase {
            Phase::Completed { report, .. } => Some(*report),
            Phase::NotStarted | Phase::InProgress(_) => None,
        }
    }

    #[must_use]
    pub fn progress(&self) -> Option<QuizProgress> {
        let attempt = self.phase.attempt()?;
        Some(QuizProgress {
            answered: attempt.selections.len(),
            total: attempt.total(),
            topic_index: attempt.cursor.topic_index,
            topic_count: attempt.topics.len(),
        })
    }

    /// True when the cursor sits on the last question of the last topic.
    #[must_use]
    pub fn is_last_position(&self) -> bool {
        match &self.phase {
            Phase::InProgress(attempt) => attempt.next_cursor().is_none(),
            Phase::NotStarted | Phase::Completed { .. } => false,
        }
    }

    /// True when the cursor sits on the first question of the first topic.
    #[must_use]
    pub fn is_first_position(&self) -> bool {
        self.cursor() == Some(Cursor::default())
    }

    /// Start the attempt using the thread-local RNG for shuffling.
    ///
    /// # Errors
    ///
    /// See [`QuizSession::start_with_rng`].
    pub fn start(&mut self) -> Result<Cursor, QuizSessionError> {
        self.start_with_rng(&mut rand::rng())
    }

    /// Group questions into topic buckets, shuffle each bucket, clear
    /// selections and place the cursor at `(0, 0)`.
    ///
    /// Bucket order follows the first appearance of each topic in the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless the session is
    /// `NotStarted`, `QuizSessionError::EmptyQuestionSet` if there are no
    /// questions and `QuizSessionError::DuplicateQuestion` if two questions
    /// share an id.
    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
    ) -> Result<Cursor, QuizSessionError> {
        if !matches!(self.phase, Phase::NotStarted) {
            return Err(self.invalid(Operation::Start));
        }
        if self.questions.is_empty() {
            return Err(QuizSessionError::EmptyQuestionSet);
        }
        let mut seen = HashSet::with_capacity(self.questions.len());
        if let Some(dup) = self
            .questions
            .iter()
            .map(Question::id)
            .find(|id| !seen.insert(*id))
        {
            return Err(QuizSessionError::DuplicateQuestion(dup));
        }

        let mut topics = Vec::new();
        for bucket in group_by_topic(&self.questions) {
            topics.push(bucket.map_questions(|questions| shuffled(&questions, rng)));
        }

        let cursor = Cursor::default();
        self.phase = Phase::InProgress(Attempt {
            topics,
            cursor,
            selections: SelectionRecord::new(),
        });
        Ok(cursor)
    }

    /// Record `answer` as the choice for `question`, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless in progress,
    /// `UnknownQuestion` if the question is not in this attempt, and
    /// `AnswerMismatch` if the answer is not one of the question's answers.
    pub fn select_answer(
        &mut self,
        question: QuestionId,
        answer: AnswerId,
    ) -> Result<(), QuizSessionError> {
        let attempt = self.attempt_mut(Operation::SelectAnswer)?;
        let q = attempt
            .question(question)
            .ok_or(QuizSessionError::UnknownQuestion(question))?;
        if !q.has_answer(answer) {
            return Err(QuizSessionError::AnswerMismatch { question, answer });
        }
        attempt.selections.select(question, answer);
        Ok(())
    }

    /// Move to the next question, the next topic, or finish the quiz when
    /// already on the last question of the last topic.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless in progress.
    pub fn advance(&mut self) -> Result<Advance, QuizSessionError> {
        let attempt = self.attempt_mut(Operation::Advance)?;
        if let Some(next) = attempt.next_cursor() {
            attempt.cursor = next;
            return Ok(Advance::Moved(next));
        }
        self.submit().map(Advance::Completed)
    }

    /// Move to the previous question, or the last question of the previous
    /// topic. No-op on the very first question.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless in progress.
    pub fn retreat(&mut self) -> Result<Cursor, QuizSessionError> {
        let attempt = self.attempt_mut(Operation::Retreat)?;
        if let Some(previous) = attempt.previous_cursor() {
            attempt.cursor = previous;
        }
        Ok(attempt.cursor)
    }

    /// Jump to the first question of topic `topic_index`.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless in progress, and
    /// `InvalidTopicIndex` when the index is out of range.
    pub fn jump_to_topic(&mut self, topic_index: usize) -> Result<Cursor, QuizSessionError> {
        let attempt = self.attempt_mut(Operation::JumpToTopic)?;
        let len = attempt.topics.len();
        if topic_index >= len {
            return Err(QuizSessionError::InvalidTopicIndex {
                index: topic_index,
                len,
            });
        }
        attempt.cursor = Cursor::new(topic_index, 0);
        Ok(attempt.cursor)
    }

    /// Score the attempt and complete the session. Terminal.
    ///
    /// # Errors
    ///
    /// Returns `QuizSessionError::InvalidState` unless in progress.
    pub fn submit(&mut self) -> Result<ScoreReport, QuizSessionError> {
        match std::mem::replace(&mut self.phase, Phase::NotStarted) {
            Phase::InProgress(attempt) => {
                let report = attempt.score();
                self.phase = Phase::Completed { attempt, report };
                Ok(report)
            }
            other => {
                self.phase = other;
                Err(self.invalid(Operation::Submit))
            }
        }
    }

    /// Return to `NotStarted`, discarding cursor, selections and score.
    pub fn reset(&mut self) {
        self.phase = Phase::NotStarted;
    }

    /// Like [`QuizSession::reset`], also replacing the question snapshot.
    pub fn reset_with(&mut self, questions: Vec<Question>) {
        self.questions = questions;
        self.reset();
    }

    fn attempt_mut(&mut self, operation: Operation) -> Result<&mut Attempt, QuizSessionError> {
        let state = self.phase.kind();
        match &mut self.phase {
            Phase::InProgress(attempt) => Ok(attempt),
            Phase::NotStarted | Phase::Completed { .. } => {
                Err(QuizSessionError::InvalidState { operation, state })
            }
        }
    }

    fn invalid(&self, operation: Operation) -> QuizSessionError {
        QuizSessionError::InvalidState {
            operation,
            state: self.phase.kind(),
        }
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("state", &self.state())
            .field("questions_len", &self.questions.len())
            .field("topics_len", &self.topics().len())
            .field("cursor", &self.cursor())
            .field("answered", &self.selections().map_or(0, SelectionRecord::len))
            .field("report", &self.report())
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
