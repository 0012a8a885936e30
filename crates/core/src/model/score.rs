use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("correct count ({correct}) exceeds total count ({total})")]
pub struct ScoreError {
    pub correct: u32,
    pub total: u32,
}

/// Final tally of a quiz attempt. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawScoreReport")]
pub struct ScoreReport {
    correct_count: u32,
    total_count: u32,
}

#[derive(Deserialize)]
struct RawScoreReport {
    correct_count: u32,
    total_count: u32,
}

impl TryFrom<RawScoreReport> for ScoreReport {
    type Error = ScoreError;

    fn try_from(raw: RawScoreReport) -> Result<Self, Self::Error> {
        Self::new(raw.correct_count, raw.total_count)
    }
}

impl ScoreReport {
    /// # Errors
    ///
    /// Returns `ScoreError` if `correct_count > total_count`.
    pub fn new(correct_count: u32, total_count: u32) -> Result<Self, ScoreError> {
        if correct_count > total_count {
            return Err(ScoreError {
                correct: correct_count,
                total: total_count,
            });
        }
        Ok(Self {
            correct_count,
            total_count,
        })
    }

    /// Tally from in-memory counts. Callers guarantee `correct <= total`;
    /// counts beyond `u32::MAX` saturate.
    pub(crate) fn from_counts(correct: usize, total: usize) -> Self {
        let total_count = u32::try_from(total).unwrap_or(u32::MAX);
        let correct_count = u32::try_from(correct).unwrap_or(u32::MAX).min(total_count);
        Self {
            correct_count,
            total_count,
        }
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn total_count(&self) -> u32 {
        self.total_count
    }

    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.total_count.saturating_sub(self.correct_count)
    }

    /// Share of correct answers in `0.0..=100.0`; zero for an empty report.
    #[must_use]
    pub fn percentage(&self) -> f64 {
        if self.total_count == 0 {
            return 0.0;
        }
        f64::from(self.correct_count) * 100.0 / f64::from(self.total_count)
    }
}
