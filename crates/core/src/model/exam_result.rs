use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{ExamResultId, UserId};
use crate::model::score::ScoreReport;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamResultError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("score ({score}) exceeds max score ({max_score})")]
    ScoreAboveMax { score: u32, max_score: u32 },
}

fn validate(title: &str, score: u32, max_score: u32) -> Result<(), ExamResultError> {
    if title.trim().is_empty() {
        return Err(ExamResultError::EmptyTitle);
    }
    if score > max_score {
        return Err(ExamResultError::ScoreAboveMax { score, max_score });
    }
    Ok(())
}

/// Payload handed to result persistence after a quiz is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawNewExamResult")]
pub struct NewExamResult {
    student_id: UserId,
    exam_title: String,
    score: u32,
    max_score: u32,
    created_at: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNewExamResult {
    student_id: UserId,
    exam_title: String,
    score: u32,
    max_score: u32,
    created_at: DateTime<Utc>,
}

impl TryFrom<RawNewExamResult> for NewExamResult {
    type Error = ExamResultError;

    fn try_from(raw: RawNewExamResult) -> Result<Self, Self::Error> {
        validate(&raw.exam_title, raw.score, raw.max_score)?;
        Ok(Self {
            student_id: raw.student_id,
            exam_title: raw.exam_title,
            score: raw.score,
            max_score: raw.max_score,
            created_at: raw.created_at,
        })
    }
}

impl NewExamResult {
    /// Build a result payload from a score report plus caller-supplied metadata.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError::EmptyTitle` if the title is blank.
    pub fn from_report(
        student_id: UserId,
        exam_title: impl Into<String>,
        report: &ScoreReport,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ExamResultError> {
        let exam_title = exam_title.into();
        validate(&exam_title, report.correct_count(), report.total_count())?;
        Ok(Self {
            student_id,
            exam_title,
            score: report.correct_count(),
            max_score: report.total_count(),
            created_at,
        })
    }

    #[must_use]
    pub fn student_id(&self) -> UserId {
        self.student_id
    }

    #[must_use]
    pub fn exam_title(&self) -> &str {
        &self.exam_title
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// A persisted exam result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExamResult {
    id: ExamResultId,
    student_id: UserId,
    exam_title: String,
    score: u32,
    max_score: u32,
    created_at: DateTime<Utc>,
}

impl ExamResult {
    /// Rehydrate an exam result from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ExamResultError` if the title is blank or the score exceeds the maximum.
    pub fn from_persisted(
        id: ExamResultId,
        student_id: UserId,
        exam_title: String,
        score: u32,
        max_score: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ExamResultError> {
        validate(&exam_title, score, max_score)?;
        Ok(Self {
            id,
            student_id,
            exam_title,
            score,
            max_score,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamResultId {
        self.id
    }

    #[must_use]
    pub fn student_id(&self) -> UserId {
        self.student_id
    }

    #[must_use]
    pub fn exam_title(&self) -> &str {
        &self.exam_title
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn max_score(&self) -> u32 {
        self.max_score
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn payload_copies_report_counts() {
        let report = ScoreReport::new(2, 5).unwrap();
        let payload =
            NewExamResult::from_report(UserId::new(7), "OS Quiz", &report, fixed_now()).unwrap();

        assert_eq!(payload.student_id(), UserId::new(7));
        assert_eq!(payload.score(), 2);
        assert_eq!(payload.max_score(), 5);
    }

    #[test]
    fn payload_rejects_blank_title() {
        let report = ScoreReport::new(0, 1).unwrap();
        let err = NewExamResult::from_report(UserId::new(1), "  ", &report, fixed_now())
            .unwrap_err();
        assert_eq!(err, ExamResultError::EmptyTitle);
    }

    #[test]
    fn persisted_rejects_score_above_max() {
        let err = ExamResult::from_persisted(
            ExamResultId::new(1),
            UserId::new(1),
            "OS Quiz".into(),
            6,
            5,
            fixed_now(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ExamResultError::ScoreAboveMax {
                score: 6,
                max_score: 5
            }
        );
    }

    #[test]
    fn payload_serializes_in_camel_case() {
        let report = ScoreReport::new(1, 3).unwrap();
        let payload =
            NewExamResult::from_report(UserId::new(4), "OS Quiz", &report, fixed_now()).unwrap();
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"studentId\":4"));
        assert!(json.contains("\"maxScore\":3"));
    }

    #[test]
    fn deserialized_payload_is_validated() {
        let json = r#"{"studentId":4,"examTitle":"OS Quiz","score":5,"maxScore":3,"createdAt":"2023-11-14T22:13:20Z"}"#;
        assert!(serde_json::from_str::<NewExamResult>(json).is_err());

        let json = r#"{"studentId":4,"examTitle":" ","score":1,"maxScore":3,"createdAt":"2023-11-14T22:13:20Z"}"#;
        assert!(serde_json::from_str::<NewExamResult>(json).is_err());

        let json = r#"{"studentId":4,"examTitle":"OS Quiz","score":1,"maxScore":3,"createdAt":"2023-11-14T22:13:20Z"}"#;
        let payload: NewExamResult = serde_json::from_str(json).unwrap();
        assert_eq!(payload.score(), 1);
    }
}
