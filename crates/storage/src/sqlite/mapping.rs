use chrono::{DateTime, Utc};
use quiz_core::model::{
    Answer, AnswerId, ExamResult, ExamResultId, QuestionId, UserId, UserProfile, UserRole,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

/// Maps driver errors, turning constraint violations into `Conflict`.
pub(crate) fn db(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::Database(err)
            if err.is_foreign_key_violation() || err.is_unique_violation() =>
        {
            StorageError::Conflict
        }
        other => StorageError::Connection(other.to_string()),
    }
}

pub(crate) fn id_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn question_id_from_i64(v: i64) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::new(i64_to_u64("question_id", v)?))
}

pub(crate) fn user_id_from_i64(v: i64) -> Result<UserId, StorageError> {
    Ok(UserId::new(i64_to_u64("user_id", v)?))
}

pub(crate) fn map_answer_row(row: &SqliteRow) -> Result<Answer, StorageError> {
    let id = AnswerId::new(i64_to_u64("answer_id", row.try_get("id").map_err(ser)?)?);
    let is_correct = match row.try_get::<i64, _>("is_correct").map_err(ser)? {
        0 => false,
        1 => true,
        other => {
            return Err(StorageError::Serialization(format!(
                "invalid is_correct: {other}"
            )));
        }
    };
    Ok(Answer::new(
        id,
        row.try_get::<String, _>("text").map_err(ser)?,
        is_correct,
    ))
}

pub(crate) fn map_user_row(row: &SqliteRow) -> Result<UserProfile, StorageError> {
    let role: String = row.try_get("role").map_err(ser)?;
    Ok(UserProfile {
        user_id: user_id_from_i64(row.try_get("id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        role: role.parse::<UserRole>().map_err(ser)?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_exam_result_row(row: &SqliteRow) -> Result<ExamResult, StorageError> {
    let id = ExamResultId::new(i64_to_u64("exam_result_id", row.try_get("id").map_err(ser)?)?);
    ExamResult::from_persisted(
        id,
        user_id_from_i64(row.try_get("student_id").map_err(ser)?)?,
        row.try_get("exam_title").map_err(ser)?,
        u32_from_i64("score", row.try_get("score").map_err(ser)?)?,
        u32_from_i64("max_score", row.try_get("max_score").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}
