use quiz_core::model::{ExamResult, ExamResultId, NewExamResult, UserId};

use super::SqliteRepository;
use super::mapping::{db, id_i64, map_exam_result_row};
use crate::repository::{ExamResultRepository, StorageError};

#[async_trait::async_trait]
impl ExamResultRepository for SqliteRepository {
    async fn append_result(&self, result: &NewExamResult) -> Result<ExamResultId, StorageError> {
        let res = sqlx::query(
            r"
                INSERT INTO exam_results (student_id, exam_title, score, max_score, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(id_i64("student_id", result.student_id().value())?)
        .bind(result.exam_title())
        .bind(i64::from(result.score()))
        .bind(i64::from(result.max_score()))
        .bind(result.created_at())
        .execute(&self.pool)
        .await
        .map_err(db)?;

        let id = u64::try_from(res.last_insert_rowid())
            .map_err(|_| StorageError::Serialization("exam_result_id sign overflow".into()))?;
        Ok(ExamResultId::new(id))
    }

    async fn get_result(&self, id: ExamResultId) -> Result<Option<ExamResult>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, student_id, exam_title, score, max_score, created_at
                FROM exam_results
                WHERE id = ?1
            ",
        )
        .bind(id_i64("exam_result_id", id.value())?)
        .fetch_optional(&self.pool)
        .await
        .map_err(db)?;

        row.as_ref().map(map_exam_result_row).transpose()
    }

    async fn list_results_for_student(
        &self,
        student_id: UserId,
        limit: u32,
    ) -> Result<Vec<ExamResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, student_id, exam_title, score, max_score, created_at
                FROM exam_results
                WHERE student_id = ?1
                ORDER BY created_at DESC, id DESC
                LIMIT ?2
            ",
        )
        .bind(id_i64("student_id", student_id.value())?)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_exam_result_row).collect()
    }

    async fn list_recent_results(&self, limit: u32) -> Result<Vec<ExamResult>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, student_id, exam_title, score, max_score, created_at
                FROM exam_results
                ORDER BY created_at DESC, id DESC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        rows.iter().map(map_exam_result_row).collect()
    }
}
