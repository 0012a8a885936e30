use std::collections::HashMap;

use quiz_core::model::{Answer, Question, QuestionId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{db, id_i64, map_answer_row, question_id_from_i64, ser};
use crate::repository::{QuestionRepository, StorageError};

fn build_question(row: &SqliteRow, answers: Vec<Answer>) -> Result<Question, StorageError> {
    Question::new(
        question_id_from_i64(row.try_get("id").map_err(ser)?)?,
        row.try_get::<String, _>("text").map_err(ser)?,
        row.try_get::<Option<String>, _>("topic").map_err(ser)?,
        answers,
    )
    .map_err(ser)
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let question_id = id_i64("question_id", question.id().value())?;
        let mut tx = self.pool.begin().await.map_err(db)?;

        sqlx::query(
            r"
            INSERT INTO questions (id, text, topic)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO UPDATE SET
                text = excluded.text,
                topic = excluded.topic
            ",
        )
        .bind(question_id)
        .bind(question.text().to_owned())
        .bind(question.topic().map(str::to_owned))
        .execute(&mut *tx)
        .await
        .map_err(db)?;

        // answers are replaced wholesale so removed options disappear
        sqlx::query("DELETE FROM answers WHERE question_id = ?1")
            .bind(question_id)
            .execute(&mut *tx)
            .await
            .map_err(db)?;

        for (position, answer) in question.answers().iter().enumerate() {
            sqlx::query(
                r"
                INSERT INTO answers (id, question_id, position, text, is_correct)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ",
            )
            .bind(id_i64("answer_id", answer.id.value())?)
            .bind(question_id)
            .bind(i64::try_from(position).map_err(ser)?)
            .bind(answer.text.clone())
            .bind(i64::from(answer.is_correct))
            .execute(&mut *tx)
            .await
            .map_err(db)?;
        }

        tx.commit().await.map_err(db)?;
        Ok(())
    }

    async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StorageError> {
        let question_id = id_i64("question_id", id.value())?;
        let Some(row) = sqlx::query("SELECT id, text, topic FROM questions WHERE id = ?1")
            .bind(question_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
        else {
            return Ok(None);
        };

        let answer_rows = sqlx::query(
            r"
            SELECT id, text, is_correct
            FROM answers
            WHERE question_id = ?1
            ORDER BY position ASC
            ",
        )
        .bind(question_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let answers = answer_rows
            .iter()
            .map(map_answer_row)
            .collect::<Result<Vec<_>, _>>()?;
        build_question(&row, answers).map(Some)
    }

    async fn list_questions(&self) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query("SELECT id, text, topic FROM questions ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;

        let answer_rows = sqlx::query(
            r"
            SELECT id, question_id, text, is_correct
            FROM answers
            ORDER BY question_id ASC, position ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let mut by_question: HashMap<i64, Vec<Answer>> = HashMap::new();
        for row in &answer_rows {
            let question_id: i64 = row.try_get("question_id").map_err(ser)?;
            by_question
                .entry(question_id)
                .or_default()
                .push(map_answer_row(row)?);
        }

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: i64 = row.try_get("id").map_err(ser)?;
            let answers = by_question.remove(&id).unwrap_or_default();
            out.push(build_question(row, answers)?);
        }
        Ok(out)
    }

    async fn delete_question(&self, id: QuestionId) -> Result<(), StorageError> {
        let res = sqlx::query("DELETE FROM questions WHERE id = ?1")
            .bind(id_i64("question_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
