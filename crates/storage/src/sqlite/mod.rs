//! `SQLite` adapter for the quiz schema.
//!
//! Tables: `users` (unique names, role checked against `STUDENT`/`PROFESSOR`),
//! `questions` with their ordered `answers`, and the append-only
//! `exam_results` log. Answers and results are removed with their parent row.

use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{ExamResultRepository, QuestionRepository, Storage, UserRepository};

mod exam_result_repo;
mod mapping;
mod migrate;
mod question_repo;
mod user_repo;

/// One connection pool serving every quiz repository trait.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

/// Failure while opening or migrating the quiz database.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open a pool on the quiz database at `database_url`.
    ///
    /// Every connection enforces foreign keys so deleting a question or a user
    /// also drops its answers or exam results.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or a
    /// connection pragma is rejected.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the quiz schema to the latest version.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration fails, for instance when
    /// existing users share a name.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Question bank, result log and user accounts over one migrated
    /// `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let questions: Arc<dyn QuestionRepository> = Arc::new(repo.clone());
        let results: Arc<dyn ExamResultRepository> = Arc::new(repo.clone());
        let users: Arc<dyn UserRepository> = Arc::new(repo);
        Ok(Self {
            questions,
            results,
            users,
        })
    }
}
