use chrono::{DateTime, Utc};
use quiz_core::model::{UserId, UserProfile, UserRole};

use super::SqliteRepository;
use super::mapping::{db, id_i64, map_user_row, user_id_from_i64};
use crate::repository::{StorageError, UserRepository};

#[async_trait::async_trait]
impl UserRepository for SqliteRepository {
    async fn upsert_user(&self, user: &UserProfile) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO users (id, name, role, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                role = excluded.role
            ",
        )
        .bind(id_i64("user_id", user.user_id.value())?)
        .bind(user.name.clone())
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(db)?;

        Ok(())
    }

    async fn create_user(
        &self,
        name: &str,
        role: UserRole,
        created_at: DateTime<Utc>,
    ) -> Result<UserProfile, StorageError> {
        let done = sqlx::query("INSERT INTO users (name, role, created_at) VALUES (?1, ?2, ?3)")
            .bind(name)
            .bind(role.as_str())
            .bind(created_at)
            .execute(&self.pool)
            .await
            .map_err(db)?;

        Ok(UserProfile {
            user_id: user_id_from_i64(done.last_insert_rowid())?,
            name: name.to_owned(),
            role,
            created_at,
        })
    }

    async fn update_user(
        &self,
        id: UserId,
        name: &str,
        role: UserRole,
    ) -> Result<UserProfile, StorageError> {
        let done = sqlx::query("UPDATE users SET name = ?2, role = ?3 WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .bind(name)
            .bind(role.as_str())
            .execute(&self.pool)
            .await
            .map_err(db)?;
        if done.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        self.get_user(id).await?.ok_or(StorageError::NotFound)
    }

    async fn delete_user(&self, id: UserId) -> Result<(), StorageError> {
        // exam_results rows go with the user through ON DELETE CASCADE.
        let done = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(db)?;
        if done.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserProfile>, StorageError> {
        let row = sqlx::query("SELECT id, name, role, created_at FROM users WHERE id = ?1")
            .bind(id_i64("user_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;

        row.as_ref().map(map_user_row).transpose()
    }

    async fn list_users(&self, role: Option<UserRole>) -> Result<Vec<UserProfile>, StorageError> {
        let rows = match role {
            Some(role) => {
                sqlx::query(
                    "SELECT id, name, role, created_at FROM users WHERE role = ?1 ORDER BY id ASC",
                )
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT id, name, role, created_at FROM users ORDER BY id ASC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(db)?;

        rows.iter().map(map_user_row).collect()
    }
}
