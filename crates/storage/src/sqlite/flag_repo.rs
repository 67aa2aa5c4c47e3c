use async_trait::async_trait;
use lesson_core::model::UserId;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{FlagRepository, StorageError};

#[async_trait]
impl FlagRepository for SqliteRepository {
    async fn get_flag(&self, user_id: UserId, key: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT value FROM user_flags WHERE user_id = ?1 AND key = ?2")
            .bind(user_id.to_string())
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => row.try_get::<bool, _>("value").map_err(ser),
            None => Ok(false),
        }
    }

    async fn set_flag(&self, user_id: UserId, key: &str, value: bool) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO user_flags (user_id, key, value)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, key) DO UPDATE SET value = excluded.value
            ",
        )
        .bind(user_id.to_string())
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
