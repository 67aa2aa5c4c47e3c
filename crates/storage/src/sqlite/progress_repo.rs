use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lesson_core::model::{LessonId, LessonProgress, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, lesson_id_from_i64, lesson_id_to_i64, ser, user_id_from_str};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn read_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT user_id, lesson_id, watched_seconds, is_completed, completed_at, updated_at
            FROM lesson_progress
            WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(lesson_id_to_i64(lesson_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        let stored_user: String = row.try_get("user_id").map_err(ser)?;
        let stored_lesson: i64 = row.try_get("lesson_id").map_err(ser)?;
        let watched_seconds: i64 = row.try_get("watched_seconds").map_err(ser)?;
        let is_completed: bool = row.try_get("is_completed").map_err(ser)?;
        let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at").map_err(ser)?;

        LessonProgress::from_persisted(
            user_id_from_str(&stored_user)?,
            lesson_id_from_i64(stored_lesson)?,
            watched_seconds,
            is_completed,
            completed_at,
            updated_at,
        )
        .map(Some)
        .map_err(ser)
    }

    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_progress (
                user_id,
                lesson_id,
                watched_seconds,
                is_completed,
                completed_at,
                updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                watched_seconds = excluded.watched_seconds,
                is_completed = excluded.is_completed,
                completed_at = excluded.completed_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(progress.user_id().to_string())
        .bind(lesson_id_to_i64(progress.lesson_id())?)
        .bind(i64::from(progress.watched_seconds()))
        .bind(progress.is_completed())
        .bind(progress.completed_at())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
