use async_trait::async_trait;
use lesson_core::drip::parse_enrollment_date;
use lesson_core::model::{CourseId, CourseModule, Enrollment, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{
    conn, course_id_from_i64, course_id_to_i64, module_id_from_i64, module_id_to_i64, ser,
    u32_from_i64,
};
use crate::repository::{EnrollmentRepository, StorageError};

fn map_module(row: &SqliteRow) -> Result<CourseModule, StorageError> {
    let id: i64 = row.try_get("id").map_err(ser)?;
    let course_id: i64 = row.try_get("course_id").map_err(ser)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let position: i64 = row.try_get("position").map_err(ser)?;
    let drip_offset_days: i64 = row.try_get("drip_offset_days").map_err(ser)?;

    Ok(CourseModule {
        id: module_id_from_i64(id)?,
        course_id: course_id_from_i64(course_id)?,
        title,
        position: u32_from_i64("position", position)?,
        drip_offset_days: u32_from_i64("drip_offset_days", drip_offset_days)?,
    })
}

#[async_trait]
impl EnrollmentRepository for SqliteRepository {
    async fn get_enrollment(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>, StorageError> {
        let row = sqlx::query(
            "SELECT enrolled_at FROM enrollments WHERE user_id = ?1 AND course_id = ?2",
        )
        .bind(user_id.to_string())
        .bind(course_id_to_i64(course_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };

        // Stored dates come from outside this crate; unreadable ones gate as pending.
        let raw: Option<String> = row.try_get("enrolled_at").map_err(ser)?;
        let enrolled_at = raw.as_deref().and_then(parse_enrollment_date);
        if enrolled_at.is_none() {
            tracing::warn!(
                %user_id,
                %course_id,
                raw = raw.as_deref().unwrap_or(""),
                "enrollment date missing or malformed"
            );
        }

        Ok(Some(Enrollment {
            user_id,
            course_id,
            enrolled_at,
        }))
    }

    async fn upsert_enrollment(&self, enrollment: &Enrollment) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO enrollments (user_id, course_id, enrolled_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(user_id, course_id) DO UPDATE SET enrolled_at = excluded.enrolled_at
            ",
        )
        .bind(enrollment.user_id.to_string())
        .bind(course_id_to_i64(enrollment.course_id)?)
        .bind(enrollment.enrolled_at.map(|at| at.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn list_modules(&self, course_id: CourseId) -> Result<Vec<CourseModule>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, course_id, title, position, drip_offset_days
            FROM course_modules
            WHERE course_id = ?1
            ORDER BY position ASC, id ASC
            ",
        )
        .bind(course_id_to_i64(course_id)?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_module).collect()
    }

    async fn upsert_module(&self, module: &CourseModule) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO course_modules (id, course_id, title, position, drip_offset_days)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                position = excluded.position,
                drip_offset_days = excluded.drip_offset_days
            ",
        )
        .bind(module_id_to_i64(module.id)?)
        .bind(course_id_to_i64(module.course_id)?)
        .bind(&module.title)
        .bind(i64::from(module.position))
        .bind(i64::from(module.drip_offset_days))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }
}
