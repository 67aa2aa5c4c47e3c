use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{CourseId, ModuleId, UserId};

/// A module of a course, released `drip_offset_days` after enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseModule {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub position: u32,
    pub drip_offset_days: u32,
}

impl CourseModule {
    #[must_use]
    pub fn new(
        id: ModuleId,
        course_id: CourseId,
        title: impl Into<String>,
        position: u32,
        drip_offset_days: u32,
    ) -> Self {
        Self {
            id,
            course_id,
            title: title.into(),
            position,
            drip_offset_days,
        }
    }
}

/// A student's enrollment in a course.
///
/// `enrolled_at` is `None` when the stored date was missing or could not be
/// parsed; gating treats that as "not yet available".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub enrolled_at: Option<DateTime<Utc>>,
}

impl Enrollment {
    #[must_use]
    pub fn new(user_id: UserId, course_id: CourseId, enrolled_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            course_id,
            enrolled_at: Some(enrolled_at),
        }
    }
}

/// Derived gate for one module. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleAvailability {
    pub is_available: bool,
    pub available_date: Option<DateTime<Utc>>,
    pub days_until_available: u32,
    pub message: String,
}

impl ModuleAvailability {
    #[must_use]
    pub fn available(available_date: Option<DateTime<Utc>>) -> Self {
        Self {
            is_available: true,
            available_date,
            days_until_available: 0,
            message: String::new(),
        }
    }
}
