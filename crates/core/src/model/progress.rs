use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{LessonId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("completed lesson is missing completed_at")]
    MissingCompletedAt,

    #[error("completed_at is set on a lesson that is not completed")]
    UnexpectedCompletedAt,

    #[error("watched seconds must be non-negative, got {provided}")]
    NegativeWatchedSeconds { provided: i64 },
}

//
// ─── LESSON PROGRESS ───────────────────────────────────────────────────────────
//

/// Persisted watch progress for one student on one lesson.
///
/// Keyed by `(user_id, lesson_id)`. `is_completed` only ever moves from
/// `false` to `true`, and `completed_at` is present exactly when the lesson
/// is completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    user_id: UserId,
    lesson_id: LessonId,
    watched_seconds: u32,
    is_completed: bool,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Fresh record with no watch time.
    #[must_use]
    pub fn new(user_id: UserId, lesson_id: LessonId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lesson_id,
            watched_seconds: 0,
            is_completed: false,
            completed_at: None,
            updated_at: now,
        }
    }

    /// Rehydrate a record from storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError` if the completion flag and timestamp disagree or
    /// the stored watch time is negative.
    pub fn from_persisted(
        user_id: UserId,
        lesson_id: LessonId,
        watched_seconds: i64,
        is_completed: bool,
        completed_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if watched_seconds < 0 {
            return Err(ProgressError::NegativeWatchedSeconds {
                provided: watched_seconds,
            });
        }
        let watched_seconds = u32::try_from(watched_seconds).unwrap_or(u32::MAX);
        match (is_completed, completed_at) {
            (true, None) => Err(ProgressError::MissingCompletedAt),
            (false, Some(_)) => Err(ProgressError::UnexpectedCompletedAt),
            _ => Ok(Self {
                user_id,
                lesson_id,
                watched_seconds,
                is_completed,
                completed_at,
                updated_at,
            }),
        }
    }

    /// Converts a fractional playback position into stored whole seconds.
    ///
    /// Truncates toward zero; negative and non-finite positions store as 0.
    #[must_use]
    pub fn seconds_from_position(position: f64) -> u32 {
        if !position.is_finite() || position <= 0.0 {
            return 0;
        }
        if position >= f64::from(u32::MAX) {
            return u32::MAX;
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let secs = position.floor() as u32;
        secs
    }

    /// Records the latest observed position and refreshes `updated_at`.
    pub fn record_position(&mut self, position: f64, now: DateTime<Utc>) {
        self.watched_seconds = Self::seconds_from_position(position);
        self.updated_at = now;
    }

    /// Marks the lesson completed.
    ///
    /// Returns `false` when it was already completed; `completed_at` is never
    /// overwritten.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_completed {
            return false;
        }
        self.is_completed = true;
        self.completed_at = Some(at);
        self.updated_at = at;
        true
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn watched_seconds(&self) -> u32 {
        self.watched_seconds
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.is_completed
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;
    use chrono::Duration;

    fn fresh() -> LessonProgress {
        LessonProgress::new(UserId::random(), LessonId::new(7), fixed_now())
    }

    #[test]
    fn position_is_truncated_not_rounded() {
        assert_eq!(LessonProgress::seconds_from_position(91.99), 91);
        assert_eq!(LessonProgress::seconds_from_position(-3.0), 0);
        assert_eq!(LessonProgress::seconds_from_position(f64::NAN), 0);
    }

    #[test]
    fn completion_is_set_once() {
        let mut progress = fresh();
        let first = fixed_now() + Duration::minutes(5);
        assert!(progress.mark_completed(first));
        assert!(!progress.mark_completed(first + Duration::minutes(1)));
        assert_eq!(progress.completed_at(), Some(first));
        assert!(progress.is_completed());
    }

    #[test]
    fn record_position_keeps_last_observed_value() {
        let mut progress = fresh();
        progress.record_position(120.4, fixed_now());
        progress.record_position(30.0, fixed_now());
        assert_eq!(progress.watched_seconds(), 30);
    }

    #[test]
    fn from_persisted_enforces_completion_invariant() {
        let user = UserId::random();
        let lesson = LessonId::new(1);
        let now = fixed_now();

        assert_eq!(
            LessonProgress::from_persisted(user, lesson, 10, true, None, now),
            Err(ProgressError::MissingCompletedAt)
        );
        assert_eq!(
            LessonProgress::from_persisted(user, lesson, 10, false, Some(now), now),
            Err(ProgressError::UnexpectedCompletedAt)
        );

        assert_eq!(
            LessonProgress::from_persisted(user, lesson, -4, false, None, now),
            Err(ProgressError::NegativeWatchedSeconds { provided: -4 })
        );

        let ok = LessonProgress::from_persisted(user, lesson, 92, true, Some(now), now).unwrap();
        assert_eq!(ok.watched_seconds(), 92);
    }
}
