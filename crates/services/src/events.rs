use chrono::{DateTime, Utc};
use lesson_core::model::{LessonId, UserId};
use tokio::sync::mpsc;

/// Emitted once when a playback session transitions into `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonCompleted {
    pub user_id: UserId,
    pub lesson_id: LessonId,
    pub completed_at: DateTime<Utc>,
}

pub type CompletionSender = mpsc::UnboundedSender<LessonCompleted>;
pub type CompletionReceiver = mpsc::UnboundedReceiver<LessonCompleted>;

/// Channel connecting trackers to the certificate trigger.
#[must_use]
pub fn completion_channel() -> (CompletionSender, CompletionReceiver) {
    mpsc::unbounded_channel()
}
