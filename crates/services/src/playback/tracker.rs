use std::sync::{Arc, Mutex};

use lesson_core::model::{LessonId, LessonProgress, UserId};
use lesson_core::{Clock, DisplayProgress};
use storage::{FlagRepository, ProgressRepository};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::slot::PersistSlot;
use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::events::{CompletionSender, LessonCompleted};
use crate::identity::IdentityProvider;

/// Flag key for the per-student "unlock everything" override.
pub const UNLOCK_FLAG_KEY: &str = "course_unlocked";

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a playback session. `Completed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Loading,
    Tracking,
    Completed,
}

/// In-memory progress owned by the active player.
#[derive(Debug, Clone)]
pub struct ProgressSession {
    record: LessonProgress,
    last_fraction: f64,
    max_watched_seconds: u32,
    unlocked: bool,
}

impl ProgressSession {
    fn from_record(record: LessonProgress, unlocked: bool) -> Self {
        let max_watched_seconds = record.watched_seconds();
        Self {
            record,
            last_fraction: 0.0,
            max_watched_seconds,
            unlocked,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.record.user_id()
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.record.lesson_id()
    }

    /// Last observed position, not the furthest one.
    #[must_use]
    pub fn watched_seconds(&self) -> u32 {
        self.record.watched_seconds()
    }

    /// Furthest position seen in this session. Reporting only; never persisted.
    #[must_use]
    pub fn max_watched_seconds(&self) -> u32 {
        self.max_watched_seconds
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.record.is_completed()
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    #[must_use]
    pub fn record(&self) -> &LessonProgress {
        &self.record
    }
}

//
// ─── TRACKER ───────────────────────────────────────────────────────────────────
//

/// Per-lesson playback session: ingests ticks, decides completion and
/// rate-limits progress writes.
///
/// Writes are spaced at least `persist_interval` apart. Ticks arriving sooner
/// park the latest snapshot in a single delayed slot, replacing any earlier
/// one. Crossing the completion threshold writes immediately and emits one
/// [`LessonCompleted`] event.
pub struct PlaybackTracker {
    config: TrackerConfig,
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    flags: Arc<dyn FlagRepository>,
    completions: Option<CompletionSender>,
    state: TrackerState,
    session: Option<ProgressSession>,
    last_persist: Arc<Mutex<Instant>>,
    slot: PersistSlot,
}

impl PlaybackTracker {
    #[must_use]
    pub fn new(
        config: TrackerConfig,
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        flags: Arc<dyn FlagRepository>,
    ) -> Self {
        Self {
            config,
            clock,
            progress,
            flags,
            completions: None,
            state: TrackerState::Loading,
            session: None,
            last_persist: Arc::new(Mutex::new(Instant::now())),
            slot: PersistSlot::default(),
        }
    }

    /// Route completion events to `sender`.
    #[must_use]
    pub fn with_completions(mut self, sender: CompletionSender) -> Self {
        self.completions = Some(sender);
        self
    }

    #[must_use]
    pub fn state(&self) -> TrackerState {
        self.state
    }

    #[must_use]
    pub fn session(&self) -> Option<&ProgressSession> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.state == TrackerState::Completed
    }

    #[must_use]
    pub fn watched_seconds(&self) -> u32 {
        self.session.as_ref().map_or(0, ProgressSession::watched_seconds)
    }

    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        self.session.as_ref().is_some_and(ProgressSession::is_unlocked)
    }

    /// Real and displayed fractions for the most recent tick.
    #[must_use]
    pub fn display_progress(&self) -> DisplayProgress {
        DisplayProgress::from_real(self.session.as_ref().map_or(0.0, |s| s.last_fraction))
    }

    #[must_use]
    pub fn has_pending_persist(&self) -> bool {
        self.slot.is_pending()
    }

    /// Load prior progress and start tracking.
    ///
    /// A failed load counts as "no prior progress". Calls after the first are
    /// ignored.
    pub async fn initialize(&mut self, user_id: UserId, lesson_id: LessonId) {
        if self.state != TrackerState::Loading {
            debug!(%user_id, %lesson_id, "playback session already initialized");
            return;
        }

        let record = match self.progress.read_progress(user_id, lesson_id).await {
            Ok(Some(record)) => record,
            Ok(None) => LessonProgress::new(user_id, lesson_id, self.clock.now()),
            Err(error) => {
                warn!(%user_id, %lesson_id, %error, "failed to load lesson progress; starting from zero");
                LessonProgress::new(user_id, lesson_id, self.clock.now())
            }
        };

        let unlocked = match self.flags.get_flag(user_id, UNLOCK_FLAG_KEY).await {
            Ok(value) => value,
            Err(error) => {
                warn!(%user_id, %error, "failed to read unlock flag; treating as locked");
                false
            }
        };

        self.state = if record.is_completed() {
            TrackerState::Completed
        } else {
            TrackerState::Tracking
        };
        debug!(
            %user_id,
            %lesson_id,
            watched_seconds = record.watched_seconds(),
            state = ?self.state,
            "playback session initialized"
        );
        self.session = Some(ProgressSession::from_record(record, unlocked));
        self.reset_last_persist();
    }

    /// Initialize once the identity provider has a signed-in user.
    ///
    /// Returns `false` and stays in `Loading` while identity is unresolved.
    pub async fn initialize_with(
        &mut self,
        identity: &dyn IdentityProvider,
        lesson_id: LessonId,
    ) -> bool {
        let Some(user_id) = identity.current().user_id() else {
            debug!(%lesson_id, "identity not ready; playback tracking deferred");
            return false;
        };
        self.initialize(user_id, lesson_id).await;
        true
    }

    /// Ingest a playback tick. Ignored while `Loading`.
    pub async fn update_progress(&mut self, current_time: f64, duration: f64) {
        if self.state == TrackerState::Loading {
            return;
        }
        let fraction = playback_fraction(current_time, duration);
        let now = self.clock.now();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.last_fraction = fraction;
        session.record.record_position(current_time, now);
        session.max_watched_seconds = session
            .max_watched_seconds
            .max(session.record.watched_seconds());

        if self.state == TrackerState::Tracking && fraction >= self.config.completion_threshold {
            self.complete().await;
            return;
        }

        self.persist_debounced().await;
    }

    /// Manually mark the lesson completed. No-op when already completed or
    /// not yet initialized. Returns `true` if this call completed the lesson.
    pub async fn mark_complete(&mut self) -> bool {
        if self.state != TrackerState::Tracking {
            debug!(state = ?self.state, "mark_complete ignored");
            return false;
        }
        self.complete().await
    }

    /// Persist and store the unlock override for this student.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NotInitialized` before `initialize`, or
    /// `TrackerError::Storage` if the flag cannot be written.
    pub async fn set_unlocked(&mut self, unlocked: bool) -> Result<(), TrackerError> {
        let session = self.session.as_mut().ok_or(TrackerError::NotInitialized)?;
        self.flags
            .set_flag(session.user_id(), UNLOCK_FLAG_KEY, unlocked)
            .await?;
        session.unlocked = unlocked;
        Ok(())
    }

    /// Cancel the delayed write. If one was pending, flush the latest
    /// position now so the last partial interval is kept.
    pub async fn teardown(&mut self) {
        if self.slot.cancel().await {
            debug!("flushing pending progress on teardown");
            self.persist_now().await;
        }
    }

    async fn complete(&mut self) -> bool {
        let now = self.clock.now();
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if !session.record.mark_completed(now) {
            return false;
        }
        self.state = TrackerState::Completed;
        let event = LessonCompleted {
            user_id: session.user_id(),
            lesson_id: session.lesson_id(),
            completed_at: now,
        };
        info!(
            user_id = %event.user_id,
            lesson_id = %event.lesson_id,
            watched_seconds = session.watched_seconds(),
            "lesson completed"
        );

        self.slot.cancel().await;
        self.persist_now().await;
        self.emit(event);
        true
    }

    fn emit(&self, event: LessonCompleted) {
        let Some(sender) = &self.completions else {
            return;
        };
        if sender.send(event).is_err() {
            debug!("no certificate trigger listening for completions");
        }
    }

    async fn persist_debounced(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let mut snapshot = session.record.clone();
        let interval = self.config.persist_interval;
        let elapsed = self.last_persist_instant().elapsed();

        if elapsed >= interval {
            self.slot.cancel().await;
            self.persist_now().await;
            return;
        }

        let repo = Arc::clone(&self.progress);
        let last_persist = Arc::clone(&self.last_persist);
        let clock = self.clock;
        self.slot
            .schedule(interval, async move {
                snapshot.touch(clock.now());
                write_progress(repo.as_ref(), &snapshot).await;
                if let Ok(mut guard) = last_persist.lock() {
                    *guard = Instant::now();
                }
            })
            .await;
    }

    async fn persist_now(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.record.touch(self.clock.now());
        write_progress(self.progress.as_ref(), &session.record).await;
        self.reset_last_persist();
    }

    fn last_persist_instant(&self) -> Instant {
        self.last_persist
            .lock()
            .map_or_else(|poisoned| *poisoned.into_inner(), |guard| *guard)
    }

    fn reset_last_persist(&self) {
        match self.last_persist.lock() {
            Ok(mut guard) => *guard = Instant::now(),
            Err(poisoned) => *poisoned.into_inner() = Instant::now(),
        }
    }
}

/// `current / duration`, or 0 when the duration is unknown.
fn playback_fraction(current_time: f64, duration: f64) -> f64 {
    if !duration.is_finite() || duration <= 0.0 || !current_time.is_finite() {
        return 0.0;
    }
    (current_time / duration).max(0.0)
}

async fn write_progress(repo: &dyn ProgressRepository, record: &LessonProgress) {
    match repo.upsert_progress(record).await {
        Ok(()) => debug!(
            user_id = %record.user_id(),
            lesson_id = %record.lesson_id(),
            watched_seconds = record.watched_seconds(),
            is_completed = record.is_completed(),
            "lesson progress persisted"
        ),
        Err(error) => warn!(
            user_id = %record.user_id(),
            lesson_id = %record.lesson_id(),
            %error,
            "failed to persist lesson progress"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_handles_missing_duration() {
        assert_eq!(playback_fraction(30.0, 0.0), 0.0);
        assert_eq!(playback_fraction(30.0, -5.0), 0.0);
        assert_eq!(playback_fraction(30.0, f64::NAN), 0.0);
        assert!((playback_fraction(45.0, 100.0) - 0.45).abs() < f64::EPSILON);
    }
}
