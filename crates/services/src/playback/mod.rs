mod slot;
mod tracker;

pub use tracker::{PlaybackTracker, ProgressSession, TrackerState, UNLOCK_FLAG_KEY};
