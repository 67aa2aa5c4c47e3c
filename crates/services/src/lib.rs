#![forbid(unsafe_code)]

pub mod certificate;
pub mod config;
pub mod error;
pub mod events;
pub mod identity;
pub mod module_gate;
pub mod notify;
pub mod playback;

pub use lesson_core::Clock;

pub use certificate::{
    CertificateCheck, CertificateTrigger, CompletionCheck, CompletionCheckConfig,
    HttpCompletionCheck, NoopCompletionCheck,
};
pub use config::TrackerConfig;
pub use error::{CompletionCheckError, ConfigError, ModuleGateError, TrackerError};
pub use events::{LessonCompleted, completion_channel};
pub use identity::{IdentityProvider, IdentityState, StaticIdentity};
pub use module_gate::{ModuleGateService, ModuleStatus};
pub use notify::{Notifier, TracingNotifier};
pub use playback::{PlaybackTracker, ProgressSession, TrackerState};
