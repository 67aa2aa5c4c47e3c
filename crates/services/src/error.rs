//! Shared error types for the services crate.

use thiserror::Error;

use storage::StorageError;

/// Errors from the completion-check service.
///
/// Callers inside this crate log and swallow these; they never roll back a
/// persisted lesson completion.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CompletionCheckError {
    #[error("completion check is not configured")]
    Disabled,
    #[error("completion check returned status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by `PlaybackTracker` operations that report failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("playback session has not been initialized")]
    NotInitialized,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ModuleGateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModuleGateError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Invalid values in environment configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("completion threshold must be in (0, 1], got {raw}")]
    InvalidThreshold { raw: String },
    #[error("persist interval must be a positive number of seconds, got {raw}")]
    InvalidInterval { raw: String },
}
