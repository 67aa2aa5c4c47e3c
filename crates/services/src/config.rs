use std::env;
use std::time::Duration;

use crate::error::ConfigError;

/// Fraction of the video past which a lesson counts as completed.
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.9;

/// Minimum spacing between progress writes for one session.
pub const DEFAULT_PERSIST_INTERVAL: Duration = Duration::from_secs(10);

/// Tuning knobs for `PlaybackTracker`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackerConfig {
    pub completion_threshold: f64,
    pub persist_interval: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
            persist_interval: DEFAULT_PERSIST_INTERVAL,
        }
    }
}

impl TrackerConfig {
    /// Reads `LEARN_COMPLETION_THRESHOLD` and `LEARN_PERSIST_INTERVAL_SECS`,
    /// falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("LEARN_COMPLETION_THRESHOLD") {
            let threshold = raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|t| *t > 0.0 && *t <= 1.0)
                .ok_or_else(|| ConfigError::InvalidThreshold { raw: raw.clone() })?;
            config.completion_threshold = threshold;
        }

        if let Some(raw) = lookup("LEARN_PERSIST_INTERVAL_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| ConfigError::InvalidInterval { raw: raw.clone() })?;
            config.persist_interval = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = TrackerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, TrackerConfig::default());
        assert_eq!(config.persist_interval, Duration::from_secs(10));
    }

    #[test]
    fn reads_overrides() {
        let config = TrackerConfig::from_lookup(lookup(&[
            ("LEARN_COMPLETION_THRESHOLD", "0.75"),
            ("LEARN_PERSIST_INTERVAL_SECS", "30"),
        ]))
        .unwrap();
        assert!((config.completion_threshold - 0.75).abs() < f64::EPSILON);
        assert_eq!(config.persist_interval, Duration::from_secs(30));
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert_eq!(
            TrackerConfig::from_lookup(lookup(&[("LEARN_COMPLETION_THRESHOLD", "1.5")])),
            Err(ConfigError::InvalidThreshold { raw: "1.5".into() })
        );
        assert_eq!(
            TrackerConfig::from_lookup(lookup(&[("LEARN_PERSIST_INTERVAL_SECS", "0")])),
            Err(ConfigError::InvalidInterval { raw: "0".into() })
        );
    }
}
