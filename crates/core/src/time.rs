use chrono::{DateTime, Duration, Utc};

/// A simple clock abstraction for deterministic time in services and tests.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(DateTime<Utc>),
}

impl Clock {
    /// Returns a clock that uses the current system time.
    #[must_use]
    pub fn default_clock() -> Self {
        Self::Default
    }

    /// Returns a clock fixed at the given timestamp.
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    /// Returns the current time according to the clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::Default => Utc::now(),
            Clock::Fixed(t) => *t,
        }
    }

    /// If this is a fixed clock, advance it by the given duration.
    ///
    /// Has no effect on `Clock::Default`.
    pub fn advance(&mut self, delta: Duration) {
        if let Clock::Fixed(t) = self {
            *t += delta;
        }
    }
}

/// Deterministic timestamp for tests and examples (2023-11-14T22:13:20Z).
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// Returns a deterministic `DateTime<Utc>` for tests and doc examples.
///
/// # Panics
///
/// Panics if the fixed timestamp cannot be represented.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp should be valid")
}

/// Returns a `Clock` fixed at the deterministic test timestamp.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}

// ─── Relative formatting ───────────────────────────────────────────────────────

const MINUTES_PER_HOUR: i64 = 60;
const MINUTES_PER_DAY: i64 = 1_440;
const MINUTES_PER_MONTH: i64 = 43_200;
const MINUTES_PER_YEAR: i64 = 525_600;

/// Human phrase for the distance between `now` and `target`.
///
/// Future targets read "in 3 days", past ones "3 days ago".
///
/// # Examples
///
/// ```
/// # use chrono::Duration;
/// # use lesson_core::time::{fixed_now, format_relative};
/// let now = fixed_now();
/// assert_eq!(format_relative(now, now + Duration::days(3)), "in 3 days");
/// assert_eq!(format_relative(now, now - Duration::hours(5)), "about 5 hours ago");
/// ```
#[must_use]
pub fn format_relative(now: DateTime<Utc>, target: DateTime<Utc>) -> String {
    let delta = target - now;
    let distance = describe_distance(delta.abs());
    if delta >= Duration::zero() {
        format!("in {distance}")
    } else {
        format!("{distance} ago")
    }
}

fn describe_distance(distance: Duration) -> String {
    let seconds = distance.num_seconds();
    let minutes = (seconds + 30) / 60;

    if minutes < 1 {
        "less than a minute".to_owned()
    } else if minutes < 45 {
        plural(minutes, "minute")
    } else if minutes < 90 {
        "about 1 hour".to_owned()
    } else if minutes < MINUTES_PER_DAY {
        format!("about {}", plural(rounded(minutes, MINUTES_PER_HOUR), "hour"))
    } else if minutes < 2_520 {
        "1 day".to_owned()
    } else if minutes < MINUTES_PER_MONTH {
        plural(rounded(minutes, MINUTES_PER_DAY), "day")
    } else if minutes < 2 * MINUTES_PER_MONTH {
        format!("about {}", plural(rounded(minutes, MINUTES_PER_MONTH), "month"))
    } else if minutes < MINUTES_PER_YEAR {
        plural(rounded(minutes, MINUTES_PER_MONTH), "month")
    } else {
        format!("about {}", plural(rounded(minutes, MINUTES_PER_YEAR), "year"))
    }
}

fn rounded(minutes: i64, unit: i64) -> i64 {
    ((minutes + unit / 2) / unit).max(1)
}

fn plural(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {unit}")
    } else {
        format!("{n} {unit}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = fixed_clock();
        clock.advance(Duration::seconds(10));
        assert_eq!(clock.now(), fixed_now() + Duration::seconds(10));
    }

    #[test]
    fn relative_phrases_follow_thresholds() {
        let now = fixed_now();
        let cases = [
            (Duration::seconds(20), "in less than a minute"),
            (Duration::minutes(1), "in 1 minute"),
            (Duration::minutes(30), "in 30 minutes"),
            (Duration::minutes(60), "in about 1 hour"),
            (Duration::hours(5), "in about 5 hours"),
            (Duration::hours(30), "in 1 day"),
            (Duration::days(3), "in 3 days"),
            (Duration::days(40), "in about 1 month"),
            (Duration::days(95), "in 3 months"),
            (Duration::days(800), "in about 2 years"),
        ];
        for (delta, expected) in cases {
            assert_eq!(format_relative(now, now + delta), expected, "delta {delta}");
        }
    }

    #[test]
    fn past_targets_use_ago_suffix() {
        let now = fixed_now();
        assert_eq!(format_relative(now, now - Duration::days(2)), "2 days ago");
    }
}
