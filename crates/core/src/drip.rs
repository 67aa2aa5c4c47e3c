//! Drip release: modules unlock a fixed number of days after enrollment.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::model::{CourseModule, ModuleAvailability, ModuleId};
use crate::time::format_relative;

/// Message used when the enrollment date is missing or unreadable.
pub const PENDING_MESSAGE: &str = "Availability pending";

/// Stateless module gate. All inputs, including "now", are explicit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DripScheduler;

impl DripScheduler {
    /// Availability of a module released `drip_offset_days` after `enrolled_at`.
    ///
    /// A zero offset is always available. A positive offset with an unknown
    /// enrollment date is never available.
    ///
    /// # Examples
    ///
    /// ```
    /// # use chrono::{TimeZone, Utc};
    /// # use lesson_core::DripScheduler;
    /// let enrolled = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    /// let now = Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap();
    /// let status = DripScheduler::status(Some(enrolled), 7, now);
    /// assert!(!status.is_available);
    /// assert_eq!(status.days_until_available, 3);
    /// ```
    #[must_use]
    pub fn status(
        enrolled_at: Option<DateTime<Utc>>,
        drip_offset_days: u32,
        now: DateTime<Utc>,
    ) -> ModuleAvailability {
        if drip_offset_days == 0 {
            return ModuleAvailability::available(None);
        }

        let Some(enrolled_at) = enrolled_at else {
            return ModuleAvailability {
                is_available: false,
                available_date: None,
                days_until_available: drip_offset_days,
                message: PENDING_MESSAGE.to_owned(),
            };
        };

        let Some(available_date) =
            enrolled_at.checked_add_signed(Duration::days(i64::from(drip_offset_days)))
        else {
            return ModuleAvailability {
                is_available: false,
                available_date: None,
                days_until_available: drip_offset_days,
                message: PENDING_MESSAGE.to_owned(),
            };
        };

        if now >= available_date {
            return ModuleAvailability::available(Some(available_date));
        }

        let days_until = calendar_days_between(now, available_date).saturating_add(1);
        ModuleAvailability {
            is_available: false,
            available_date: Some(available_date),
            days_until_available: days_until,
            message: format!("Available {}", format_relative(now, available_date)),
        }
    }

    /// Availability of every module for a single enrollment date.
    #[must_use]
    pub fn statuses(
        enrolled_at: Option<DateTime<Utc>>,
        modules: &[CourseModule],
        now: DateTime<Utc>,
    ) -> HashMap<ModuleId, ModuleAvailability> {
        modules
            .iter()
            .map(|module| {
                (
                    module.id,
                    Self::status(enrolled_at, module.drip_offset_days, now),
                )
            })
            .collect()
    }
}

/// Whole UTC calendar days strictly between the two instants' dates.
///
/// Jan 5 to Jan 8 counts Jan 6 and Jan 7, so 2. Same or adjacent dates give 0.
#[must_use]
pub fn calendar_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> u32 {
    let days = (to.date_naive() - from.date_naive()).num_days() - 1;
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Parses a stored enrollment date, either RFC 3339 or a bare `YYYY-MM-DD`.
///
/// Returns `None` for anything else.
#[must_use]
pub fn parse_enrollment_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CourseId;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn zero_offset_is_always_available() {
        for now in [at(2023, 6, 1), at(2024, 1, 1), at(2030, 12, 31)] {
            let status = DripScheduler::status(Some(at(2024, 1, 1)), 0, now);
            assert!(status.is_available);
            assert_eq!(status.available_date, None);
            assert_eq!(status.days_until_available, 0);
            assert!(status.message.is_empty());
        }
    }

    #[test]
    fn seven_day_drip_before_and_after_release() {
        let enrolled = Some(at(2024, 1, 1));

        let before = DripScheduler::status(enrolled, 7, at(2024, 1, 5));
        assert!(!before.is_available);
        assert_eq!(before.available_date, Some(at(2024, 1, 8)));
        assert_eq!(before.days_until_available, 3);
        assert_eq!(before.message, "Available in 3 days");

        let after = DripScheduler::status(enrolled, 7, at(2024, 1, 9));
        assert!(after.is_available);
        assert_eq!(after.days_until_available, 0);
        assert!(after.message.is_empty());
    }

    #[test]
    fn available_tomorrow_reads_as_one_day() {
        let enrolled = Some(at(2024, 1, 1));
        let now = Utc.with_ymd_and_hms(2024, 1, 7, 18, 30, 0).unwrap();
        let status = DripScheduler::status(enrolled, 7, now);
        assert!(!status.is_available);
        assert_eq!(status.days_until_available, 1);
    }

    #[test]
    fn release_instant_is_available() {
        let status = DripScheduler::status(Some(at(2024, 1, 1)), 7, at(2024, 1, 8));
        assert!(status.is_available);
    }

    #[test]
    fn unknown_enrollment_date_is_pending() {
        let status = DripScheduler::status(None, 5, at(2024, 1, 8));
        assert!(!status.is_available);
        assert_eq!(status.available_date, None);
        assert_eq!(status.days_until_available, 5);
        assert_eq!(status.message, PENDING_MESSAGE);

        assert!(DripScheduler::status(None, 0, at(2024, 1, 8)).is_available);
    }

    #[test]
    fn batch_maps_each_module() {
        let course = CourseId::new(1);
        let modules = vec![
            CourseModule::new(ModuleId::new(1), course, "Intro", 0, 0),
            CourseModule::new(ModuleId::new(2), course, "Week 2", 1, 7),
            CourseModule::new(ModuleId::new(3), course, "Week 3", 2, 14),
        ];
        let map = DripScheduler::statuses(Some(at(2024, 1, 1)), &modules, at(2024, 1, 10));

        assert_eq!(map.len(), 3);
        assert!(map[&ModuleId::new(1)].is_available);
        assert!(map[&ModuleId::new(2)].is_available);
        assert!(!map[&ModuleId::new(3)].is_available);
        assert_eq!(map[&ModuleId::new(3)].days_until_available, 5);
    }

    #[test]
    fn parses_supported_date_shapes() {
        assert_eq!(parse_enrollment_date("2024-01-01"), Some(at(2024, 1, 1)));
        assert_eq!(
            parse_enrollment_date("2024-01-01T00:00:00+00:00"),
            Some(at(2024, 1, 1))
        );
        assert_eq!(parse_enrollment_date("yesterday"), None);
        assert_eq!(parse_enrollment_date(""), None);
    }
}
