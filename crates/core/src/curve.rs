//! Display-progress mapping for the lesson player.
//!
//! The player shows a distorted fraction that climbs quickly at the start of a
//! video. Completion and unlock decisions always use the real fraction; the
//! displayed value is presentation only.

use serde::Serialize;

/// Piecewise-linear `real -> display` mapping.
///
/// Anchors are `(0, 0)`, `(0.05, 0.40)`, `(0.15, 0.70)`, `(0.50, 0.93)` and
/// `(1, 1)`. Inputs outside `[0, 1]` are clamped; NaN maps to `0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressCurve;

const BREAKPOINTS: [(f64, f64); 5] = [
    (0.0, 0.0),
    (0.05, 0.40),
    (0.15, 0.70),
    (0.50, 0.93),
    (1.0, 1.0),
];

impl ProgressCurve {
    /// Maps a real playback fraction to the displayed fraction.
    ///
    /// # Examples
    ///
    /// ```
    /// # use lesson_core::ProgressCurve;
    /// assert!((ProgressCurve::display_fraction(0.5) - 0.93).abs() < 1e-9);
    /// assert_eq!(ProgressCurve::display_fraction(1.0), 1.0);
    /// ```
    #[must_use]
    pub fn display_fraction(real: f64) -> f64 {
        if real.is_nan() {
            return 0.0;
        }
        let real = real.clamp(0.0, 1.0);

        for pair in BREAKPOINTS.windows(2) {
            let (x0, y0) = pair[0];
            let (x1, y1) = pair[1];
            if real <= x1 {
                let t = (real - x0) / (x1 - x0);
                return (y0 + t * (y1 - y0)).clamp(0.0, 1.0);
            }
        }
        1.0
    }

    /// Displayed progress as a whole percentage (0-100).
    #[must_use]
    pub fn display_percent(real: f64) -> u8 {
        let pct = (Self::display_fraction(real) * 100.0).round();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let pct = pct.clamp(0.0, 100.0) as u8;
        pct
    }
}

/// Real and displayed fractions side by side, for UI consumers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DisplayProgress {
    pub real: f64,
    pub display: f64,
}

impl DisplayProgress {
    #[must_use]
    pub fn from_real(real: f64) -> Self {
        let real = if real.is_nan() { 0.0 } else { real.clamp(0.0, 1.0) };
        Self {
            real,
            display: ProgressCurve::display_fraction(real),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn endpoints_and_anchors() {
        assert!(close(ProgressCurve::display_fraction(0.0), 0.0));
        assert!(close(ProgressCurve::display_fraction(0.05), 0.40));
        assert!(close(ProgressCurve::display_fraction(0.15), 0.70));
        assert!(close(ProgressCurve::display_fraction(0.5), 0.93));
        assert!(close(ProgressCurve::display_fraction(1.0), 1.0));
    }

    #[test]
    fn interpolates_between_anchors() {
        // halfway between 0.05 and 0.15
        assert!(close(ProgressCurve::display_fraction(0.10), 0.55));
        // halfway between 0.5 and 1.0
        assert!(close(ProgressCurve::display_fraction(0.75), 0.965));
    }

    #[test]
    fn clamps_out_of_range_input() {
        assert!(close(ProgressCurve::display_fraction(-0.3), 0.0));
        assert!(close(ProgressCurve::display_fraction(4.0), 1.0));
        assert!(close(ProgressCurve::display_fraction(f64::NAN), 0.0));
    }

    #[test]
    fn monotonic_non_decreasing() {
        let mut prev = ProgressCurve::display_fraction(0.0);
        for step in 1..=1000 {
            let x = f64::from(step) / 1000.0;
            let y = ProgressCurve::display_fraction(x);
            assert!(y >= prev, "curve decreased at {x}: {prev} -> {y}");
            prev = y;
        }
    }

    #[test]
    fn pure_regardless_of_call_order() {
        let first = ProgressCurve::display_fraction(0.2);
        let _ = ProgressCurve::display_fraction(0.9);
        let _ = ProgressCurve::display_fraction(0.01);
        assert_eq!(ProgressCurve::display_fraction(0.2), first);
    }

    #[test]
    fn percent_rounds_display_value() {
        assert_eq!(ProgressCurve::display_percent(0.5), 93);
        assert_eq!(ProgressCurve::display_percent(0.0), 0);
        assert_eq!(ProgressCurve::display_percent(1.0), 100);
    }

    #[test]
    fn display_progress_keeps_real_value() {
        let progress = DisplayProgress::from_real(0.05);
        assert!(close(progress.real, 0.05));
        assert!(close(progress.display, 0.40));
    }
}
