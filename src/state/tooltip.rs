use chrono::DateTime;
use chrono_tz::Tz;

use super::{TimeInterval, VisiblePortion};
use crate::core::ratio::{compute_ratio, time_from_ratio};

/// Transient hover state, rebuilt on every pointer move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tooltip {
    pub visible: bool,
    /// Day-ratio under the pointer
    pub offset_start: f64,
    /// Wall-clock time under the pointer
    pub tooltip_time: Option<DateTime<Tz>>,
}

impl Tooltip {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            offset_start: 0.0,
            tooltip_time: None,
        }
    }

    /// Hover state for a pointer `x` pixels into a container `width` pixels wide.
    pub fn from_pointer(
        x: f64,
        width: f64,
        portion: &VisiblePortion,
        interval: &TimeInterval,
    ) -> Self {
        if !(width > 0.0) || !x.is_finite() {
            return Self::hidden();
        }
        let window_ratio = (x / width).clamp(0.0, 1.0);
        let offset_start = portion.start_ratio() + window_ratio * portion.span();
        Self {
            visible: true,
            offset_start,
            tooltip_time: Some(time_from_ratio(offset_start, interval)),
        }
    }

    /// Horizontal position of the scrub marker inside the visible window.
    pub fn window_ratio(&self, portion: &VisiblePortion) -> f64 {
        compute_ratio(self.offset_start, portion, false)
    }
}

impl Default for Tooltip {
    fn default() -> Self {
        Self::hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_pointer_maps_through_zoomed_window() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let interval = TimeInterval::for_day(day, chrono_tz::UTC).unwrap();
        let portion = VisiblePortion::new(0.5, 0.75);
        let tooltip = Tooltip::from_pointer(500.0, 1000.0, &portion, &interval);
        assert!(tooltip.visible);
        assert!((tooltip.offset_start - 0.625).abs() < 1e-12);
        let time = tooltip.tooltip_time.unwrap();
        assert_eq!(time.format("%H:%M").to_string(), "15:00");
        assert!((tooltip.window_ratio(&portion) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_width_hides_tooltip() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 12).unwrap();
        let interval = TimeInterval::for_day(day, chrono_tz::UTC).unwrap();
        let tooltip = Tooltip::from_pointer(10.0, 0.0, &VisiblePortion::FULL, &interval);
        assert!(!tooltip.visible);
    }
}
