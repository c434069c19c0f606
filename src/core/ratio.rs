//! Conversions between wall-clock time, day-ratios in [0,1], and positions inside the
//! visible window.
//!
//! Rendering uses unclamped window ratios so off-screen elements land outside [0,1] and
//! can be culled; click handling clamps.

use chrono::{DateTime, Duration, TimeZone};
use chrono_tz::Tz;

use crate::state::{local_midnight, TimeInterval, VisiblePortion};

/// DOM-style element bounds in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElementRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ElementRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// The next local midnight after `start_of_day`, in the same zone.
pub fn end_of_day(start_of_day: &DateTime<Tz>) -> DateTime<Tz> {
    let tz = start_of_day.timezone();
    start_of_day
        .date_naive()
        .succ_opt()
        .and_then(|next| local_midnight(next, tz).ok())
        .unwrap_or_else(|| *start_of_day + Duration::days(1))
}

/// Where `time` falls within the day starting at `start_of_day`, clamped to [0,1].
///
/// The day length is measured, not assumed, so 23 and 25 hour days map correctly.
pub fn day_ratio_from_time<Z: TimeZone>(time: &DateTime<Z>, start_of_day: &DateTime<Tz>) -> f64 {
    let day_ms = end_of_day(start_of_day)
        .signed_duration_since(*start_of_day)
        .num_milliseconds();
    if day_ms <= 0 {
        return 0.0;
    }
    let elapsed_ms = time
        .with_timezone(&start_of_day.timezone())
        .signed_duration_since(*start_of_day)
        .num_milliseconds();
    (elapsed_ms as f64 / day_ms as f64).clamp(0.0, 1.0)
}

/// Inverse of [`day_ratio_from_time`] over an explicit interval.
pub fn time_from_ratio(ratio: f64, interval: &TimeInterval) -> DateTime<Tz> {
    let ratio = if ratio.is_nan() { 0.0 } else { ratio.clamp(0.0, 1.0) };
    let total_ms = interval.duration().num_milliseconds() as f64;
    interval.time_start + Duration::milliseconds((ratio * total_ms).round() as i64)
}

/// Where `time` falls within `interval`, clamped to [0,1].
pub fn ratio_in_interval<Z: TimeZone>(time: &DateTime<Z>, interval: &TimeInterval) -> f64 {
    let total_ms = interval.duration().num_milliseconds();
    if total_ms <= 0 {
        return 0.0;
    }
    let elapsed_ms = time
        .with_timezone(&interval.timezone())
        .signed_duration_since(interval.time_start)
        .num_milliseconds();
    (elapsed_ms as f64 / total_ms as f64).clamp(0.0, 1.0)
}

/// Rescale a day-ratio into visible-window coordinates.
///
/// Unclamped results may be negative or above one. A zero-width window yields NaN, which
/// layers treat as "do not render".
pub fn compute_ratio(value: f64, portion: &VisiblePortion, clamp: bool) -> f64 {
    let span = portion.end_ratio() - portion.start_ratio();
    if span <= 0.0 {
        return f64::NAN;
    }
    let ratio = (value - portion.start_ratio()) / span;
    if clamp {
        ratio.clamp(0.0, 1.0)
    } else {
        ratio
    }
}

/// Where `x_offset` falls across `rect`, clamped to [0,1]. Zero-width rects give 0.
pub fn rect_ratio(rect: &ElementRect, x_offset: f64) -> f64 {
    if !(rect.width > 0.0) {
        return 0.0;
    }
    ((x_offset - rect.left) / rect.width).clamp(0.0, 1.0)
}
