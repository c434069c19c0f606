use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::TimeInterval;
use crate::core::ratio::time_from_ratio;

/// The fraction of the rendered day currently inside the viewport.
///
/// Always satisfies `0 <= start_ratio <= end_ratio <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PortionBounds")]
pub struct VisiblePortion {
    start_ratio: f64,
    end_ratio: f64,
}

/// Wire shape of a portion; normalized through [`VisiblePortion::new`] on the way in.
#[derive(Deserialize)]
struct PortionBounds {
    start_ratio: f64,
    end_ratio: f64,
}

impl From<PortionBounds> for VisiblePortion {
    fn from(bounds: PortionBounds) -> Self {
        Self::new(bounds.start_ratio, bounds.end_ratio)
    }
}

impl VisiblePortion {
    /// The whole day, as seen before any zoom.
    pub const FULL: VisiblePortion = VisiblePortion {
        start_ratio: 0.0,
        end_ratio: 1.0,
    };

    /// Build a portion from two ratios, clamping into [0,1] and ordering them.
    /// NaN inputs collapse to the full day.
    pub fn new(start_ratio: f64, end_ratio: f64) -> Self {
        if start_ratio.is_nan() || end_ratio.is_nan() {
            return Self::FULL;
        }
        let a = start_ratio.clamp(0.0, 1.0);
        let b = end_ratio.clamp(0.0, 1.0);
        Self {
            start_ratio: a.min(b),
            end_ratio: a.max(b),
        }
    }

    pub fn start_ratio(&self) -> f64 {
        self.start_ratio
    }

    pub fn end_ratio(&self) -> f64 {
        self.end_ratio
    }

    pub fn span(&self) -> f64 {
        self.end_ratio - self.start_ratio
    }

    /// Wall-clock bounds of this portion within `interval`.
    pub fn time_range(&self, interval: &TimeInterval) -> (DateTime<Tz>, DateTime<Tz>) {
        (
            time_from_ratio(self.start_ratio, interval),
            time_from_ratio(self.end_ratio, interval),
        )
    }
}

impl Default for VisiblePortion {
    fn default() -> Self {
        Self::FULL
    }
}
