//! Discrete level-of-detail selection for the continuous zoom scale, plus the per-level
//! minimum bar widths that keep very short events visible when zoomed out.

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Granularity bucket driving axis ticks and minimum bar sizes.
/// Ordered coarsest-last: `OneWeek > OneDay > ... > ThirtyMinutes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ScaleDetailLevel {
    ThirtyMinutes,
    OneHour,
    ThreeHours,
    SixHours,
    TwelveHours,
    OneDay,
    OneWeek,
}

impl ScaleDetailLevel {
    pub const ALL: [ScaleDetailLevel; 7] = [
        ScaleDetailLevel::ThirtyMinutes,
        ScaleDetailLevel::OneHour,
        ScaleDetailLevel::ThreeHours,
        ScaleDetailLevel::SixHours,
        ScaleDetailLevel::TwelveHours,
        ScaleDetailLevel::OneDay,
        ScaleDetailLevel::OneWeek,
    ];

    /// Spacing between major axis ticks at this level.
    pub fn tick_spacing(self) -> Duration {
        match self {
            ScaleDetailLevel::OneWeek => Duration::days(1),
            ScaleDetailLevel::OneDay => Duration::hours(2),
            ScaleDetailLevel::TwelveHours => Duration::hours(1),
            ScaleDetailLevel::SixHours => Duration::minutes(30),
            ScaleDetailLevel::ThreeHours => Duration::minutes(15),
            ScaleDetailLevel::OneHour => Duration::minutes(5),
            ScaleDetailLevel::ThirtyMinutes => Duration::minutes(1),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ScaleDetailLevel::OneWeek => "1w",
            ScaleDetailLevel::OneDay => "1d",
            ScaleDetailLevel::TwelveHours => "12h",
            ScaleDetailLevel::SixHours => "6h",
            ScaleDetailLevel::ThreeHours => "3h",
            ScaleDetailLevel::OneHour => "1h",
            ScaleDetailLevel::ThirtyMinutes => "30m",
        }
    }
}

/// One row of the threshold table. `None` stands for +infinity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleThreshold {
    pub max_scale_exclusive: Option<f64>,
    pub level: ScaleDetailLevel,
}

impl ScaleThreshold {
    fn limit(&self) -> f64 {
        self.max_scale_exclusive.unwrap_or(f64::INFINITY)
    }
}

/// Ordered scale → level table. The first row whose limit exceeds the scale wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleThresholds {
    entries: Vec<ScaleThreshold>,
    default_level: ScaleDetailLevel,
}

impl ScaleThresholds {
    /// Build a table, appending an infinity row when the caller left it out.
    pub fn new(mut entries: Vec<ScaleThreshold>, default_level: ScaleDetailLevel) -> Self {
        if !entries.iter().any(|entry| entry.max_scale_exclusive.is_none()) {
            tracing::debug!(?default_level, "scale table has no sentinel row, appending one");
            entries.push(ScaleThreshold {
                max_scale_exclusive: None,
                level: default_level,
            });
        }
        Self {
            entries,
            default_level,
        }
    }

    /// Build from `(limit, level)` pairs; `f64::INFINITY` marks the sentinel row.
    pub fn from_pairs(pairs: &[(f64, ScaleDetailLevel)], default_level: ScaleDetailLevel) -> Self {
        let entries = pairs
            .iter()
            .map(|&(limit, level)| ScaleThreshold {
                max_scale_exclusive: (limit != f64::INFINITY).then_some(limit),
                level,
            })
            .collect();
        Self::new(entries, default_level)
    }

    pub fn entries(&self) -> &[ScaleThreshold] {
        &self.entries
    }

    pub fn default_level(&self) -> ScaleDetailLevel {
        self.default_level
    }
}

impl Default for ScaleThresholds {
    fn default() -> Self {
        Self::from_pairs(
            &[
                (1.0, ScaleDetailLevel::OneWeek),
                (2.0, ScaleDetailLevel::OneDay),
                (4.0, ScaleDetailLevel::TwelveHours),
                (8.0, ScaleDetailLevel::SixHours),
                (16.0, ScaleDetailLevel::ThreeHours),
                (48.0, ScaleDetailLevel::OneHour),
                (f64::INFINITY, ScaleDetailLevel::ThirtyMinutes),
            ],
            ScaleDetailLevel::OneDay,
        )
    }
}

/// Map a zoom scale onto a detail level.
///
/// Never fails: a scale no row accepts (NaN, +inf) logs and yields the table default.
pub fn scale_detail_from_scale(scale: f64, table: &ScaleThresholds) -> ScaleDetailLevel {
    table
        .entries
        .iter()
        .find(|entry| scale < entry.limit())
        .map(|entry| entry.level)
        .unwrap_or_else(|| {
            tracing::warn!(
                scale,
                default = ?table.default_level,
                "no detail level matches zoom scale, using default"
            );
            table.default_level
        })
}

/// Minimum bar width per level, as a fraction of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BumpThresholds {
    entries: Vec<(ScaleDetailLevel, f64)>,
}

impl BumpThresholds {
    pub fn new(entries: Vec<(ScaleDetailLevel, f64)>) -> Self {
        Self { entries }
    }

    /// Minimum width at `level`; levels not in the table get no bump.
    pub fn min_width(&self, level: ScaleDetailLevel) -> f64 {
        self.entries
            .iter()
            .find(|(l, _)| *l == level)
            .map(|(_, width)| width.max(0.0))
            .unwrap_or(0.0)
    }
}

impl Default for BumpThresholds {
    fn default() -> Self {
        Self::new(vec![
            (ScaleDetailLevel::OneWeek, 0.004),
            (ScaleDetailLevel::OneDay, 0.002),
            (ScaleDetailLevel::TwelveHours, 0.001),
            (ScaleDetailLevel::SixHours, 0.0005),
            (ScaleDetailLevel::ThreeHours, 0.00025),
            (ScaleDetailLevel::OneHour, 0.0),
            (ScaleDetailLevel::ThirtyMinutes, 0.0),
        ])
    }
}

/// Widen `[start, end]` symmetrically about its centre to the level's minimum width.
/// Purely visual: callers pass copies of the event's ratios.
pub fn bump_interval(
    start_ratio: f64,
    end_ratio: f64,
    level: ScaleDetailLevel,
    bumps: &BumpThresholds,
) -> (f64, f64) {
    let min_width = bumps.min_width(level);
    let width = end_ratio - start_ratio;
    if min_width <= 0.0 || width >= min_width {
        return (start_ratio, end_ratio);
    }
    let center = (start_ratio + end_ratio) / 2.0;
    (center - min_width / 2.0, center + min_width / 2.0)
}

/// Thresholds and bump table bundled for the renderer and pan/zoom controller.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScaleClassifier {
    pub thresholds: ScaleThresholds,
    pub bumps: BumpThresholds,
}

impl ScaleClassifier {
    pub fn new(thresholds: ScaleThresholds, bumps: BumpThresholds) -> Self {
        Self { thresholds, bumps }
    }

    pub fn classify(&self, scale: f64) -> ScaleDetailLevel {
        scale_detail_from_scale(scale, &self.thresholds)
    }

    pub fn bump(&self, start_ratio: f64, end_ratio: f64, level: ScaleDetailLevel) -> (f64, f64) {
        bump_interval(start_ratio, end_ratio, level, &self.bumps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use super::ScaleDetailLevel::*;

    fn abc() -> ScaleThresholds {
        ScaleThresholds::from_pairs(
            &[(4.0, OneDay), (8.0, TwelveHours), (f64::INFINITY, OneHour)],
            OneDay,
        )
    }

    #[test]
    fn test_first_matching_threshold_wins() {
        let table = abc();
        assert_eq!(scale_detail_from_scale(3.0, &table), OneDay);
        assert_eq!(scale_detail_from_scale(4.0, &table), TwelveHours);
        assert_eq!(scale_detail_from_scale(4.5, &table), TwelveHours);
        assert_eq!(scale_detail_from_scale(1000.0, &table), OneHour);
    }

    #[test]
    fn test_unmatched_scale_falls_back_to_default() {
        let table = ScaleThresholds::from_pairs(&[(2.0, OneHour)], SixHours);
        // Appended sentinel maps everything else to the default.
        assert_eq!(table.entries().len(), 2);
        assert_eq!(scale_detail_from_scale(5.0, &table), SixHours);
        assert_eq!(scale_detail_from_scale(f64::NAN, &abc()), OneDay);
    }

    #[test]
    fn test_level_ordering() {
        assert!(OneWeek > OneDay);
        assert!(OneDay > TwelveHours);
        assert!(OneHour > ThirtyMinutes);
        assert!(ScaleDetailLevel::ALL.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_bump_is_symmetric_and_finest_levels_do_not_bump() {
        let bumps = BumpThresholds::default();
        let (start, end) = bump_interval(0.5, 0.50005, OneDay, &bumps);
        assert!((end - start - 0.002).abs() < 1e-12);
        assert!(((start + end) / 2.0 - 0.500025).abs() < 1e-12);
        assert_eq!(bump_interval(0.5, 0.50005, OneHour, &bumps), (0.5, 0.50005));
        assert_eq!(bump_interval(0.1, 0.3, OneDay, &bumps), (0.1, 0.3));
    }

    proptest! {
        #[test]
        fn prop_classification_is_monotonic(a in 0.0f64..200.0, b in 0.0f64..200.0) {
            let table = ScaleThresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            // Zooming in never yields a coarser level.
            prop_assert!(scale_detail_from_scale(lo, &table) >= scale_detail_from_scale(hi, &table));
            prop_assert_eq!(scale_detail_from_scale(a, &table), scale_detail_from_scale(a, &table));
        }
    }
}
