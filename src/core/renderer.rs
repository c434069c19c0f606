//! Layer composition for the timeline.
//!
//! Rendering is a pure function of the visible window, the detail level and the data:
//! it produces a back-to-front list of positioned layers that a host turns into DOM.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::core::ratio::{compute_ratio, day_ratio_from_time, time_from_ratio};
use crate::core::scale::{ScaleClassifier, ScaleDetailLevel};
use crate::state::{Annotation, DetectionInterval, TimeInterval, TimelineSettings, Tooltip, VisiblePortion};

pub const DEFAULT_SHORT_CLICK_MS: u64 = 200;
const MAX_AXIS_TICKS: i64 = 400;

/// Whether a press that went down at `down_ms` and ended at `event_ms` was a click.
pub fn is_short_click(down_ms: u64, event_ms: u64) -> bool {
    is_short_click_within(down_ms, event_ms, Duration::from_millis(DEFAULT_SHORT_CLICK_MS))
}

pub fn is_short_click_within(down_ms: u64, event_ms: u64, threshold: Duration) -> bool {
    u128::from(event_ms.saturating_sub(down_ms)) < threshold.as_millis()
}

/// Translate a click `x` pixels into a `width`-pixel window into a wall-clock time.
///
/// Long presses (the tail of a drag) and times after `now` yield `None`.
pub fn click_time(
    x: f64,
    width: f64,
    portion: &VisiblePortion,
    interval: &TimeInterval,
    elapsed: Duration,
    threshold: Duration,
    now: DateTime<Utc>,
) -> Option<DateTime<Tz>> {
    if elapsed >= threshold {
        return None;
    }
    if !(width > 0.0) || !x.is_finite() {
        return None;
    }
    let window_ratio = (x / width).clamp(0.0, 1.0);
    let day_ratio = portion.start_ratio() + window_ratio * portion.span();
    let time = time_from_ratio(day_ratio, interval);
    if time.with_timezone(&Utc) > now {
        tracing::debug!(%time, "click in the future ignored");
        return None;
    }
    Some(time)
}

/// One category lane.
#[derive(Debug, Clone, PartialEq)]
pub struct LaneConfig {
    pub category: String,
    pub label: String,
}

impl LaneConfig {
    pub fn new(category: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            label: label.into(),
        }
    }
}

/// Positioned element of a rendered frame. Coordinates are pixels in the visible window.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    AxisTick {
        x: f64,
        label: String,
    },
    LaneSeparator {
        y: f64,
    },
    Bar {
        lane: usize,
        detection_id: Uuid,
        left: f64,
        width: f64,
        top: f64,
        height: f64,
        bumped: bool,
    },
    NowMarker {
        x: f64,
    },
    AnnotationRange {
        left: f64,
        width: f64,
        current_x: f64,
    },
    ScrubMarker {
        x: f64,
        label: String,
    },
}

/// Everything a host needs to draw one frame, ordered back to front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineFrame {
    pub width: f64,
    pub height: f64,
    pub layers: Vec<Layer>,
}

impl TimelineFrame {
    pub fn bars(&self) -> impl Iterator<Item = &Layer> {
        self.layers
            .iter()
            .filter(|layer| matches!(layer, Layer::Bar { .. }))
    }

    pub fn now_marker(&self) -> Option<f64> {
        self.layers.iter().find_map(|layer| match layer {
            Layer::NowMarker { x } => Some(*x),
            _ => None,
        })
    }
}

/// Per-frame inputs. Treated as an immutable snapshot for the duration of a render.
#[derive(Debug, Clone)]
pub struct RenderInput<'a> {
    pub width: f64,
    pub interval: &'a TimeInterval,
    pub portion: VisiblePortion,
    pub level: ScaleDetailLevel,
    pub detections: &'a [DetectionInterval],
    pub now: DateTime<Utc>,
    pub annotation: Annotation,
    pub tooltip: Tooltip,
}

#[derive(Debug, Clone)]
pub struct TimelineRenderer {
    lanes: Vec<LaneConfig>,
    lane_height: f64,
    short_click_threshold: Duration,
    classifier: ScaleClassifier,
}

impl TimelineRenderer {
    pub fn new(lanes: Vec<LaneConfig>, lane_height: f64, classifier: ScaleClassifier) -> Self {
        Self {
            lanes,
            lane_height: lane_height.max(0.0),
            short_click_threshold: Duration::from_millis(DEFAULT_SHORT_CLICK_MS),
            classifier,
        }
    }

    pub fn from_settings(
        lanes: Vec<LaneConfig>,
        settings: &TimelineSettings,
        classifier: ScaleClassifier,
    ) -> Self {
        Self {
            short_click_threshold: settings.short_click_threshold(),
            ..Self::new(lanes, settings.lane_height, classifier)
        }
    }

    pub fn lanes(&self) -> &[LaneConfig] {
        &self.lanes
    }

    pub fn lane_height(&self) -> f64 {
        self.lane_height
    }

    pub fn height(&self) -> f64 {
        self.lane_height * self.lanes.len() as f64
    }

    pub fn classifier(&self) -> &ScaleClassifier {
        &self.classifier
    }

    /// Compose a frame. A zero-width or non-finite container renders nothing.
    pub fn render(&self, input: &RenderInput<'_>) -> TimelineFrame {
        let mut frame = TimelineFrame {
            width: input.width,
            height: self.height(),
            layers: Vec::new(),
        };
        if !(input.width > 0.0) || !input.width.is_finite() {
            return frame;
        }

        frame.layers.extend(self.axis_ticks(input));
        frame.layers.extend(
            (1..self.lanes.len()).map(|index| Layer::LaneSeparator {
                y: index as f64 * self.lane_height,
            }),
        );
        for (index, lane) in self.lanes.iter().enumerate() {
            frame.layers.extend(self.lane_bars(index, lane, input));
        }
        if let Some(layer) = self.now_marker(input) {
            frame.layers.push(layer);
        }
        if let Some(layer) = self.annotation_range(input) {
            frame.layers.push(layer);
        }
        if let Some(layer) = self.scrub_marker(input) {
            frame.layers.push(layer);
        }
        frame
    }

    /// Bars of one lane, positioned independently of the other lanes.
    fn lane_bars(&self, index: usize, lane: &LaneConfig, input: &RenderInput<'_>) -> Vec<Layer> {
        let start_of_day = &input.interval.time_start;
        input
            .detections
            .iter()
            .filter(|detection| detection.category == lane.category)
            .filter_map(|detection| {
                let start = day_ratio_from_time(&detection.start_time, start_of_day);
                let end = day_ratio_from_time(&detection.end_time, start_of_day);
                let (bumped_start, bumped_end) = self.classifier.bump(start, end, input.level);
                let left = compute_ratio(bumped_start, &input.portion, false) * input.width;
                let right = compute_ratio(bumped_end, &input.portion, false) * input.width;
                if left.is_nan() || right.is_nan() || right < 0.0 || left > input.width {
                    return None;
                }
                Some(Layer::Bar {
                    lane: index,
                    detection_id: detection.id,
                    left,
                    width: right - left,
                    top: index as f64 * self.lane_height,
                    height: self.lane_height,
                    bumped: (bumped_start, bumped_end) != (start, end),
                })
            })
            .collect()
    }

    fn axis_ticks(&self, input: &RenderInput<'_>) -> Vec<Layer> {
        let spacing_ms = input.level.tick_spacing().num_milliseconds();
        let total_ms = input.interval.duration().num_milliseconds();
        if spacing_ms <= 0 || total_ms <= 0 {
            return Vec::new();
        }
        let first = (input.portion.start_ratio() * total_ms as f64 / spacing_ms as f64).ceil() as i64;
        let last = (input.portion.end_ratio() * total_ms as f64 / spacing_ms as f64).floor() as i64;
        let last = last.min(first + MAX_AXIS_TICKS);
        (first..=last)
            .filter_map(|k| {
                let time = input.interval.time_start + chrono::Duration::milliseconds(k * spacing_ms);
                let ratio = day_ratio_from_time(&time, &input.interval.time_start);
                let x = compute_ratio(ratio, &input.portion, false) * input.width;
                (!x.is_nan()).then(|| Layer::AxisTick {
                    x,
                    label: time.format("%H:%M").to_string(),
                })
            })
            .collect()
    }

    fn now_marker(&self, input: &RenderInput<'_>) -> Option<Layer> {
        if !input.interval.is_same_day(&input.now) {
            return None;
        }
        let ratio = day_ratio_from_time(&input.now, &input.interval.time_start);
        let x = compute_ratio(ratio, &input.portion, false) * input.width;
        (x >= 0.0 && x <= input.width).then_some(Layer::NowMarker { x })
    }

    fn annotation_range(&self, input: &RenderInput<'_>) -> Option<Layer> {
        let annotation = &input.annotation;
        if !annotation.visible {
            return None;
        }
        let left = compute_ratio(annotation.offset_start, &input.portion, false) * input.width;
        let right = compute_ratio(annotation.offset_end, &input.portion, false) * input.width;
        let current_x = compute_ratio(annotation.offset_current, &input.portion, false) * input.width;
        if left.is_nan() || right.is_nan() || right < 0.0 || left > input.width {
            return None;
        }
        Some(Layer::AnnotationRange {
            left,
            width: right - left,
            current_x,
        })
    }

    fn scrub_marker(&self, input: &RenderInput<'_>) -> Option<Layer> {
        let tooltip = &input.tooltip;
        if !tooltip.visible {
            return None;
        }
        let x = tooltip.window_ratio(&input.portion) * input.width;
        if x.is_nan() {
            return None;
        }
        let label = tooltip
            .tooltip_time
            .map(|time| time.format("%H:%M:%S").to_string())
            .unwrap_or_default();
        Some(Layer::ScrubMarker { x, label })
    }

    /// Click at `x` pixels into a `width`-pixel window, after a press of `elapsed`.
    pub fn click_to_time(
        &self,
        x: f64,
        width: f64,
        portion: &VisiblePortion,
        interval: &TimeInterval,
        elapsed: Duration,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Tz>> {
        click_time(x, width, portion, interval, elapsed, self.short_click_threshold, now)
    }
}

/// Where `time` falls inside a `width`-pixel window, for hosts placing ad-hoc overlays.
pub fn time_to_x<Z: TimeZone>(
    time: &DateTime<Z>,
    width: f64,
    portion: &VisiblePortion,
    interval: &TimeInterval,
) -> f64 {
    compute_ratio(day_ratio_from_time(time, &interval.time_start), portion, false) * width
}
