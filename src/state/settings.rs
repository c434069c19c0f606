use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::TimelineError;

/// Upper bound for every time window read from settings.
pub const MAX_WINDOW_SECS: i64 = 86_400;

fn window_seconds(field: &'static str, secs: i64) -> chrono::Duration {
    let clamped = secs.clamp(0, MAX_WINDOW_SECS);
    if clamped != secs {
        tracing::warn!(field, secs, clamped, "time window out of range");
    }
    chrono::Duration::try_seconds(clamped).unwrap_or_else(chrono::Duration::zero)
}

/// Timeline tunables, persisted as JSON.
///
/// The click threshold and thumbnail debounce are product-tuned values; they live here
/// rather than in code so they can be adjusted without a rebuild.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineSettings {
    /// Pointer down→up shorter than this counts as a click, not a drag
    pub short_click_threshold_ms: u64,
    /// Trailing debounce applied to the visible window before a dense thumbnail fetch
    pub thumbnail_debounce_ms: u64,
    /// Height of one category lane in pixels
    pub lane_height: f64,
    /// Thumbnails requested on first hover
    pub num_thumbs_to_fetch_initial: usize,
    /// Thumbnails requested once the visible window settles
    pub num_thumbs_to_fetch_visible: usize,
    /// How far from the hover point the initial batch may reach
    pub max_initial_thumbnail_difference_secs: i64,
    /// How far a thumbnail may be from the pointer and still count as a match
    pub max_thumbnail_difference_secs: i64,
    /// Length of the range placed by a click
    pub annotation_clip_duration_secs: i64,
    /// Desktop zoom range
    pub min_zoom: f64,
    pub max_zoom: f64,
    /// Fixed zoom used on mobile layouts
    pub mobile_zoom: f64,
    /// Delay between a programmatic zoom and the pan that follows it
    pub settle_delay_ms: u64,
    /// Wheel delta to zoom exponent factor
    pub wheel_step: f64,
    /// Base URL of the thumbnail service
    pub thumbnail_base_url: String,
    /// Base URL of the detection service
    pub detection_base_url: String,
    /// IANA zone the day is rendered in
    pub time_zone: String,
}

impl Default for TimelineSettings {
    fn default() -> Self {
        Self {
            short_click_threshold_ms: 200,
            thumbnail_debounce_ms: 300,
            lane_height: 24.0,
            num_thumbs_to_fetch_initial: 5,
            num_thumbs_to_fetch_visible: 60,
            max_initial_thumbnail_difference_secs: 300,
            max_thumbnail_difference_secs: 600,
            annotation_clip_duration_secs: 30,
            min_zoom: 1.0,
            max_zoom: 96.0,
            mobile_zoom: 8.0,
            settle_delay_ms: 50,
            wheel_step: 0.002,
            thumbnail_base_url: "http://localhost:8080/api".to_string(),
            detection_base_url: "http://localhost:8080/api".to_string(),
            time_zone: "UTC".to_string(),
        }
    }
}

impl TimelineSettings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, TimelineError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Load settings, falling back to defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self, TimelineError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Save settings as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), TimelineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, TimelineError> {
        self.time_zone
            .parse::<Tz>()
            .map_err(|_| TimelineError::UnknownTimeZone(self.time_zone.clone()))
    }

    pub fn short_click_threshold(&self) -> Duration {
        Duration::from_millis(self.short_click_threshold_ms)
    }

    pub fn thumbnail_debounce(&self) -> Duration {
        Duration::from_millis(self.thumbnail_debounce_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Clip length, clamped to `0..=MAX_WINDOW_SECS`.
    pub fn annotation_clip_duration(&self) -> chrono::Duration {
        window_seconds("annotation_clip_duration_secs", self.annotation_clip_duration_secs)
    }

    pub fn max_initial_thumbnail_difference(&self) -> chrono::Duration {
        window_seconds(
            "max_initial_thumbnail_difference_secs",
            self.max_initial_thumbnail_difference_secs,
        )
    }

    pub fn max_thumbnail_difference(&self) -> chrono::Duration {
        window_seconds("max_thumbnail_difference_secs", self.max_thumbnail_difference_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let settings: TimelineSettings =
            serde_json::from_str(r#"{ "short_click_threshold_ms": 150, "time_zone": "Europe/Oslo" }"#)
                .unwrap();
        assert_eq!(settings.short_click_threshold(), Duration::from_millis(150));
        assert_eq!(settings.thumbnail_debounce(), Duration::from_millis(300));
        assert_eq!(settings.tz().unwrap(), chrono_tz::Europe::Oslo);
    }

    #[test]
    fn test_unknown_zone_is_reported() {
        let settings = TimelineSettings {
            time_zone: "Mars/Olympus".to_string(),
            ..Default::default()
        };
        assert!(matches!(settings.tz(), Err(TimelineError::UnknownTimeZone(_))));
    }

    #[test]
    fn test_time_windows_are_clamped() {
        let settings: TimelineSettings = serde_json::from_str(
            r#"{
                "max_initial_thumbnail_difference_secs": 9000000000000,
                "max_thumbnail_difference_secs": -600,
                "annotation_clip_duration_secs": -9223372036854775808
            }"#,
        )
        .unwrap();
        assert_eq!(
            settings.max_initial_thumbnail_difference(),
            chrono::Duration::seconds(MAX_WINDOW_SECS)
        );
        assert_eq!(settings.max_thumbnail_difference(), chrono::Duration::zero());
        assert_eq!(settings.annotation_clip_duration(), chrono::Duration::zero());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("day-timeline-{}", uuid::Uuid::new_v4()));
        let path = dir.join("timeline.json");
        let settings = TimelineSettings {
            lane_height: 32.0,
            ..Default::default()
        };
        settings.save(&path).unwrap();
        let loaded = TimelineSettings::load_or_default(&path).unwrap();
        assert_eq!(loaded, settings);
        let _ = fs::remove_dir_all(&dir);

        let missing = TimelineSettings::load_or_default(&dir.join("missing.json")).unwrap();
        assert_eq!(missing, TimelineSettings::default());
    }
}
