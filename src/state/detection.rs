use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One event bar: a detection or occurrence reported by the detection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionInterval {
    /// Unique identifier (generated when the service omits one)
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// When the event began
    pub start_time: DateTime<Utc>,
    /// When the event ended
    pub end_time: DateTime<Utc>,
    /// Lane category the event is drawn in
    pub category: String,
    /// Opaque source identifier (camera, sensor, ...)
    pub source: String,
}

impl DetectionInterval {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        category: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time,
            end_time,
            category: category.into(),
            source: source.into(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.end_time.signed_duration_since(self.start_time)
    }
}
