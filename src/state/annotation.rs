use serde::{Deserialize, Serialize};

/// A user-placed marked range over the day, with a movable "current" sub-marker.
/// Every offset is a day-ratio in [0,1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Whether the range is drawn at all
    pub visible: bool,
    /// Day-ratio where the range begins
    pub offset_start: f64,
    /// Day-ratio where the range ends
    pub offset_end: f64,
    /// Day-ratio of the moving "now playing" marker
    pub offset_current: f64,
}
