//! State management module
//!
//! This module contains the data structures shared by the engine and its hosts:
//! - TimeInterval: The wall-clock span of one rendered day
//! - VisiblePortion: The fraction of that day currently in the viewport
//! - DetectionInterval: One event bar supplied by the detection service
//! - Annotation / Tooltip: User-placed range and transient hover state
//! - Thumbnail: A fetched preview image keyed by time
//! - TimelineSettings: Tunables persisted as JSON

mod annotation;
mod detection;
mod interval;
mod portion;
mod settings;
mod thumbnail;
mod tooltip;

pub use annotation::Annotation;
pub use detection::DetectionInterval;
pub use interval::TimeInterval;
pub(crate) use interval::local_midnight;
pub use portion::VisiblePortion;
pub use settings::TimelineSettings;
pub use thumbnail::{Thumbnail, ThumbnailImage};
pub use tooltip::Tooltip;
