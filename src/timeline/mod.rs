//! Timeline components
//!
//! Pure views over a rendered `TimelineFrame`; all state lives in `app.rs`.

mod axis;
mod lanes;
mod panel;
mod preview;

pub use panel::TimelinePanel;
pub use preview::PreviewStatus;

use crate::constants::{ACCENT_ANIMAL, ACCENT_OTHER, ACCENT_PERSON, ACCENT_VEHICLE};

pub(crate) fn lane_color(category: &str) -> &'static str {
    match category {
        "person" => ACCENT_PERSON,
        "vehicle" => ACCENT_VEHICLE,
        "animal" => ACCENT_ANIMAL,
        _ => ACCENT_OTHER,
    }
}
