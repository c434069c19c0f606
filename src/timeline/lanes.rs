use dioxus::prelude::*;
use day_timeline::core::renderer::{LaneConfig, Layer, TimelineFrame};

use crate::constants::{ACCENT_ANNOTATION, ACCENT_NOW, ACCENT_SCRUB, BORDER_SUBTLE, TEXT_PRIMARY};

use super::lane_color;

/// Absolutely positioned bars and overlays, painted in frame order.
#[component]
pub(crate) fn TimelineLanes(frame: TimelineFrame, lanes: Vec<LaneConfig>) -> Element {
    let height = frame.height;

    rsx! {
        for (index, layer) in frame.layers.iter().enumerate() {
            {match layer {
                Layer::AxisTick { .. } => rsx! {},
                Layer::LaneSeparator { y } => rsx! {
                    div {
                        key: "sep-{index}",
                        style: "position: absolute; left: 0; right: 0; top: {y}px; height: 1px; background-color: {BORDER_SUBTLE}; pointer-events: none;",
                    }
                },
                Layer::Bar { lane, detection_id, left, width, top, height, .. } => {
                    let color = lanes.get(*lane).map(|l| lane_color(&l.category)).unwrap_or(TEXT_PRIMARY);
                    // Keep sub-pixel bars visible
                    let width = width.max(1.0);
                    rsx! {
                        div {
                            key: "{detection_id}",
                            style: "
                                position: absolute;
                                left: {left}px; width: {width}px;
                                top: {top + 4.0}px; height: {height - 8.0}px;
                                background-color: {color};
                                border-radius: 2px;
                                pointer-events: none;
                            ",
                        }
                    }
                }
                Layer::NowMarker { x } => rsx! {
                    div {
                        key: "now",
                        style: "position: absolute; left: {x}px; top: 0; width: 1px; height: {height}px; background-color: {ACCENT_NOW}; pointer-events: none; z-index: 5;",
                    }
                },
                Layer::AnnotationRange { left, width, current_x } => rsx! {
                    div {
                        key: "annotation",
                        style: "position: absolute; left: {left}px; width: {width}px; top: 0; height: {height}px; background-color: {ACCENT_ANNOTATION}; pointer-events: none; z-index: 6;",
                    }
                    div {
                        key: "annotation-current",
                        style: "position: absolute; left: {current_x}px; top: 0; width: 2px; height: {height}px; background-color: {ACCENT_NOW}; pointer-events: none; z-index: 6;",
                    }
                },
                Layer::ScrubMarker { x, .. } => rsx! {
                    div {
                        key: "scrub",
                        style: "position: absolute; left: {x}px; top: 0; width: 1px; height: {height}px; background-color: {ACCENT_SCRUB}; pointer-events: none; z-index: 7;",
                    }
                },
            }}
        }
    }
}
