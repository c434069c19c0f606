use dioxus::prelude::*;
use day_timeline::core::renderer::{Layer, TimelineFrame};

use crate::constants::{AXIS_HEIGHT, BORDER_STRONG, TEXT_DIM};

/// Tick marks and HH:MM labels for the visible window.
/// Pointer events pass through to the lanes below.
#[component]
pub(crate) fn TimeAxis(frame: TimelineFrame) -> Element {
    let width = frame.width;
    let ticks: Vec<(f64, String)> = frame
        .layers
        .iter()
        .filter_map(|layer| match layer {
            Layer::AxisTick { x, label } => Some((*x, label.clone())),
            _ => None,
        })
        .collect();

    rsx! {
        div {
            style: "position: relative; height: {AXIS_HEIGHT}px; overflow: hidden; pointer-events: none;",
            for (x, label) in ticks {
                {
                    // Keep the last label inside the axis
                    let shift = if x > width - 40.0 { "translateX(-100%)" } else { "none" };
                    let label_x = if x > width - 40.0 { x - 4.0 } else { x + 4.0 };
                    rsx! {
                        div {
                            key: "tick-{label}",
                            div {
                                style: "
                                    position: absolute;
                                    left: {x}px;
                                    bottom: 0;
                                    width: 1px;
                                    height: 10px;
                                    background-color: {BORDER_STRONG};
                                ",
                            }
                            div {
                                style: "
                                    position: absolute; left: {label_x}px; top: 3px;
                                    font-size: 9px; color: {TEXT_DIM};
                                    font-family: 'SF Mono', Consolas, monospace;
                                    user-select: none; transform: {shift};
                                ",
                                "{label}"
                            }
                        }
                    }
                }
            }
        }
    }
}
