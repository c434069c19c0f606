use dioxus::prelude::*;
use day_timeline::core::renderer::{LaneConfig, TimelineFrame};

use crate::constants::{
    AXIS_HEIGHT, BG_BASE, BG_ELEVATED, BG_SURFACE, BORDER_DEFAULT, LANE_LABEL_WIDTH, TEXT_DIM,
    TEXT_MUTED,
};

use super::axis::TimeAxis;
use super::lane_color;
use super::lanes::TimelineLanes;
use super::preview::{PreviewStatus, ThumbnailPreview};

const HEADER_BUTTON_STYLE: &str = "padding: 0 6px; height: 20px; border: none; border-radius: 3px; background: transparent; color: #71717a; font-size: 11px; cursor: pointer; display: flex; align-items: center; justify-content: center;";

/// Header, lane labels, axis and lanes for one day.
#[component]
pub fn TimelinePanel(
    frame: TimelineFrame,
    lanes: Vec<LaneConfig>,
    date_label: String,
    zoom_label: String,
    level_label: String,
    status_message: Option<String>,
    // Hover preview
    preview_x: Option<f64>,
    preview_url: Option<String>,
    preview_status: PreviewStatus,
    preview_label: String,
    // Header actions
    on_zoom_in: EventHandler<MouseEvent>,
    on_zoom_out: EventHandler<MouseEvent>,
    on_fit: EventHandler<MouseEvent>,
    on_now: EventHandler<MouseEvent>,
    on_prev_day: EventHandler<MouseEvent>,
    on_next_day: EventHandler<MouseEvent>,
    // Gestures on the lane area
    on_pointer_down: EventHandler<PointerEvent>,
    on_pointer_move: EventHandler<PointerEvent>,
    on_pointer_up: EventHandler<PointerEvent>,
    on_pointer_leave: EventHandler<PointerEvent>,
    on_wheel: EventHandler<WheelEvent>,
) -> Element {
    let lanes_height = frame.height.max(1.0);

    rsx! {
        div {
            style: "
                display: flex; flex-direction: column;
                background-color: {BG_ELEVATED};
                border-top: 1px solid {BORDER_DEFAULT};
                user-select: none;
            ",

            // Header
            div {
                style: "
                    display: flex; align-items: center; justify-content: space-between;
                    height: 32px; padding: 0 14px;
                    background-color: {BG_SURFACE}; border-bottom: 1px solid {BORDER_DEFAULT};
                ",
                div {
                    style: "display: flex; align-items: center; gap: 12px;",
                    span { style: "font-size: 11px; font-weight: 500; color: {TEXT_MUTED}; text-transform: uppercase; letter-spacing: 0.5px;", "Timeline" }
                    div {
                        style: "display: flex; align-items: center; gap: 4px;",
                        button { style: HEADER_BUTTON_STYLE, onclick: move |e| on_zoom_out.call(e), "−" }
                        span { style: "font-size: 10px; color: {TEXT_DIM}; min-width: 40px; text-align: center;", "{zoom_label}" }
                        button { style: HEADER_BUTTON_STYLE, onclick: move |e| on_zoom_in.call(e), "+" }
                        button { style: HEADER_BUTTON_STYLE, onclick: move |e| on_fit.call(e), "Fit" }
                        button { style: HEADER_BUTTON_STYLE, onclick: move |e| on_now.call(e), "Now" }
                        span { style: "font-size: 10px; color: {TEXT_DIM};", "{level_label}" }
                    }
                }
                if let Some(message) = status_message {
                    span { style: "font-size: 11px; color: {TEXT_MUTED};", "{message}" }
                }
                div {
                    style: "display: flex; align-items: center; gap: 6px;",
                    button { style: HEADER_BUTTON_STYLE, onclick: move |e| on_prev_day.call(e), "◀" }
                    span {
                        style: "font-family: 'SF Mono', Consolas, monospace; font-size: 11px; color: {TEXT_DIM};",
                        "{date_label}"
                    }
                    button { style: HEADER_BUTTON_STYLE, onclick: move |e| on_next_day.call(e), "▶" }
                }
            }

            div {
                style: "display: flex;",

                // Lane labels
                div {
                    style: "
                        width: {LANE_LABEL_WIDTH}px; min-width: {LANE_LABEL_WIDTH}px;
                        border-right: 1px solid {BORDER_DEFAULT};
                        padding-top: {AXIS_HEIGHT}px;
                    ",
                    for lane in lanes.iter() {
                        div {
                            key: "{lane.category}",
                            style: "
                                height: {frame.height / lanes.len().max(1) as f64}px;
                                display: flex; align-items: center; gap: 6px; padding: 0 10px;
                                font-size: 11px; color: {TEXT_MUTED};
                            ",
                            div { style: "width: 8px; height: 8px; border-radius: 2px; background-color: {lane_color(&lane.category)};" }
                            "{lane.label}"
                        }
                    }
                }

                // Axis and lanes share the measured width
                div {
                    style: "flex: 1; position: relative; min-width: 0;",
                    TimeAxis { frame: frame.clone() }
                    div {
                        id: "timeline-lanes-host",
                        style: "
                            position: relative; overflow: hidden;
                            height: {lanes_height}px;
                            background-color: {BG_BASE};
                            cursor: crosshair; touch-action: none;
                        ",
                        onpointerdown: move |e| on_pointer_down.call(e),
                        onpointermove: move |e| on_pointer_move.call(e),
                        onpointerup: move |e| on_pointer_up.call(e),
                        onpointerleave: move |e| on_pointer_leave.call(e),
                        onwheel: move |e| on_wheel.call(e),
                        TimelineLanes { frame: frame.clone(), lanes: lanes.clone() }
                    }
                    if let Some(x) = preview_x {
                        div {
                            style: "position: absolute; left: 0; right: 0; top: {AXIS_HEIGHT}px; pointer-events: none;",
                            ThumbnailPreview {
                                x: x,
                                container_width: frame.width,
                                url: preview_url.clone(),
                                status: preview_status,
                                label: preview_label.clone(),
                            }
                        }
                    }
                }
            }
        }
    }
}
