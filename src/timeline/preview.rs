use dioxus::prelude::*;

use crate::constants::{BG_DEEPEST, BORDER_DEFAULT, PREVIEW_HEIGHT, PREVIEW_WIDTH, TEXT_MUTED, TEXT_PRIMARY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStatus {
    Loading,
    Ready,
    NotFound,
    Error,
}

/// Hover preview floating above the scrub marker.
#[component]
pub(crate) fn ThumbnailPreview(
    x: f64,
    container_width: f64,
    url: Option<String>,
    status: PreviewStatus,
    label: String,
) -> Element {
    let left = (x - PREVIEW_WIDTH / 2.0).clamp(0.0, (container_width - PREVIEW_WIDTH).max(0.0));
    let message = match status {
        PreviewStatus::Loading => "Loading…",
        PreviewStatus::NotFound => "No thumbnail",
        PreviewStatus::Error => "Thumbnails unavailable",
        PreviewStatus::Ready => "",
    };

    rsx! {
        div {
            style: "
                position: absolute; left: {left}px; bottom: calc(100% + 6px);
                width: {PREVIEW_WIDTH}px;
                background-color: {BG_DEEPEST}; border: 1px solid {BORDER_DEFAULT};
                border-radius: 4px; overflow: hidden; pointer-events: none; z-index: 30;
            ",
            div {
                style: "width: {PREVIEW_WIDTH}px; height: {PREVIEW_HEIGHT}px; display: flex; align-items: center; justify-content: center;",
                if let (PreviewStatus::Ready, Some(url)) = (status, url) {
                    img {
                        src: "{url}",
                        style: "width: 100%; height: 100%; object-fit: cover;",
                    }
                } else {
                    span { style: "font-size: 10px; color: {TEXT_MUTED};", "{message}" }
                }
            }
            div {
                style: "padding: 2px 6px; font-family: 'SF Mono', Consolas, monospace; font-size: 10px; color: {TEXT_PRIMARY};",
                "{label}"
            }
        }
    }
}
