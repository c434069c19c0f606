//! Day Timeline
//!
//! Desktop viewer for one day of detections: a zoomable, pannable timeline with
//! hover thumbnails and click-to-annotate.

mod app;
mod constants;
mod timeline;
mod utils;

use dioxus::desktop::{Config, LogicalSize, WindowBuilder};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("day_timeline=info")),
        )
        .init();

    let config = Config::new()
        .with_window(
            WindowBuilder::new()
                .with_title("Day Timeline")
                .with_inner_size(LogicalSize::new(1280.0, 480.0))
                .with_resizable(true),
        )
        .with_menu(None)
        // Preview images are served from memory by handle
        .with_custom_protocol(utils::THUMB_PROTOCOL, |_webview, request| {
            utils::serve_thumbnail(app::image_store(), request.uri().path())
        });

    dioxus::LaunchBuilder::desktop()
        .with_cfg(config)
        .launch(app::App);
}
