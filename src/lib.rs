//! Day Timeline
//!
//! Headless engine behind a zoomable, pannable day timeline of detections with
//! synchronized thumbnail previews:
//! - `core`: ratio math, detail levels, pan/zoom, rendering, annotation, prefetching
//! - `state`: the data model shared by the engine and its hosts
//! - `providers`: HTTP adapters for the detection and thumbnail services

pub mod core;
pub mod error;
pub mod providers;
pub mod state;

pub use error::{FetchError, TimelineError};
