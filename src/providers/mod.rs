//! Adapters for the external detection and thumbnail services.

pub mod http;

pub use http::{HttpDetectionSource, HttpThumbnailSource};
