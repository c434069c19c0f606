pub mod annotation;
pub mod debounce;
pub mod detections;
pub mod fetch;
pub mod panzoom;
pub mod ratio;
pub mod renderer;
pub mod scale;
pub mod thumbnails;
