use std::sync::Arc;

use chrono::{DateTime, Utc};

const FALLBACK_MIME: &str = "application/octet-stream";

/// Encoded preview image bytes, shared between the fetch cache and the image store.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailImage {
    bytes: Arc<[u8]>,
    mime: &'static str,
}

impl ThumbnailImage {
    /// Wrap encoded bytes, sniffing the MIME type from the image header.
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        let bytes = bytes.into();
        let mime = image::guess_format(&bytes)
            .map(|format| format.to_mime_type())
            .unwrap_or(FALLBACK_MIME);
        Self { bytes, mime }
    }

    pub fn bytes(&self) -> &Arc<[u8]> {
        &self.bytes
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A fetched preview keyed by the time it was requested for.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub time: DateTime<Utc>,
    pub image: ThumbnailImage,
}

impl Thumbnail {
    pub fn new(time: DateTime<Utc>, image: ThumbnailImage) -> Self {
        Self { time, image }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_is_sniffed_from_header() {
        let png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        assert_eq!(ThumbnailImage::from_bytes(png).mime(), "image/png");
        let jpeg = vec![0xFF, 0xD8, 0xFF, 0xE0, 0, 0];
        assert_eq!(ThumbnailImage::from_bytes(jpeg).mime(), "image/jpeg");
        let junk = vec![1, 2, 3];
        assert_eq!(ThumbnailImage::from_bytes(junk).mime(), FALLBACK_MIME);
    }
}
