use std::borrow::Cow;

use day_timeline::core::thumbnails::{ImageHandle, ImageStore};

pub const THUMB_PROTOCOL: &str = "thumb";

/// URL under which the "thumb" custom protocol serves an image handle.
/// Uses the http://<scheme>.localhost/ mapping of the current WebView2 configuration on Windows.
pub fn thumbnail_url(handle: ImageHandle) -> String {
    format!("http://{}.localhost/{}", THUMB_PROTOCOL, handle.id())
}

/// Resolve a protocol request path to the stored image bytes.
pub fn serve_thumbnail(store: &ImageStore, path: &str) -> http::Response<Cow<'static, [u8]>> {
    let image = path
        .rsplit('/')
        .next()
        .and_then(ImageHandle::parse)
        .and_then(|handle| store.get(handle));
    let response = match image {
        Some(image) => http::Response::builder()
            .status(http::StatusCode::OK)
            .header(http::header::CONTENT_TYPE, image.mime())
            .header(http::header::CACHE_CONTROL, "no-store")
            .body(Cow::Owned(image.bytes().to_vec())),
        None => http::Response::builder()
            .status(http::StatusCode::NOT_FOUND)
            .body(Cow::Borrowed(&[][..])),
    };
    response.unwrap_or_else(|_| http::Response::new(Cow::Borrowed(&[][..])))
}

/// Zoom readout for the timeline header.
pub fn format_zoom(scale: f64) -> String {
    if scale < 10.0 {
        format!("{:.1}x", scale)
    } else {
        format!("{:.0}x", scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use day_timeline::state::ThumbnailImage;

    #[test]
    fn test_serve_registered_and_revoked() {
        let store = ImageStore::new();
        let png = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let handle = store.register(ThumbnailImage::from_bytes(png.to_vec()));
        let url = thumbnail_url(handle);
        let path = url.trim_start_matches("http://thumb.localhost");

        let response = serve_thumbnail(&store, path);
        assert_eq!(response.status(), http::StatusCode::OK);
        assert_eq!(response.headers()[http::header::CONTENT_TYPE], "image/png");

        store.revoke(handle);
        assert_eq!(serve_thumbnail(&store, path).status(), http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_format_zoom() {
        assert_eq!(format_zoom(1.0), "1.0x");
        assert_eq!(format_zoom(48.0), "48x");
    }
}
