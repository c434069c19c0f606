use std::ops::Range;

use chrono::{DateTime, SecondsFormat, Utc};
use futures_util::future::join_all;
use serde::Deserialize;

use crate::core::detections::{DetectionFilter, DetectionSource};
use crate::core::fetch::FetchHandle;
use crate::core::thumbnails::ThumbnailSource;
use crate::error::FetchError;
use crate::state::{DetectionInterval, Thumbnail, ThumbnailImage};

/// Entry of the thumbnail index; `url` may be relative to the service base.
#[derive(Debug, Clone, PartialEq, Deserialize)]
struct ThumbnailRef {
    time: DateTime<Utc>,
    url: String,
}

fn timestamp(time: &DateTime<Utc>) -> String {
    urlencoding::encode(&time.to_rfc3339_opts(SecondsFormat::Millis, true)).into_owned()
}

fn thumbnails_url(
    base_url: &str,
    source_id: &str,
    range: &Range<DateTime<Utc>>,
    max_count: usize,
) -> String {
    format!(
        "{}/sources/{}/thumbnails?start={}&end={}&max_count={}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(source_id),
        timestamp(&range.start),
        timestamp(&range.end),
        max_count,
    )
}

fn occurrences_url(base_url: &str, filter: &DetectionFilter, range: &Range<DateTime<Utc>>) -> String {
    let mut url = format!(
        "{}/occurrences?start={}&end={}",
        base_url.trim_end_matches('/'),
        timestamp(&range.start),
        timestamp(&range.end),
    );
    for source in &filter.source_ids {
        url.push_str("&source=");
        url.push_str(&urlencoding::encode(source));
    }
    for category in &filter.categories {
        url.push_str("&category=");
        url.push_str(&urlencoding::encode(category));
    }
    url
}

fn resolve_image_url(base_url: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        return url.to_string();
    }
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        url.trim_start_matches('/')
    )
}

async fn get_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<T, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    response
        .json()
        .await
        .map_err(|err| FetchError::Decode(err.to_string()))
}

async fn download_image(client: &reqwest::Client, url: &str) -> Result<ThumbnailImage, FetchError> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    let bytes = response.bytes().await?;
    Ok(ThumbnailImage::from_bytes(bytes.to_vec()))
}

/// Thumbnail index plus image download over HTTP.
#[derive(Debug, Clone)]
pub struct HttpThumbnailSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpThumbnailSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl ThumbnailSource for HttpThumbnailSource {
    fn fetch_thumbnails(
        &self,
        source_id: &str,
        range: Range<DateTime<Utc>>,
        max_count: usize,
    ) -> FetchHandle<Vec<Thumbnail>> {
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let url = thumbnails_url(&base_url, source_id, &range, max_count);
        FetchHandle::new(async move {
            let refs: Vec<ThumbnailRef> = get_json(&client, &url).await?;
            let downloads = refs.into_iter().take(max_count).map(|entry| {
                let client = client.clone();
                let image_url = resolve_image_url(&base_url, &entry.url);
                async move {
                    match download_image(&client, &image_url).await {
                        Ok(image) => Some(Thumbnail::new(entry.time, image)),
                        Err(err) => {
                            tracing::warn!(url = %image_url, error = %err, "thumbnail download failed");
                            None
                        }
                    }
                }
            });
            Ok(join_all(downloads).await.into_iter().flatten().collect())
        })
    }
}

/// Detection occurrences over HTTP.
#[derive(Debug, Clone)]
pub struct HttpDetectionSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpDetectionSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl DetectionSource for HttpDetectionSource {
    fn fetch_occurrences(
        &self,
        filter: &DetectionFilter,
        range: Range<DateTime<Utc>>,
    ) -> FetchHandle<Vec<DetectionInterval>> {
        let client = self.client.clone();
        let url = occurrences_url(&self.base_url, filter, &range);
        FetchHandle::new(async move { get_json(&client, &url).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn range() -> Range<DateTime<Utc>> {
        Utc.with_ymd_and_hms(2024, 6, 12, 6, 0, 0).unwrap()
            ..Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_thumbnails_url_encodes_segments() {
        let url = thumbnails_url("http://cams.local/api/", "front door", &range(), 60);
        assert_eq!(
            url,
            "http://cams.local/api/sources/front%20door/thumbnails?start=2024-06-12T06%3A00%3A00.000Z&end=2024-06-12T12%3A00%3A00.000Z&max_count=60"
        );
    }

    #[test]
    fn test_occurrences_url_repeats_filters() {
        let filter = DetectionFilter {
            source_ids: vec!["cam-1".to_string(), "cam 2".to_string()],
            categories: vec!["person".to_string()],
        };
        let url = occurrences_url("http://det.local", &filter, &range());
        assert!(url.starts_with("http://det.local/occurrences?start="));
        assert!(url.ends_with("&source=cam-1&source=cam%202&category=person"));
    }

    #[test]
    fn test_resolve_image_url() {
        assert_eq!(
            resolve_image_url("http://cams.local/", "/thumbs/1.jpg"),
            "http://cams.local/thumbs/1.jpg"
        );
        assert_eq!(
            resolve_image_url("http://cams.local", "https://cdn.local/1.jpg"),
            "https://cdn.local/1.jpg"
        );
    }

    #[test]
    fn test_thumbnail_index_deserializes() {
        let refs: Vec<ThumbnailRef> = serde_json::from_str(
            r#"[{"time": "2024-06-12T06:30:00Z", "url": "thumbs/a.jpg"}]"#,
        )
        .unwrap();
        assert_eq!(refs[0].time, Utc.with_ymd_and_hms(2024, 6, 12, 6, 30, 0).unwrap());
        assert_eq!(refs[0].url, "thumbs/a.jpg");
    }
}
