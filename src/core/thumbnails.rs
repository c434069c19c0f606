//! Thumbnail prefetching for the hover preview.
//!
//! A small batch around the first hover point is fetched eagerly, then a denser batch
//! over the visible window once it stops moving. Fetches run on the host's executor:
//! the prefetcher hands out a [`PendingFetch`] and the host feeds the result back
//! through [`ThumbnailPrefetcher::complete`].

use std::collections::HashMap;
use std::ops::Range;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crate::core::debounce::{Clock, Debouncer, SystemClock};
use crate::core::fetch::{FetchHandle, LatestRequest, RequestTicket};
use crate::error::FetchError;
use crate::state::{Thumbnail, ThumbnailImage, TimeInterval, TimelineSettings, VisiblePortion};

/// Anything that can produce thumbnails for a source over a time range.
pub trait ThumbnailSource {
    fn fetch_thumbnails(
        &self,
        source_id: &str,
        range: Range<DateTime<Utc>>,
        max_count: usize,
    ) -> FetchHandle<Vec<Thumbnail>>;
}

/// Opaque reference to an image held by an [`ImageStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageHandle(u64);

impl ImageHandle {
    pub fn id(self) -> u64 {
        self.0
    }

    /// Parse a handle from the last path segment of a served URL.
    pub fn parse(segment: &str) -> Option<Self> {
        segment.trim_matches('/').parse::<u64>().ok().map(Self)
    }
}

#[derive(Default)]
struct ImageStoreInner {
    next_id: u64,
    images: HashMap<u64, ThumbnailImage>,
}

/// Registry of materialized preview images that hosts serve by handle.
///
/// Every registered handle must eventually be revoked; the prefetcher keeps at most one alive.
#[derive(Clone, Default)]
pub struct ImageStore {
    inner: Arc<RwLock<ImageStoreInner>>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, ImageStoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, ImageStoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn register(&self, image: ThumbnailImage) -> ImageHandle {
        let mut inner = self.write();
        let mut id = inner.next_id.wrapping_add(1);
        if id == 0 {
            id = 1;
        }
        inner.next_id = id;
        inner.images.insert(id, image);
        ImageHandle(id)
    }

    pub fn get(&self, handle: ImageHandle) -> Option<ThumbnailImage> {
        self.read().images.get(&handle.0).cloned()
    }

    /// Release an image. Returns false if the handle was already revoked.
    pub fn revoke(&self, handle: ImageHandle) -> bool {
        self.write().images.remove(&handle.0).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageStore").field("len", &self.len()).finish()
    }
}

/// The thumbnail currently shown in the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedThumbnail {
    pub time: DateTime<Utc>,
    pub handle: ImageHandle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ThumbnailState {
    pub thumbnail: Option<SelectedThumbnail>,
    pub is_error: bool,
    pub still_fetching: bool,
}

/// A fetch the host must drive to completion and report back.
pub struct PendingFetch {
    pub ticket: RequestTicket,
    pub handle: FetchHandle<Vec<Thumbnail>>,
}

impl PendingFetch {
    /// Await the fetch, yielding the ticket alongside its result.
    pub async fn run(self) -> (RequestTicket, Result<Vec<Thumbnail>, FetchError>) {
        let ticket = self.ticket;
        (ticket, self.handle.join().await)
    }
}

/// Which batch a fetch belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Initial,
    Visible,
}

pub struct ThumbnailPrefetcher<S, C = SystemClock> {
    source: S,
    source_id: String,
    interval: TimeInterval,
    store: ImageStore,
    num_initial: usize,
    num_visible: usize,
    max_initial_difference: chrono::Duration,
    max_difference: chrono::Duration,
    visible: Debouncer<VisiblePortion, C>,
    request: LatestRequest,
    thumbnails: Vec<Thumbnail>,
    pointer_time: Option<DateTime<Utc>>,
    state: ThumbnailState,
    initial_issued: bool,
    completed_once: bool,
}

impl<S: ThumbnailSource> ThumbnailPrefetcher<S, SystemClock> {
    pub fn new(
        source: S,
        source_id: impl Into<String>,
        interval: TimeInterval,
        settings: &TimelineSettings,
        store: ImageStore,
    ) -> Self {
        Self::with_clock(source, source_id, interval, settings, store, SystemClock)
    }
}

impl<S: ThumbnailSource, C: Clock> ThumbnailPrefetcher<S, C> {
    pub fn with_clock(
        source: S,
        source_id: impl Into<String>,
        interval: TimeInterval,
        settings: &TimelineSettings,
        store: ImageStore,
        clock: C,
    ) -> Self {
        Self {
            source,
            source_id: source_id.into(),
            interval,
            store,
            num_initial: settings.num_thumbs_to_fetch_initial,
            num_visible: settings.num_thumbs_to_fetch_visible,
            max_initial_difference: settings.max_initial_thumbnail_difference(),
            max_difference: settings.max_thumbnail_difference(),
            visible: Debouncer::new(settings.thumbnail_debounce(), clock),
            request: LatestRequest::new(),
            thumbnails: Vec::new(),
            pointer_time: None,
            state: ThumbnailState::default(),
            initial_issued: false,
            completed_once: false,
        }
    }

    pub fn state(&self) -> ThumbnailState {
        self.state
    }

    pub fn thumbnails(&self) -> &[Thumbnail] {
        &self.thumbnails
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// Image bytes of the current selection, if any.
    pub fn current_image(&self) -> Option<ThumbnailImage> {
        self.state
            .thumbnail
            .and_then(|selected| self.store.get(selected.handle))
    }

    /// Fetching has settled without an error and nothing lies close enough to the pointer.
    pub fn thumbnail_not_found(&self) -> bool {
        self.completed_once
            && !self.state.still_fetching
            && !self.state.is_error
            && self.state.thumbnail.is_none()
            && self.pointer_time.is_some()
    }

    /// Eager small batch around the first hover point. Later calls return `None`.
    pub fn initial_fetch(&mut self, hover: DateTime<Utc>) -> Option<PendingFetch> {
        if self.initial_issued {
            return None;
        }
        self.initial_issued = true;
        if self.pointer_time.is_none() {
            self.pointer_time = Some(hover);
        }
        let start = hover
            .checked_sub_signed(self.max_initial_difference)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let end = hover
            .checked_add_signed(self.max_initial_difference)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let range = self.clamp_to_interval(start, end);
        Some(self.issue(FetchKind::Initial, range, self.num_initial))
    }

    /// Record the latest visible window; the dense fetch waits for it to settle.
    pub fn set_visible_portion(&mut self, portion: VisiblePortion) {
        self.visible.push(portion);
    }

    /// Issue the dense fetch over the visible window once it has been stable long enough.
    pub fn poll_visible(&mut self) -> Option<PendingFetch> {
        let portion = self.visible.poll()?;
        let (start, end) = portion.time_range(&self.interval);
        let range = self.clamp_to_interval(start.with_timezone(&Utc), end.with_timezone(&Utc));
        Some(self.issue(FetchKind::Visible, range, self.num_visible))
    }

    fn clamp_to_interval(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Range<DateTime<Utc>> {
        let day_start = self.interval.time_start.with_timezone(&Utc);
        let day_end = self.interval.time_end.with_timezone(&Utc);
        let start = start.clamp(day_start, day_end);
        let end = end.clamp(day_start, day_end);
        start.min(end)..end.max(start)
    }

    fn issue(
        &mut self,
        kind: FetchKind,
        range: Range<DateTime<Utc>>,
        max_count: usize,
    ) -> PendingFetch {
        tracing::debug!(
            ?kind,
            source = %self.source_id,
            start = %range.start,
            end = %range.end,
            max_count,
            "fetching thumbnails"
        );
        let handle = self
            .source
            .fetch_thumbnails(&self.source_id, range, max_count);
        let ticket = self.request.issue(&handle);
        self.state.still_fetching = true;
        PendingFetch { ticket, handle }
    }

    /// Apply a finished fetch. Stale tickets are dropped without touching state.
    pub fn complete(&mut self, ticket: RequestTicket, result: Result<Vec<Thumbnail>, FetchError>) {
        if !self.request.finish(ticket) {
            tracing::debug!(?ticket, "dropping stale thumbnail response");
            return;
        }
        self.state.still_fetching = self.request.in_flight();
        match result {
            Ok(batch) => {
                self.completed_once = true;
                self.state.is_error = false;
                self.merge(batch);
                self.reselect();
            }
            Err(FetchError::Cancelled) => {}
            Err(err) => {
                self.completed_once = true;
                tracing::warn!(source = %self.source_id, error = %err, "thumbnail fetch failed");
                self.state.is_error = true;
            }
        }
    }

    fn merge(&mut self, batch: Vec<Thumbnail>) {
        let mut merged = batch;
        merged.append(&mut self.thumbnails);
        // Stable sort keeps the fresher copy first for equal times.
        merged.sort_by_key(|thumbnail| thumbnail.time);
        merged.dedup_by_key(|thumbnail| thumbnail.time);
        self.thumbnails = merged;
    }

    /// Move the preview to the thumbnail nearest `time`.
    pub fn set_pointer_time(&mut self, time: DateTime<Utc>) {
        self.pointer_time = Some(time);
        self.reselect();
    }

    fn nearest(&self, time: DateTime<Utc>) -> Option<&Thumbnail> {
        let index = self.thumbnails.partition_point(|thumbnail| thumbnail.time < time);
        let before = index.checked_sub(1).and_then(|i| self.thumbnails.get(i));
        let after = self.thumbnails.get(index);
        let distance = |thumbnail: &Thumbnail| (thumbnail.time - time).abs();
        let best = match (before, after) {
            (Some(a), Some(b)) => Some(if distance(b) < distance(a) { b } else { a }),
            (a, b) => a.or(b),
        }?;
        (distance(best) <= self.max_difference).then_some(best)
    }

    fn reselect(&mut self) {
        let Some(pointer) = self.pointer_time else {
            return;
        };
        let best = self.nearest(pointer).map(|thumbnail| (thumbnail.time, thumbnail.image.clone()));
        let current_time = self.state.thumbnail.map(|selected| selected.time);
        if best.as_ref().map(|(time, _)| *time) == current_time {
            return;
        }
        if let Some(previous) = self.state.thumbnail.take() {
            self.store.revoke(previous.handle);
        }
        self.state.thumbnail = best.map(|(time, image)| SelectedThumbnail {
            time,
            handle: self.store.register(image),
        });
    }

    /// Cancel in-flight work and release the held image.
    pub fn teardown(&mut self) {
        tracing::debug!(source = %self.source_id, "tearing down thumbnail prefetcher");
        self.request.cancel();
        self.visible.clear();
        if let Some(previous) = self.state.thumbnail.take() {
            self.store.revoke(previous.handle);
        }
        self.state.still_fetching = false;
    }
}

impl<S, C> Drop for ThumbnailPrefetcher<S, C> {
    fn drop(&mut self) {
        self.request.cancel();
        if let Some(previous) = self.state.thumbnail.take() {
            self.store.revoke(previous.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::debounce::ManualClock;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::oneshot;

    type Reply = oneshot::Sender<Result<Vec<Thumbnail>, FetchError>>;

    #[derive(Clone, Default)]
    struct FakeSource {
        calls: Arc<Mutex<Vec<(Range<DateTime<Utc>>, usize)>>>,
        replies: Arc<Mutex<Vec<Reply>>>,
    }

    impl FakeSource {
        fn calls(&self) -> Vec<(Range<DateTime<Utc>>, usize)> {
            self.calls.lock().unwrap().clone()
        }

        fn reply(&self, index: usize, result: Result<Vec<Thumbnail>, FetchError>) {
            let sender = self.replies.lock().unwrap().remove(index);
            let _ = sender.send(result);
        }
    }

    impl ThumbnailSource for FakeSource {
        fn fetch_thumbnails(
            &self,
            _source_id: &str,
            range: Range<DateTime<Utc>>,
            max_count: usize,
        ) -> FetchHandle<Vec<Thumbnail>> {
            self.calls.lock().unwrap().push((range, max_count));
            let (tx, rx) = oneshot::channel();
            self.replies.lock().unwrap().push(tx);
            FetchHandle::new(async move {
                rx.await
                    .unwrap_or_else(|_| Err(FetchError::Network("dropped".to_string())))
            })
        }
    }

    fn day() -> TimeInterval {
        TimeInterval::for_day(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(), chrono_tz::UTC)
            .unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, h, m, 0).unwrap()
    }

    fn thumb(time: DateTime<Utc>, tag: u8) -> Thumbnail {
        Thumbnail::new(time, ThumbnailImage::from_bytes(vec![tag; 4]))
    }

    fn prefetcher(source: &FakeSource, clock: &ManualClock) -> ThumbnailPrefetcher<FakeSource, ManualClock> {
        ThumbnailPrefetcher::with_clock(
            source.clone(),
            "cam-1",
            day(),
            &TimelineSettings::default(),
            ImageStore::new(),
            clock.clone(),
        )
    }

    #[test]
    fn test_initial_fetch_bounded_and_once() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        assert!(prefetcher.initial_fetch(at(12, 0)).is_some());
        assert!(prefetcher.state().still_fetching);
        assert!(prefetcher.initial_fetch(at(13, 0)).is_none());
        assert_eq!(source.calls(), vec![(at(11, 55)..at(12, 5), 5)]);

        let mut edge = ThumbnailPrefetcher::with_clock(
            source.clone(),
            "cam-1",
            day(),
            &TimelineSettings::default(),
            ImageStore::new(),
            clock.clone(),
        );
        edge.initial_fetch(at(0, 2));
        assert_eq!(source.calls()[1].0, at(0, 0)..at(0, 7));
    }

    #[test]
    fn test_out_of_range_settings_keep_range_ordered() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let huge: TimelineSettings =
            serde_json::from_str(r#"{ "max_initial_thumbnail_difference_secs": 9000000000000 }"#)
                .unwrap();
        let mut prefetcher = ThumbnailPrefetcher::with_clock(
            source.clone(),
            "cam-1",
            day(),
            &huge,
            ImageStore::new(),
            clock.clone(),
        );
        assert!(prefetcher.initial_fetch(at(12, 0)).is_some());
        assert_eq!(source.calls()[0].0, at(0, 0)..day().time_end.with_timezone(&Utc));

        let negative = TimelineSettings {
            max_initial_thumbnail_difference_secs: -600,
            ..Default::default()
        };
        let mut prefetcher = ThumbnailPrefetcher::with_clock(
            source.clone(),
            "cam-1",
            day(),
            &negative,
            ImageStore::new(),
            clock.clone(),
        );
        prefetcher.initial_fetch(at(12, 0));
        let range = source.calls()[1].0.clone();
        assert!(range.start <= range.end);
        assert_eq!(range, at(12, 0)..at(12, 0));
    }

    #[test]
    fn test_visible_window_settling_back_is_not_refetched() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        prefetcher.set_visible_portion(VisiblePortion::new(0.25, 0.5));
        clock.advance(Duration::from_millis(300));
        let in_flight = prefetcher.poll_visible().unwrap();

        prefetcher.set_visible_portion(VisiblePortion::new(0.3, 0.55));
        clock.advance(Duration::from_millis(100));
        prefetcher.set_visible_portion(VisiblePortion::new(0.25, 0.5));
        clock.advance(Duration::from_millis(300));
        assert!(prefetcher.poll_visible().is_none());
        assert!(!in_flight.handle.is_cancelled());
        assert_eq!(source.calls().len(), 1);
    }

    #[test]
    fn test_visible_fetch_waits_for_debounce() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        prefetcher.set_visible_portion(VisiblePortion::new(0.0, 0.5));
        clock.advance(Duration::from_millis(200));
        prefetcher.set_visible_portion(VisiblePortion::new(0.25, 0.5));
        clock.advance(Duration::from_millis(299));
        assert!(prefetcher.poll_visible().is_none());

        clock.advance(Duration::from_millis(1));
        assert!(prefetcher.poll_visible().is_some());
        assert_eq!(source.calls(), vec![(at(6, 0)..at(12, 0), 60)]);
        assert!(prefetcher.poll_visible().is_none());
    }

    #[test]
    fn test_stale_response_is_dropped() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        let first = prefetcher.initial_fetch(at(12, 0)).unwrap();
        prefetcher.set_visible_portion(VisiblePortion::new(0.5, 0.75));
        clock.advance(Duration::from_millis(300));
        let second = prefetcher.poll_visible().unwrap();
        assert!(first.handle.is_cancelled());
        assert!(!second.handle.is_cancelled());

        prefetcher.complete(first.ticket, Ok(vec![thumb(at(12, 0), 1)]));
        assert!(prefetcher.thumbnails().is_empty());
        assert!(prefetcher.state().still_fetching);

        prefetcher.complete(second.ticket, Ok(vec![thumb(at(12, 1), 2)]));
        assert_eq!(prefetcher.thumbnails().len(), 1);
        assert!(!prefetcher.state().still_fetching);
        assert_eq!(prefetcher.state().thumbnail.map(|t| t.time), Some(at(12, 1)));
    }

    #[tokio::test]
    async fn test_superseded_fetch_resolves_cancelled() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        let first = prefetcher.initial_fetch(at(12, 0)).unwrap();
        prefetcher.set_visible_portion(VisiblePortion::new(0.5, 0.75));
        clock.advance(Duration::from_millis(300));
        let second = prefetcher.poll_visible().unwrap();

        let (ticket, result) = first.run().await;
        assert_eq!(result, Err(FetchError::Cancelled));
        prefetcher.complete(ticket, result);
        assert!(prefetcher.state().still_fetching);

        source.reply(1, Ok(vec![thumb(at(15, 0), 3)]));
        let (ticket, result) = second.run().await;
        prefetcher.complete(ticket, result);
        assert_eq!(prefetcher.thumbnails().len(), 1);
    }

    #[test]
    fn test_pointer_selection_revokes_previous_handle() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        let pending = prefetcher.initial_fetch(at(12, 0)).unwrap();
        prefetcher.complete(
            pending.ticket,
            Ok(vec![thumb(at(12, 3), 2), thumb(at(11, 58), 1), thumb(at(12, 3), 9)]),
        );
        assert_eq!(prefetcher.thumbnails().len(), 2);
        let first = prefetcher.state().thumbnail.unwrap();
        assert_eq!(first.time, at(11, 58));
        assert_eq!(prefetcher.store().len(), 1);

        prefetcher.set_pointer_time(at(12, 2));
        let second = prefetcher.state().thumbnail.unwrap();
        assert_eq!(second.time, at(12, 3));
        assert!(prefetcher.store().get(first.handle).is_none());
        assert_eq!(prefetcher.store().len(), 1);
        assert_eq!(prefetcher.current_image().unwrap().bytes()[0], 2);

        // Hovering near the same thumbnail keeps the handle.
        prefetcher.set_pointer_time(at(12, 4));
        assert_eq!(prefetcher.state().thumbnail, Some(second));
    }

    #[test]
    fn test_not_found_versus_error() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        let pending = prefetcher.initial_fetch(at(12, 0)).unwrap();
        assert!(!prefetcher.thumbnail_not_found());
        prefetcher.complete(pending.ticket, Ok(vec![thumb(at(1, 0), 1)]));
        assert!(prefetcher.state().thumbnail.is_none());
        assert!(prefetcher.thumbnail_not_found());

        prefetcher.set_visible_portion(VisiblePortion::FULL);
        clock.advance(Duration::from_millis(300));
        let pending = prefetcher.poll_visible().unwrap();
        prefetcher.complete(pending.ticket, Err(FetchError::Status(503)));
        assert!(prefetcher.state().is_error);
        assert!(!prefetcher.thumbnail_not_found());
    }

    #[test]
    fn test_teardown_cancels_and_revokes() {
        let source = FakeSource::default();
        let clock = ManualClock::new();
        let mut prefetcher = prefetcher(&source, &clock);

        let pending = prefetcher.initial_fetch(at(12, 0)).unwrap();
        prefetcher.complete(pending.ticket, Ok(vec![thumb(at(12, 0), 1)]));
        prefetcher.set_visible_portion(VisiblePortion::new(0.4, 0.6));
        clock.advance(Duration::from_millis(300));
        let in_flight = prefetcher.poll_visible().unwrap();

        prefetcher.teardown();
        assert!(in_flight.handle.is_cancelled());
        assert!(prefetcher.store().is_empty());
        assert_eq!(prefetcher.state().thumbnail, None);
        assert!(!prefetcher.state().still_fetching);
    }

    #[test]
    fn test_image_store_handles() {
        let store = ImageStore::new();
        let a = store.register(ThumbnailImage::from_bytes(vec![1]));
        let b = store.register(ThumbnailImage::from_bytes(vec![2]));
        assert_ne!(a, b);
        assert_eq!(ImageHandle::parse(&format!("/{}", b.id())), Some(b));
        assert!(store.revoke(a));
        assert!(!store.revoke(a));
        assert_eq!(store.len(), 1);
    }
}
