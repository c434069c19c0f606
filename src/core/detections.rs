//! Detection intervals for the displayed day.

use std::ops::Range;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::fetch::{FetchHandle, LatestRequest, RequestTicket};
use crate::error::FetchError;
use crate::state::{DetectionInterval, TimeInterval};

/// Which detections to load. Empty lists mean "all".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionFilter {
    pub source_ids: Vec<String>,
    pub categories: Vec<String>,
}

impl DetectionFilter {
    pub fn for_source(source_id: impl Into<String>) -> Self {
        Self {
            source_ids: vec![source_id.into()],
            categories: Vec::new(),
        }
    }

    pub fn matches(&self, detection: &DetectionInterval) -> bool {
        (self.source_ids.is_empty() || self.source_ids.contains(&detection.source))
            && (self.categories.is_empty() || self.categories.contains(&detection.category))
    }
}

pub trait DetectionSource {
    fn fetch_occurrences(
        &self,
        filter: &DetectionFilter,
        range: Range<DateTime<Utc>>,
    ) -> FetchHandle<Vec<DetectionInterval>>;
}

pub struct PendingDetections {
    pub ticket: RequestTicket,
    pub handle: FetchHandle<Vec<DetectionInterval>>,
}

impl PendingDetections {
    pub async fn run(self) -> (RequestTicket, Result<Vec<DetectionInterval>, FetchError>) {
        let ticket = self.ticket;
        (ticket, self.handle.join().await)
    }
}

/// Holds the detections currently drawn. A failed load leaves the timeline empty and
/// records the error; the host decides whether to try again.
pub struct DetectionFeed<S> {
    source: S,
    request: LatestRequest,
    filter: DetectionFilter,
    detections: Vec<DetectionInterval>,
    last_error: Option<FetchError>,
}

impl<S: DetectionSource> DetectionFeed<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            request: LatestRequest::new(),
            filter: DetectionFilter::default(),
            detections: Vec::new(),
            last_error: None,
        }
    }

    pub fn detections(&self) -> &[DetectionInterval] {
        &self.detections
    }

    pub fn last_error(&self) -> Option<&FetchError> {
        self.last_error.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.request.in_flight()
    }

    /// Start loading `interval`, superseding any load in flight.
    pub fn load(&mut self, filter: DetectionFilter, interval: &TimeInterval) -> PendingDetections {
        let range = interval.time_start.with_timezone(&Utc)..interval.time_end.with_timezone(&Utc);
        tracing::debug!(?filter, start = %range.start, end = %range.end, "loading detections");
        let handle = self.source.fetch_occurrences(&filter, range);
        self.filter = filter;
        let ticket = self.request.issue(&handle);
        PendingDetections { ticket, handle }
    }

    /// Apply a finished load. Returns false when the result was stale or cancelled.
    pub fn complete(
        &mut self,
        ticket: RequestTicket,
        result: Result<Vec<DetectionInterval>, FetchError>,
    ) -> bool {
        if !self.request.finish(ticket) {
            tracing::debug!(?ticket, "dropping stale detection response");
            return false;
        }
        match result {
            Ok(mut detections) => {
                let before = detections.len();
                detections.retain(|d| d.end_time >= d.start_time && self.filter.matches(d));
                if detections.len() != before {
                    tracing::debug!(dropped = before - detections.len(), "skipped detections");
                }
                detections.sort_by_key(|d| (d.start_time, d.end_time));
                self.detections = detections;
                self.last_error = None;
                true
            }
            Err(FetchError::Cancelled) => false,
            Err(err) => {
                tracing::warn!(error = %err, "detection fetch failed");
                self.detections.clear();
                self.last_error = Some(err);
                true
            }
        }
    }

    pub fn cancel(&mut self) {
        self.request.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::cell::RefCell;

    #[derive(Default)]
    struct ScriptedSource {
        calls: RefCell<Vec<(DetectionFilter, Range<DateTime<Utc>>)>>,
    }

    impl DetectionSource for ScriptedSource {
        fn fetch_occurrences(
            &self,
            filter: &DetectionFilter,
            range: Range<DateTime<Utc>>,
        ) -> FetchHandle<Vec<DetectionInterval>> {
            self.calls.borrow_mut().push((filter.clone(), range));
            FetchHandle::ready(Ok(Vec::new()))
        }
    }

    fn day() -> TimeInterval {
        TimeInterval::for_day(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(), chrono_tz::Europe::Berlin)
            .unwrap()
    }

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, h, 0, 0).unwrap()
    }

    #[test]
    fn test_load_requests_whole_day_in_utc() {
        let mut feed = DetectionFeed::new(ScriptedSource::default());
        feed.load(DetectionFilter::for_source("cam-1"), &day());
        let calls = feed.source.calls.borrow();
        assert_eq!(calls[0].1.start, Utc.with_ymd_and_hms(2024, 6, 11, 22, 0, 0).unwrap());
        assert_eq!(calls[0].1.end, at(22));
        assert!(feed.is_loading());
    }

    #[test]
    fn test_complete_sorts_and_filters() {
        let mut feed = DetectionFeed::new(ScriptedSource::default());
        let pending = feed.load(DetectionFilter::for_source("cam-1"), &day());
        let applied = feed.complete(
            pending.ticket,
            Ok(vec![
                DetectionInterval::new(at(10), at(11), "person", "cam-1"),
                DetectionInterval::new(at(3), at(4), "vehicle", "cam-1"),
                DetectionInterval::new(at(5), at(6), "vehicle", "cam-2"),
                DetectionInterval::new(at(8), at(7), "vehicle", "cam-1"),
            ]),
        );
        assert!(applied);
        let starts: Vec<DateTime<Utc>> = feed.detections().iter().map(|d| d.start_time).collect();
        assert_eq!(starts, vec![at(3), at(10)]);
        assert!(!feed.is_loading());
    }

    #[test]
    fn test_failure_empties_and_records_error() {
        let mut feed = DetectionFeed::new(ScriptedSource::default());
        let pending = feed.load(DetectionFilter::default(), &day());
        feed.complete(pending.ticket, Ok(vec![DetectionInterval::new(at(3), at(4), "vehicle", "cam-1")]));

        let pending = feed.load(DetectionFilter::default(), &day());
        assert!(feed.complete(pending.ticket, Err(FetchError::Network("refused".to_string()))));
        assert!(feed.detections().is_empty());
        assert_eq!(feed.last_error(), Some(&FetchError::Network("refused".to_string())));
        assert_eq!(feed.source.calls.borrow().len(), 2);
    }

    #[tokio::test]
    async fn test_superseded_load_is_ignored() {
        let mut feed = DetectionFeed::new(ScriptedSource::default());
        let first = feed.load(DetectionFilter::default(), &day());
        let second = feed.load(DetectionFilter::default(), &day());

        let (ticket, result) = first.run().await;
        assert_eq!(result, Err(FetchError::Cancelled));
        assert!(!feed.complete(ticket, result));

        let (ticket, result) = second.run().await;
        assert!(feed.complete(ticket, result));
        assert!(feed.last_error().is_none());
    }
}
