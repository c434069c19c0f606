//! Imperative annotation surface.
//!
//! Hosts hold an [`AnnotationHandle`] and drive it with times; the stored state is only
//! read back by the renderer through [`AnnotationController::annotation`].

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::core::ratio::day_ratio_from_time;
use crate::state::{Annotation, TimeInterval};

/// Commands a host may issue against the annotation of one timeline.
pub trait AnnotationHandle {
    /// Hide the range and zero every offset.
    fn reset_annotation(&mut self);
    /// Place a range of the fixed clip length starting at `time`.
    fn set_annotation_from_time(&mut self, time: DateTime<chrono_tz::Tz>);
    /// Move only the "current" marker, keeping the placed range.
    fn update_annotation_from_time(&mut self, time: DateTime<chrono_tz::Tz>);
}

/// Times after `now` are ignored by every command.
#[derive(Debug, Clone)]
pub struct AnnotationController {
    interval: TimeInterval,
    clip_duration: Duration,
    annotation: Annotation,
    now: fn() -> DateTime<Utc>,
}

impl AnnotationController {
    pub fn new(interval: TimeInterval, clip_duration: Duration) -> Self {
        Self::with_now(interval, clip_duration, Utc::now)
    }

    pub fn with_now(
        interval: TimeInterval,
        clip_duration: Duration,
        now: fn() -> DateTime<Utc>,
    ) -> Self {
        Self {
            interval,
            clip_duration: clip_duration.max(Duration::zero()),
            annotation: Annotation::default(),
            now,
        }
    }

    pub fn annotation(&self) -> Annotation {
        self.annotation
    }

    pub fn clip_duration(&self) -> Duration {
        self.clip_duration
    }

    /// Switch to another day. The old annotation does not carry over.
    pub fn set_interval(&mut self, interval: TimeInterval) {
        if interval != self.interval {
            self.interval = interval;
            self.reset_annotation();
        }
    }

    fn ratio<Z: TimeZone>(&self, time: &DateTime<Z>) -> f64 {
        day_ratio_from_time(time, &self.interval.time_start)
    }

    fn is_future(&self, time: &DateTime<chrono_tz::Tz>) -> bool {
        let future = time.with_timezone(&Utc) > (self.now)();
        if future {
            tracing::debug!(%time, "ignoring annotation in the future");
        }
        future
    }
}

impl AnnotationHandle for AnnotationController {
    fn reset_annotation(&mut self) {
        self.annotation = Annotation::default();
    }

    fn set_annotation_from_time(&mut self, time: DateTime<chrono_tz::Tz>) {
        if self.is_future(&time) {
            return;
        }
        let clip_end = time
            .checked_add_signed(self.clip_duration)
            .unwrap_or(self.interval.time_end);
        let offset_start = self.ratio(&time);
        let offset_end = self.ratio(&clip_end);
        self.annotation = Annotation {
            visible: true,
            offset_start,
            offset_end,
            offset_current: offset_start,
        };
    }

    fn update_annotation_from_time(&mut self, time: DateTime<chrono_tz::Tz>) {
        if self.is_future(&time) {
            return;
        }
        self.annotation.offset_current = self.ratio(&time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn controller() -> AnnotationController {
        let interval =
            TimeInterval::for_day(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(), chrono_tz::UTC)
                .unwrap();
        AnnotationController::new(interval, Duration::minutes(36))
    }

    fn at(hour: u32, minute: u32) -> DateTime<chrono_tz::Tz> {
        chrono_tz::UTC
            .with_ymd_and_hms(2024, 6, 12, hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn test_set_places_fixed_length_range() {
        let mut annotations = controller();
        annotations.set_annotation_from_time(at(12, 0));
        let annotation = annotations.annotation();
        assert!(annotation.visible);
        assert!((annotation.offset_start - 0.5).abs() < 1e-12);
        assert!((annotation.offset_end - 0.525).abs() < 1e-12);
        assert_eq!(annotation.offset_current, annotation.offset_start);
    }

    #[test]
    fn test_update_moves_only_current() {
        let mut annotations = controller();
        annotations.set_annotation_from_time(at(12, 0));
        annotations.update_annotation_from_time(at(12, 18));
        let annotation = annotations.annotation();
        assert!((annotation.offset_start - 0.5).abs() < 1e-12);
        assert!((annotation.offset_end - 0.525).abs() < 1e-12);
        assert!((annotation.offset_current - 0.5125).abs() < 1e-12);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut annotations = controller();
        annotations.set_annotation_from_time(at(8, 0));
        annotations.reset_annotation();
        let once = annotations.annotation();
        annotations.reset_annotation();
        assert_eq!(annotations.annotation(), once);
        assert_eq!(once, Annotation::default());
        assert!(!once.visible);
    }

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_future_times_are_ignored() {
        let interval =
            TimeInterval::for_day(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(), chrono_tz::UTC)
                .unwrap();
        let mut annotations = AnnotationController::with_now(interval, Duration::minutes(36), noon);

        annotations.set_annotation_from_time(at(12, 30));
        assert_eq!(annotations.annotation(), Annotation::default());

        annotations.set_annotation_from_time(at(11, 0));
        let placed = annotations.annotation();
        assert!(placed.visible);
        annotations.update_annotation_from_time(at(12, 1));
        assert_eq!(annotations.annotation(), placed);
        annotations.update_annotation_from_time(at(12, 0));
        assert!((annotations.annotation().offset_current - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_oversized_clip_ends_at_day_end() {
        let interval =
            TimeInterval::for_day(NaiveDate::from_ymd_opt(2024, 6, 12).unwrap(), chrono_tz::UTC)
                .unwrap();
        let mut annotations =
            AnnotationController::new(interval, Duration::days(1_000_000_000));
        annotations.set_annotation_from_time(at(6, 0));
        assert_eq!(annotations.annotation().offset_end, 1.0);

        let mut annotations = AnnotationController::new(interval, Duration::minutes(-30));
        assert_eq!(annotations.clip_duration(), Duration::zero());
        annotations.set_annotation_from_time(at(6, 0));
        assert_eq!(annotations.annotation().offset_end, annotations.annotation().offset_start);
    }

    #[test]
    fn test_range_near_midnight_is_clamped() {
        let mut annotations = controller();
        annotations.set_annotation_from_time(at(23, 50));
        assert_eq!(annotations.annotation().offset_end, 1.0);
    }
}
