use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::error::TimelineError;

/// Longest DST gap we step over when local midnight does not exist.
const MAX_MIDNIGHT_GAP_MINUTES: i64 = 180;

/// The wall-clock span rendered by one timeline, normally a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInterval {
    /// Inclusive start of the span
    pub time_start: DateTime<Tz>,
    /// Inclusive end of the span
    pub time_end: DateTime<Tz>,
}

impl TimeInterval {
    /// Create an interval, rejecting a start that lies after the end.
    pub fn new(time_start: DateTime<Tz>, time_end: DateTime<Tz>) -> Result<Self, TimelineError> {
        if time_start > time_end {
            return Err(TimelineError::InvalidInterval {
                start: time_start.to_rfc3339(),
                end: time_end.to_rfc3339(),
            });
        }
        Ok(Self { time_start, time_end })
    }

    /// The interval covering `date` from local midnight to the next local midnight.
    /// DST days come out 23 or 25 hours long.
    pub fn for_day(date: NaiveDate, tz: Tz) -> Result<Self, TimelineError> {
        let next = date
            .succ_opt()
            .ok_or(TimelineError::AmbiguousMidnight { date })?;
        let time_start = local_midnight(date, tz)?;
        let time_end = local_midnight(next, tz)?;
        Self::new(time_start, time_end)
    }

    pub fn duration(&self) -> Duration {
        self.time_end.signed_duration_since(self.time_start)
    }

    pub fn timezone(&self) -> Tz {
        self.time_start.timezone()
    }

    pub fn contains<Z: TimeZone>(&self, time: &DateTime<Z>) -> bool {
        let time = time.with_timezone(&self.timezone());
        self.time_start <= time && time <= self.time_end
    }

    /// Whether `now` falls on this interval's calendar day in the interval's own zone.
    pub fn is_same_day<Z: TimeZone>(&self, now: &DateTime<Z>) -> bool {
        now.with_timezone(&self.timezone()).date_naive() == self.time_start.date_naive()
    }
}

/// First valid instant of `date` in `tz`.
pub(crate) fn local_midnight(date: NaiveDate, tz: Tz) -> Result<DateTime<Tz>, TimelineError> {
    let midnight = date.and_time(NaiveTime::MIN);
    if let Some(start) = tz.from_local_datetime(&midnight).earliest() {
        return Ok(start);
    }
    // Midnight skipped by a DST transition: walk forward to the first local time that exists.
    (1..=MAX_MIDNIGHT_GAP_MINUTES / 30)
        .find_map(|step| {
            tz.from_local_datetime(&(midnight + Duration::minutes(step * 30)))
                .earliest()
        })
        .ok_or(TimelineError::AmbiguousMidnight { date })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_regular_day_is_24_hours() {
        let interval = TimeInterval::for_day(date(2024, 6, 12), chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(interval.duration(), Duration::hours(24));
    }

    #[test]
    fn test_dst_days_are_not_24_hours() {
        let spring = TimeInterval::for_day(date(2024, 3, 31), chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(spring.duration(), Duration::hours(23));
        let autumn = TimeInterval::for_day(date(2024, 10, 27), chrono_tz::Europe::Berlin).unwrap();
        assert_eq!(autumn.duration(), Duration::hours(25));
    }

    #[test]
    fn test_missing_midnight_uses_first_valid_instant() {
        // Santiago skips 00:00 -> 01:00 on the first Sunday of September.
        let interval = TimeInterval::for_day(date(2024, 9, 8), chrono_tz::America::Santiago).unwrap();
        assert_eq!(interval.time_start.time(), NaiveTime::from_hms_opt(1, 0, 0).unwrap());
        assert_eq!(interval.duration(), Duration::hours(23));
    }

    #[test]
    fn test_reversed_interval_is_rejected() {
        let tz = chrono_tz::UTC;
        let start = tz.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let end = tz.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(matches!(
            TimeInterval::new(start, end),
            Err(TimelineError::InvalidInterval { .. })
        ));
    }

    #[test]
    fn test_same_day_uses_interval_zone() {
        let interval = TimeInterval::for_day(date(2024, 6, 12), chrono_tz::Asia::Tokyo).unwrap();
        // 20:00 UTC on the 11th is already the 12th in Tokyo.
        let now = Utc.with_ymd_and_hms(2024, 6, 11, 20, 0, 0).unwrap();
        assert!(interval.is_same_day(&now));
        let later = Utc.with_ymd_and_hms(2024, 6, 12, 20, 0, 0).unwrap();
        assert!(!interval.is_same_day(&later));
        assert!(interval.contains(&now));
    }
}
