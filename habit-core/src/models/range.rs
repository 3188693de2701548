//! Time windows over completion timestamps

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::ValidationError;

/// Earliest year accepted in dates and timestamps from clients
pub const MIN_YEAR: i32 = 1970;

/// Latest year accepted in dates and timestamps from clients
pub const MAX_YEAR: i32 = 9999;

/// A client-supplied date within `MIN_YEAR..=MAX_YEAR`.
///
/// Schedule arithmetic on dates inside these years cannot leave chrono's
/// range.
pub fn calendar_date(field: &'static str, date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    if !(MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        return Err(ValidationError::Invalid {
            field,
            reason: format!("year must be between {} and {}", MIN_YEAR, MAX_YEAR),
        });
    }
    Ok(date)
}

/// Half-open window `[start, end)`; a missing bound is unbounded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

/// First instant of `date` in `tz`.
///
/// Zones that skip midnight on a DST change start the day at the first
/// existing local time.
pub fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    let resolved = match tz.from_local_datetime(&naive) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t),
        LocalResult::None => tz.from_local_datetime(&(naive + Duration::hours(1))).earliest(),
    };
    resolved.map_or_else(
        || Utc.from_utc_datetime(&naive),
        |t| t.with_timezone(&Utc),
    )
}

/// Local noon of `date`; stands in for "some time that day".
pub fn local_noon(date: NaiveDate, tz: Tz) -> DateTime<Utc> {
    local_midnight(date, tz) + Duration::hours(12)
}

impl TimeRange {
    pub fn all() -> Self {
        Self::default()
    }

    /// Local calendar days `from..=to` in `tz`.
    pub fn local_days(from: NaiveDate, to: NaiveDate, tz: Tz) -> Self {
        Self {
            start: Some(local_midnight(from, tz)),
            end: to.succ_opt().map(|next| local_midnight(next, tz)),
        }
    }

    pub fn local_day(date: NaiveDate, tz: Tz) -> Self {
        Self::local_days(date, date, tz)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| at >= s) && self.end.map_or(true, |e| at < e)
    }
}
