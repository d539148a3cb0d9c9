use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::constants::defaults;
use crate::errors::DataShapeError;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn now_local() -> DateTime<Tz> {
    Utc::now().with_timezone(&defaults::TZ_LOCAL)
}

/// Naive UTC-equivalent cutoff for provisional vendor data: anything
/// timestamped at or after this instant is discarded.
pub fn utc_cutoff_now() -> NaiveDateTime {
    floor_15min(Utc::now().naive_utc())
}

pub fn floor_15min(t: NaiveDateTime) -> NaiveDateTime {
    let excess = (t.minute() % 15) as i64 * 60 + t.second() as i64;
    t - Duration::seconds(excess) - Duration::nanoseconds(t.nanosecond() as i64)
}

pub fn ceil_15min(t: NaiveDateTime) -> NaiveDateTime {
    let floored = floor_15min(t);
    if floored == t {
        t
    } else {
        floored + Duration::minutes(15)
    }
}

/// Interpret a naive wall-clock time in `tz`, convert to UTC and strip the
/// timezone annotation. DST transitions make some local times ambiguous or
/// nonexistent; those surface as a data-shape violation.
pub fn localize_to_naive_utc(local: NaiveDateTime, tz: Tz) -> Result<NaiveDateTime, DataShapeError> {
    tz.from_local_datetime(&local)
        .single()
        .map(|dt| dt.naive_utc())
        .ok_or(DataShapeError::UnrepresentableLocalTime(local, tz))
}
