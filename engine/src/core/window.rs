//! Time-window bucketing for earnings aggregation
//!
//! Chart series and rolling sums group events into fixed calendar buckets.
//! Bucketing is a pure function of the event timestamp, so aggregation stays
//! order-independent regardless of how events arrive.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Granularity of a chart series bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Granularity {
    /// One bucket per calendar day
    Day,

    /// One bucket per ISO week (starting Monday)
    Week,

    /// One bucket per calendar month
    Month,
}

/// Start of the bucket containing `at`, at UTC midnight
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc};
/// use earnings_engine_core_rs::core::window::{bucket_start, Granularity};
///
/// // 2026-03-18 is a Wednesday
/// let at = Utc.with_ymd_and_hms(2026, 3, 18, 15, 30, 0).unwrap();
///
/// let day = bucket_start(Granularity::Day, at);
/// assert_eq!(day, Utc.with_ymd_and_hms(2026, 3, 18, 0, 0, 0).unwrap());
///
/// let week = bucket_start(Granularity::Week, at);
/// assert_eq!(week, Utc.with_ymd_and_hms(2026, 3, 16, 0, 0, 0).unwrap());
///
/// let month = bucket_start(Granularity::Month, at);
/// assert_eq!(month, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap());
/// ```
pub fn bucket_start(granularity: Granularity, at: DateTime<Utc>) -> DateTime<Utc> {
    let day = at.date_naive();
    let start = match granularity {
        Granularity::Day => day,
        Granularity::Week => day - Duration::days(i64::from(day.weekday().num_days_from_monday())),
        Granularity::Month => day.with_day(1).unwrap_or(day),
    };
    Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN))
}

/// Key identifying a calendar month, used for monthly loyalty caps
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Month containing the given instant
    pub fn of(at: DateTime<Utc>) -> Self {
        Self {
            year: at.year(),
            month: at.month(),
        }
    }
}
