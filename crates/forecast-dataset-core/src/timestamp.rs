//! Timestamp parsing and grid alignment.
//!
//! Every record's `start` field is parsed into a timezone-naive
//! [`Timestamp`] and aligned to the grid of the dataset's [`Frequency`]:
//!
//! - Anchored frequencies (`M`, `MS`, `W-<DAY>`) drop the time of day and
//!   roll *back* to the most recent anchor. A date already on the anchor is
//!   kept as-is.
//! - Business-day frequencies are left untouched; flooring is not defined on
//!   a business-day grid.
//! - Fixed-width frequencies (`S`, `T`, `H`, `D` and multiples) are floored to
//!   the period boundary, counting periods from the Unix epoch.
//!
//! Timestamps carrying a timezone (`Z` or an explicit offset) are rejected.
//!
//! The same start strings recur across a dataset, so
//! [`TimestampNormalizer`] memoizes parse results per `(string, frequency)`
//! pair in a bounded LRU cache.

use std::{
    fmt,
    num::NonZeroUsize,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};

use chrono::{
    DateTime, Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday,
};
use lru::LruCache;
use snafu::prelude::*;

use crate::frequency::{Frequency, FrequencyUnit};

/// Default number of `(string, frequency)` pairs kept by a normalizer.
pub const DEFAULT_CACHE_CAPACITY: usize = 10_000;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Errors produced while turning a raw value into a [`Timestamp`].
#[derive(Debug, Clone, Snafu, PartialEq, Eq)]
pub enum TimestampError {
    /// The input is not a recognized date or date-time.
    #[snafu(display("could not parse '{input}' as a timestamp"))]
    Unparseable {
        /// The raw input.
        input: String,
    },

    /// The input carries a timezone designator or UTC offset.
    #[snafu(display("'{input}' carries timezone information"))]
    TimezoneNotSupported {
        /// The raw input.
        input: String,
    },

    /// Aligning the timestamp to the frequency grid left the supported range.
    #[snafu(display("timestamp {datetime} cannot be aligned to frequency {freq}"))]
    OutOfRange {
        /// The parsed timestamp before alignment.
        datetime: NaiveDateTime,
        /// The frequency it was aligned to.
        freq: Frequency,
    },

    /// The raw value is neither a string nor an existing timestamp.
    #[snafu(display("expected a timestamp string, found {found}"))]
    UnsupportedType {
        /// Short description of the value that was found.
        found: String,
    },
}

/// A timezone-naive timestamp aligned to a frequency grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    datetime: NaiveDateTime,
    freq: Frequency,
}

impl Timestamp {
    /// The aligned date-time.
    pub fn datetime(&self) -> NaiveDateTime {
        self.datetime
    }

    /// The frequency this timestamp was aligned to.
    pub fn freq(&self) -> Frequency {
        self.freq
    }
}

impl fmt::Display for Timestamp {
    /// Renders `YYYY-MM-DD HH:MM:SS`, with fractional seconds only when they
    /// are non-zero. The output parses back to the same timestamp.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.datetime.nanosecond() == 0 {
            write!(f, "{}", self.datetime.format("%Y-%m-%d %H:%M:%S"))
        } else {
            write!(f, "{}", self.datetime.format("%Y-%m-%d %H:%M:%S%.f"))
        }
    }
}

/// Parses and aligns timestamps, memoizing results in a bounded LRU cache.
///
/// The cache sits behind a mutex, so one normalizer can be shared across
/// datasets and threads. Only successful parses are cached.
#[derive(Debug)]
pub struct TimestampNormalizer {
    cache: Mutex<LruCache<(String, Frequency), NaiveDateTime>>,
}

impl Default for TimestampNormalizer {
    fn default() -> Self {
        TimestampNormalizer::new()
    }
}

impl TimestampNormalizer {
    /// Create a normalizer with [`DEFAULT_CACHE_CAPACITY`].
    pub fn new() -> Self {
        TimestampNormalizer::with_capacity(
            NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
        )
    }

    /// Create a normalizer that keeps at most `capacity` cached results.
    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        TimestampNormalizer {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Process-wide normalizer used by record processors unless another one
    /// is injected.
    pub fn global() -> Arc<TimestampNormalizer> {
        static GLOBAL: OnceLock<Arc<TimestampNormalizer>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(TimestampNormalizer::new()))
            .clone()
    }

    /// Number of results currently cached.
    pub fn cached_len(&self) -> usize {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Parse `raw` and align it to `freq`.
    pub fn normalize(&self, raw: &str, freq: Frequency) -> Result<Timestamp, TimestampError> {
        let key = (raw.to_owned(), freq);
        if let Some(datetime) = self
            .cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Timestamp {
                datetime: *datetime,
                freq,
            });
        }

        let parsed = parse_naive(raw)?;
        let aligned = align(parsed, freq)?;

        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .put(key, aligned.datetime);

        Ok(aligned)
    }

    /// Align an already parsed date-time to `freq`, bypassing the cache.
    pub fn realign(
        &self,
        datetime: NaiveDateTime,
        freq: Frequency,
    ) -> Result<Timestamp, TimestampError> {
        align(datetime, freq)
    }
}

/// Parse a raw timestamp string without timezone information.
pub(crate) fn parse_naive(raw: &str) -> Result<NaiveDateTime, TimestampError> {
    let input = raw.trim();

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(dt);
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, fmt) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }
    // `YYYY-MM` means the first of the month.
    if input.len() == 7 {
        if let Ok(date) = NaiveDate::parse_from_str(&format!("{input}-01"), "%Y-%m-%d") {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }

    if has_timezone(input) {
        return TimezoneNotSupportedSnafu { input: raw }.fail();
    }
    UnparseableSnafu { input: raw }.fail()
}

/// Whether `input` is a valid date-time apart from a trailing `Z` or UTC
/// offset.
fn has_timezone(input: &str) -> bool {
    if DateTime::parse_from_rfc3339(input).is_ok() {
        return true;
    }

    // Offsets can only appear after the `YYYY-MM-DD?` date part.
    let Some(time_part) = input.get(11..) else {
        return false;
    };
    let Some(offset_at) = time_part.find(['Z', 'z', '+', '-']) else {
        return false;
    };
    let naive_part = &input[..11 + offset_at];
    NAIVE_DATETIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(naive_part.trim_end(), fmt).is_ok())
}

fn align(datetime: NaiveDateTime, freq: Frequency) -> Result<Timestamp, TimestampError> {
    let at_midnight = |date: NaiveDate| date.and_time(NaiveTime::MIN);
    let on_grid = match freq.unit() {
        FrequencyUnit::MonthEnd => rollback_month_end(datetime.date()).map(at_midnight),
        FrequencyUnit::MonthStart => datetime.date().with_day(1).map(at_midnight),
        FrequencyUnit::Week(anchor) => rollback_weekday(datetime.date(), anchor).map(at_midnight),
        FrequencyUnit::BusinessDay => Some(datetime),
        _ => floor_fixed(datetime, freq),
    };

    let on_grid = on_grid.context(OutOfRangeSnafu { datetime, freq })?;
    Ok(Timestamp {
        datetime: on_grid,
        freq,
    })
}

fn rollback_weekday(date: NaiveDate, anchor: Weekday) -> Option<NaiveDate> {
    let back = (7 + date.weekday().num_days_from_monday() - anchor.num_days_from_monday()) % 7;
    date.checked_sub_days(Days::new(u64::from(back)))
}

/// Last day of the month containing `date` if `date` is that day, otherwise
/// the last day of the previous month.
fn rollback_month_end(date: NaiveDate) -> Option<NaiveDate> {
    let is_month_end = date.succ_opt().is_none_or(|next| next.month() != date.month());
    if is_month_end {
        Some(date)
    } else {
        date.with_day(1)?.pred_opt()
    }
}

fn floor_fixed(datetime: NaiveDateTime, freq: Frequency) -> Option<NaiveDateTime> {
    let step = freq.fixed_seconds()?;
    let secs = datetime.and_utc().timestamp();
    let floored = secs.div_euclid(step) * step;
    DateTime::from_timestamp(floored, 0).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .expect("valid date-time")
    }

    fn freq(s: &str) -> Frequency {
        s.parse().expect("valid frequency")
    }

    #[test]
    fn daily_keeps_date_and_zeroes_time() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2014-09-07", freq("D")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 7, 0, 0, 0));
        assert_eq!(ts.freq(), freq("D"));
    }

    #[test]
    fn daily_floors_time_of_day() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2014-09-07T05:00:00", freq("D")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 7, 0, 0, 0));

        let ts = n.normalize("2014-09-07 23:59:59.999", freq("D")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 7, 0, 0, 0));
    }

    #[test]
    fn fixed_multiples_floor_from_epoch() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2020-01-01 10:07:30", freq("5min")).unwrap();
        assert_eq!(ts.datetime(), dt(2020, 1, 1, 10, 5, 0));

        let ts = n.normalize("2020-01-01 10:07:30", freq("H")).unwrap();
        assert_eq!(ts.datetime(), dt(2020, 1, 1, 10, 0, 0));

        let ts = n.normalize("2020-01-01 10:07:30.25", freq("S")).unwrap();
        assert_eq!(ts.datetime(), dt(2020, 1, 1, 10, 7, 30));
    }

    #[test]
    fn month_end_rolls_back() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2015-03-15 13:00:00", freq("M")).unwrap();
        assert_eq!(ts.datetime(), dt(2015, 2, 28, 0, 0, 0));

        // Already on a month end: only the time of day is dropped.
        let ts = n.normalize("2016-02-29 08:30:00", freq("M")).unwrap();
        assert_eq!(ts.datetime(), dt(2016, 2, 29, 0, 0, 0));
    }

    #[test]
    fn month_start_rolls_back_to_first() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2015-03-15 13:00:00", freq("MS")).unwrap();
        assert_eq!(ts.datetime(), dt(2015, 3, 1, 0, 0, 0));
    }

    #[test]
    fn weekly_rolls_back_to_anchor() {
        let n = TimestampNormalizer::new();
        // 2014-09-10 is a Wednesday.
        let ts = n.normalize("2014-09-10 12:00:00", freq("W")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 7, 0, 0, 0));
        assert_eq!(ts.datetime().weekday(), Weekday::Sun);

        let ts = n.normalize("2014-09-10", freq("W-MON")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 8, 0, 0, 0));

        // 2014-09-07 is a Sunday and stays put.
        let ts = n.normalize("2014-09-07 17:45", freq("W-SUN")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 7, 0, 0, 0));
    }

    #[test]
    fn business_day_is_left_untouched() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2014-09-06 05:30:00", freq("B")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 6, 5, 30, 0));
    }

    #[test]
    fn anchored_results_have_no_time_of_day() {
        let n = TimestampNormalizer::new();
        for f in ["M", "W-SUN", "W", "2M"] {
            for raw in ["2019-07-04 18:22:01", "2019-12-31 23:59:59", "2020-02-29"] {
                let ts = n.normalize(raw, freq(f)).unwrap();
                assert_eq!(ts.datetime().time(), NaiveTime::MIN, "{raw} @ {f}");
            }
        }
    }

    #[test]
    fn normalize_is_idempotent() {
        let n = TimestampNormalizer::new();
        let inputs = [
            "2014-09-07",
            "2014-09-07T05:13:00",
            "2019-07-04 18:22:01.5",
            "2020-02-29 23:00",
            "1969-12-31 23:59:59",
        ];
        for f in ["S", "T", "15min", "H", "D", "3D", "B", "W", "W-WED", "M", "MS"] {
            for raw in inputs {
                let once = n.normalize(raw, freq(f)).unwrap();
                let twice = n.normalize(&once.to_string(), freq(f)).unwrap();
                assert_eq!(once, twice, "{raw} @ {f}");
                let realigned = n.realign(once.datetime(), freq(f)).unwrap();
                assert_eq!(once, realigned, "{raw} @ {f}");
            }
        }
    }

    #[test]
    fn rejects_timezones() {
        let n = TimestampNormalizer::new();
        for raw in [
            "2014-09-07T05:00:00Z",
            "2014-09-07T05:00:00+02:00",
            "2014-09-07 05:00:00-0500",
            "2014-09-07 05:00+01:00",
        ] {
            for f in ["D", "M", "B", "H"] {
                let err = n.normalize(raw, freq(f)).unwrap_err();
                assert!(
                    matches!(err, TimestampError::TimezoneNotSupported { .. }),
                    "{raw} @ {f}: {err}"
                );
            }
        }
    }

    #[test]
    fn rejects_garbage() {
        let n = TimestampNormalizer::new();
        let err = n.normalize("not a date", freq("D")).unwrap_err();
        assert!(matches!(err, TimestampError::Unparseable { .. }));

        let err = n.normalize("2014-13-40", freq("D")).unwrap_err();
        assert!(matches!(err, TimestampError::Unparseable { .. }));
    }

    #[test]
    fn accepts_year_month() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2014-09", freq("D")).unwrap();
        assert_eq!(ts.datetime(), dt(2014, 9, 1, 0, 0, 0));
    }

    #[test]
    fn display_round_trips_fractional_seconds() {
        let n = TimestampNormalizer::new();
        let ts = n.normalize("2014-09-07 05:00:00.250", freq("B")).unwrap();
        assert_eq!(ts.to_string(), "2014-09-07 05:00:00.250");
        assert_eq!(n.normalize(&ts.to_string(), freq("B")).unwrap(), ts);

        let ts = n.normalize("2014-09-07", freq("D")).unwrap();
        assert_eq!(ts.to_string(), "2014-09-07 00:00:00");
    }

    #[test]
    fn cache_is_bounded() {
        let n = TimestampNormalizer::with_capacity(NonZeroUsize::new(2).unwrap());
        n.normalize("2014-09-01", freq("D")).unwrap();
        n.normalize("2014-09-02", freq("D")).unwrap();
        n.normalize("2014-09-03", freq("D")).unwrap();
        assert_eq!(n.cached_len(), 2);

        // Same string under another frequency is a distinct entry.
        let d = n.normalize("2014-09-10", freq("D")).unwrap();
        let w = n.normalize("2014-09-10", freq("W")).unwrap();
        assert_ne!(d.datetime(), w.datetime());
    }

    #[test]
    fn failures_are_not_cached() {
        let n = TimestampNormalizer::new();
        assert!(n.normalize("nope", freq("D")).is_err());
        assert_eq!(n.cached_len(), 0);
    }
}
