//! Record filters: inclusive date range and test-name membership.
//!
//! All timestamps are UTC. A bare `YYYY-MM-DD` bound covers the whole day:
//! midnight when used as a start, 23:59:59.999 when used as an end.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::record::ExecutionRecord;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RangeError {
    #[error("invalid date or timestamp: {0:?}")]
    InvalidDate(String),
    #[error("range start {start} is after end {end}")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("a period needs both a start and an end")]
    Incomplete,
}

/// Which side of a range a bare date is resolved for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    End,
}

/// Parse an RFC 3339 timestamp, a naive `YYYY-MM-DD[ T]HH:MM:SS` (read as
/// UTC) or a bare `YYYY-MM-DD`.
pub fn parse_timestamp(input: &str, bound: Bound) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, fmt) {
            return Some(naive.and_utc());
        }
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d").ok()?;
    let naive = match bound {
        Bound::Start => date.and_hms_opt(0, 0, 0)?,
        Bound::End => date.and_hms_milli_opt(23, 59, 59, 999)?,
    };
    Some(naive.and_utc())
}

/// Inclusive date range. A missing bound disables date filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, RangeError> {
        if start > end {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self {
            start: Some(start),
            end: Some(end),
        })
    }

    /// Build a range from user-supplied strings.
    pub fn parse_bounds(start: Option<&str>, end: Option<&str>) -> Result<Self, RangeError> {
        let parse = |raw: Option<&str>, bound| -> Result<Option<DateTime<Utc>>, RangeError> {
            match raw.map(str::trim).filter(|s| !s.is_empty()) {
                None => Ok(None),
                Some(s) => parse_timestamp(s, bound)
                    .map(Some)
                    .ok_or_else(|| RangeError::InvalidDate(s.to_string())),
            }
        };
        let start = parse(start, Bound::Start)?;
        let end = parse(end, Bound::End)?;
        if let (Some(s), Some(e)) = (start, end) {
            return Self::new(s, e);
        }
        Ok(Self { start, end })
    }

    /// A fully bounded period from user strings, or `fallback` when neither
    /// bound was given.
    pub fn parse_or(
        start: Option<&str>,
        end: Option<&str>,
        fallback: DateRange,
    ) -> Result<Self, RangeError> {
        let range = Self::parse_bounds(start, end)?;
        match (range.start, range.end) {
            (None, None) => Ok(fallback),
            (Some(_), Some(_)) => Ok(range),
            _ => Err(RangeError::Incomplete),
        }
    }

    /// The `days` whole UTC days ending with today.
    pub fn last_days(now: DateTime<Utc>, days: u32) -> Self {
        let today = now.date_naive();
        let first = today - Duration::days(i64::from(days.max(1)) - 1);
        Self {
            start: Some(day_start(first)),
            end: Some(day_end(today)),
        }
    }

    /// Default reporting window: `last_days`, or everything when `days` is 0.
    pub fn recent(now: DateTime<Utc>, days: u32) -> Self {
        if days == 0 {
            Self::default()
        } else {
            Self::last_days(now, days)
        }
    }

    /// The calendar month before the one containing `now`.
    pub fn previous_month(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let last = today - Duration::days(i64::from(today.day0()) + 1);
        let first = last - Duration::days(i64::from(last.day0()));
        Self {
            start: Some(day_start(first)),
            end: Some(day_end(last)),
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

fn day_end(date: NaiveDate) -> DateTime<Utc> {
    day_start(date) + Duration::days(1) - Duration::milliseconds(1)
}

/// Records whose start time lies within `[start, end]`.
///
/// If either bound is absent the input is returned unchanged.
pub fn filter_by_date_range(
    records: &[ExecutionRecord],
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Vec<ExecutionRecord> {
    let (Some(start), Some(end)) = (start, end) else {
        return records.to_vec();
    };
    records
        .iter()
        .filter(|r| r.start_time >= start && r.start_time <= end)
        .cloned()
        .collect()
}

/// Records whose test name is in `names`. An empty selection means no
/// filtering, not "match nothing".
pub fn filter_by_test_names(records: &[ExecutionRecord], names: &[String]) -> Vec<ExecutionRecord> {
    if names.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|r| names.iter().any(|n| n == &r.test_name))
        .cloned()
        .collect()
}

/// Sorted, de-duplicated test names present in `records`.
pub fn available_test_names(records: &[ExecutionRecord]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.test_name.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// The active dashboard filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    pub range: DateRange,
    pub test_names: Vec<String>,
}

impl RecordFilter {
    pub fn new(range: DateRange, test_names: Vec<String>) -> Self {
        Self { range, test_names }
    }

    /// Split a comma-separated test list, dropping blanks.
    pub fn parse_test_list(raw: Option<&str>) -> Vec<String> {
        raw.map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
    }

    pub fn apply(&self, records: &[ExecutionRecord]) -> Vec<ExecutionRecord> {
        let in_range = filter_by_date_range(records, self.range.start, self.range.end);
        filter_by_test_names(&in_range, &self.test_names)
    }
}
