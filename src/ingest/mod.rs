//! Ingestion boundary -- manual form entry and delimited-text import/export.
//!
//! This is the only layer that validates user input. Everything past it
//! deals in well-formed [`NewRecord`](crate::record::NewRecord)s.

pub mod csv;
pub mod manual;

use serde::Serialize;
use thiserror::Error;

use crate::analysis::filter::{parse_timestamp, Bound};
use crate::record::MAX_DURATION_MS;
use crate::storage::StoreError;
use chrono::{DateTime, SubsecRound, Utc};

pub use self::csv::{export_csv, parse_csv, CsvParse, ImportReport, RowError};
pub use self::manual::ManualEntry;

/// A single rejected input field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid entry: {}", join_fields(.0))]
    InvalidEntry(Vec<FieldError>),
    #[error("import has no header row")]
    MissingHeader,
    #[error("import header is missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn join_fields(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub(crate) fn parse_start_time(field: &str, raw: &str) -> Result<DateTime<Utc>, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldError::new(field, "is required"));
    }
    parse_timestamp(raw, Bound::Start)
        .map(|ts| ts.trunc_subsecs(3))
        .ok_or_else(|| FieldError::new(field, format!("'{}' is not a valid date", raw)))
}

pub(crate) fn parse_number(field: &str, raw: &str) -> Result<f64, FieldError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(FieldError::new(field, "is required"));
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(FieldError::new(field, format!("'{}' is not a number", raw))),
    }
}

/// Seconds to whole milliseconds.
pub(crate) fn parse_duration_secs(field: &str, raw: &str) -> Result<u64, FieldError> {
    let secs = parse_number(field, raw)?;
    if secs < 0.0 {
        return Err(FieldError::new(field, "must not be negative"));
    }
    let ms = (secs * 1000.0).round();
    // `MAX_DURATION_MS as f64` rounds up to 2^63, so equality is already too long.
    if ms >= MAX_DURATION_MS as f64 {
        return Err(FieldError::new(field, format!("{} seconds is too long", raw.trim())));
    }
    Ok(ms as u64)
}

/// A trimmed, single-line test name.
pub(crate) fn parse_test_name(field: &str, raw: &str) -> Result<String, FieldError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(FieldError::new(field, "is required"));
    }
    if name.contains(['\n', '\r']) {
        return Err(FieldError::new(field, "must be a single line"));
    }
    Ok(name.to_string())
}

/// Percentage to a [0, 1] fraction.
pub(crate) fn parse_success_pct(field: &str, raw: &str) -> Result<f64, FieldError> {
    let fraction = parse_number(field, raw)? / 100.0;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(FieldError::new(field, "must be between 0 and 100"));
    }
    Ok(fraction)
}

pub(crate) fn parse_cost(field: &str, raw: &str) -> Result<f64, FieldError> {
    let cost = parse_number(field, raw)?;
    if cost < 0.0 {
        return Err(FieldError::new(field, "must not be negative"));
    }
    Ok(cost)
}
