//! Comma-separated import and export.
//!
//! Format: a header row naming at least `testname, starttime, duration,
//! successrate, cost` (any case, any order), optionally `validation`.
//! Fields are comma-separated; a field wrapped in double quotes may contain
//! commas, with `""` standing for a literal quote. Records are one line each.
//! Duration is in seconds and success rate in percent, as on the form.

use std::collections::HashMap;

use serde::Serialize;

use super::{
    parse_cost, parse_duration_secs, parse_start_time, parse_success_pct, parse_test_name,
    FieldError, IngestError,
};
use crate::record::{ExecutionRecord, NewRecord};

pub const REQUIRED_COLUMNS: [&str; 5] = ["testname", "starttime", "duration", "successrate", "cost"];
const VALIDATION_COLUMN: &str = "validation";

/// A skipped input row. `line` is 1-based, counting the header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub line: usize,
    pub reason: String,
}

/// Result of parsing an import, before anything is stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CsvParse {
    /// Valid rows with their line numbers.
    pub records: Vec<(usize, NewRecord)>,
    pub errors: Vec<RowError>,
}

/// Outcome of an import once rows have gone through the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub error_count: usize,
    pub errors: Vec<RowError>,
}

impl ImportReport {
    pub fn record_error(&mut self, line: usize, reason: impl Into<String>) {
        self.error_count += 1;
        self.errors.push(RowError {
            line,
            reason: reason.into(),
        });
    }
}

struct Columns {
    width: usize,
    index: HashMap<&'static str, usize>,
    validation: Option<usize>,
}

impl Columns {
    fn from_header(header: &str) -> Result<Self, IngestError> {
        let names: Vec<String> = split_fields(header)
            .map_err(|_| IngestError::MissingHeader)?
            .iter()
            .map(|c| c.trim().to_ascii_lowercase())
            .collect();

        let mut index = HashMap::new();
        let mut missing = Vec::new();
        for required in REQUIRED_COLUMNS {
            match names.iter().position(|n| n == required) {
                Some(pos) => {
                    index.insert(required, pos);
                }
                None => missing.push(required.to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(IngestError::MissingColumns(missing));
        }

        Ok(Self {
            width: names.len(),
            index,
            validation: names.iter().position(|n| n == VALIDATION_COLUMN),
        })
    }

    fn get<'a>(&self, fields: &'a [String], column: &str) -> &'a str {
        self.index.get(column).map(|&i| fields[i].as_str()).unwrap_or("")
    }
}

/// Split one line into fields, honouring double-quoted fields.
fn split_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut chars = line.chars().peekable();
    let mut quoted = false;
    let mut was_quoted = false;

    while let Some(c) = chars.next() {
        match (quoted, c) {
            (true, '"') if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            (true, '"') => quoted = false,
            (true, c) => field.push(c),
            (false, '"') if field.trim().is_empty() && !was_quoted => {
                field.clear();
                quoted = true;
                was_quoted = true;
            }
            (false, '"') => return Err("unexpected quote inside a field".to_string()),
            (false, ',') => {
                fields.push(std::mem::take(&mut field));
                was_quoted = false;
            }
            (false, c) if was_quoted && !c.is_whitespace() => {
                return Err("text after closing quote".to_string());
            }
            (false, _) if was_quoted => {}
            (false, c) => field.push(c),
        }
    }
    if quoted {
        return Err("unterminated quoted field".to_string());
    }
    fields.push(field);
    Ok(fields)
}

fn quote_field(value: &str) -> String {
    if value.contains([',', '"']) || value.trim() != value {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn parse_bool(raw: &str) -> Result<bool, FieldError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(FieldError::new(VALIDATION_COLUMN, format!("'{}' is not a boolean", other))),
    }
}

fn parse_row(columns: &Columns, fields: &[String]) -> Result<NewRecord, FieldError> {
    let test_name = parse_test_name("testname", columns.get(fields, "testname"))?;
    let start_time = parse_start_time("starttime", columns.get(fields, "starttime"))?;
    let duration_ms = parse_duration_secs("duration", columns.get(fields, "duration"))?;
    let success_rate = parse_success_pct("successrate", columns.get(fields, "successrate"))?;
    let cost = parse_cost("cost", columns.get(fields, "cost"))?;
    let validation = match columns.validation {
        Some(i) => parse_bool(&fields[i])?,
        None => true,
    };
    Ok(NewRecord {
        test_name,
        start_time,
        duration_ms,
        success_rate,
        cost,
        validation,
    })
}

/// Parse an import. Bad rows are collected, never fatal; a bad header is.
pub fn parse_csv(text: &str) -> Result<CsvParse, IngestError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(IngestError::MissingHeader)?;
    let columns = Columns::from_header(header)?;

    let mut parsed = CsvParse::default();
    for (line, row) in lines {
        let fields = match split_fields(row) {
            Ok(fields) => fields,
            Err(reason) => {
                parsed.errors.push(RowError { line, reason });
                continue;
            }
        };
        if fields.len() != columns.width {
            parsed.errors.push(RowError {
                line,
                reason: format!("expected {} columns, found {}", columns.width, fields.len()),
            });
            continue;
        }
        match parse_row(&columns, &fields) {
            Ok(record) => parsed.records.push((line, record)),
            Err(e) => parsed.errors.push(RowError {
                line,
                reason: e.to_string(),
            }),
        }
    }
    Ok(parsed)
}

/// Write records in the import format, so an export re-imports cleanly.
pub fn export_csv(records: &[ExecutionRecord]) -> String {
    let mut out = String::from("testname,starttime,duration,successrate,cost,validation\n");
    for r in records {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            quote_field(&r.test_name),
            r.start_time.to_rfc3339(),
            r.duration_ms as f64 / 1000.0,
            r.success_rate * 100.0,
            r.cost,
            r.validation,
        ));
    }
    out
}
