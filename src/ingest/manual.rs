use serde::{Deserialize, Serialize};

use super::{
    parse_cost, parse_duration_secs, parse_start_time, parse_success_pct, parse_test_name,
    IngestError,
};
use crate::record::NewRecord;

/// Raw values from the "add test execution" form.
///
/// Duration is in seconds, success rate in percent, cost in currency units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualEntry {
    pub test_name: String,
    pub start_time: String,
    pub duration_secs: String,
    pub success_rate_pct: String,
    pub cost: String,
}

impl ManualEntry {
    /// Validate every field and convert. Any failure rejects the entry,
    /// with all failing fields reported together.
    pub fn into_new_record(self) -> Result<NewRecord, IngestError> {
        let mut errors = Vec::new();

        let test_name = parse_test_name("test_name", &self.test_name)
            .map_err(|e| errors.push(e))
            .ok();
        let start_time = parse_start_time("start_time", &self.start_time)
            .map_err(|e| errors.push(e))
            .ok();
        let duration_ms = parse_duration_secs("duration_secs", &self.duration_secs)
            .map_err(|e| errors.push(e))
            .ok();
        let success_rate = parse_success_pct("success_rate_pct", &self.success_rate_pct)
            .map_err(|e| errors.push(e))
            .ok();
        let cost = parse_cost("cost", &self.cost).map_err(|e| errors.push(e)).ok();

        match (test_name, start_time, duration_ms, success_rate, cost) {
            (Some(test_name), Some(start_time), Some(duration_ms), Some(success_rate), Some(cost))
                if errors.is_empty() =>
            {
                Ok(NewRecord {
                    test_name,
                    start_time,
                    duration_ms,
                    success_rate,
                    cost,
                    validation: true,
                })
            }
            _ => Err(IngestError::InvalidEntry(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> ManualEntry {
        ManualEntry {
            test_name: "user-authentication-test".to_string(),
            start_time: "2024-04-10".to_string(),
            duration_secs: "3.5".to_string(),
            success_rate_pct: "95.5".to_string(),
            cost: "0.0250".to_string(),
        }
    }

    #[test]
    fn test_converts_units() {
        let record = entry().into_new_record().unwrap();
        assert_eq!(record.test_name, "user-authentication-test");
        assert_eq!(record.start_time.to_rfc3339(), "2024-04-10T00:00:00+00:00");
        assert_eq!(record.duration_ms, 3500);
        assert!((record.success_rate - 0.955).abs() < 1e-12);
        assert_eq!(record.cost, 0.025);
        assert!(record.validation);
    }

    #[test]
    fn test_reports_every_bad_field() {
        let bad = ManualEntry {
            test_name: " ".to_string(),
            start_time: "not-a-date".to_string(),
            duration_secs: "-2".to_string(),
            success_rate_pct: "101".to_string(),
            cost: "free".to_string(),
        };
        match bad.into_new_record() {
            Err(IngestError::InvalidEntry(errors)) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
                assert_eq!(
                    fields,
                    vec!["test_name", "start_time", "duration_secs", "success_rate_pct", "cost"]
                );
            }
            other => panic!("expected InvalidEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_duration_is_a_field_error() {
        let mut e = entry();
        e.duration_secs = "1e16".to_string();
        match e.into_new_record() {
            Err(IngestError::InvalidEntry(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "duration_secs");
            }
            other => panic!("expected InvalidEntry, got {:?}", other),
        }
    }

    #[test]
    fn test_single_bad_field_rejects_entry() {
        let mut e = entry();
        e.cost = "-1".to_string();
        assert!(matches!(e.into_new_record(), Err(IngestError::InvalidEntry(v)) if v.len() == 1));
    }
}
