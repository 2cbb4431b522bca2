//! Execution records -- one observed test run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runs with a success rate strictly above this count as successful.
///
/// The field is a continuous fraction but every aggregate treats it as a
/// binary pass/fail: 0.51 is a full success, 0.49 a full failure.
pub const SUCCESS_THRESHOLD: f64 = 0.5;

/// Longest storable duration; the backing column is a signed 64-bit integer.
pub const MAX_DURATION_MS: u64 = i64::MAX as u64;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    #[error("test name must not be empty")]
    EmptyTestName,
    #[error("test name must be a single line")]
    MultilineTestName,
    #[error("duration {0} ms exceeds the storable maximum")]
    DurationTooLong(u64),
    #[error("success rate {0} is outside [0, 1]")]
    SuccessRateOutOfRange(f64),
    #[error("cost {0} must be a non-negative finite number")]
    InvalidCost(f64),
}

/// A stored test run. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub test_name: String,
    pub start_time: DateTime<Utc>,
    /// Milliseconds.
    pub duration_ms: u64,
    /// Fraction in [0, 1].
    pub success_rate: f64,
    pub cost: f64,
    /// Informational only; not used by any aggregate.
    pub validation: bool,
}

impl ExecutionRecord {
    pub fn is_successful(&self) -> bool {
        self.success_rate > SUCCESS_THRESHOLD
    }
}

/// A record candidate that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    pub test_name: String,
    pub start_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub success_rate: f64,
    pub cost: f64,
    pub validation: bool,
}

impl NewRecord {
    /// Check the record invariants. Returns the first violation found.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.test_name.trim().is_empty() {
            return Err(RecordError::EmptyTestName);
        }
        if self.test_name.contains(['\n', '\r']) {
            return Err(RecordError::MultilineTestName);
        }
        if self.duration_ms > MAX_DURATION_MS {
            return Err(RecordError::DurationTooLong(self.duration_ms));
        }
        if !self.success_rate.is_finite() || !(0.0..=1.0).contains(&self.success_rate) {
            return Err(RecordError::SuccessRateOutOfRange(self.success_rate));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(RecordError::InvalidCost(self.cost));
        }
        Ok(())
    }

    pub fn with_id(self, id: String) -> ExecutionRecord {
        ExecutionRecord {
            id,
            test_name: self.test_name,
            start_time: self.start_time,
            duration_ms: self.duration_ms,
            success_rate: self.success_rate,
            cost: self.cost,
            validation: self.validation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate() -> NewRecord {
        NewRecord {
            test_name: "send-message-test".to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            duration_ms: 1500,
            success_rate: 0.9,
            cost: 0.02,
            validation: true,
        }
    }

    #[test]
    fn test_valid_candidate_passes() {
        assert_eq!(candidate().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_empty_name() {
        let mut c = candidate();
        c.test_name = "   ".to_string();
        assert_eq!(c.validate(), Err(RecordError::EmptyTestName));
    }

    #[test]
    fn test_rejects_out_of_range_success_rate() {
        let mut c = candidate();
        c.success_rate = 1.5;
        assert!(matches!(c.validate(), Err(RecordError::SuccessRateOutOfRange(_))));
        c.success_rate = f64::NAN;
        assert!(matches!(c.validate(), Err(RecordError::SuccessRateOutOfRange(_))));
    }

    #[test]
    fn test_rejects_negative_cost() {
        let mut c = candidate();
        c.cost = -0.01;
        assert!(matches!(c.validate(), Err(RecordError::InvalidCost(_))));
    }

    #[test]
    fn test_rejects_unstorable_duration() {
        let mut c = candidate();
        c.duration_ms = MAX_DURATION_MS;
        assert_eq!(c.validate(), Ok(()));
        c.duration_ms = MAX_DURATION_MS + 1;
        assert_eq!(c.validate(), Err(RecordError::DurationTooLong(MAX_DURATION_MS + 1)));
    }

    #[test]
    fn test_rejects_multiline_name() {
        let mut c = candidate();
        c.test_name = "login\ncheckout".to_string();
        assert_eq!(c.validate(), Err(RecordError::MultilineTestName));
    }

    #[test]
    fn test_success_threshold_is_strict() {
        let mut r = candidate().with_id("x".to_string());
        r.success_rate = 0.5;
        assert!(!r.is_successful());
        r.success_rate = 0.51;
        assert!(r.is_successful());
    }
}
