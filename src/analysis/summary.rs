//! Dashboard rollups over a metrics table.

use serde::Serialize;

use crate::analysis::comparison::PeriodTotals;
use crate::analysis::TestMetrics;

/// Headline figures for the selected window.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_runs: u64,
    pub total_cost: f64,
    pub average_cost: f64,
    pub overall_success_rate: f64,
    pub total_successful: u64,
    pub total_failed: u64,
    pub unique_tests: usize,
}

impl SummaryStats {
    pub fn from_metrics(metrics: &[TestMetrics]) -> Self {
        let totals = PeriodTotals::from_metrics(metrics);
        Self {
            total_runs: totals.total_runs,
            total_cost: totals.total_cost,
            average_cost: totals.average_cost(),
            overall_success_rate: totals.success_rate(),
            total_successful: totals.successful_runs,
            total_failed: totals.failed_runs,
            unique_tests: metrics.len(),
        }
    }
}

pub const WORKING_WELL_RATE: f64 = 0.95;
pub const NEEDS_ATTENTION_RATE: f64 = 0.80;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBucket {
    pub tests: Vec<String>,
    pub total_runs: u64,
}

impl StatusBucket {
    fn add(&mut self, metrics: &TestMetrics) {
        self.tests.push(metrics.test_name.clone());
        self.total_runs += metrics.total_runs;
    }
}

/// Tests grouped by health: >= 95% working well, 80-95% needs attention,
/// below 80% at risk.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusBuckets {
    pub working_well: StatusBucket,
    pub needs_attention: StatusBucket,
    pub at_risk: StatusBucket,
}

impl StatusBuckets {
    pub fn from_metrics(metrics: &[TestMetrics]) -> Self {
        let mut buckets = Self::default();
        for m in metrics {
            if m.success_rate >= WORKING_WELL_RATE {
                buckets.working_well.add(m);
            } else if m.success_rate >= NEEDS_ATTENTION_RATE {
                buckets.needs_attention.add(m);
            } else {
                buckets.at_risk.add(m);
            }
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::calculate_test_metrics;
    use crate::analysis::fixtures::sample;

    #[test]
    fn test_summary_of_sample() {
        let summary = SummaryStats::from_metrics(&calculate_test_metrics(&sample()));
        assert_eq!(summary.total_runs, 6);
        assert_eq!(summary.total_successful, 4);
        assert_eq!(summary.total_failed, 2);
        assert_eq!(summary.unique_tests, 3);
        assert!((summary.total_cost - 1.65).abs() < 1e-9);
        assert!((summary.average_cost - 0.275).abs() < 1e-9);
        assert!((summary.overall_success_rate - 4.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_summary_of_nothing_is_zero() {
        assert_eq!(SummaryStats::from_metrics(&[]), SummaryStats::default());
    }

    #[test]
    fn test_status_buckets() {
        let buckets = StatusBuckets::from_metrics(&calculate_test_metrics(&sample()));
        assert_eq!(buckets.working_well.tests, vec!["search"]);
        assert_eq!(buckets.working_well.total_runs, 1);
        assert!(buckets.needs_attention.tests.is_empty());
        assert_eq!(buckets.at_risk.tests, vec!["login", "checkout"]);
        assert_eq!(buckets.at_risk.total_runs, 5);
    }
}
