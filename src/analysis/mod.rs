//! Metrics engine -- filtering, grouping and period comparison over
//! execution records.
//!
//! Everything in here is a pure function of its input slice. Callers hand
//! in the current snapshot of the record store on every call.

pub mod aggregator;
pub mod comparison;
pub mod executive;
pub mod filter;
pub mod summary;
pub mod timeline;

use chrono::NaiveDate;
use serde::Serialize;

pub use self::aggregator::{calculate_test_metrics, sort_metrics, MetricsSortField, SortDirection};
pub use self::comparison::{
    compare_periods, compare_tests, ExecutiveKpis, KpiStatus, PercentChange, Trend,
};
pub use self::executive::{
    team_performance, ExecutiveSummary, QualityDistribution, RiskLevel, TeamPerformance,
};
pub use self::filter::{
    available_test_names, filter_by_date_range, filter_by_test_names, DateRange, RecordFilter,
};
pub use self::summary::{StatusBuckets, SummaryStats};
pub use self::timeline::{generate_timeline, TimelineStats};

/// Aggregate statistics for every record sharing a test name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestMetrics {
    pub test_name: String,
    /// Milliseconds.
    pub average_duration: f64,
    pub average_cost: f64,
    pub total_runs: u64,
    pub successful_runs: u64,
    pub failed_runs: u64,
    pub success_rate: f64,
}

/// Aggregate statistics for every record on one UTC calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelinePoint {
    pub date: NaiveDate,
    pub runs: u64,
    pub average_cost: f64,
    pub success_rate: f64,
}

/// Divide, resolving a zero denominator to 0.
pub(crate) fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
