use std::cmp::Ordering;
use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analysis::TestMetrics;
use crate::record::ExecutionRecord;

/// Running sums for one group of records.
#[derive(Debug, Default)]
pub(crate) struct Accumulator {
    pub runs: u64,
    pub successful: u64,
    pub duration_sum: f64,
    pub cost_sum: f64,
}

impl Accumulator {
    pub fn push(&mut self, record: &ExecutionRecord) {
        self.runs += 1;
        if record.is_successful() {
            self.successful += 1;
        }
        self.duration_sum += record.duration_ms as f64;
        self.cost_sum += record.cost;
    }
}

/// Group records by test name and compute per-test statistics.
///
/// Groups come out in first-seen order. Every emitted entry has
/// `total_runs >= 1`; an empty input yields an empty vector.
pub fn calculate_test_metrics(records: &[ExecutionRecord]) -> Vec<TestMetrics> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, Accumulator)> = Vec::new();

    for record in records {
        let slot = *index.entry(record.test_name.as_str()).or_insert_with(|| {
            groups.push((record.test_name.as_str(), Accumulator::default()));
            groups.len() - 1
        });
        groups[slot].1.push(record);
    }

    groups
        .into_iter()
        .map(|(name, acc)| {
            let total = acc.runs as f64;
            TestMetrics {
                test_name: name.to_string(),
                average_duration: acc.duration_sum / total,
                average_cost: acc.cost_sum / total,
                total_runs: acc.runs,
                successful_runs: acc.successful,
                failed_runs: acc.runs - acc.successful,
                success_rate: acc.successful as f64 / total,
            }
        })
        .collect()
}

/// Sortable columns of the metrics table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricsSortField {
    #[default]
    TestName,
    AverageDuration,
    AverageCost,
    TotalRuns,
    SuccessfulRuns,
    FailedRuns,
    SuccessRate,
}

impl FromStr for MetricsSortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "test_name" | "name" => Ok(Self::TestName),
            "average_duration" | "duration" => Ok(Self::AverageDuration),
            "average_cost" | "cost" => Ok(Self::AverageCost),
            "total_runs" | "runs" => Ok(Self::TotalRuns),
            "successful_runs" | "successful" => Ok(Self::SuccessfulRuns),
            "failed_runs" | "failed" => Ok(Self::FailedRuns),
            "success_rate" => Ok(Self::SuccessRate),
            other => Err(format!("unknown sort field '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(Self::Asc),
            "desc" | "descending" => Ok(Self::Desc),
            other => Err(format!("unknown sort direction '{}'", other)),
        }
    }
}

fn by_test_name(a: &TestMetrics, b: &TestMetrics) -> Ordering {
    a.test_name.to_lowercase().cmp(&b.test_name.to_lowercase())
}

fn by_average_duration(a: &TestMetrics, b: &TestMetrics) -> Ordering {
    a.average_duration.total_cmp(&b.average_duration)
}

fn by_average_cost(a: &TestMetrics, b: &TestMetrics) -> Ordering {
    a.average_cost.total_cmp(&b.average_cost)
}

fn by_total_runs(a: &TestMetrics, b: &TestMetrics) -> Ordering {
    a.total_runs.cmp(&b.total_runs)
}

fn by_successful_runs(a: &TestMetrics, b: &TestMetrics) -> Ordering {
    a.successful_runs.cmp(&b.successful_runs)
}

fn by_failed_runs(a: &TestMetrics, b: &TestMetrics) -> Ordering {
    a.failed_runs.cmp(&b.failed_runs)
}

fn by_success_rate(a: &TestMetrics, b: &TestMetrics) -> Ordering {
    a.success_rate.total_cmp(&b.success_rate)
}

impl MetricsSortField {
    pub fn comparator(self) -> fn(&TestMetrics, &TestMetrics) -> Ordering {
        match self {
            Self::TestName => by_test_name,
            Self::AverageDuration => by_average_duration,
            Self::AverageCost => by_average_cost,
            Self::TotalRuns => by_total_runs,
            Self::SuccessfulRuns => by_successful_runs,
            Self::FailedRuns => by_failed_runs,
            Self::SuccessRate => by_success_rate,
        }
    }
}

/// Stable in-place sort of a metrics table.
pub fn sort_metrics(metrics: &mut [TestMetrics], field: MetricsSortField, direction: SortDirection) {
    let cmp = field.comparator();
    match direction {
        SortDirection::Asc => metrics.sort_by(cmp),
        SortDirection::Desc => metrics.sort_by(|a, b| cmp(b, a)),
    }
}
