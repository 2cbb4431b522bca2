//! Period-over-period comparison of two independently filtered metric sets.

use std::collections::HashMap;

use serde::{Serialize, Serializer};

use crate::analysis::{ratio, TestMetrics};

/// Scalar rollup of a metrics table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PeriodTotals {
    pub total_runs: u64,
    pub total_cost: f64,
    /// Milliseconds.
    pub total_duration: f64,
    pub successful_runs: u64,
    pub failed_runs: u64,
}

impl PeriodTotals {
    pub fn from_metrics(metrics: &[TestMetrics]) -> Self {
        metrics.iter().fold(Self::default(), |acc, m| Self {
            total_runs: acc.total_runs + m.total_runs,
            total_cost: acc.total_cost + m.average_cost * m.total_runs as f64,
            total_duration: acc.total_duration + m.average_duration * m.total_runs as f64,
            successful_runs: acc.successful_runs + m.successful_runs,
            failed_runs: acc.failed_runs + m.failed_runs,
        })
    }

    pub fn average_cost(&self) -> f64 {
        ratio(self.total_cost, self.total_runs as f64)
    }

    pub fn average_duration(&self) -> f64 {
        ratio(self.total_duration, self.total_runs as f64)
    }

    pub fn success_rate(&self) -> f64 {
        ratio(self.successful_runs as f64, self.total_runs as f64)
    }
}

/// Relative change in percent. Undefined against a zero baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentChange {
    Value(f64),
    NotApplicable,
}

impl PercentChange {
    pub fn value(self) -> Option<f64> {
        match self {
            Self::Value(v) => Some(v),
            Self::NotApplicable => None,
        }
    }
}

impl std::fmt::Display for PercentChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{:+.1}%", v),
            Self::NotApplicable => write!(f, "N/A"),
        }
    }
}

impl Serialize for PercentChange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Value(v) => serializer.serialize_f64(*v),
            Self::NotApplicable => serializer.serialize_str("n/a"),
        }
    }
}

pub fn percent_change(current: f64, previous: f64) -> PercentChange {
    if previous == 0.0 {
        return PercentChange::NotApplicable;
    }
    let change = (current - previous) / previous * 100.0;
    if change.is_finite() {
        PercentChange::Value(change)
    } else {
        PercentChange::NotApplicable
    }
}

/// Which way a statistic should move to count as an improvement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsBetter,
    LowerIsBetter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Favorable,
    Unfavorable,
    Unchanged,
    NotApplicable,
}

pub fn classify(current: f64, previous: f64, direction: Direction) -> Trend {
    if previous == 0.0 {
        return Trend::NotApplicable;
    }
    if current == previous {
        return Trend::Unchanged;
    }
    let increased = current > previous;
    let favorable = match direction {
        Direction::HigherIsBetter => increased,
        Direction::LowerIsBetter => !increased,
    };
    if favorable {
        Trend::Favorable
    } else {
        Trend::Unfavorable
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    TotalRuns,
    AverageCost,
    AverageDuration,
    SuccessRate,
}

impl Stat {
    pub fn direction(self) -> Direction {
        match self {
            Self::TotalRuns | Self::SuccessRate => Direction::HigherIsBetter,
            Self::AverageCost | Self::AverageDuration => Direction::LowerIsBetter,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::TotalRuns => "Total Runs",
            Self::AverageCost => "Average Cost",
            Self::AverageDuration => "Average Duration",
            Self::SuccessRate => "Success Rate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatComparison {
    pub stat: Stat,
    pub direction: Direction,
    pub current: f64,
    pub previous: f64,
    pub change: PercentChange,
    pub trend: Trend,
}

impl StatComparison {
    pub fn new(stat: Stat, current: f64, previous: f64) -> Self {
        let direction = stat.direction();
        Self {
            stat,
            direction,
            current,
            previous,
            change: percent_change(current, previous),
            trend: classify(current, previous, direction),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodComparison {
    pub current: PeriodTotals,
    pub previous: PeriodTotals,
    pub stats: Vec<StatComparison>,
}

impl PeriodComparison {
    pub fn stat(&self, stat: Stat) -> Option<&StatComparison> {
        self.stats.iter().find(|s| s.stat == stat)
    }
}

/// Compare two metric tables statistic by statistic.
pub fn compare_periods(current: &[TestMetrics], previous: &[TestMetrics]) -> PeriodComparison {
    compare_totals(
        PeriodTotals::from_metrics(current),
        PeriodTotals::from_metrics(previous),
    )
}

pub fn compare_totals(current: PeriodTotals, previous: PeriodTotals) -> PeriodComparison {
    let stats = vec![
        StatComparison::new(
            Stat::TotalRuns,
            current.total_runs as f64,
            previous.total_runs as f64,
        ),
        StatComparison::new(Stat::AverageCost, current.average_cost(), previous.average_cost()),
        StatComparison::new(
            Stat::AverageDuration,
            current.average_duration(),
            previous.average_duration(),
        ),
        StatComparison::new(Stat::SuccessRate, current.success_rate(), previous.success_rate()),
    ];
    PeriodComparison {
        current,
        previous,
        stats,
    }
}

/// Cost and duration movement for a test present in both periods.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestComparison {
    pub test_name: String,
    pub cost_change: PercentChange,
    pub duration_change: PercentChange,
}

/// Per-test deltas, in the order of `current`. Tests missing from either
/// side are skipped.
pub fn compare_tests(current: &[TestMetrics], previous: &[TestMetrics]) -> Vec<TestComparison> {
    let baseline: HashMap<&str, &TestMetrics> =
        previous.iter().map(|m| (m.test_name.as_str(), m)).collect();
    current
        .iter()
        .filter_map(|cur| {
            let prev = baseline.get(cur.test_name.as_str())?;
            Some(TestComparison {
                test_name: cur.test_name.clone(),
                cost_change: percent_change(cur.average_cost, prev.average_cost),
                duration_change: percent_change(cur.average_duration, prev.average_duration),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiTrend {
    Up,
    Down,
    Stable,
}

impl KpiTrend {
    /// Moves under one percent (or point) count as stable.
    pub fn of(change: f64) -> Self {
        if change.abs() < 1.0 {
            Self::Stable
        } else if change > 0.0 {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Grade of a KPI against its excellent / good / attention thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KpiStatus {
    Excellent,
    Good,
    Attention,
    Critical,
}

impl KpiStatus {
    pub fn grade(value: f64, [excellent, good, attention]: [f64; 3]) -> Self {
        if value >= excellent {
            Self::Excellent
        } else if value >= good {
            Self::Good
        } else if value >= attention {
            Self::Attention
        } else {
            Self::Critical
        }
    }
}

pub const QUALITY_GRADES: [f64; 3] = [95.0, 85.0, 70.0];
/// Percent saved against the baseline.
pub const COST_GRADES: [f64; 3] = [15.0, 10.0, 5.0];
/// Percent faster than the baseline.
pub const PERFORMANCE_GRADES: [f64; 3] = [10.0, 5.0, 0.0];
/// Distinct tests exercised.
pub const COVERAGE_GRADES: [f64; 3] = [8.0, 6.0, 4.0];

/// Executive summary figures. Improvement-style changes are positive when
/// things got better (cheaper, faster).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveKpis {
    /// Success percentage, 0-100.
    pub quality_score: f64,
    /// Percentage-point change in quality score.
    pub quality_change: f64,
    pub cost_efficiency: f64,
    pub performance_change: f64,
    pub test_coverage: usize,
    pub coverage_change: f64,
    pub total_cost: f64,
    pub average_duration: f64,
    pub quality_trend: KpiTrend,
    pub cost_trend: KpiTrend,
    pub performance_trend: KpiTrend,
    pub coverage_trend: KpiTrend,
    pub quality_status: KpiStatus,
    pub cost_status: KpiStatus,
    pub performance_status: KpiStatus,
    pub coverage_status: KpiStatus,
}

impl ExecutiveKpis {
    pub fn compute(current: &[TestMetrics], previous: &[TestMetrics]) -> Self {
        let cur = PeriodTotals::from_metrics(current);
        let prev = PeriodTotals::from_metrics(previous);

        let quality_score = cur.success_rate() * 100.0;
        let previous_quality = prev.success_rate() * 100.0;
        let quality_change = if previous_quality > 0.0 {
            quality_score - previous_quality
        } else {
            0.0
        };

        let improvement = |now: f64, before: f64| {
            if before > 0.0 {
                (before - now) / before * 100.0
            } else {
                0.0
            }
        };
        let cost_efficiency = improvement(cur.average_cost(), prev.average_cost());
        let performance_change = improvement(cur.average_duration(), prev.average_duration());

        let coverage_change = if previous.is_empty() {
            0.0
        } else {
            (current.len() as f64 - previous.len() as f64) / previous.len() as f64 * 100.0
        };

        Self {
            quality_score,
            quality_change,
            cost_efficiency,
            performance_change,
            test_coverage: current.len(),
            coverage_change,
            total_cost: cur.total_cost,
            average_duration: cur.average_duration(),
            quality_trend: KpiTrend::of(quality_change),
            cost_trend: KpiTrend::of(cost_efficiency),
            performance_trend: KpiTrend::of(performance_change),
            coverage_trend: KpiTrend::of(coverage_change),
            quality_status: KpiStatus::grade(quality_score, QUALITY_GRADES),
            cost_status: KpiStatus::grade(cost_efficiency, COST_GRADES),
            performance_status: KpiStatus::grade(performance_change, PERFORMANCE_GRADES),
            coverage_status: KpiStatus::grade(current.len() as f64, COVERAGE_GRADES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::calculate_test_metrics;
    use crate::analysis::fixtures::sample;

    fn metrics(name: &str, runs: u64, successful: u64, avg_cost: f64, avg_duration: f64) -> TestMetrics {
        TestMetrics {
            test_name: name.to_string(),
            average_duration: avg_duration,
            average_cost: avg_cost,
            total_runs: runs,
            successful_runs: successful,
            failed_runs: runs - successful,
            success_rate: successful as f64 / runs as f64,
        }
    }

    #[test]
    fn test_halved_cost_is_favorable() {
        let current = PeriodTotals {
            total_runs: 100,
            total_cost: 5.0,
            ..Default::default()
        };
        let previous = PeriodTotals {
            total_runs: 100,
            total_cost: 10.0,
            ..Default::default()
        };
        let cmp = compare_totals(current, previous);
        let cost = cmp.stat(Stat::AverageCost).unwrap();
        assert!((cost.change.value().unwrap() + 50.0).abs() < 1e-9);
        assert_eq!(cost.trend, Trend::Favorable);
    }

    #[test]
    fn test_equal_periods_are_zero_change() {
        let m = calculate_test_metrics(&sample());
        let cmp = compare_periods(&m, &m);
        for stat in &cmp.stats {
            assert_eq!(stat.change, PercentChange::Value(0.0), "{:?}", stat.stat);
            assert_eq!(stat.trend, Trend::Unchanged);
        }
    }

    #[test]
    fn test_zero_baseline_is_not_applicable() {
        let m = calculate_test_metrics(&sample());
        let cmp = compare_periods(&m, &[]);
        for stat in &cmp.stats {
            assert_eq!(stat.change, PercentChange::NotApplicable);
            assert_eq!(stat.trend, Trend::NotApplicable);
        }
        assert_eq!(serde_json::to_value(cmp.stats[0].change).unwrap(), "n/a");
    }

    #[test]
    fn test_empty_totals_are_zero() {
        let totals = PeriodTotals::from_metrics(&[]);
        assert_eq!(totals.average_cost(), 0.0);
        assert_eq!(totals.average_duration(), 0.0);
        assert_eq!(totals.success_rate(), 0.0);
    }

    #[test]
    fn test_totals_weight_by_runs() {
        let totals = PeriodTotals::from_metrics(&[
            metrics("a", 3, 3, 1.0, 100.0),
            metrics("b", 1, 0, 5.0, 500.0),
        ]);
        assert_eq!(totals.total_runs, 4);
        assert_eq!(totals.total_cost, 8.0);
        assert_eq!(totals.average_cost(), 2.0);
        assert_eq!(totals.average_duration(), 200.0);
        assert_eq!(totals.success_rate(), 0.75);
    }

    #[test]
    fn test_directionality() {
        assert_eq!(classify(120.0, 100.0, Direction::HigherIsBetter), Trend::Favorable);
        assert_eq!(classify(80.0, 100.0, Direction::HigherIsBetter), Trend::Unfavorable);
        assert_eq!(classify(120.0, 100.0, Direction::LowerIsBetter), Trend::Unfavorable);
        assert_eq!(classify(80.0, 100.0, Direction::LowerIsBetter), Trend::Favorable);
    }

    #[test]
    fn test_percent_change_display() {
        assert_eq!(percent_change(150.0, 100.0).to_string(), "+50.0%");
        assert_eq!(percent_change(1.0, 0.0).to_string(), "N/A");
    }

    #[test]
    fn test_compare_tests_skips_unmatched() {
        let current = vec![metrics("a", 1, 1, 2.0, 100.0), metrics("new", 1, 1, 1.0, 1.0)];
        let previous = vec![metrics("a", 1, 1, 4.0, 50.0), metrics("gone", 1, 1, 1.0, 1.0)];
        let cmp = compare_tests(&current, &previous);
        assert_eq!(cmp.len(), 1);
        assert_eq!(cmp[0].test_name, "a");
        assert_eq!(cmp[0].cost_change, PercentChange::Value(-50.0));
        assert_eq!(cmp[0].duration_change, PercentChange::Value(100.0));
    }

    #[test]
    fn test_compare_tests_zero_baseline_cost() {
        let cmp = compare_tests(&[metrics("a", 1, 1, 2.0, 1.0)], &[metrics("a", 1, 1, 0.0, 1.0)]);
        assert_eq!(cmp[0].cost_change, PercentChange::NotApplicable);
    }

    #[test]
    fn test_executive_kpis() {
        let current = vec![metrics("a", 10, 9, 1.0, 1000.0), metrics("b", 10, 9, 1.0, 1000.0)];
        let previous = vec![metrics("a", 10, 8, 2.0, 2000.0)];
        let kpis = ExecutiveKpis::compute(&current, &previous);
        assert!((kpis.quality_score - 90.0).abs() < 1e-9);
        assert!((kpis.quality_change - 10.0).abs() < 1e-9);
        assert_eq!(kpis.cost_efficiency, 50.0);
        assert_eq!(kpis.performance_change, 50.0);
        assert_eq!(kpis.test_coverage, 2);
        assert_eq!(kpis.coverage_change, 100.0);
        assert_eq!(kpis.total_cost, 20.0);
        assert_eq!(kpis.quality_trend, KpiTrend::Up);
        assert_eq!(kpis.cost_trend, KpiTrend::Up);
        assert_eq!(kpis.quality_status, KpiStatus::Good);
        assert_eq!(kpis.cost_status, KpiStatus::Excellent);
        assert_eq!(kpis.performance_status, KpiStatus::Excellent);
        assert_eq!(kpis.coverage_status, KpiStatus::Critical);
    }

    #[test]
    fn test_kpi_grade_thresholds() {
        assert_eq!(KpiStatus::grade(95.0, QUALITY_GRADES), KpiStatus::Excellent);
        assert_eq!(KpiStatus::grade(94.9, QUALITY_GRADES), KpiStatus::Good);
        assert_eq!(KpiStatus::grade(85.0, QUALITY_GRADES), KpiStatus::Good);
        assert_eq!(KpiStatus::grade(70.0, QUALITY_GRADES), KpiStatus::Attention);
        assert_eq!(KpiStatus::grade(69.9, QUALITY_GRADES), KpiStatus::Critical);

        assert_eq!(KpiStatus::grade(15.0, COST_GRADES), KpiStatus::Excellent);
        assert_eq!(KpiStatus::grade(10.0, COST_GRADES), KpiStatus::Good);
        assert_eq!(KpiStatus::grade(5.0, COST_GRADES), KpiStatus::Attention);
        assert_eq!(KpiStatus::grade(-20.0, COST_GRADES), KpiStatus::Critical);

        assert_eq!(KpiStatus::grade(10.0, PERFORMANCE_GRADES), KpiStatus::Excellent);
        assert_eq!(KpiStatus::grade(5.0, PERFORMANCE_GRADES), KpiStatus::Good);
        assert_eq!(KpiStatus::grade(0.0, PERFORMANCE_GRADES), KpiStatus::Attention);
        assert_eq!(KpiStatus::grade(-0.1, PERFORMANCE_GRADES), KpiStatus::Critical);

        assert_eq!(KpiStatus::grade(8.0, COVERAGE_GRADES), KpiStatus::Excellent);
        assert_eq!(KpiStatus::grade(6.0, COVERAGE_GRADES), KpiStatus::Good);
        assert_eq!(KpiStatus::grade(4.0, COVERAGE_GRADES), KpiStatus::Attention);
        assert_eq!(KpiStatus::grade(3.0, COVERAGE_GRADES), KpiStatus::Critical);
    }

    #[test]
    fn test_executive_kpis_without_baseline() {
        let kpis = ExecutiveKpis::compute(&calculate_test_metrics(&sample()), &[]);
        assert_eq!(kpis.quality_change, 0.0);
        assert_eq!(kpis.cost_efficiency, 0.0);
        assert_eq!(kpis.coverage_change, 0.0);
        assert_eq!(kpis.coverage_trend, KpiTrend::Stable);
    }
}
