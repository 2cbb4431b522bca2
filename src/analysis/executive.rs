//! Executive view: headline summary with risk level, quality tiers and
//! per-team rollups.

use serde::Serialize;

use crate::analysis::comparison::{percent_change, PercentChange, PeriodTotals};
use crate::analysis::{ratio, TestMetrics};

/// Tests below this success rate are critical.
pub const CRITICAL_RATE: f64 = 0.70;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// More than two critical tests is high risk, any at all is medium.
    pub fn from_critical_count(critical: usize) -> Self {
        match critical {
            0 => Self::Low,
            1 | 2 => Self::Medium,
            _ => Self::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub total_runs: u64,
    pub total_cost: f64,
    pub overall_success_rate: f64,
    /// Percentage-point change in overall success rate.
    pub quality_trend: f64,
    /// Relative change in total spend.
    pub cost_trend: PercentChange,
    pub critical_tests: Vec<String>,
    pub risk_level: RiskLevel,
    pub tests_monitored: usize,
}

impl ExecutiveSummary {
    pub fn compute(current: &[TestMetrics], previous: &[TestMetrics]) -> Self {
        let cur = PeriodTotals::from_metrics(current);
        let prev = PeriodTotals::from_metrics(previous);
        let critical_tests: Vec<String> = current
            .iter()
            .filter(|m| m.success_rate < CRITICAL_RATE)
            .map(|m| m.test_name.clone())
            .collect();

        Self {
            total_runs: cur.total_runs,
            total_cost: cur.total_cost,
            overall_success_rate: cur.success_rate(),
            quality_trend: (cur.success_rate() - prev.success_rate()) * 100.0,
            cost_trend: percent_change(cur.total_cost, prev.total_cost),
            risk_level: RiskLevel::from_critical_count(critical_tests.len()),
            critical_tests,
            tests_monitored: current.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// 95% and up.
    Excellent,
    /// 85% to 95%.
    Good,
    /// 70% to 85%.
    Fair,
    Poor,
}

impl QualityTier {
    pub fn of(success_rate: f64) -> Self {
        if success_rate >= 0.95 {
            Self::Excellent
        } else if success_rate >= 0.85 {
            Self::Good
        } else if success_rate >= CRITICAL_RATE {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Number of tests in each quality tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QualityDistribution {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub poor: usize,
}

impl QualityDistribution {
    pub fn from_metrics(metrics: &[TestMetrics]) -> Self {
        let mut dist = Self::default();
        for m in metrics {
            match QualityTier::of(m.success_rate) {
                QualityTier::Excellent => dist.excellent += 1,
                QualityTier::Good => dist.good += 1,
                QualityTier::Fair => dist.fair += 1,
                QualityTier::Poor => dist.poor += 1,
            }
        }
        dist
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamPerformance {
    pub team: String,
    pub tests: usize,
    pub runs: u64,
    /// Unweighted mean of the member tests' success rates.
    pub success_rate: f64,
    pub total_cost: f64,
    pub average_cost: f64,
    /// Success percentage per tenth of a cent of average cost.
    pub efficiency: f64,
}

/// Owning team of a test: the name up to the first `-`.
pub fn team_of(test_name: &str) -> &str {
    test_name
        .split('-')
        .next()
        .filter(|prefix| !prefix.is_empty())
        .unwrap_or("Other")
}

/// Teams in order of first appearance.
pub fn team_performance(metrics: &[TestMetrics]) -> Vec<TeamPerformance> {
    let mut teams: Vec<TeamPerformance> = Vec::new();
    for m in metrics {
        let name = team_of(&m.test_name);
        let idx = match teams.iter().position(|t| t.team == name) {
            Some(idx) => idx,
            None => {
                teams.push(TeamPerformance {
                    team: name.to_string(),
                    tests: 0,
                    runs: 0,
                    success_rate: 0.0,
                    total_cost: 0.0,
                    average_cost: 0.0,
                    efficiency: 0.0,
                });
                teams.len() - 1
            }
        };
        let team = &mut teams[idx];
        team.tests += 1;
        team.runs += m.total_runs;
        team.success_rate += m.success_rate;
        team.total_cost += m.average_cost * m.total_runs as f64;
    }

    for team in &mut teams {
        team.success_rate = ratio(team.success_rate, team.tests as f64);
        team.average_cost = ratio(team.total_cost, team.runs as f64);
        team.efficiency = ratio(team.success_rate * 100.0, team.average_cost * 1000.0);
    }
    teams
}
