//! Human-readable formatting for terminal reports.

use crate::analysis::comparison::{
    KpiStatus, KpiTrend, PeriodComparison, Stat, TestComparison, Trend,
};
use crate::analysis::timeline::TimelineStats;
use crate::analysis::{
    ExecutiveKpis, ExecutiveSummary, QualityDistribution, RiskLevel, StatusBuckets, SummaryStats,
    TeamPerformance, TestMetrics, TimelinePoint,
};

/// `850ms` below one second, `2.35s` above.
pub fn format_duration(ms: f64) -> String {
    if ms < 1000.0 {
        format!("{}ms", ms.round())
    } else {
        format!("{:.2}s", ms / 1000.0)
    }
}

pub fn format_currency(amount: f64) -> String {
    format!("${:.4}", amount)
}

/// A [0, 1] fraction as a percentage.
pub fn format_percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

fn format_stat(stat: Stat, value: f64) -> String {
    match stat {
        Stat::TotalRuns => format!("{}", value as u64),
        Stat::AverageCost => format_currency(value),
        Stat::AverageDuration => format_duration(value),
        Stat::SuccessRate => format_percent(value),
    }
}

fn trend_marker(trend: Trend) -> &'static str {
    match trend {
        Trend::Favorable => "better",
        Trend::Unfavorable => "worse",
        Trend::Unchanged => "same",
        Trend::NotApplicable => "-",
    }
}

pub fn format_summary(summary: &SummaryStats) -> String {
    format!(
        "{} runs across {} test{} | success {} ({} ok, {} failed) | avg cost {} | total cost ${:.2}",
        summary.total_runs,
        summary.unique_tests,
        if summary.unique_tests == 1 { "" } else { "s" },
        format_percent(summary.overall_success_rate),
        summary.total_successful,
        summary.total_failed,
        format_currency(summary.average_cost),
        summary.total_cost,
    )
}

pub fn metrics_table(metrics: &[TestMetrics]) -> String {
    let mut out = format!(
        "{:<32} | {:>10} | {:>10} | {:>6} | {:>6} | {:>6} | {:>8}\n",
        "Test", "Avg Time", "Avg Cost", "Runs", "Pass", "Fail", "Success"
    );
    out.push_str(&format!(
        "{:-<32}-|-{:-<10}-|-{:-<10}-|-{:-<6}-|-{:-<6}-|-{:-<6}-|-{:-<8}\n",
        "", "", "", "", "", "", ""
    ));
    for m in metrics {
        out.push_str(&format!(
            "{:<32} | {:>10} | {:>10} | {:>6} | {:>6} | {:>6} | {:>8}\n",
            m.test_name,
            format_duration(m.average_duration),
            format_currency(m.average_cost),
            m.total_runs,
            m.successful_runs,
            m.failed_runs,
            format_percent(m.success_rate),
        ));
    }
    out
}

pub fn timeline_table(points: &[TimelinePoint], stats: &TimelineStats) -> String {
    let mut out = format!("{:<10} | {:>6} | {:>10} | {:>8}\n", "Date", "Runs", "Avg Cost", "Success");
    out.push_str(&format!("{:-<10}-|-{:-<6}-|-{:-<10}-|-{:-<8}\n", "", "", "", ""));
    for p in points {
        out.push_str(&format!(
            "{:<10} | {:>6} | {:>10} | {:>8}\n",
            p.date.format("%Y-%m-%d"),
            p.runs,
            format_currency(p.average_cost),
            format_percent(p.success_rate),
        ));
    }
    out.push_str(&format!(
        "\nPeak day: {} runs | avg/day: {} | best success: {} | active days: {}\n",
        stats.peak_runs,
        stats.average_runs_per_day,
        format_percent(stats.best_success_rate),
        stats.active_days,
    ));
    out.push_str(&format!(
        "Daily avg cost: highest {} / lowest {}\n",
        format_currency(stats.highest_daily_cost),
        format_currency(stats.lowest_daily_cost),
    ));
    out
}

pub fn comparison_table(cmp: &PeriodComparison) -> String {
    let mut out = format!(
        "{:<18} | {:>12} | {:>12} | {:>8} | Trend\n",
        "Statistic", "Current", "Previous", "Change"
    );
    out.push_str(&format!("{:-<18}-|-{:-<12}-|-{:-<12}-|-{:-<8}-|-{:-<6}\n", "", "", "", "", ""));
    for s in &cmp.stats {
        out.push_str(&format!(
            "{:<18} | {:>12} | {:>12} | {:>8} | {}\n",
            s.stat.label(),
            format_stat(s.stat, s.current),
            format_stat(s.stat, s.previous),
            s.change.to_string(),
            trend_marker(s.trend),
        ));
    }
    out
}

pub fn test_comparison_table(tests: &[TestComparison]) -> String {
    if tests.is_empty() {
        return "No test ran in both periods.\n".to_string();
    }
    let mut out = format!("{:<32} | {:>10} | {:>10}\n", "Test", "Cost", "Duration");
    out.push_str(&format!("{:-<32}-|-{:-<10}-|-{:-<10}\n", "", "", ""));
    for t in tests {
        out.push_str(&format!(
            "{:<32} | {:>10} | {:>10}\n",
            t.test_name,
            t.cost_change.to_string(),
            t.duration_change.to_string(),
        ));
    }
    out
}

fn kpi_arrow(trend: KpiTrend) -> &'static str {
    match trend {
        KpiTrend::Up => "up",
        KpiTrend::Down => "down",
        KpiTrend::Stable => "stable",
    }
}

fn status_word(status: KpiStatus) -> &'static str {
    match status {
        KpiStatus::Excellent => "excellent",
        KpiStatus::Good => "good",
        KpiStatus::Attention => "attention",
        KpiStatus::Critical => "critical",
    }
}

pub fn kpi_summary(kpis: &ExecutiveKpis) -> String {
    let mut out = format!(
        "Quality {:.1}% ({:+.1} pts, {}) | cost efficiency {:+.1}% ({}) | performance {:+.1}% ({}) | coverage {} tests ({:+.1}%, {})\n",
        kpis.quality_score,
        kpis.quality_change,
        kpi_arrow(kpis.quality_trend),
        kpis.cost_efficiency,
        kpi_arrow(kpis.cost_trend),
        kpis.performance_change,
        kpi_arrow(kpis.performance_trend),
        kpis.test_coverage,
        kpis.coverage_change,
        kpi_arrow(kpis.coverage_trend),
    );
    out.push_str(&format!(
        "Status: quality {} | cost {} | performance {} | coverage {}\n",
        status_word(kpis.quality_status),
        status_word(kpis.cost_status),
        status_word(kpis.performance_status),
        status_word(kpis.coverage_status),
    ));
    out
}

pub fn executive_summary(summary: &ExecutiveSummary) -> String {
    let risk = match summary.risk_level {
        RiskLevel::Low => "low",
        RiskLevel::Medium => "medium",
        RiskLevel::High => "high",
    };
    let mut out = format!(
        "{} runs over {} tests | success {} ({:+.1} pts) | spend ${:.2} ({}) | risk {}\n",
        summary.total_runs,
        summary.tests_monitored,
        format_percent(summary.overall_success_rate),
        summary.quality_trend,
        summary.total_cost,
        summary.cost_trend,
        risk,
    );
    if !summary.critical_tests.is_empty() {
        out.push_str(&format!("Critical: {}\n", summary.critical_tests.join(", ")));
    }
    out
}

pub fn quality_distribution(dist: &QualityDistribution) -> String {
    format!(
        "Quality tiers: {} excellent, {} good, {} fair, {} poor\n",
        dist.excellent, dist.good, dist.fair, dist.poor
    )
}

pub fn team_table(teams: &[TeamPerformance]) -> String {
    let mut out = format!(
        "{:<16} | {:>5} | {:>6} | {:>8} | {:>10} | {:>10}\n",
        "Team", "Tests", "Runs", "Success", "Total Cost", "Efficiency"
    );
    out.push_str(&format!(
        "{:-<16}-|-{:-<5}-|-{:-<6}-|-{:-<8}-|-{:-<10}-|-{:-<10}\n",
        "", "", "", "", "", ""
    ));
    for t in teams {
        out.push_str(&format!(
            "{:<16} | {:>5} | {:>6} | {:>8} | {:>10} | {:>10.1}\n",
            t.team,
            t.tests,
            t.runs,
            format_percent(t.success_rate),
            format!("${:.2}", t.total_cost),
            t.efficiency,
        ));
    }
    out
}

pub fn status_report(buckets: &StatusBuckets) -> String {
    let line = |label: &str, tests: &[String], runs: u64| {
        let mut names = tests.iter().take(3).cloned().collect::<Vec<_>>().join(", ");
        if tests.len() > 3 {
            names.push_str(&format!(" +{} more", tests.len() - 3));
        }
        format!("{:<16} {:>3} tests {:>6} runs  {}\n", label, tests.len(), runs, names)
    };
    let mut out = String::new();
    out.push_str(&line(
        "Working well",
        &buckets.working_well.tests,
        buckets.working_well.total_runs,
    ));
    out.push_str(&line(
        "Needs attention",
        &buckets.needs_attention.tests,
        buckets.needs_attention.total_runs,
    ));
    out.push_str(&line("At risk", &buckets.at_risk.tests, buckets.at_risk.total_runs));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::comparison::{compare_totals, PeriodTotals};

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(850.4), "850ms");
        assert_eq!(format_duration(2346.0), "2.35s");
    }

    #[test]
    fn test_format_currency_and_percent() {
        assert_eq!(format_currency(0.025), "$0.0250");
        assert_eq!(format_percent(0.9), "90.0%");
    }

    #[test]
    fn test_comparison_table_marks_trends() {
        let cmp = compare_totals(
            PeriodTotals {
                total_runs: 100,
                total_cost: 5.0,
                ..Default::default()
            },
            PeriodTotals {
                total_runs: 100,
                total_cost: 10.0,
                ..Default::default()
            },
        );
        let table = comparison_table(&cmp);
        let cost_line = table.lines().find(|l| l.starts_with("Average Cost")).unwrap();
        assert!(cost_line.contains("-50.0%"));
        assert!(cost_line.ends_with("better"));
        let rate_line = table.lines().find(|l| l.starts_with("Success Rate")).unwrap();
        assert!(rate_line.contains("N/A"));
    }

    #[test]
    fn test_kpi_summary_against_empty_baseline() {
        let current = vec![TestMetrics {
            test_name: "login".into(),
            average_duration: 1000.0,
            average_cost: 0.1,
            total_runs: 4,
            successful_runs: 3,
            failed_runs: 1,
            success_rate: 0.75,
        }];
        let line = kpi_summary(&ExecutiveKpis::compute(&current, &[]));
        assert!(line.starts_with("Quality 75.0% (+0.0 pts, stable)"));
        assert!(line.contains("coverage 1 tests"));
        assert!(line.ends_with(
            "Status: quality attention | cost critical | performance attention | coverage critical\n"
        ));
    }

    #[test]
    fn test_executive_summary_lists_critical_tests() {
        let current = crate::analysis::calculate_test_metrics(&crate::analysis::fixtures::sample());
        let text = executive_summary(&ExecutiveSummary::compute(&current, &[]));
        assert!(text.contains("(N/A) | risk medium"));
        assert!(text.ends_with("Critical: login, checkout\n"));
    }

    #[test]
    fn test_team_table_rows() {
        let teams = vec![TeamPerformance {
            team: "payment".into(),
            tests: 2,
            runs: 40,
            success_rate: 0.9,
            total_cost: 1.4,
            average_cost: 0.035,
            efficiency: 90.0 / 35.0,
        }];
        let table = team_table(&teams);
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("payment "));
        assert!(row.contains("90.0%"));
        assert!(row.contains("$1.40"));
        assert!(row.ends_with("2.6"));
        assert_eq!(
            quality_distribution(&QualityDistribution { excellent: 1, good: 2, fair: 0, poor: 3 }),
            "Quality tiers: 1 excellent, 2 good, 0 fair, 3 poor\n"
        );
    }

    #[test]
    fn test_status_report_truncates_names() {
        let mut buckets = StatusBuckets::default();
        buckets.at_risk.tests = (0..5).map(|i| format!("t{}", i)).collect();
        buckets.at_risk.total_runs = 12;
        let report = status_report(&buckets);
        assert!(report.contains("t0, t1, t2 +2 more"));
    }
}
