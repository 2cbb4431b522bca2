use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::analysis::aggregator::Accumulator;
use crate::analysis::TimelinePoint;
use crate::record::ExecutionRecord;

/// Group records by UTC calendar day, ascending by date.
pub fn generate_timeline(records: &[ExecutionRecord]) -> Vec<TimelinePoint> {
    let mut days: BTreeMap<NaiveDate, Accumulator> = BTreeMap::new();
    for record in records {
        days.entry(record.start_time.date_naive())
            .or_default()
            .push(record);
    }

    days.into_iter()
        .map(|(date, acc)| {
            let runs = acc.runs as f64;
            TimelinePoint {
                date,
                runs: acc.runs,
                average_cost: acc.cost_sum / runs,
                success_rate: acc.successful as f64 / runs,
            }
        })
        .collect()
}

/// Headline numbers for the timeline view.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimelineStats {
    pub peak_runs: u64,
    pub average_runs_per_day: u64,
    pub best_success_rate: f64,
    pub active_days: usize,
    pub highest_daily_cost: f64,
    pub lowest_daily_cost: f64,
}

impl TimelineStats {
    pub fn from_points(points: &[TimelinePoint]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let total_runs: u64 = points.iter().map(|p| p.runs).sum();
        Self {
            peak_runs: points.iter().map(|p| p.runs).max().unwrap_or(0),
            average_runs_per_day: (total_runs as f64 / points.len() as f64).round() as u64,
            best_success_rate: points.iter().map(|p| p.success_rate).fold(0.0, f64::max),
            active_days: points.iter().filter(|p| p.runs > 0).count(),
            highest_daily_cost: points
                .iter()
                .map(|p| p.average_cost)
                .fold(f64::NEG_INFINITY, f64::max),
            lowest_daily_cost: points
                .iter()
                .map(|p| p.average_cost)
                .fold(f64::INFINITY, f64::min),
        }
    }
}
