//! Synthetic execution history for trying the dashboard out.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::record::NewRecord;

pub const DEMO_TEST_NAMES: [&str; 10] = [
    "send-message-test",
    "add-reaction-test",
    "user-authentication-test",
    "file-upload-test",
    "payment-processing-test",
    "notification-delivery-test",
    "database-connection-test",
    "api-endpoint-test",
    "search-functionality-test",
    "user-registration-test",
];

fn demo_run<R: Rng>(rng: &mut R, test_name: &str, start_time: DateTime<Utc>) -> NewRecord {
    let base_success = 0.7 + rng.gen::<f64>() * 0.25;
    let base_duration = 1000.0 + rng.gen::<f64>() * 5000.0;
    let base_cost = 0.01 + rng.gen::<f64>() * 0.5;

    let duration = base_duration + (rng.gen::<f64>() - 0.5) * 1000.0;
    let cost = (base_cost + (rng.gen::<f64>() - 0.5) * 0.1).max(0.0);

    NewRecord {
        test_name: test_name.to_string(),
        start_time,
        duration_ms: duration.round().max(0.0) as u64,
        success_rate: (base_success + (rng.gen::<f64>() - 0.5) * 0.3).clamp(0.0, 1.0),
        cost: (cost * 10_000.0).round() / 10_000.0,
        validation: rng.gen_bool(0.9),
    }
}

/// 5-25 runs per day for each of the `days` days ending at `end`, oldest
/// first.
pub fn generate_demo_data<R: Rng>(end: DateTime<Utc>, days: u32, rng: &mut R) -> Vec<NewRecord> {
    let mut data = Vec::new();
    let first_day = (end - Duration::days(i64::from(days))).date_naive();

    for offset in 0..=days {
        let day = first_day + Duration::days(i64::from(offset));
        let Some(midnight) = day.and_hms_opt(0, 0, 0) else {
            continue;
        };
        let midnight = midnight.and_utc();
        let runs = rng.gen_range(5..25);
        for _ in 0..runs {
            let name = DEMO_TEST_NAMES[rng.gen_range(0..DEMO_TEST_NAMES.len())];
            let at = midnight + Duration::seconds(rng.gen_range(0..86_400));
            if at > end {
                continue;
            }
            data.push(demo_run(rng, name, at));
        }
    }

    data.sort_by_key(|r| r.start_time);
    data
}
