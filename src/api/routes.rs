//! API route definitions.

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use super::state::AppState;
use super::ApiError;
use crate::analysis::{
    available_test_names, calculate_test_metrics, compare_periods, compare_tests,
    generate_timeline, sort_metrics, team_performance, DateRange, ExecutiveKpis,
    ExecutiveSummary, MetricsSortField, QualityDistribution, RecordFilter, SortDirection,
    StatusBuckets, SummaryStats, TimelineStats,
};
use crate::ingest::{export_csv, ManualEntry};
use crate::record::ExecutionRecord;
use crate::store::RecordStore;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/records", get(list_records).post(add_record))
        .route("/records/import", post(import_records))
        .route("/records/export", get(export_records))
        .route("/records/refresh", post(refresh_records))
        .route("/tests", get(list_tests))
        .route("/metrics", get(metrics))
        .route("/timeline", get(timeline))
        .route("/compare", get(compare))
        .route("/status", get(status))
}

/// Query string shared by the read endpoints. `tests` is comma-separated.
#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub tests: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
    pub baseline_start: Option<String>,
    pub baseline_end: Option<String>,
}

impl ViewQuery {
    fn filter(&self) -> Result<RecordFilter, ApiError> {
        let range = DateRange::parse_bounds(self.start.as_deref(), self.end.as_deref())?;
        Ok(RecordFilter::new(range, RecordFilter::parse_test_list(self.tests.as_deref())))
    }

    /// Current and baseline periods; each defaults when neither of its
    /// bounds is given.
    fn periods(&self, window_days: u32) -> Result<(RecordFilter, RecordFilter), ApiError> {
        let now = chrono::Utc::now();
        let current = DateRange::parse_or(
            self.start.as_deref(),
            self.end.as_deref(),
            DateRange::recent(now, window_days),
        )?;
        let baseline = DateRange::parse_or(
            self.baseline_start.as_deref(),
            self.baseline_end.as_deref(),
            DateRange::previous_month(now),
        )?;
        let tests = RecordFilter::parse_test_list(self.tests.as_deref());
        Ok((
            RecordFilter::new(current, tests.clone()),
            RecordFilter::new(baseline, tests),
        ))
    }

    fn sort(&self) -> Result<(MetricsSortField, SortDirection), ApiError> {
        let field = match self.sort.as_deref() {
            Some(s) => s.parse::<MetricsSortField>().map_err(ApiError::BadRequest)?,
            None => MetricsSortField::default(),
        };
        let direction = match self.dir.as_deref() {
            Some(d) => d.parse::<SortDirection>().map_err(ApiError::BadRequest)?,
            None => SortDirection::default(),
        };
        Ok((field, direction))
    }
}

async fn snapshot(state: &AppState, filter: &RecordFilter) -> Vec<ExecutionRecord> {
    let store = state.store.read().await;
    filter.apply(store.records())
}

fn meta(extra: Value) -> Value {
    let mut meta = json!({ "timestamp": chrono::Utc::now().to_rfc3339() });
    if let (Some(m), Value::Object(extra)) = (meta.as_object_mut(), extra) {
        m.extend(extra);
    }
    meta
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let records = state.store.read().await.len();
    Json(json!({
        "data": {
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "records": records,
        },
        "meta": meta(json!({}))
    }))
}

async fn list_records(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Json<Value>, ApiError> {
    let records = snapshot(&state, &q.filter()?).await;
    Ok(Json(json!({
        "data": records,
        "meta": meta(json!({ "total": records.len() }))
    })))
}

async fn add_record(
    State(state): State<AppState>,
    Json(entry): Json<ManualEntry>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let record = RecordStore::persist_manual(state.backend.as_ref(), entry).await?;
    state.store.write().await.append([record.clone()]);
    Ok((StatusCode::CREATED, Json(json!({ "data": record }))))
}

async fn import_records(
    State(state): State<AppState>,
    body: String,
) -> Result<Json<Value>, ApiError> {
    let staged = RecordStore::persist_csv(state.backend.as_ref(), &body).await?;
    let total = {
        let mut store = state.store.write().await;
        store.append(staged.stored);
        store.len()
    };
    Ok(Json(json!({ "data": staged.report, "meta": meta(json!({ "total": total })) })))
}

async fn export_records(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let records = snapshot(&state, &q.filter()?).await;
    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        export_csv(&records),
    ))
}

async fn refresh_records(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let fresh = RecordStore::load(state.backend.as_ref()).await?;
    let total = fresh.len();
    *state.store.write().await = fresh;
    Ok(Json(json!({ "data": { "total": total } })))
}

async fn list_tests(State(state): State<AppState>) -> Json<Value> {
    let names = available_test_names(state.store.read().await.records());
    Json(json!({ "data": names, "meta": meta(json!({ "total": names.len() })) }))
}

async fn metrics(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Json<Value>, ApiError> {
    let (field, direction) = q.sort()?;
    let records = snapshot(&state, &q.filter()?).await;
    let mut metrics = calculate_test_metrics(&records);
    let summary = SummaryStats::from_metrics(&metrics);
    sort_metrics(&mut metrics, field, direction);
    Ok(Json(json!({
        "data": metrics,
        "meta": meta(json!({ "summary": summary, "sort": field, "dir": direction }))
    })))
}

async fn timeline(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Json<Value>, ApiError> {
    let records = snapshot(&state, &q.filter()?).await;
    let points = generate_timeline(&records);
    let stats = TimelineStats::from_points(&points);
    Ok(Json(json!({ "data": points, "meta": meta(json!({ "stats": stats })) })))
}

async fn compare(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Json<Value>, ApiError> {
    let (current_filter, baseline_filter) = q.periods(state.window_days)?;

    let (current_records, baseline_records) = {
        let store = state.store.read().await;
        (
            current_filter.apply(store.records()),
            baseline_filter.apply(store.records()),
        )
    };
    let current = calculate_test_metrics(&current_records);
    let previous = calculate_test_metrics(&baseline_records);

    Ok(Json(json!({
        "data": {
            "periods": compare_periods(&current, &previous),
            "tests": compare_tests(&current, &previous),
            "kpis": ExecutiveKpis::compute(&current, &previous),
            "summary": ExecutiveSummary::compute(&current, &previous),
        },
        "meta": meta(json!({
            "current": current_filter.range,
            "baseline": baseline_filter.range,
        }))
    })))
}

async fn status(
    State(state): State<AppState>,
    Query(q): Query<ViewQuery>,
) -> Result<Json<Value>, ApiError> {
    let records = snapshot(&state, &q.filter()?).await;
    let metrics = calculate_test_metrics(&records);
    Ok(Json(json!({
        "data": StatusBuckets::from_metrics(&metrics),
        "meta": meta(json!({
            "distribution": QualityDistribution::from_metrics(&metrics),
            "teams": team_performance(&metrics),
        }))
    })))
}
