//! Backing store for execution records -- the `test_executions` table.
//!
//! The rest of the crate only sees [`RecordBackend`]: a bulk read and a
//! single insert. [`SqliteBackend`] is the shipped implementation.

pub mod schema;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use thiserror::Error;
use uuid::Uuid;

use crate::record::{ExecutionRecord, NewRecord, RecordError};

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored record {id} is unreadable: {reason}")]
    Decode { id: String, reason: String },
    #[error("record rejected: {0}")]
    Rejected(#[from] RecordError),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// The two operations the dashboard needs from persistent storage.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Every stored record, oldest first.
    async fn list_all(&self) -> Result<Vec<ExecutionRecord>, StoreError>;

    /// Persist a candidate and return it with its assigned id.
    async fn insert(&self, candidate: &NewRecord) -> Result<ExecutionRecord, StoreError>;
}

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &str) -> Result<Pool, StoreError> {
    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

fn encode_time(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[derive(Clone)]
pub struct SqliteBackend {
    pool: Pool,
}

impl SqliteBackend {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn open(path: &str) -> Result<Self, StoreError> {
        tracing::info!(%path, "Opening record database");
        Ok(Self::new(open_pool(path)?))
    }

    /// Private in-memory database. The pool holds one connection so every
    /// query sees the same data.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let pool = R2D2Pool::builder()
            .max_size(1)
            .build(SqliteConnectionManager::memory())?;
        schema::migrate(&*pool.get()?)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

struct RawRow {
    id: String,
    test_name: String,
    start_time: String,
    duration: i64,
    success_rate: f64,
    cost: f64,
    validation: bool,
}

impl RawRow {
    fn decode(self) -> Result<ExecutionRecord, StoreError> {
        let start_time = DateTime::parse_from_rfc3339(&self.start_time)
            .map_err(|e| StoreError::Decode {
                id: self.id.clone(),
                reason: format!("start_time '{}': {}", self.start_time, e),
            })?
            .with_timezone(&Utc);
        let duration_ms = u64::try_from(self.duration).map_err(|_| StoreError::Decode {
            id: self.id.clone(),
            reason: format!("negative duration {}", self.duration),
        })?;
        Ok(ExecutionRecord {
            id: self.id,
            test_name: self.test_name,
            start_time,
            duration_ms,
            success_rate: self.success_rate,
            cost: self.cost,
            validation: self.validation,
        })
    }
}

fn list_rows(pool: &Pool) -> Result<Vec<ExecutionRecord>, StoreError> {
    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, test_name, start_time, duration, success_rate, cost, validation
         FROM test_executions
         ORDER BY start_time ASC, created_at ASC",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok(RawRow {
            id: row.get(0)?,
            test_name: row.get(1)?,
            start_time: row.get(2)?,
            duration: row.get(3)?,
            success_rate: row.get(4)?,
            cost: row.get(5)?,
            validation: row.get(6)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?.decode()?);
    }
    tracing::debug!(count = records.len(), "Loaded test executions");
    Ok(records)
}

fn insert_row(pool: &Pool, candidate: NewRecord) -> Result<ExecutionRecord, StoreError> {
    candidate.validate()?;
    let duration = i64::try_from(candidate.duration_ms)
        .map_err(|_| RecordError::DurationTooLong(candidate.duration_ms))?;

    let id = Uuid::new_v4().to_string();
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO test_executions
            (id, test_name, start_time, duration, success_rate, cost, validation)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            candidate.test_name,
            encode_time(&candidate.start_time),
            duration,
            candidate.success_rate,
            candidate.cost,
            candidate.validation,
        ],
    )?;

    tracing::debug!(%id, test_name = %candidate.test_name, "Inserted test execution");
    // Hand back what a reload would read: the column keeps milliseconds.
    let mut stored = candidate.with_id(id);
    stored.start_time = stored.start_time.trunc_subsecs(3);
    Ok(stored)
}

/// rusqlite blocks, so every call runs on the blocking pool.
#[async_trait]
impl RecordBackend for SqliteBackend {
    async fn list_all(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || list_rows(&pool))
            .await
            .map_err(|e| StoreError::Unavailable(format!("list task failed: {}", e)))?
    }

    async fn insert(&self, candidate: &NewRecord) -> Result<ExecutionRecord, StoreError> {
        let pool = self.pool.clone();
        let candidate = candidate.clone();
        tokio::task::spawn_blocking(move || insert_row(&pool, candidate))
            .await
            .map_err(|e| StoreError::Unavailable(format!("insert task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn candidate(name: &str, day: u32) -> NewRecord {
        NewRecord {
            test_name: name.to_string(),
            start_time: Utc.with_ymd_and_hms(2024, 6, day, 12, 30, 0).unwrap(),
            duration_ms: 4200,
            success_rate: 0.8,
            cost: 0.05,
            validation: true,
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_lists_in_time_order() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let later = backend.insert(&candidate("b", 20)).await.unwrap();
        let earlier = backend.insert(&candidate("a", 10)).await.unwrap();
        assert!(Uuid::parse_str(&later.id).is_ok());
        assert_ne!(later.id, earlier.id);

        let all = backend.list_all().await.unwrap();
        assert_eq!(all, vec![earlier, later]);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_candidate() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut bad = candidate("a", 1);
        bad.success_rate = 2.0;
        let err = backend.insert(&bad).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(_)));
        assert!(backend.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_result_matches_reload() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut c = candidate("precise", 4);
        c.start_time = Utc.with_ymd_and_hms(2024, 6, 4, 23, 59, 59).unwrap()
            + chrono::Duration::nanoseconds(999_600_000);
        let inserted = backend.insert(&c).await.unwrap();
        let reloaded = backend.list_all().await.unwrap();
        assert_eq!(reloaded, vec![inserted.clone()]);
        assert_eq!(inserted.start_time.timestamp_subsec_nanos(), 999_000_000);
    }

    #[tokio::test]
    async fn test_insert_rejects_unstorable_duration() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut c = candidate("slow", 5);
        c.duration_ms = u64::MAX;
        let err = backend.insert(&c).await.unwrap_err();
        assert!(matches!(err, StoreError::Rejected(RecordError::DurationTooLong(_))));
        assert!(backend.list_all().await.unwrap().is_empty());
    }

    #[test]
    fn test_file_pool_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.db");
        let path = path.to_str().unwrap();

        tokio_test::block_on(async {
            let backend = SqliteBackend::open(path).unwrap();
            backend.insert(&candidate("persisted", 3)).await.unwrap();
        });

        let reopened = SqliteBackend::open(path).unwrap();
        let all = tokio_test::block_on(reopened.list_all()).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].test_name, "persisted");
    }

    #[tokio::test]
    async fn test_corrupt_row_surfaces_decode_error() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .pool()
            .get()
            .unwrap()
            .execute(
                "INSERT INTO test_executions (id, test_name, start_time, duration, success_rate, cost)
                 VALUES ('bad', 'a', 'last tuesday', 10, 0.5, 0.1)",
                [],
            )
            .unwrap();
        let err = backend.list_all().await.unwrap_err();
        assert!(err.to_string().contains("last tuesday"));
    }
}
