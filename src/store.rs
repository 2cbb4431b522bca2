//! Session record store -- the in-memory snapshot every view is computed from.
//!
//! The store is owned by its caller and only changes through the backend:
//! a record is appended after the backend has accepted it, and a failed
//! fetch or insert leaves the snapshot exactly as it was. The `persist*`
//! functions do the backend half alone, so a shared store need only be
//! locked for the final [`RecordStore::append`].

use tracing::{info, warn};

use crate::ingest::{parse_csv, ImportReport, IngestError, ManualEntry};
use crate::record::{ExecutionRecord, NewRecord};
use crate::storage::{RecordBackend, StoreError};

/// Outcome of an import whose rows are persisted but not yet in a snapshot.
#[derive(Debug, Clone, Default)]
pub struct StagedImport {
    pub report: ImportReport,
    pub stored: Vec<ExecutionRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<ExecutionRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<ExecutionRecord>) -> Self {
        Self { records }
    }

    /// Bulk fetch from the backend.
    pub async fn load(backend: &dyn RecordBackend) -> Result<Self, StoreError> {
        let records = backend.list_all().await?;
        info!(count = records.len(), "Record store loaded");
        Ok(Self { records })
    }

    /// Replace the snapshot with a fresh fetch.
    pub async fn refresh(&mut self, backend: &dyn RecordBackend) -> Result<usize, StoreError> {
        let records = backend.list_all().await.map_err(|e| {
            warn!(error = %e, "Refresh failed, keeping current snapshot");
            e
        })?;
        self.records = records;
        Ok(self.records.len())
    }

    /// Validate and persist without touching any snapshot.
    pub async fn persist(
        backend: &dyn RecordBackend,
        candidate: NewRecord,
    ) -> Result<ExecutionRecord, StoreError> {
        candidate.validate()?;
        let stored = backend.insert(&candidate).await?;
        info!(id = %stored.id, test_name = %stored.test_name, "Test execution added");
        Ok(stored)
    }

    pub async fn persist_manual(
        backend: &dyn RecordBackend,
        entry: ManualEntry,
    ) -> Result<ExecutionRecord, IngestError> {
        let candidate = entry.into_new_record()?;
        Ok(Self::persist(backend, candidate).await?)
    }

    /// Best-effort import: every row is attempted, failures are counted.
    /// Returns the rows the backend accepted; no snapshot changes.
    pub async fn persist_csv(
        backend: &dyn RecordBackend,
        text: &str,
    ) -> Result<StagedImport, IngestError> {
        let parsed = parse_csv(text)?;

        let mut staged = StagedImport::default();
        for err in parsed.errors {
            staged.report.record_error(err.line, err.reason);
        }
        for (line, candidate) in parsed.records {
            match backend.insert(&candidate).await {
                Ok(stored) => {
                    staged.stored.push(stored);
                    staged.report.success_count += 1;
                }
                Err(e) => {
                    warn!(test_name = %candidate.test_name, error = %e, "Import row not stored");
                    staged.report.record_error(line, e.to_string());
                }
            }
        }
        staged.report.errors.sort_by_key(|e| e.line);

        info!(
            success = staged.report.success_count,
            errors = staged.report.error_count,
            "Import finished"
        );
        Ok(staged)
    }

    /// Append records the backend has already confirmed.
    pub fn append(&mut self, stored: impl IntoIterator<Item = ExecutionRecord>) {
        self.records.extend(stored);
    }

    pub async fn add(
        &mut self,
        backend: &dyn RecordBackend,
        candidate: NewRecord,
    ) -> Result<&ExecutionRecord, StoreError> {
        let stored = Self::persist(backend, candidate).await?;
        self.records.push(stored);
        Ok(&self.records[self.records.len() - 1])
    }

    pub async fn add_manual(
        &mut self,
        backend: &dyn RecordBackend,
        entry: ManualEntry,
    ) -> Result<&ExecutionRecord, IngestError> {
        let candidate = entry.into_new_record()?;
        Ok(self.add(backend, candidate).await?)
    }

    pub async fn import_csv(
        &mut self,
        backend: &dyn RecordBackend,
        text: &str,
    ) -> Result<ImportReport, IngestError> {
        let staged = Self::persist_csv(backend, text).await?;
        self.append(staged.stored);
        Ok(staged.report)
    }

    pub fn records(&self) -> &[ExecutionRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteBackend;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Accepts the first `budget` inserts, then fails everything.
    struct FlakyBackend {
        inner: SqliteBackend,
        budget: AtomicUsize,
    }

    impl FlakyBackend {
        fn new(budget: usize) -> Self {
            Self {
                inner: SqliteBackend::open_in_memory().unwrap(),
                budget: AtomicUsize::new(budget),
            }
        }
    }

    #[async_trait]
    impl RecordBackend for FlakyBackend {
        async fn list_all(&self) -> Result<Vec<ExecutionRecord>, StoreError> {
            if self.budget.load(Ordering::SeqCst) == 0 {
                return Err(StoreError::Unavailable("budget exhausted".to_string()));
            }
            self.inner.list_all().await
        }

        async fn insert(&self, candidate: &NewRecord) -> Result<ExecutionRecord, StoreError> {
            let left = self.budget.load(Ordering::SeqCst);
            if left == 0 {
                return Err(StoreError::Unavailable("budget exhausted".to_string()));
            }
            self.budget.store(left - 1, Ordering::SeqCst);
            self.inner.insert(candidate).await
        }
    }

    fn entry(name: &str) -> ManualEntry {
        ManualEntry {
            test_name: name.to_string(),
            start_time: "2024-05-01".to_string(),
            duration_secs: "2".to_string(),
            success_rate_pct: "90".to_string(),
            cost: "0.02".to_string(),
        }
    }

    const IMPORT: &str = "testname,starttime,duration,successrate,cost
a,2024-03-01,1,90,0.01
b,2024-03-02,2,80,0.02
c,2024-03-03,3,70,0.03
d,2024-03-04,4,150,0.04
";

    #[tokio::test]
    async fn test_import_counts_successes_and_errors() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut store = RecordStore::new();
        let report = store.import_csv(&backend, IMPORT).await.unwrap();
        assert_eq!(report.success_count, 3);
        assert_eq!(report.error_count, 1);
        assert_eq!(store.len(), 3);
        assert!(store.records().iter().all(|r| r.test_name != "d"));
        assert_eq!(backend.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_import_continues_past_backend_failures() {
        let backend = FlakyBackend::new(2);
        let mut store = RecordStore::new();
        let report = store.import_csv(&backend, IMPORT).await.unwrap();
        assert_eq!(report.success_count, 2);
        assert_eq!(report.error_count, 2);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_header_stores_nothing() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut store = RecordStore::new();
        let err = store.import_csv(&backend, "name,when\nx,y\n").await.unwrap_err();
        assert!(matches!(err, IngestError::MissingColumns(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_failed_insert_leaves_store_unchanged() {
        let backend = FlakyBackend::new(1);
        let mut store = RecordStore::new();
        store.add_manual(&backend, entry("first")).await.unwrap();
        let err = store.add_manual(&backend, entry("second")).await.unwrap_err();
        assert!(matches!(err, IngestError::Store(_)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].test_name, "first");
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let backend = FlakyBackend::new(1);
        let mut store = RecordStore::new();
        store.add_manual(&backend, entry("kept")).await.unwrap();
        assert!(store.refresh(&backend).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_manual_entry_never_reaches_backend() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut store = RecordStore::new();
        let mut bad = entry("x");
        bad.success_rate_pct = "120".to_string();
        assert!(store.add_manual(&backend, bad).await.is_err());
        assert!(backend.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persisted_import_waits_for_append() {
        let backend = FlakyBackend::new(2);
        let mut store = RecordStore::new();
        let staged = RecordStore::persist_csv(&backend, IMPORT).await.unwrap();
        assert!(store.is_empty());
        assert_eq!(staged.stored.len(), 2);
        assert_eq!(staged.report.error_count, 2);
        assert_eq!(
            staged.report.errors.iter().map(|e| e.line).collect::<Vec<_>>(),
            vec![4, 5]
        );

        store.append(staged.stored);
        assert_eq!(store.len(), 2);
        assert_eq!(store.records()[1].test_name, "b");
    }

    #[tokio::test]
    async fn test_load_reads_backend() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        let mut writer = RecordStore::new();
        writer.add_manual(&backend, entry("one")).await.unwrap();
        writer.add_manual(&backend, entry("two")).await.unwrap();

        let store = RecordStore::load(&backend).await.unwrap();
        assert_eq!(store.len(), 2);
    }
}
