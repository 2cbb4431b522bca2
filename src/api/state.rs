use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::DashboardSection;
use crate::storage::RecordBackend;
use crate::store::RecordStore;

/// Shared handler state: the session snapshot and the backend it mirrors.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<RecordStore>>,
    pub backend: Arc<dyn RecordBackend>,
    /// Length of the default current period for comparisons.
    pub window_days: u32,
}

impl AppState {
    pub fn new(store: RecordStore, backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            backend,
            window_days: DashboardSection::default().default_window_days,
        }
    }

    pub fn with_window_days(mut self, days: u32) -> Self {
        self.window_days = days;
        self
    }
}
