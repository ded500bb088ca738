//! Boundary facade for query callers.
//!
//! Every entry point here is a boundary function: internal faults are
//! caught, logged, and converted into a structured result, so no error
//! ever propagates to the UI/messaging layer as an unhandled fault. A
//! delete that finds nothing is a successful result with
//! `deleted: false`, distinct from a storage fault.

use serde::Serialize;
use tabtrail_core::{EngineConfig, Error, FaviconEntry, Store, VisitRecord};
use tokio::task::JoinHandle;

use crate::recorder::{self, RecorderHandle};
use crate::sweeper;

/// Structured result returned to query callers.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResult<T> {
    fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }

    fn fail(err: &Error, op: &str) -> Self {
        tracing::warn!(error = %err, op, "operation failed at the boundary");
        Self { success: false, data: None, error: Some(err.to_string()) }
    }
}

fn wrap<T>(result: Result<T, Error>, op: &str) -> ApiResult<T> {
    match result {
        Ok(data) => ApiResult::ok(data),
        Err(e) => ApiResult::fail(&e, op),
    }
}

/// Outcome of a single-record delete.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteOutcome {
    pub deleted: bool,
}

/// The assembled engine: store handle, recorder actor, and config.
pub struct Engine {
    store: Store,
    recorder: RecorderHandle,
    config: EngineConfig,
}

impl Engine {
    /// Open the store at the configured path and spawn the recorder.
    pub async fn open(config: EngineConfig) -> Result<Self, Error> {
        let store = Store::open(&config.db_path).await?;
        Ok(Self::with_store(store, config))
    }

    /// Assemble an engine over an already-open store.
    pub fn with_store(store: Store, config: EngineConfig) -> Self {
        let recorder = recorder::spawn(store.clone(), config.debounce_ms);
        Self { store, recorder, config }
    }

    /// The underlying store handle, for collaborators that bypass the
    /// facade (the resource fetch collaborator talks to the favicon
    /// cache directly).
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Spawn the periodic retention sweep (startup + fixed interval).
    pub fn start_sweeper(&self) -> JoinHandle<()> {
        sweeper::spawn_periodic(self.store.clone(), self.config.retention_days, self.config.sweep_interval())
    }

    /// Entry point for the navigation source.
    ///
    /// Returns whether the event was accepted; never faults.
    pub async fn record_visit(&self, url: &str, title: &str, favicon_hint: Option<&str>) -> bool {
        self.recorder.record_visit(url, title, favicon_hint).await
    }

    pub async fn most_visited(&self, limit: usize) -> ApiResult<Vec<VisitRecord>> {
        wrap(self.store.most_visited(limit).await, "most_visited")
    }

    pub async fn recent_visits(&self, limit: usize) -> ApiResult<Vec<VisitRecord>> {
        wrap(self.store.recent_visits(limit).await, "recent_visits")
    }

    pub async fn search(&self, query: &str, limit: usize) -> ApiResult<Vec<VisitRecord>> {
        wrap(self.store.search_visits(query, limit).await, "search")
    }

    pub async fn delete_record(&self, url: &str) -> ApiResult<DeleteOutcome> {
        wrap(
            self.store.delete_visit(url).await.map(|deleted| DeleteOutcome { deleted }),
            "delete_record",
        )
    }

    pub async fn delete_by_urls(&self, urls: Vec<String>) -> ApiResult<u64> {
        wrap(self.store.delete_visits_by_urls(urls).await, "delete_by_urls")
    }

    pub async fn delete_by_time_range(&self, start_ms: i64, end_ms: i64) -> ApiResult<u64> {
        wrap(self.store.delete_visits_in_range(start_ms, end_ms).await, "delete_by_time_range")
    }

    /// On-demand retention sweep with the configured horizon.
    pub async fn sweep_now(&self) -> ApiResult<u64> {
        wrap(sweeper::sweep_history(&self.store, self.config.retention_days).await, "sweep_now")
    }

    pub async fn get_favicon(&self, source_url: &str) -> ApiResult<Option<FaviconEntry>> {
        wrap(self.store.get_favicon(source_url).await, "get_favicon")
    }

    pub async fn put_favicon(&self, source_url: &str, payload: &str, is_default: bool) -> ApiResult<()> {
        wrap(self.store.put_favicon(source_url, payload, is_default).await, "put_favicon")
    }
}
