pub mod auth;
pub mod cache;
pub mod firestore;
pub mod gcs;
pub mod memory;
pub mod types;

#[cfg(test)]
mod memory_tests;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AppConfig;
use crate::error::StoreError;

use self::cache::CachedStore;
use self::firestore::FirestoreStore;
use self::gcs::GcsStore;
use self::memory::{MemoryObjectStore, MemoryStore};
use self::types::{
    AlertRule, ClientProfile, ReportPage, ReportQuery, ReportRecord, TickerSummary,
};

pub type StoreResult<T> = Result<T, StoreError>;

/// Hard cap on list page sizes regardless of what the caller asks for.
pub const MAX_PAGE_SIZE: usize = 50;
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ping(&self) -> StoreResult<()>;

    /// Upsert keyed by (client_id, trading_date). `created_at` defaults to now
    /// only when absent; `email_status` defaults to pending via the record type.
    async fn upsert_report(&self, record: ReportRecord) -> StoreResult<ReportRecord>;
    async fn get_report(
        &self,
        client_id: &str,
        trading_date: &str,
    ) -> StoreResult<Option<ReportRecord>>;
    async fn set_audio_path(
        &self,
        client_id: &str,
        trading_date: &str,
        audio_gcs_path: &str,
    ) -> StoreResult<()>;
    async fn list_reports(&self, query: ReportQuery) -> StoreResult<ReportPage>;

    async fn get_client(&self, client_id: &str) -> StoreResult<Option<ClientProfile>>;
    async fn upsert_client(&self, profile: ClientProfile) -> StoreResult<()>;
    async fn list_clients(&self) -> StoreResult<Vec<ClientProfile>>;

    async fn insert_alert(&self, alert: AlertRule) -> StoreResult<AlertRule>;
    async fn list_alerts(&self, client_id: Option<&str>) -> StoreResult<Vec<AlertRule>>;
    async fn update_alert(&self, alert: AlertRule) -> StoreResult<()>;
    async fn delete_alert(&self, id: &str) -> StoreResult<()>;

    async fn upsert_ticker_summary(&self, summary: TickerSummary) -> StoreResult<()>;
    async fn get_ticker_summary(&self, ticker: &str) -> StoreResult<Option<TickerSummary>>;
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    fn name(&self) -> &'static str;
    async fn ping(&self) -> StoreResult<()>;

    /// Writes bytes and returns the canonical object URI (e.g. gs://bucket/path).
    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<String>;
}

pub fn build_stores(config: &AppConfig) -> (Arc<dyn DocumentStore>, Arc<dyn ObjectStore>) {
    let documents: Arc<dyn DocumentStore> = match config.document_store.backend.to_lowercase().as_str() {
        "firestore" => {
            let project = config
                .document_store
                .project_id
                .clone()
                .expect("document_store.project_id required for firestore backend");
            let database = config
                .document_store
                .database
                .clone()
                .unwrap_or_else(|| "(default)".to_string());
            let inner = FirestoreStore::new(project, database);
            Arc::new(CachedStore::new(Arc::new(inner), config.cache_ttl_secs))
        }
        "memory" => Arc::new(MemoryStore::new()),
        other => panic!("Unknown document_store.backend='{}' (expected firestore|memory)", other),
    };

    let objects: Arc<dyn ObjectStore> = match config.object_store.backend.to_lowercase().as_str() {
        "gcs" => {
            let bucket = config
                .object_store
                .bucket
                .clone()
                .expect("object_store.bucket required for gcs backend");
            Arc::new(GcsStore::new(bucket))
        }
        "memory" => {
            let bucket = config
                .object_store
                .bucket
                .clone()
                .unwrap_or_else(|| "local".to_string());
            Arc::new(MemoryObjectStore::new(bucket))
        }
        other => panic!("Unknown object_store.backend='{}' (expected gcs|memory)", other),
    };

    (documents, objects)
}
