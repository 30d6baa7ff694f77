//! TTL read cache over a remote document store.
//!
//! Point lookups and listings are cached for a short window; any write to a
//! report key invalidates that key and drops all cached listings. Client,
//! alert and ticker-summary operations pass straight through.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;

use super::types::{
    report_doc_key, AlertRule, ClientProfile, ReportPage, ReportQuery, ReportRecord, TickerSummary,
};
use super::{DocumentStore, StoreResult};

pub struct CachedStore {
    inner: Arc<dyn DocumentStore>,
    ttl: Duration,
    reports: DashMap<String, (Instant, Option<ReportRecord>)>,
    pages: DashMap<String, (Instant, ReportPage)>,
}

impl CachedStore {
    pub fn new(inner: Arc<dyn DocumentStore>, ttl_secs: u64) -> Self {
        Self {
            inner,
            ttl: Duration::from_secs(ttl_secs),
            reports: DashMap::new(),
            pages: DashMap::new(),
        }
    }

    fn invalidate(&self, client_id: &str, trading_date: &str) {
        self.reports.remove(&report_doc_key(client_id, trading_date));
        self.pages.clear();
    }

    fn page_key(query: &ReportQuery) -> String {
        format!(
            "{}|{}|{}",
            query.client_id.as_deref().unwrap_or("*"),
            query.limit,
            query.start_after.as_deref().unwrap_or("-")
        )
    }
}

#[async_trait]
impl DocumentStore for CachedStore {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn upsert_report(&self, record: ReportRecord) -> StoreResult<ReportRecord> {
        let stored = self.inner.upsert_report(record).await?;
        self.invalidate(&stored.client_id, &stored.trading_date);
        Ok(stored)
    }

    async fn get_report(
        &self,
        client_id: &str,
        trading_date: &str,
    ) -> StoreResult<Option<ReportRecord>> {
        let key = report_doc_key(client_id, trading_date);
        if let Some(entry) = self.reports.get(&key) {
            if entry.0.elapsed() < self.ttl {
                return Ok(entry.1.clone());
            }
        }

        let fresh = self.inner.get_report(client_id, trading_date).await?;
        self.reports.insert(key, (Instant::now(), fresh.clone()));
        Ok(fresh)
    }

    async fn set_audio_path(
        &self,
        client_id: &str,
        trading_date: &str,
        audio_gcs_path: &str,
    ) -> StoreResult<()> {
        self.inner
            .set_audio_path(client_id, trading_date, audio_gcs_path)
            .await?;
        self.invalidate(client_id, trading_date);
        Ok(())
    }

    async fn list_reports(&self, query: ReportQuery) -> StoreResult<ReportPage> {
        let key = Self::page_key(&query);
        if let Some(entry) = self.pages.get(&key) {
            if entry.0.elapsed() < self.ttl {
                return Ok(entry.1.clone());
            }
        }

        let fresh = self.inner.list_reports(query).await?;
        self.pages.insert(key, (Instant::now(), fresh.clone()));
        Ok(fresh)
    }

    async fn get_client(&self, client_id: &str) -> StoreResult<Option<ClientProfile>> {
        self.inner.get_client(client_id).await
    }

    async fn upsert_client(&self, profile: ClientProfile) -> StoreResult<()> {
        self.inner.upsert_client(profile).await
    }

    async fn list_clients(&self) -> StoreResult<Vec<ClientProfile>> {
        self.inner.list_clients().await
    }

    async fn insert_alert(&self, alert: AlertRule) -> StoreResult<AlertRule> {
        self.inner.insert_alert(alert).await
    }

    async fn list_alerts(&self, client_id: Option<&str>) -> StoreResult<Vec<AlertRule>> {
        self.inner.list_alerts(client_id).await
    }

    async fn update_alert(&self, alert: AlertRule) -> StoreResult<()> {
        self.inner.update_alert(alert).await
    }

    async fn delete_alert(&self, id: &str) -> StoreResult<()> {
        self.inner.delete_alert(id).await
    }

    async fn upsert_ticker_summary(&self, summary: TickerSummary) -> StoreResult<()> {
        self.inner.upsert_ticker_summary(summary).await
    }

    async fn get_ticker_summary(&self, ticker: &str) -> StoreResult<Option<TickerSummary>> {
        self.inner.get_ticker_summary(ticker).await
    }
}
