//! In-process store backends. Used by tests, the REPL mode and local
//! development; mirrors the remote backends' semantics including key shape
//! and returned URIs.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use super::types::{
    report_doc_key, AlertRule, ClientProfile, ReportPage, ReportQuery, ReportRecord, TickerSummary,
};
use super::{DocumentStore, ObjectStore, StoreResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryStore {
    reports: DashMap<String, ReportRecord>,
    clients: DashMap<String, ClientProfile>,
    alerts: DashMap<String, AlertRule>,
    summaries: DashMap<String, TickerSummary>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn upsert_report(&self, mut record: ReportRecord) -> StoreResult<ReportRecord> {
        if record.created_at.is_none() {
            record.created_at = Some(Utc::now().to_rfc3339());
        }
        self.reports.insert(record.doc_key(), record.clone());
        Ok(record)
    }

    async fn get_report(
        &self,
        client_id: &str,
        trading_date: &str,
    ) -> StoreResult<Option<ReportRecord>> {
        Ok(self
            .reports
            .get(&report_doc_key(client_id, trading_date))
            .map(|r| r.value().clone()))
    }

    async fn set_audio_path(
        &self,
        client_id: &str,
        trading_date: &str,
        audio_gcs_path: &str,
    ) -> StoreResult<()> {
        let key = report_doc_key(client_id, trading_date);
        match self.reports.get_mut(&key) {
            Some(mut record) => {
                record.audio_gcs_path = Some(audio_gcs_path.to_string());
                Ok(())
            }
            None => Err(StoreError::NotFound { path: key }),
        }
    }

    async fn list_reports(&self, query: ReportQuery) -> StoreResult<ReportPage> {
        let limit = effective_limit(query.limit);

        let mut matching: Vec<ReportRecord> = self
            .reports
            .iter()
            .filter(|entry| match &query.client_id {
                Some(c) => entry.client_id == *c,
                None => true,
            })
            .filter(|entry| match &query.start_after {
                Some(cursor) => entry.trading_date < *cursor,
                None => true,
            })
            .map(|entry| entry.value().clone())
            .collect();

        matching.sort_by(|a, b| b.trading_date.cmp(&a.trading_date));

        let has_more = matching.len() > limit;
        matching.truncate(limit);
        let last_date = matching.last().map(|r| r.trading_date.clone());

        Ok(ReportPage {
            reports: matching,
            has_more,
            last_date,
        })
    }

    async fn get_client(&self, client_id: &str) -> StoreResult<Option<ClientProfile>> {
        Ok(self.clients.get(client_id).map(|c| c.value().clone()))
    }

    async fn upsert_client(&self, mut profile: ClientProfile) -> StoreResult<()> {
        profile.updated_at = Some(Utc::now().to_rfc3339());
        self.clients.insert(profile.client_id.clone(), profile);
        Ok(())
    }

    async fn list_clients(&self) -> StoreResult<Vec<ClientProfile>> {
        Ok(self.clients.iter().map(|c| c.value().clone()).collect())
    }

    async fn insert_alert(&self, alert: AlertRule) -> StoreResult<AlertRule> {
        self.alerts.insert(alert.id.clone(), alert.clone());
        Ok(alert)
    }

    async fn list_alerts(&self, client_id: Option<&str>) -> StoreResult<Vec<AlertRule>> {
        Ok(self
            .alerts
            .iter()
            .filter(|a| match client_id {
                Some(c) => a.client_id == c,
                None => true,
            })
            .map(|a| a.value().clone())
            .collect())
    }

    async fn update_alert(&self, alert: AlertRule) -> StoreResult<()> {
        if !self.alerts.contains_key(&alert.id) {
            return Err(StoreError::NotFound {
                path: format!("alerts/{}", alert.id),
            });
        }
        self.alerts.insert(alert.id.clone(), alert);
        Ok(())
    }

    async fn delete_alert(&self, id: &str) -> StoreResult<()> {
        self.alerts.remove(id);
        Ok(())
    }

    async fn upsert_ticker_summary(&self, summary: TickerSummary) -> StoreResult<()> {
        self.summaries.insert(summary.ticker.clone(), summary);
        Ok(())
    }

    async fn get_ticker_summary(&self, ticker: &str) -> StoreResult<Option<TickerSummary>> {
        Ok(self.summaries.get(ticker).map(|s| s.value().clone()))
    }
}

fn effective_limit(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_PAGE_SIZE
    } else {
        requested.min(MAX_PAGE_SIZE)
    }
}

/// Object store stand-in that keeps bytes in memory but hands back the same
/// gs:// URIs the real backend would.
pub struct MemoryObjectStore {
    bucket: String,
    objects: DashMap<String, (String, Vec<u8>)>,
}

impl MemoryObjectStore {
    pub fn new(bucket: String) -> Self {
        Self {
            bucket,
            objects: DashMap::new(),
        }
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.objects.get(path).map(|o| o.1.clone())
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<String> {
        self.objects
            .insert(path.to_string(), (content_type.to_string(), bytes));
        Ok(format!("gs://{}/{}", self.bucket, path))
    }
}
