//! Firestore REST backend (v1 documents API).
//!
//! Reports are keyed `{client_id}__{trading_date}` so a trading date is unique
//! per client; clients and ticker summaries use their natural ids; alerts use
//! their uuid. Listing goes through `:runQuery` with a descending order on
//! trading_date and an exclusive cursor.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Map, Value};
use std::time::Duration;

use super::auth::GcpTokenProvider;
use super::types::{
    report_doc_key, AlertRule, ClientProfile, ReportPage, ReportQuery, ReportRecord, TickerSummary,
};
use super::{DocumentStore, StoreResult, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::error::StoreError;

const BACKEND: &str = "firestore";

pub struct FirestoreStore {
    client: Client,
    /// .../projects/{project}/databases/{database}/documents
    base_url: String,
    auth: GcpTokenProvider,
}

impl FirestoreStore {
    pub fn new(project_id: String, database: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("Failed to build Firestore HTTP client"),
            base_url: format!(
                "https://firestore.googleapis.com/v1/projects/{}/databases/{}/documents",
                project_id, database
            ),
            auth: GcpTokenProvider::new(BACKEND),
        }
    }

    async fn get_doc(&self, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let token = self.auth.token().await?;
        let url = format!("{}/{}/{}", self.base_url, collection, id);
        let response = self.client.get(&url).bearer_auth(token).send().await?;

        match response.status().as_u16() {
            404 => Ok(None),
            s if (200..300).contains(&s) => {
                let doc: Value = response.json().await?;
                Ok(Some(doc_to_value(&doc)))
            }
            s => Err(http_error(s, response.text().await.unwrap_or_default())),
        }
    }

    async fn patch_doc(&self, collection: &str, id: &str, value: &Value) -> StoreResult<()> {
        let token = self.auth.token().await?;
        let url = format!("{}/{}/{}", self.base_url, collection, id);
        let body = json!({ "fields": to_fs_fields(value) });
        let response = self
            .client
            .patch(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        ensure_success(response).await
    }

    async fn delete_doc(&self, collection: &str, id: &str) -> StoreResult<()> {
        let token = self.auth.token().await?;
        let url = format!("{}/{}/{}", self.base_url, collection, id);
        let response = self.client.delete(&url).bearer_auth(token).send().await?;
        ensure_success(response).await
    }

    async fn run_query(&self, structured_query: Value) -> StoreResult<Vec<Value>> {
        let token = self.auth.token().await?;
        let url = format!("{}:runQuery", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "structuredQuery": structured_query }))
            .send()
            .await?;

        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            return Err(http_error(status, response.text().await.unwrap_or_default()));
        }

        let rows: Vec<Value> = response.json().await?;
        Ok(rows
            .iter()
            .filter_map(|row| row.get("document"))
            .map(doc_to_value)
            .collect())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn ping(&self) -> StoreResult<()> {
        let token = self.auth.token().await?;
        let url = format!("{}/clients?pageSize=1", self.base_url);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        ensure_success(response).await
    }

    async fn upsert_report(&self, mut record: ReportRecord) -> StoreResult<ReportRecord> {
        if record.created_at.is_none() {
            record.created_at = Some(Utc::now().to_rfc3339());
        }
        let value = serde_json::to_value(&record)?;
        self.patch_doc("reports", &record.doc_key(), &value).await?;
        Ok(record)
    }

    async fn get_report(
        &self,
        client_id: &str,
        trading_date: &str,
    ) -> StoreResult<Option<ReportRecord>> {
        let doc = self
            .get_doc("reports", &report_doc_key(client_id, trading_date))
            .await?;
        match doc {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn set_audio_path(
        &self,
        client_id: &str,
        trading_date: &str,
        audio_gcs_path: &str,
    ) -> StoreResult<()> {
        let key = report_doc_key(client_id, trading_date);
        let mut record = self
            .get_report(client_id, trading_date)
            .await?
            .ok_or(StoreError::NotFound { path: format!("reports/{}", key) })?;
        record.audio_gcs_path = Some(audio_gcs_path.to_string());
        let value = serde_json::to_value(&record)?;
        self.patch_doc("reports", &key, &value).await
    }

    async fn list_reports(&self, query: ReportQuery) -> StoreResult<ReportPage> {
        let limit = if query.limit == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            query.limit.min(MAX_PAGE_SIZE)
        };

        let mut structured = json!({
            "from": [{ "collectionId": "reports" }],
            "orderBy": [{ "field": { "fieldPath": "trading_date" }, "direction": "DESCENDING" }],
            // Fetch one extra row to compute has_more without a count query
            "limit": limit + 1,
        });

        if let Some(client_id) = &query.client_id {
            structured["where"] = json!({
                "fieldFilter": {
                    "field": { "fieldPath": "client_id" },
                    "op": "EQUAL",
                    "value": { "stringValue": client_id },
                }
            });
        }

        if let Some(cursor) = &query.start_after {
            structured["startAt"] = json!({
                "values": [{ "stringValue": cursor }],
                "before": false,
            });
        }

        let rows = self.run_query(structured).await?;

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            reports.push(serde_json::from_value::<ReportRecord>(row)?);
        }

        let has_more = reports.len() > limit;
        reports.truncate(limit);
        let last_date = reports.last().map(|r| r.trading_date.clone());

        Ok(ReportPage {
            reports,
            has_more,
            last_date,
        })
    }

    async fn get_client(&self, client_id: &str) -> StoreResult<Option<ClientProfile>> {
        match self.get_doc("clients", client_id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    async fn upsert_client(&self, mut profile: ClientProfile) -> StoreResult<()> {
        profile.updated_at = Some(Utc::now().to_rfc3339());
        let value = serde_json::to_value(&profile)?;
        self.patch_doc("clients", &profile.client_id, &value).await
    }

    async fn list_clients(&self) -> StoreResult<Vec<ClientProfile>> {
        let token = self.auth.token().await?;
        let mut clients = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/clients?pageSize=100", self.base_url);
            if let Some(t) = &page_token {
                url.push_str(&format!("&pageToken={}", t));
            }
            let response = self
                .client
                .get(&url)
                .bearer_auth(token.clone())
                .send()
                .await?;

            let status = response.status().as_u16();
            if !(200..300).contains(&status) {
                return Err(http_error(status, response.text().await.unwrap_or_default()));
            }

            let body: Value = response.json().await?;
            if let Some(docs) = body.get("documents").and_then(|d| d.as_array()) {
                for doc in docs {
                    clients.push(serde_json::from_value(doc_to_value(doc))?);
                }
            }

            page_token = body
                .get("nextPageToken")
                .and_then(|t| t.as_str())
                .map(|t| t.to_string());
            if page_token.is_none() {
                break;
            }
        }

        Ok(clients)
    }

    async fn insert_alert(&self, alert: AlertRule) -> StoreResult<AlertRule> {
        let value = serde_json::to_value(&alert)?;
        self.patch_doc("alerts", &alert.id, &value).await?;
        Ok(alert)
    }

    async fn list_alerts(&self, client_id: Option<&str>) -> StoreResult<Vec<AlertRule>> {
        let mut structured = json!({
            "from": [{ "collectionId": "alerts" }],
        });
        if let Some(client_id) = client_id {
            structured["where"] = json!({
                "fieldFilter": {
                    "field": { "fieldPath": "client_id" },
                    "op": "EQUAL",
                    "value": { "stringValue": client_id },
                }
            });
        }

        let rows = self.run_query(structured).await?;
        let mut alerts = Vec::with_capacity(rows.len());
        for row in rows {
            alerts.push(serde_json::from_value::<AlertRule>(row)?);
        }
        Ok(alerts)
    }

    async fn update_alert(&self, alert: AlertRule) -> StoreResult<()> {
        let value = serde_json::to_value(&alert)?;
        self.patch_doc("alerts", &alert.id, &value).await
    }

    async fn delete_alert(&self, id: &str) -> StoreResult<()> {
        self.delete_doc("alerts", id).await
    }

    async fn upsert_ticker_summary(&self, summary: TickerSummary) -> StoreResult<()> {
        let value = serde_json::to_value(&summary)?;
        self.patch_doc("ticker_summaries", &summary.ticker, &value)
            .await
    }

    async fn get_ticker_summary(&self, ticker: &str) -> StoreResult<Option<TickerSummary>> {
        match self.get_doc("ticker_summaries", ticker).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }
}

async fn ensure_success(response: reqwest::Response) -> StoreResult<()> {
    let status = response.status().as_u16();
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(http_error(status, response.text().await.unwrap_or_default()))
    }
}

fn http_error(status: u16, body: String) -> StoreError {
    let body = body.chars().take(400).collect();
    StoreError::Http {
        backend: BACKEND,
        status,
        body,
    }
}

/// Firestore document ({name, fields, ...}) -> plain JSON object.
fn doc_to_value(doc: &Value) -> Value {
    match doc.get("fields") {
        Some(Value::Object(fields)) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), from_fs_value(v)))
                .collect(),
        ),
        _ => Value::Object(Map::new()),
    }
}

fn to_fs_fields(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), to_fs_value(v)))
                .collect(),
        ),
        _ => Value::Object(Map::new()),
    }
}

fn to_fs_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!({ "integerValue": i.to_string() })
            } else {
                json!({ "doubleValue": n.as_f64() })
            }
        }
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(to_fs_value).collect::<Vec<_>>() }
        }),
        Value::Object(_) => json!({ "mapValue": { "fields": to_fs_fields(value) } }),
    }
}

fn from_fs_value(value: &Value) -> Value {
    if let Some(s) = value.get("stringValue").and_then(|v| v.as_str()) {
        return Value::String(s.to_string());
    }
    if let Some(i) = value.get("integerValue") {
        // Integers come back as strings over REST
        let parsed = i
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .or_else(|| i.as_i64());
        if let Some(n) = parsed {
            return json!(n);
        }
    }
    if let Some(d) = value.get("doubleValue").and_then(|v| v.as_f64()) {
        return json!(d);
    }
    if let Some(b) = value.get("booleanValue").and_then(|v| v.as_bool()) {
        return Value::Bool(b);
    }
    if value.get("nullValue").is_some() {
        return Value::Null;
    }
    if let Some(ts) = value.get("timestampValue").and_then(|v| v.as_str()) {
        return Value::String(ts.to_string());
    }
    if let Some(arr) = value.pointer("/arrayValue/values").and_then(|v| v.as_array()) {
        return Value::Array(arr.iter().map(from_fs_value).collect());
    }
    if value.get("arrayValue").is_some() {
        return Value::Array(Vec::new());
    }
    if let Some(Value::Object(fields)) = value.pointer("/mapValue/fields") {
        return Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), from_fs_value(v)))
                .collect(),
        );
    }
    Value::Null
}
