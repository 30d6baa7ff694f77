use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Delivery state of the report email. Tracking only; sending is external.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailStatus {
    #[default]
    Pending,
    Sent,
    Failed,
}

/// One briefing per (client, trading date). The document store is the sole
/// source of truth; anything returned to callers is a projection of this.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportRecord {
    pub client_id: String,
    /// Calendar date, YYYY-MM-DD. Document key per client.
    pub trading_date: String,
    pub tickers: Vec<String>,
    pub summary_text: String,
    pub key_insights: Vec<String>,
    #[serde(default)]
    pub email_status: EmailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_gcs_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_context: Option<Value>,
    /// Original market/news/macro inputs, kept for replay
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<Value>,
    /// RFC3339. Filled by the store at first write when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ReportRecord {
    pub fn doc_key(&self) -> String {
        report_doc_key(&self.client_id, &self.trading_date)
    }
}

pub fn report_doc_key(client_id: &str, trading_date: &str) -> String {
    format!("{}__{}", client_id, trading_date)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientProfile {
    pub client_id: String,
    pub display_name: String,
    pub timezone: String,
    #[serde(default)]
    pub watchlist: Vec<String>,
    /// Categorized watchlist, e.g. "semis" -> ["NVDA", "SMCI"]
    #[serde(default)]
    pub categories: HashMap<String, Vec<String>>,
    /// Report-section toggles, e.g. "macro" -> false
    #[serde(default)]
    pub sections: HashMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ClientProfile {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            display_name: client_id.to_string(),
            timezone: "UTC".to_string(),
            watchlist: Vec::new(),
            categories: HashMap::new(),
            sections: HashMap::new(),
            updated_at: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCondition {
    PriceAbove,
    PriceBelow,
    PercentChangeAbove,
    PercentChangeBelow,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: String,
    pub client_id: String,
    pub ticker: String,
    pub condition: AlertCondition,
    pub threshold: f64,
    pub notify_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<String>,
    pub active: bool,
}

/// Denormalized latest snapshot per ticker, refreshed whenever a report
/// references the ticker. Independent lifecycle from reports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
    pub last_trading_date: String,
    #[serde(default)]
    pub mention_count: u64,
    pub updated_at: String,
}

#[derive(Clone, Debug, Default)]
pub struct ReportQuery {
    pub client_id: Option<String>,
    pub limit: usize,
    /// Exclusive cursor: return reports with trading_date strictly older
    pub start_after: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ReportPage {
    pub reports: Vec<ReportRecord>,
    pub has_more: bool,
    pub last_date: Option<String>,
}
