//! The generate-and-store pipeline.
//!
//! Strictly linear: build prompt -> model call -> parse -> persist report ->
//! refresh ticker snapshots -> synthesize audio -> upload -> stamp audio path.
//! The text report is persisted before any audio work so an audio failure can
//! never lose the narrative. Text-generation and first-persistence failures
//! are fatal to the request; everything audio-side degrades to
//! `AudioOutcome::Skipped`.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::error::BriefingError;
use crate::llm::{parse::parse_brief, retry, Priority, TextGenerator};
use crate::store::types::{ClientProfile, EmailStatus, ReportRecord, TickerSummary};
use crate::store::{DocumentStore, ObjectStore};
use crate::tts::SpeechSynthesizer;
use crate::writers::{daily::DailyBriefWriter, watchlist::WatchlistBriefWriter, Writer};

#[derive(Clone, Debug, Deserialize)]
pub struct GenerateRequest {
    pub client_id: Option<String>,
    pub trading_date: String,
    #[serde(default)]
    pub market_data: Value,
    #[serde(default)]
    pub news_items: Value,
    #[serde(default)]
    pub macro_context: Value,
}

/// What happened to the optional audio side effect.
#[derive(Clone, Debug, Serialize, PartialEq)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum AudioOutcome {
    Stored(String),
    Skipped(String),
}

/// Flat projection of the stored report handed back to API/CLI callers.
#[derive(Clone, Debug, Serialize)]
pub struct GeneratedReport {
    /// Equal to the trading date string
    pub report_id: String,
    pub client_id: String,
    pub trading_date: String,
    pub tickers: Vec<String>,
    pub summary_text: String,
    pub key_insights: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_context: Option<Value>,
    pub email_status: EmailStatus,
    pub audio_gcs_path: Option<String>,
    pub audio: AudioOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_markdown: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_tickers_in_depth_markdown: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ticker_reports: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_report: Option<String>,
}

#[derive(Clone)]
pub struct ReportPipeline {
    generator: Arc<dyn TextGenerator>,
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
    synthesizer: Arc<SpeechSynthesizer>,
    config: AppConfig,
}

impl ReportPipeline {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
        synthesizer: Arc<SpeechSynthesizer>,
        config: AppConfig,
    ) -> Self {
        Self {
            generator,
            store,
            objects,
            synthesizer,
            config,
        }
    }

    /// Full daily briefing from raw market/news/macro inputs.
    pub async fn generate_daily(
        &self,
        request: GenerateRequest,
        priority: Priority,
    ) -> Result<GeneratedReport, BriefingError> {
        let client_id = request
            .client_id
            .clone()
            .unwrap_or_else(|| self.config.default_client_id.clone());

        self.run(
            DailyBriefWriter.system_prompt(),
            &client_id,
            &request.trading_date,
            request.market_data,
            request.news_items,
            request.macro_context,
            priority,
        )
        .await
    }

    /// Watchlist-focused briefing. Saves the watchlist to the client profile
    /// first (profiles are created on first watchlist save).
    pub async fn generate_watchlist(
        &self,
        client_id: &str,
        watchlist: Vec<String>,
        trading_date: Option<String>,
        priority: Priority,
    ) -> Result<GeneratedReport, BriefingError> {
        if watchlist.is_empty() {
            return Err(BriefingError::Validation {
                field: "watchlist".to_string(),
                reason: "watchlist must not be empty".to_string(),
            });
        }

        let mut profile = self
            .store
            .get_client(client_id)
            .await?
            .unwrap_or_else(|| ClientProfile::new(client_id));
        profile.watchlist = watchlist.clone();
        self.store.upsert_client(profile).await?;

        let trading_date =
            trading_date.unwrap_or_else(|| Utc::now().date_naive().to_string());
        let market_data = json!({ "tickers": watchlist });

        self.run(
            WatchlistBriefWriter.system_prompt(),
            client_id,
            &trading_date,
            market_data,
            Value::Null,
            Value::Null,
            priority,
        )
        .await
    }

    async fn run(
        &self,
        system_prompt: &str,
        client_id: &str,
        trading_date: &str,
        market_data: Value,
        news_items: Value,
        macro_context: Value,
        priority: Priority,
    ) -> Result<GeneratedReport, BriefingError> {
        if NaiveDate::parse_from_str(trading_date, "%Y-%m-%d").is_err() {
            return Err(BriefingError::Validation {
                field: "trading_date".to_string(),
                reason: format!("'{}' is not a YYYY-MM-DD date", trading_date),
            });
        }

        let tickers = extract_tickers(&market_data);
        let prompt = self.build_prompt(client_id, trading_date, &market_data, &news_items, &macro_context);

        info!(
            "📝 [PIPELINE] Generating report for {} / {} ({} tickers)",
            client_id,
            trading_date,
            tickers.len()
        );

        // Model call with backoff on transport errors only; parse failures
        // are final at this layer.
        let raw = retry::with_backoff(self.config.llm.max_attempts, || {
            self.generator.generate(system_prompt, &prompt, priority)
        })
        .await?;

        let parsed = parse_brief(&raw)?;

        let record = ReportRecord {
            client_id: client_id.to_string(),
            trading_date: trading_date.to_string(),
            tickers: tickers.clone(),
            summary_text: parsed.summary_text.clone(),
            key_insights: parsed.key_insights.clone(),
            email_status: EmailStatus::Pending,
            audio_gcs_path: None,
            market_context: parsed.market_context.clone(),
            raw_payload: Some(json!({
                "market_data": market_data,
                "news_items": news_items,
                "macro_context": macro_context,
            })),
            created_at: None,
        };

        // Text report must land before any audio work starts.
        let stored = self.store.upsert_report(record).await?;
        info!("💾 [PIPELINE] Report stored for {} / {}", client_id, trading_date);

        self.refresh_ticker_summaries(&tickers, trading_date, &market_data).await;

        let audio = self.attach_audio(client_id, trading_date, &parsed.audio_report, &parsed.summary_text).await;
        let audio_gcs_path = match &audio {
            AudioOutcome::Stored(uri) => Some(uri.clone()),
            AudioOutcome::Skipped(_) => None,
        };

        Ok(GeneratedReport {
            report_id: trading_date.to_string(),
            client_id: stored.client_id,
            trading_date: stored.trading_date,
            tickers: stored.tickers,
            summary_text: stored.summary_text,
            key_insights: stored.key_insights,
            market_context: stored.market_context,
            email_status: stored.email_status,
            audio_gcs_path,
            audio,
            report_markdown: parsed.report_markdown,
            core_tickers_in_depth_markdown: parsed.core_tickers_in_depth_markdown,
            ticker_reports: parsed.ticker_reports,
            audio_report: parsed.audio_report,
        })
    }

    fn build_prompt(
        &self,
        client_id: &str,
        trading_date: &str,
        market_data: &Value,
        news_items: &Value,
        macro_context: &Value,
    ) -> String {
        let mut prompt = format!("Trading date: {}\n", trading_date);

        prompt.push_str("\nMarket data:\n");
        prompt.push_str(&pretty_or_empty(market_data));

        if self.config.section_enabled(client_id, "news") {
            prompt.push_str("\nNews:\n");
            prompt.push_str(&pretty_or_empty(news_items));
        }

        if self.config.section_enabled(client_id, "macro") {
            prompt.push_str("\nMacro context:\n");
            prompt.push_str(&pretty_or_empty(macro_context));
        }

        prompt
    }

    /// Denormalized per-ticker snapshots. Best-effort: a failure here must
    /// not fail the report that already landed.
    async fn refresh_ticker_summaries(
        &self,
        tickers: &[String],
        trading_date: &str,
        market_data: &Value,
    ) {
        for ticker in tickers {
            let (last_price, percent_change) = ticker_metrics(market_data, ticker);
            let mention_count = match self.store.get_ticker_summary(ticker).await {
                Ok(Some(existing)) => existing.mention_count + 1,
                _ => 1,
            };

            let summary = TickerSummary {
                ticker: ticker.clone(),
                last_price,
                percent_change,
                last_trading_date: trading_date.to_string(),
                mention_count,
                updated_at: Utc::now().to_rfc3339(),
            };

            if let Err(e) = self.store.upsert_ticker_summary(summary).await {
                warn!("⚠️ [PIPELINE] Ticker summary upsert failed for {}: {}", ticker, e);
            }
        }
    }

    /// Optional side effect: synthesize, upload, stamp the document. The
    /// result is reported, never thrown.
    async fn attach_audio(
        &self,
        client_id: &str,
        trading_date: &str,
        audio_report: &Option<String>,
        summary_text: &str,
    ) -> AudioOutcome {
        if !self.synthesizer.is_enabled() {
            return AudioOutcome::Skipped("audio synthesis disabled".to_string());
        }

        let script = audio_report
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(summary_text);

        let (primary, _) = self.config.tts_providers_for(client_id);
        let provider_override = if primary != self.config.tts.provider {
            Some(primary.as_str())
        } else {
            None
        };

        let audio = match self.synthesizer.synthesize(script, provider_override).await {
            Ok(audio) => audio,
            Err(e) => {
                error!("🔇 [PIPELINE] Audio synthesis failed for {} / {}: {:?}", client_id, trading_date, e);
                return AudioOutcome::Skipped(format!("tts failed: {}", e));
            }
        };

        let path = format!(
            "reports/{}/{}/report.{}",
            client_id, trading_date, audio.file_ext
        );

        let uri = match self.objects.put(&path, audio.bytes, audio.content_type).await {
            Ok(uri) => uri,
            Err(e) => {
                error!("🔇 [PIPELINE] Audio upload failed for {}: {:?}", path, e);
                return AudioOutcome::Skipped(format!("upload failed: {}", e));
            }
        };

        if let Err(e) = self.store.set_audio_path(client_id, trading_date, &uri).await {
            error!("🔇 [PIPELINE] Audio path update failed for {}: {:?}", uri, e);
            return AudioOutcome::Skipped(format!("audio path update failed: {}", e));
        }

        info!("🔊 [PIPELINE] Audio stored at {} (provider: {})", uri, audio.provider);
        AudioOutcome::Stored(uri)
    }
}

/// Tickers from the market-data payload: the "tickers" array, deduplicated
/// and uppercased. Order is irrelevant downstream, so sort for determinism.
fn extract_tickers(market_data: &Value) -> Vec<String> {
    let mut tickers: Vec<String> = market_data
        .get("tickers")
        .and_then(|t| t.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    tickers.sort();
    tickers.dedup();
    tickers
}

/// Best-effort price/percent-change lookup for a ticker inside the arbitrary
/// market-data payload. Checks `prices[ticker]` then a top-level `[ticker]`
/// object; accepts a few common field spellings.
fn ticker_metrics(market_data: &Value, ticker: &str) -> (Option<f64>, Option<f64>) {
    let candidates = [
        market_data.pointer(&format!("/prices/{}", ticker)),
        market_data.get(ticker),
    ];

    for entry in candidates.into_iter().flatten() {
        let price = ["price", "last", "close"]
            .iter()
            .find_map(|k| entry.get(*k).and_then(|v| v.as_f64()));
        let change = ["percent_change", "change_percent", "change_pct"]
            .iter()
            .find_map(|k| entry.get(*k).and_then(|v| v.as_f64()));
        if price.is_some() || change.is_some() {
            return (price, change);
        }
    }

    (None, None)
}

fn pretty_or_empty(value: &Value) -> String {
    match value {
        Value::Null => "(none)\n".to_string(),
        Value::Object(map) if map.is_empty() => "(none)\n".to_string(),
        other => {
            let mut s = serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string());
            s.push('\n');
            s
        }
    }
}
