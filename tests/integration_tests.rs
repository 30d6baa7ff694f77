//! Integration tests for the briefing service.
//! These drive the public crate API end-to-end against in-memory backends.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use rust_dailybrief::error::{LlmError, TtsError};
use rust_dailybrief::llm::{Priority, TextGenerator};
use rust_dailybrief::services::alerts::AlertMonitor;
use rust_dailybrief::services::chat::{ChatService, ChatSession};
use rust_dailybrief::services::rate_limit::RateLimiter;
use rust_dailybrief::services::scheduler::DailySweep;
use rust_dailybrief::store::memory::{MemoryObjectStore, MemoryStore};
use rust_dailybrief::store::types::{AlertCondition, AlertRule, ClientProfile, ReportQuery};
use rust_dailybrief::store::DocumentStore;
use rust_dailybrief::tts::{SpeechApi, SpeechSynthesizer};
use rust_dailybrief::{AppConfig, AudioOutcome, GenerateRequest, ReportPipeline};

const MODEL_RESPONSE: &str = r#"{
    "summary_text": "A constructive session led by AI infrastructure names.",
    "key_insights": ["SMCI outperformed", "Volumes were light"],
    "market_context": "Quiet macro tape.",
    "audio_report": "Good evening. A constructive session today."
}"#;

struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(
        &self,
        _system_prompt: &str,
        _user_input: &str,
        _priority: Priority,
    ) -> Result<String, LlmError> {
        Ok(MODEL_RESPONSE.to_string())
    }
}

struct StubSpeech {
    fail: bool,
}

#[async_trait]
impl SpeechApi for StubSpeech {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }
    fn file_ext(&self) -> &'static str {
        "wav"
    }
    fn content_type(&self) -> &'static str {
        "audio/wav"
    }
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>, TtsError> {
        if self.fail {
            Err(TtsError::Provider {
                provider: "elevenlabs",
                reason: "forced failure".to_string(),
            })
        } else {
            Ok(vec![7u8; 128])
        }
    }
}

fn test_config() -> AppConfig {
    let yaml = r#"
server:
  port: 3000
llm:
  api_key: "test-key"
  base_url: null
  model: "test-model"
  queue_size: 16
  max_concurrent: 2
  max_attempts: 1
tts:
  provider: "elevenlabs"
  fallback: null
  elevenlabs_api_key: "xi-test"
  elevenlabs_voice_id: "voice"
  gemini_voice: "Kore"
document_store:
  backend: "memory"
  project_id: null
  database: null
object_store:
  backend: "memory"
  bucket: "briefs"
rate_limit:
  max_requests: 3
  window_secs: 60
schedule:
  daily_cron: "0 0 13 * * *"
  alert_cron: "0 */15 * * * *"
cache_ttl_secs: 120
default_client_id: "michael_brooks"
chat_history_limit: 20
"#;
    serde_yaml::from_str(yaml).unwrap()
}

fn build_pipeline(tts_fails: bool) -> (ReportPipeline, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let pipeline = ReportPipeline::new(
        Arc::new(CannedGenerator),
        store.clone(),
        Arc::new(MemoryObjectStore::new("briefs".to_string())),
        Arc::new(SpeechSynthesizer::new(vec![Arc::new(StubSpeech {
            fail: tts_fails,
        })])),
        test_config(),
    );
    (pipeline, store)
}

fn sample_request(date: &str) -> GenerateRequest {
    GenerateRequest {
        client_id: Some("michael_brooks".to_string()),
        trading_date: date.to_string(),
        market_data: json!({
            "tickers": ["SMCI"],
            "prices": { "SMCI": { "last": 48.2, "percent_change": 5.4 } }
        }),
        news_items: json!({}),
        macro_context: json!({}),
    }
}

/// Generation with working TTS yields a gs:// audio path; with failing TTS
/// the text fields are identical and audio is absent.
#[tokio::test]
async fn generation_scenario_with_and_without_audio() {
    let (with_audio, _) = build_pipeline(false);
    let ok = with_audio
        .generate_daily(sample_request("2025-12-04"), Priority::High)
        .await
        .unwrap();

    assert_eq!(ok.client_id, "michael_brooks");
    assert_eq!(ok.trading_date, "2025-12-04");
    assert!(!ok.summary_text.is_empty());
    let audio_path = ok.audio_gcs_path.clone().unwrap();
    assert!(audio_path.starts_with("gs://"));
    assert!(audio_path.ends_with("report.wav"));

    let (without_audio, store) = build_pipeline(true);
    let degraded = without_audio
        .generate_daily(sample_request("2025-12-04"), Priority::High)
        .await
        .unwrap();

    assert!(degraded.audio_gcs_path.is_none());
    assert!(matches!(degraded.audio, AudioOutcome::Skipped(_)));
    assert_eq!(degraded.summary_text, ok.summary_text);
    assert_eq!(degraded.key_insights, ok.key_insights);

    // Text-first persistence: the document landed despite the TTS failure
    let stored = store
        .get_report("michael_brooks", "2025-12-04")
        .await
        .unwrap()
        .unwrap();
    assert!(stored.audio_gcs_path.is_none());
    assert_eq!(stored.summary_text, ok.summary_text);
}

#[tokio::test]
async fn report_history_pages_through_generated_reports() {
    let (pipeline, store) = build_pipeline(false);

    for day in ["2025-12-01", "2025-12-02", "2025-12-03"] {
        pipeline
            .generate_daily(sample_request(day), Priority::High)
            .await
            .unwrap();
    }

    let first = store
        .list_reports(ReportQuery {
            client_id: Some("michael_brooks".to_string()),
            limit: 2,
            start_after: None,
        })
        .await
        .unwrap();

    assert_eq!(first.reports.len(), 2);
    assert!(first.has_more);
    assert_eq!(first.reports[0].trading_date, "2025-12-03");

    let rest = store
        .list_reports(ReportQuery {
            client_id: Some("michael_brooks".to_string()),
            limit: 2,
            start_after: first.last_date,
        })
        .await
        .unwrap();

    assert_eq!(rest.reports.len(), 1);
    assert!(!rest.has_more);
    assert_eq!(rest.reports[0].trading_date, "2025-12-01");
}

#[tokio::test]
async fn alert_triggers_on_generated_snapshot() {
    let (pipeline, store) = build_pipeline(false);

    store
        .insert_alert(AlertRule {
            id: "a1".to_string(),
            client_id: "michael_brooks".to_string(),
            ticker: "SMCI".to_string(),
            condition: AlertCondition::PercentChangeAbove,
            threshold: 5.0,
            notify_email: "mb@example.test".to_string(),
            last_triggered: None,
            active: true,
        })
        .await
        .unwrap();

    // Generation refreshes the SMCI snapshot with +5.4%
    pipeline
        .generate_daily(sample_request("2025-12-04"), Priority::High)
        .await
        .unwrap();

    let monitor = AlertMonitor::new(store.clone());
    assert_eq!(monitor.check_once().await, 1);

    let alerts = store.list_alerts(Some("michael_brooks")).await.unwrap();
    assert!(alerts[0].last_triggered.is_some());
}

#[tokio::test]
async fn daily_sweep_covers_clients_with_watchlists() {
    let (pipeline, store) = build_pipeline(false);

    let mut with_watchlist = ClientProfile::new("michael_brooks");
    with_watchlist.watchlist = vec!["SMCI".to_string()];
    store.upsert_client(with_watchlist).await.unwrap();
    // A client without a watchlist is skipped
    store.upsert_client(ClientProfile::new("empty_client")).await.unwrap();

    let sweep = DailySweep::new(Arc::new(pipeline), store.clone());
    assert_eq!(sweep.run_once().await, 1);

    let page = store
        .list_reports(ReportQuery {
            client_id: Some("michael_brooks".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.reports.len(), 1);
}

#[tokio::test]
async fn chat_round_trip_keeps_session_history() {
    let chat = ChatService::new(Arc::new(CannedGenerator));
    let mut session = ChatSession::new(10);

    let reply = chat.reply(&mut session, "How did SMCI do?").await.unwrap();
    assert!(!reply.is_empty());
    assert_eq!(session.len(), 2);
}

#[test]
fn rate_limiter_gates_burst_traffic() {
    let limiter = RateLimiter::new(3, 60);

    for _ in 0..3 {
        assert!(limiter.is_allowed("michael_brooks"));
    }
    assert!(!limiter.is_allowed("michael_brooks"));
    // Other clients unaffected
    assert!(limiter.is_allowed("jane_doe"));
}
