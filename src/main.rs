mod api;
mod cli;
mod config;
mod error;
mod llm;
pub mod services;
mod store;
mod tts;
mod writers;

use std::sync::Arc;

use api::{run_server, AppState};
use config::AppConfig;
use llm::{LlmClient, LlmQueue};
use services::alerts::AlertMonitor;
use services::chat::{ChatService, ChatSession};
use services::pipeline::ReportPipeline;
use services::rate_limit::RateLimiter;
use services::scheduler::DailySweep;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // Setup Logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting DailyBrief...");

    // Load Configuration
    let config = AppConfig::load();
    info!(
        "Loaded configuration (store: {}, objects: {}, tts: {})",
        config.document_store.backend, config.object_store.backend, config.tts.provider
    );

    // Initialize model client + queue
    let api_key = config.llm.api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        warn!("No LLM API key configured; generation requests will fail");
    }
    if let Some(url) = &config.llm.base_url {
        info!("Using custom model base URL: {}", url);
    }
    info!("Using model: {}", config.llm.model);

    let llm_client = LlmClient::new(api_key, config.llm.base_url.clone(), config.llm.model.clone());

    info!(
        "📬 Initializing LLM queue (max concurrent: {}, size: {})...",
        config.llm.max_concurrent, config.llm.queue_size
    );
    let llm_queue = LlmQueue::new(llm_client, config.llm.max_concurrent, config.llm.queue_size);

    // Storage backends
    let (document_store, object_store) = store::build_stores(&config);
    info!(
        "💾 Stores ready (documents: {}, objects: {})",
        document_store.name(),
        object_store.name()
    );

    // Speech synthesis
    let synthesizer = Arc::new(tts::factory::build_synthesizer(&config));
    if synthesizer.is_enabled() {
        info!("🔊 TTS providers: {:?}", synthesizer.provider_names());
    } else {
        info!("🔇 TTS disabled");
    }

    let generator = Arc::new(llm_queue.clone());
    let pipeline = ReportPipeline::new(
        generator.clone(),
        document_store.clone(),
        object_store.clone(),
        synthesizer.clone(),
        config.clone(),
    );

    let chat = ChatService::new(generator);
    let rate_limiter = RateLimiter::new(config.rate_limit.max_requests, config.rate_limit.window_secs);

    let state = Arc::new(AppState {
        chat_session: tokio::sync::Mutex::new(ChatSession::new(config.chat_history_limit)),
        pipeline: pipeline.clone(),
        store: document_store.clone(),
        objects: object_store,
        synthesizer,
        chat,
        rate_limiter,
        config: config.clone(),
    });

    let sweep = DailySweep::new(Arc::new(pipeline), document_store.clone());

    // Mode dispatch: serve (default) | repl | daily
    let mode = std::env::args().nth(1).unwrap_or_else(|| "serve".to_string());
    match mode.as_str() {
        "repl" => {
            cli::run_repl(state).await;
        }
        "daily" => {
            let generated = sweep.run_once().await;
            info!("Daily run complete: {} report(s)", generated);
        }
        "serve" => {
            if let Err(e) = sweep.start(&config.schedule.daily_cron).await {
                warn!("⚠️ Could not schedule daily sweep: {}", e);
            }

            let alert_monitor = AlertMonitor::new(document_store);
            if let Err(e) = alert_monitor.start(&config.schedule.alert_cron).await {
                warn!("⚠️ Could not schedule alert monitor: {}", e);
            }

            info!("Initializing API server...");
            run_server(state).await;
        }
        other => {
            eprintln!("Unknown mode '{}' (expected serve|repl|daily)", other);
            std::process::exit(2);
        }
    }

    Ok(())
}
