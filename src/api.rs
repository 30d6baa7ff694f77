use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{user_message, BriefingError};
use crate::llm::Priority;
use crate::services::chat::{ChatService, ChatSession};
use crate::services::pipeline::{GenerateRequest, ReportPipeline};
use crate::services::rate_limit::RateLimiter;
use crate::store::types::{AlertCondition, AlertRule, ClientProfile, ReportQuery};
use crate::store::{DocumentStore, ObjectStore};
use crate::tts::SpeechSynthesizer;

pub struct AppState {
    pub config: AppConfig,
    pub pipeline: ReportPipeline,
    pub store: Arc<dyn DocumentStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub synthesizer: Arc<SpeechSynthesizer>,
    pub chat: ChatService,
    pub chat_session: tokio::sync::Mutex<ChatSession>,
    pub rate_limiter: RateLimiter,
}

pub async fn run_server(state: Arc<AppState>) {
    let port = state.config.server.port;

    let app = Router::new()
        .route("/reports/generate", post(generate_report))
        .route("/reports/generate/watchlist", post(generate_watchlist_report))
        .route("/reports", get(list_reports))
        .route("/reports/{date}", get(get_report))
        .route("/reports/{date}/audio", get(get_report_audio))
        .route("/clients/{id}", get(get_client))
        .route("/clients/{id}/watchlist", put(put_watchlist))
        .route("/alerts", post(create_alert).get(list_alerts))
        .route("/alerts/{id}", delete(delete_alert))
        .route("/chat/message", post(chat_message))
        .route("/health", get(health))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await.unwrap();
    info!("API server listening on port {}", port);
    axum::serve(listener, app).await.unwrap();
}

/// Uncaught pipeline/store errors become 500s with static friendly text;
/// validation maps to 400, lookups to 404, throttling to 429. Raw detail is
/// logged here and goes no further.
fn error_response(error: BriefingError) -> Response {
    let status = match &error {
        BriefingError::Validation { .. } => StatusCode::BAD_REQUEST,
        BriefingError::ReportNotFound { .. } => StatusCode::NOT_FOUND,
        BriefingError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("❌ [API] {:?}", error);
    } else {
        warn!("⚠️ [API] {}", error);
    }

    (status, Json(json!({ "error": user_message(&error) }))).into_response()
}

fn validate_client_id(client_id: &str) -> Result<(), BriefingError> {
    let ok = !client_id.is_empty()
        && client_id.len() <= 64
        && client_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(BriefingError::Validation {
            field: "client_id".to_string(),
            reason: format!("'{}' is not a valid client id", client_id),
        })
    }
}

fn validate_trading_date(date: &str) -> Result<(), BriefingError> {
    if chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok() {
        Ok(())
    } else {
        Err(BriefingError::Validation {
            field: "trading_date".to_string(),
            reason: format!("'{}' is not a YYYY-MM-DD date", date),
        })
    }
}

fn validate_ticker(ticker: &str) -> Result<(), BriefingError> {
    let ok = !ticker.is_empty()
        && ticker.len() <= 10
        && ticker
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(BriefingError::Validation {
            field: "ticker".to_string(),
            reason: format!("'{}' is not a valid ticker", ticker),
        })
    }
}

async fn generate_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateRequest>,
) -> Response {
    let client_id = request
        .client_id
        .clone()
        .unwrap_or_else(|| state.config.default_client_id.clone());

    if let Err(e) = validate_client_id(&client_id) {
        return error_response(e);
    }

    if !state.rate_limiter.is_allowed(&client_id) {
        return error_response(BriefingError::RateLimited {
            key: client_id,
            window_secs: state.rate_limiter.window_secs(),
        });
    }

    match state.pipeline.generate_daily(request, Priority::High).await {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct WatchlistGenerateRequest {
    client_id: String,
    watchlist: Vec<String>,
    trading_date: Option<String>,
}

async fn generate_watchlist_report(
    State(state): State<Arc<AppState>>,
    Json(request): Json<WatchlistGenerateRequest>,
) -> Response {
    if let Err(e) = validate_client_id(&request.client_id) {
        return error_response(e);
    }
    for ticker in &request.watchlist {
        if let Err(e) = validate_ticker(ticker) {
            return error_response(e);
        }
    }

    if !state.rate_limiter.is_allowed(&request.client_id) {
        return error_response(BriefingError::RateLimited {
            key: request.client_id,
            window_secs: state.rate_limiter.window_secs(),
        });
    }

    match state
        .pipeline
        .generate_watchlist(
            &request.client_id,
            request.watchlist,
            request.trading_date,
            Priority::High,
        )
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Deserialize)]
struct ClientParam {
    client_id: Option<String>,
}

async fn get_report(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Query(params): Query<ClientParam>,
) -> Response {
    let client_id = params
        .client_id
        .unwrap_or_else(|| state.config.default_client_id.clone());

    if let Err(e) = validate_trading_date(&date) {
        return error_response(e);
    }

    match state.store.get_report(&client_id, &date).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => error_response(BriefingError::ReportNotFound {
            client_id,
            trading_date: date,
        }),
        Err(e) => error_response(e.into()),
    }
}

async fn get_report_audio(
    State(state): State<Arc<AppState>>,
    Path(date): Path<String>,
    Query(params): Query<ClientParam>,
) -> Response {
    let client_id = params
        .client_id
        .unwrap_or_else(|| state.config.default_client_id.clone());

    if let Err(e) = validate_trading_date(&date) {
        return error_response(e);
    }

    match state.store.get_report(&client_id, &date).await {
        Ok(Some(record)) => match record.audio_gcs_path {
            Some(path) => Json(json!({
                "client_id": record.client_id,
                "trading_date": record.trading_date,
                "audio_gcs_path": path,
            }))
            .into_response(),
            None => error_response(BriefingError::ReportNotFound {
                client_id,
                trading_date: date,
            }),
        },
        Ok(None) => error_response(BriefingError::ReportNotFound {
            client_id,
            trading_date: date,
        }),
        Err(e) => error_response(e.into()),
    }
}

#[derive(Deserialize)]
struct ListParams {
    client_id: Option<String>,
    limit: Option<usize>,
    start_after: Option<String>,
}

/// Listing never 500s: store failures degrade to an empty page with an error
/// field so history views render instead of crashing.
async fn list_reports(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Response {
    let query = ReportQuery {
        client_id: params.client_id,
        limit: params.limit.unwrap_or(0),
        start_after: params.start_after,
    };

    match state.store.list_reports(query).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => {
            error!("❌ [API] Report listing failed: {:?}", e);
            Json(json!({
                "reports": [],
                "has_more": false,
                "last_date": null,
                "error": user_message(&BriefingError::Store(e)),
            }))
            .into_response()
        }
    }
}

async fn get_client(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store.get_client(&id).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "Client not found." })),
        )
            .into_response(),
        Err(e) => error_response(e.into()),
    }
}

#[derive(Deserialize)]
struct WatchlistUpdate {
    watchlist: Vec<String>,
}

async fn put_watchlist(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(update): Json<WatchlistUpdate>,
) -> Response {
    if let Err(e) = validate_client_id(&id) {
        return error_response(e);
    }
    for ticker in &update.watchlist {
        if let Err(e) = validate_ticker(ticker) {
            return error_response(e);
        }
    }

    let mut profile = match state.store.get_client(&id).await {
        Ok(Some(profile)) => profile,
        Ok(None) => ClientProfile::new(&id),
        Err(e) => return error_response(e.into()),
    };
    profile.watchlist = update.watchlist;

    match state.store.upsert_client(profile.clone()).await {
        Ok(()) => Json(profile).into_response(),
        Err(e) => error_response(e.into()),
    }
}

#[derive(Deserialize)]
struct CreateAlertRequest {
    client_id: String,
    ticker: String,
    condition: AlertCondition,
    threshold: f64,
    notify_email: String,
}

async fn create_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateAlertRequest>,
) -> Response {
    if let Err(e) = validate_client_id(&request.client_id) {
        return error_response(e);
    }
    if let Err(e) = validate_ticker(&request.ticker) {
        return error_response(e);
    }

    let alert = AlertRule {
        id: Uuid::new_v4().to_string(),
        client_id: request.client_id,
        ticker: request.ticker.to_uppercase(),
        condition: request.condition,
        threshold: request.threshold,
        notify_email: request.notify_email,
        last_triggered: None,
        active: true,
    };

    match state.store.insert_alert(alert).await {
        Ok(stored) => (StatusCode::CREATED, Json(stored)).into_response(),
        Err(e) => error_response(e.into()),
    }
}

async fn list_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClientParam>,
) -> Response {
    match state.store.list_alerts(params.client_id.as_deref()).await {
        Ok(alerts) => Json(alerts).into_response(),
        Err(e) => error_response(e.into()),
    }
}

async fn delete_alert(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> Response {
    match state.store.delete_alert(&id).await {
        Ok(()) => Json(json!({ "status": "deleted" })).into_response(),
        Err(e) => error_response(e.into()),
    }
}

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

async fn chat_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return error_response(BriefingError::Validation {
            field: "message".to_string(),
            reason: "message must not be empty".to_string(),
        });
    }

    let chat_key = format!("chat:{}", state.config.default_client_id);
    if !state.rate_limiter.is_allowed(&chat_key) {
        return error_response(BriefingError::RateLimited {
            key: chat_key,
            window_secs: state.rate_limiter.window_secs(),
        });
    }

    let mut session = state.chat_session.lock().await;
    match state.chat.reply(&mut session, &request.message).await {
        Ok(response) => Json(json!({ "response": response })).into_response(),
        Err(e) => error_response(e.into()),
    }
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let store_ok = state.store.ping().await.is_ok();
    let objects_ok = state.objects.ping().await.is_ok();
    let llm_ok = state.config.llm.api_key.as_deref().map(|k| !k.is_empty()).unwrap_or(false);
    let tts = if state.synthesizer.is_enabled() {
        json!(state.synthesizer.provider_names())
    } else {
        json!("disabled")
    };

    let healthy = store_ok && objects_ok && llm_ok;
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };

    (
        status,
        Json(json!({
            "status": if healthy { "ok" } else { "degraded" },
            "components": {
                "store": if store_ok { "ok" } else { "error" },
                "object_store": if objects_ok { "ok" } else { "error" },
                "llm": if llm_ok { "configured" } else { "missing_key" },
                "tts": tts,
            }
        })),
    )
        .into_response()
}
