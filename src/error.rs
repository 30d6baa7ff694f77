//! Custom error types for the briefing service
//!
//! Provides structured, typed errors instead of generic Box<dyn Error>

use thiserror::Error;

/// Top-level briefing service errors
#[derive(Error, Debug)]
pub enum BriefingError {
    #[error("Validation failed for {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Rate limited for {key} (window: {window_secs}s)")]
    RateLimited { key: String, window_secs: u64 },

    #[error("Report not found: {client_id}/{trading_date}")]
    ReportNotFound {
        client_id: String,
        trading_date: String,
    },

    #[error("Text generation failed: {0}")]
    Llm(#[from] LlmError),

    #[error("Response parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Audio synthesis failed: {0}")]
    Tts(#[from] TtsError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors from the text-generation layer
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("Transport error calling model API: {0}")]
    Transport(String),

    #[error("Model API error: {0}")]
    Api(String),

    #[error("LLM request queue is closed")]
    QueueClosed,

    #[error("LLM request was cancelled")]
    Cancelled,
}

impl LlmError {
    /// Network-class failures are the only ones worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transport(_))
    }
}

/// Errors from decoding a model response into a structured brief
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Empty model response")]
    Empty,

    #[error("No JSON object found in model response (snippet: {snippet})")]
    NoJsonObject { snippet: String },

    #[error("Invalid JSON after repair: {message} (snippet: {snippet})")]
    Invalid { message: String, snippet: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },
}

/// Document / object store errors
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP {status} from {backend}: {body}")]
    Http {
        backend: &'static str,
        status: u16,
        body: String,
    },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Auth failed for {backend}: {reason}")]
    AuthFailed {
        backend: &'static str,
        reason: String,
    },

    #[error("Document not found: {path}")]
    NotFound { path: String },

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
}

/// Speech synthesis errors
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("Cannot synthesize empty text")]
    EmptyText,

    #[error("Provider {provider} failed: {reason}")]
    Provider { provider: &'static str, reason: String },

    #[error("TTS generation failed across all providers (last: {last_error}, text length: {text_len})")]
    AllProvidersFailed { last_error: String, text_len: usize },
}

/// Static user-facing text per error category. Raw error detail stays in the
/// server logs and never reaches API clients.
pub fn user_message(error: &BriefingError) -> &'static str {
    match error {
        BriefingError::Validation { .. } => "Invalid request. Check the date, client id and tickers.",
        BriefingError::RateLimited { .. } => "Too many requests. Please wait a moment and try again.",
        BriefingError::ReportNotFound { .. } => "Report not available yet.",
        BriefingError::Llm(_) | BriefingError::Parse(_) => {
            "Report generation failed. Please try again later."
        }
        BriefingError::Store(_) => "Storage is temporarily unavailable. Please try again later.",
        BriefingError::Tts(_) => "Audio is unavailable for this report.",
        BriefingError::Config(_) => "Service is misconfigured. Contact the operator.",
    }
}
