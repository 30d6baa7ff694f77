pub mod parse;
pub mod queue;
pub mod retry;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{ChatCompletionRequestMessage, CreateChatCompletionRequestArgs},
    Client,
};
use async_trait::async_trait;
use tracing::info;

use crate::error::LlmError;

pub use queue::{LlmQueue, Priority};

/// Seam between callers and the model queue. Production uses [`LlmQueue`];
/// tests substitute canned generators.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        user_input: &str,
        priority: Priority,
    ) -> Result<String, LlmError>;
}

#[async_trait]
impl TextGenerator for LlmQueue {
    async fn generate(
        &self,
        system_prompt: &str,
        user_input: &str,
        priority: Priority,
    ) -> Result<String, LlmError> {
        self.chat(system_prompt, user_input, priority).await
    }
}

/// Gemini's OpenAI-compatible chat endpoint. Overridable for other providers
/// or a local model.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

#[derive(Clone)]
pub struct LlmClient {
    pub client: Client<OpenAIConfig>,
    pub model: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: Option<String>, model: String) -> Self {
        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()));
        let client = Client::with_config(config);
        Self { client, model }
    }

    pub async fn chat(&self, system_prompt: &str, user_input: &str) -> Result<String, LlmError> {
        info!("🤖 Sending request to model {} ({} prompt chars)", self.model, user_input.len());

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages([
                ChatCompletionRequestMessage::System(
                    async_openai::types::ChatCompletionRequestSystemMessageArgs::default()
                        .content(system_prompt)
                        .build()
                        .map_err(|e| LlmError::Api(e.to_string()))?,
                ),
                ChatCompletionRequestMessage::User(
                    async_openai::types::ChatCompletionRequestUserMessageArgs::default()
                        .content(user_input)
                        .build()
                        .map_err(|e| LlmError::Api(e.to_string()))?,
                ),
            ])
            .build()
            .map_err(|e| LlmError::Api(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(classify_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        info!("🤖 Model response received ({} chars)", content.len());
        Ok(content)
    }
}

fn classify_openai_error(err: OpenAIError) -> LlmError {
    match err {
        OpenAIError::Reqwest(e) => LlmError::Transport(e.to_string()),
        other => LlmError::Api(other.to_string()),
    }
}
