//! Eleven Labs text-to-speech provider (mp3 output).

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

use super::traits::SpeechApi;
use crate::error::TtsError;

const MODEL_ID: &str = "eleven_multilingual_v2";

pub struct ElevenLabsSpeech {
    client: Client,
    api_key: String,
    voice_id: String,
}

impl ElevenLabsSpeech {
    pub fn new(api_key: String, voice_id: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build Eleven Labs HTTP client"),
            api_key,
            voice_id,
        }
    }
}

#[async_trait]
impl SpeechApi for ElevenLabsSpeech {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn file_ext(&self) -> &'static str {
        "mp3"
    }

    fn content_type(&self) -> &'static str {
        "audio/mpeg"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let url = format!(
            "https://api.elevenlabs.io/v1/text-to-speech/{}",
            self.voice_id
        );

        let body = json!({
            "text": text,
            "model_id": MODEL_ID,
            "voice_settings": { "stability": 0.5, "similarity_boost": 0.75 },
        });

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::Provider {
                provider: "elevenlabs",
                reason: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(TtsError::Provider {
                provider: "elevenlabs",
                reason: format!("HTTP {}: {}", status, detail.chars().take(300).collect::<String>()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| TtsError::Provider {
            provider: "elevenlabs",
            reason: format!("body read failed: {}", e),
        })?;

        if bytes.is_empty() {
            return Err(TtsError::Provider {
                provider: "elevenlabs",
                reason: "empty audio body".to_string(),
            });
        }

        Ok(bytes.to_vec())
    }
}
