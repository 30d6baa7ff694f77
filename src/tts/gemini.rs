//! Gemini text-to-speech provider.
//!
//! The native generateContent endpoint returns base64 PCM (s16le, 24 kHz,
//! mono); we wrap it in a WAV header before handing it back.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use super::traits::SpeechApi;
use crate::error::TtsError;

const MODEL: &str = "gemini-2.5-flash-preview-tts";
const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const SAMPLE_RATE: u32 = 24_000;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

pub struct GeminiSpeech {
    client: Client,
    api_key: String,
    voice: String,
}

impl GeminiSpeech {
    pub fn new(api_key: String, voice: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(120))
                .build()
                .expect("Failed to build Gemini TTS HTTP client"),
            api_key,
            voice,
        }
    }
}

#[async_trait]
impl SpeechApi for GeminiSpeech {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn file_ext(&self) -> &'static str {
        "wav"
    }

    fn content_type(&self) -> &'static str {
        "audio/wav"
    }

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError> {
        let url = format!("{}/models/{}:generateContent?key={}", BASE_URL, MODEL, self.api_key);

        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.voice }
                    }
                }
            }
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsError::Provider {
                provider: "gemini",
                reason: format!("request failed: {}", e),
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(TtsError::Provider {
                provider: "gemini",
                reason: format!("HTTP {}: {}", status, detail.chars().take(300).collect::<String>()),
            });
        }

        let payload: Value = response.json().await.map_err(|e| TtsError::Provider {
            provider: "gemini",
            reason: format!("bad response payload: {}", e),
        })?;

        let encoded = payload
            .pointer("/candidates/0/content/parts/0/inlineData/data")
            .and_then(|v| v.as_str())
            .ok_or(TtsError::Provider {
                provider: "gemini",
                reason: "no inline audio data in response".to_string(),
            })?;

        let pcm = BASE64.decode(encoded).map_err(|e| TtsError::Provider {
            provider: "gemini",
            reason: format!("base64 decode failed: {}", e),
        })?;

        if pcm.is_empty() {
            return Err(TtsError::Provider {
                provider: "gemini",
                reason: "empty audio data".to_string(),
            });
        }

        Ok(wrap_wav(&pcm))
    }
}

/// Prepend a 44-byte RIFF/WAVE header to raw PCM samples.
fn wrap_wav(pcm: &[u8]) -> Vec<u8> {
    let byte_rate = SAMPLE_RATE * CHANNELS as u32 * BITS_PER_SAMPLE as u32 / 8;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let data_len = pcm.len() as u32;

    let mut wav = Vec::with_capacity(44 + pcm.len());
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&CHANNELS.to_le_bytes());
    wav.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.extend_from_slice(pcm);
    wav
}
