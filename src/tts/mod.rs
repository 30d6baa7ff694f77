pub mod elevenlabs;
pub mod factory;
pub mod traits;


pub mod gemini;

use std::sync::Arc;
use tracing::warn;

use crate::error::TtsError;

pub use traits::SpeechApi;

/// Synthesized speech plus the metadata needed to store and serve it.
#[derive(Debug)]
pub struct SpeechAudio {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_ext: &'static str,
    pub provider: &'static str,
}

/// Tries providers in configured order; any provider error falls through to
/// the next. No retry inside: retry policy, if any, belongs to the caller.
pub struct SpeechSynthesizer {
    providers: Vec<Arc<dyn SpeechApi>>,
}

impl SpeechSynthesizer {
    pub fn new(providers: Vec<Arc<dyn SpeechApi>>) -> Self {
        Self { providers }
    }

    pub fn disabled() -> Self {
        Self { providers: Vec::new() }
    }

    pub fn is_enabled(&self) -> bool {
        !self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// `provider` pins synthesis to one named provider; otherwise the
    /// configured primary/fallback order applies.
    pub async fn synthesize(
        &self,
        text: &str,
        provider: Option<&str>,
    ) -> Result<SpeechAudio, TtsError> {
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }

        let candidates: Vec<&Arc<dyn SpeechApi>> = match provider {
            Some(name) => self.providers.iter().filter(|p| p.name() == name).collect(),
            None => self.providers.iter().collect(),
        };

        if candidates.is_empty() {
            return Err(TtsError::AllProvidersFailed {
                last_error: match provider {
                    Some(name) => format!("no provider named '{}'", name),
                    None => "no providers configured".to_string(),
                },
                text_len: text.len(),
            });
        }

        let mut last_error = String::new();
        for candidate in candidates {
            match candidate.synthesize(text).await {
                Ok(bytes) => {
                    return Ok(SpeechAudio {
                        bytes,
                        content_type: candidate.content_type(),
                        file_ext: candidate.file_ext(),
                        provider: candidate.name(),
                    })
                }
                Err(e) => {
                    warn!("🔇 [TTS] Provider {} failed, trying next: {}", candidate.name(), e);
                    last_error = e.to_string();
                }
            }
        }

        Err(TtsError::AllProvidersFailed {
            last_error,
            text_len: text.len(),
        })
    }
}
