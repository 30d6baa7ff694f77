use std::sync::Arc;

use crate::config::AppConfig;

use super::elevenlabs::ElevenLabsSpeech;
use super::gemini::GeminiSpeech;
use super::traits::SpeechApi;
use super::SpeechSynthesizer;

pub fn build_synthesizer(config: &AppConfig) -> SpeechSynthesizer {
    let mut names = vec![config.tts.provider.clone()];
    if let Some(fallback) = &config.tts.fallback {
        if !names.contains(fallback) {
            names.push(fallback.clone());
        }
    }

    let mut providers: Vec<Arc<dyn SpeechApi>> = Vec::new();
    for name in names {
        match name.to_lowercase().as_str() {
            "elevenlabs" => {
                let api_key = config
                    .tts
                    .elevenlabs_api_key
                    .clone()
                    .expect("tts.elevenlabs_api_key required for elevenlabs provider");
                providers.push(Arc::new(ElevenLabsSpeech::new(
                    api_key,
                    config.tts.elevenlabs_voice_id.clone(),
                )));
            }
            "gemini" => {
                let api_key = config
                    .llm
                    .api_key
                    .clone()
                    .expect("llm.api_key required for gemini TTS provider");
                providers.push(Arc::new(GeminiSpeech::new(
                    api_key,
                    config.tts.gemini_voice.clone(),
                )));
            }
            "none" => {}
            other => panic!("Unknown tts provider '{}' (expected elevenlabs|gemini|none)", other),
        }
    }

    SpeechSynthesizer::new(providers)
}
