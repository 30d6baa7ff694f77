use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;

#[derive(Clone, Debug, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Clone, Debug, Deserialize)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub queue_size: usize,
    pub max_concurrent: usize,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_max_attempts() -> u32 {
    3
}

#[derive(Clone, Debug, Deserialize)]
pub struct TtsConfig {
    /// "elevenlabs" | "gemini" | "none"
    pub provider: String,
    /// Optional second provider tried when the first one errors
    pub fallback: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: String,
    pub gemini_voice: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct DocumentStoreConfig {
    /// "firestore" | "memory"
    pub backend: String,
    pub project_id: Option<String>,
    pub database: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ObjectStoreConfig {
    /// "gcs" | "memory"
    pub backend: String,
    pub bucket: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ScheduleConfig {
    /// 6-field cron, e.g. "0 0 13 * * *" for 13:00 UTC daily
    pub daily_cron: String,
    pub alert_cron: String,
}

/// Per-client overrides for voice and report sections
#[derive(Clone, Debug, Deserialize)]
pub struct ClientOverride {
    pub tts_provider: Option<String>,
    pub sections: Option<HashMap<String, bool>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub document_store: DocumentStoreConfig,
    pub object_store: ObjectStoreConfig,
    pub rate_limit: RateLimitConfig,
    pub schedule: ScheduleConfig,

    pub cache_ttl_secs: u64,
    pub default_client_id: String,
    pub chat_history_limit: usize,

    pub client_overrides: Option<HashMap<String, ClientOverride>>,
}

impl AppConfig {
    pub fn load() -> Self {
        let config_path = env::var("BRIEF_CONFIG").unwrap_or_else(|_| "config.yaml".to_string());
        let content = fs::read_to_string(&config_path)
            .unwrap_or_else(|e| panic!("Failed to read {}: {}", config_path, e));

        // Strip BOM if present
        let content = content.strip_prefix("\u{feff}").unwrap_or(&content);

        let mut config: AppConfig =
            serde_yaml::from_str(content).expect("Failed to parse config.yaml");
        config.apply_env_overrides();
        config
    }

    /// Secrets and deploy knobs come from the environment when present.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(key) = env::var("GEMINI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Ok(key) = env::var("ELEVENLABS_API_KEY") {
            self.tts.elevenlabs_api_key = Some(key);
        }
        if let Ok(project) = env::var("GCP_PROJECT_ID") {
            self.document_store.project_id = Some(project);
        }
        if let Ok(bucket) = env::var("BRIEF_BUCKET") {
            self.object_store.bucket = Some(bucket);
        }
        if let Ok(port) = env::var("PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
    }

    /// Effective TTS provider order for a client: (primary, fallback)
    pub fn tts_providers_for(&self, client_id: &str) -> (String, Option<String>) {
        let mut primary = self.tts.provider.clone();
        if let Some(overrides) = &self.client_overrides {
            if let Some(c) = overrides.get(client_id) {
                if let Some(p) = &c.tts_provider {
                    primary = p.clone();
                }
            }
        }
        (primary, self.tts.fallback.clone())
    }

    /// Whether a report section is enabled for a client (defaults to on)
    pub fn section_enabled(&self, client_id: &str, section: &str) -> bool {
        if let Some(overrides) = &self.client_overrides {
            if let Some(c) = overrides.get(client_id) {
                if let Some(sections) = &c.sections {
                    if let Some(enabled) = sections.get(section) {
                        return *enabled;
                    }
                }
            }
        }
        true
    }
}
