//! Unit tests for configuration structures and parsing.

#[cfg(test)]
mod config_tests {
    use crate::config::*;

    fn create_test_config() -> AppConfig {
        let yaml = r#"
server:
  port: 3000

llm:
  api_key: "test-key"
  base_url: "http://localhost:11434/v1"
  model: "gemini-2.0-flash"
  queue_size: 100
  max_concurrent: 3

tts:
  provider: "elevenlabs"
  fallback: "gemini"
  elevenlabs_api_key: "xi-test"
  elevenlabs_voice_id: "Rachel"
  gemini_voice: "Kore"

document_store:
  backend: "firestore"
  project_id: "briefing-prod"
  database: "(default)"

object_store:
  backend: "gcs"
  bucket: "briefing-audio"

rate_limit:
  max_requests: 10
  window_secs: 60

schedule:
  daily_cron: "0 0 13 * * *"
  alert_cron: "0 */15 * * * *"

cache_ttl_secs: 120
default_client_id: "michael_brooks"
chat_history_limit: 20

client_overrides:
  "michael_brooks":
    tts_provider: "gemini"
    sections:
      macro: false
  "jane_doe":
    tts_provider: null
"#;
        serde_yaml::from_str(yaml).unwrap()
    }

    // ============= Section Parsing Tests =============

    #[test]
    fn test_llm_config_full() {
        let yaml = r#"
api_key: "sk-test123"
base_url: "https://generativelanguage.googleapis.com/v1beta/openai"
model: "gemini-2.0-flash"
queue_size: 50
max_concurrent: 2
max_attempts: 5
"#;
        let config: LlmConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.api_key, Some("sk-test123".to_string()));
        assert_eq!(config.model, "gemini-2.0-flash");
        assert_eq!(config.max_attempts, 5);
    }

    #[test]
    fn test_llm_config_default_attempts() {
        let yaml = r#"
api_key: null
base_url: null
model: "local"
queue_size: 10
max_concurrent: 1
"#;
        let config: LlmConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.api_key, None);
        assert_eq!(config.max_attempts, 3);
    }

    #[test]
    fn test_tts_config() {
        let yaml = r#"
provider: "gemini"
fallback: null
elevenlabs_api_key: null
elevenlabs_voice_id: "Rachel"
gemini_voice: "Kore"
"#;
        let config: TtsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.provider, "gemini");
        assert!(config.fallback.is_none());
    }

    #[test]
    fn test_rate_limit_config() {
        let yaml = r#"
max_requests: 5
window_secs: 30
"#;
        let config: RateLimitConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.max_requests, 5);
        assert_eq!(config.window_secs, 30);
    }

    // ============= Full Config Tests =============

    #[test]
    fn test_full_config_deserialize() {
        let config = create_test_config();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.document_store.backend, "firestore");
        assert_eq!(config.object_store.bucket.as_deref(), Some("briefing-audio"));
        assert_eq!(config.default_client_id, "michael_brooks");
        assert_eq!(config.cache_ttl_secs, 120);
    }

    #[test]
    fn test_config_clone_and_debug() {
        let config = create_test_config();
        let cloned = config.clone();

        assert_eq!(cloned.server.port, config.server.port);
        let debug = format!("{:?}", config);
        assert!(debug.contains("AppConfig"));
    }

    // ============= Client Override Tests =============

    #[test]
    fn test_tts_provider_override() {
        let config = create_test_config();

        let (primary, fallback) = config.tts_providers_for("michael_brooks");
        assert_eq!(primary, "gemini");
        assert_eq!(fallback.as_deref(), Some("gemini"));

        // No override -> global default
        let (primary, _) = config.tts_providers_for("unknown_client");
        assert_eq!(primary, "elevenlabs");

        // Override entry present but provider unset -> global default
        let (primary, _) = config.tts_providers_for("jane_doe");
        assert_eq!(primary, "elevenlabs");
    }

    #[test]
    fn test_section_toggles() {
        let config = create_test_config();

        assert!(!config.section_enabled("michael_brooks", "macro"));
        // Unlisted section defaults to on
        assert!(config.section_enabled("michael_brooks", "news"));
        // Unknown client defaults to on
        assert!(config.section_enabled("unknown_client", "macro"));
    }

    // ============= Env Override Tests =============

    #[test]
    fn test_env_overrides_applied() {
        // Env mutation: keep all env-dependent assertions in this one test
        std::env::set_var("GEMINI_API_KEY", "env-key");
        std::env::set_var("BRIEF_BUCKET", "env-bucket");
        std::env::set_var("PORT", "8080");

        let mut config = create_test_config();
        config.apply_env_overrides();

        assert_eq!(config.llm.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.object_store.bucket.as_deref(), Some("env-bucket"));
        assert_eq!(config.server.port, 8080);

        std::env::remove_var("GEMINI_API_KEY");
        std::env::remove_var("BRIEF_BUCKET");
        std::env::remove_var("PORT");

        // Invalid port values are ignored
        std::env::set_var("PORT", "not-a-port");
        let mut config = create_test_config();
        config.apply_env_overrides();
        assert_eq!(config.server.port, 3000);
        std::env::remove_var("PORT");
    }
}
