//! Bearer-token source for the GCP REST backends.
//!
//! Order: `GCP_ACCESS_TOKEN` from the environment (local dev, CI), then the
//! GCE metadata server (deployed). Metadata tokens are cached until shortly
//! before expiry.

use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::error::StoreError;

const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";
const EXPIRY_SLACK: Duration = Duration::from_secs(60);

#[derive(Deserialize)]
struct MetadataToken {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    fetched: Instant,
    ttl: Duration,
}

pub struct GcpTokenProvider {
    backend: &'static str,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl GcpTokenProvider {
    pub fn new(backend: &'static str) -> Self {
        Self {
            backend,
            client: Client::builder()
                .timeout(Duration::from_secs(5))
                .build()
                .expect("Failed to build metadata HTTP client"),
            cached: Mutex::new(None),
        }
    }

    pub async fn token(&self) -> Result<String, StoreError> {
        if let Ok(token) = env::var("GCP_ACCESS_TOKEN") {
            return Ok(token);
        }

        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.as_ref() {
            if entry.fetched.elapsed() + EXPIRY_SLACK < entry.ttl {
                return Ok(entry.token.clone());
            }
        }

        let response = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|e| StoreError::AuthFailed {
                backend: self.backend,
                reason: format!("metadata server unreachable: {}", e),
            })?;

        if !response.status().is_success() {
            return Err(StoreError::AuthFailed {
                backend: self.backend,
                reason: format!("metadata server returned {}", response.status()),
            });
        }

        let token: MetadataToken =
            response.json().await.map_err(|e| StoreError::AuthFailed {
                backend: self.backend,
                reason: format!("bad metadata token payload: {}", e),
            })?;

        *cached = Some(CachedToken {
            token: token.access_token.clone(),
            fetched: Instant::now(),
            ttl: Duration::from_secs(token.expires_in),
        });

        Ok(token.access_token)
    }
}
