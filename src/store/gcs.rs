//! Cloud Storage backend for synthesized audio (JSON upload API).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::auth::GcpTokenProvider;
use super::{ObjectStore, StoreResult};
use crate::error::StoreError;

const BACKEND: &str = "gcs";

pub struct GcsStore {
    client: Client,
    bucket: String,
    auth: GcpTokenProvider,
}

impl GcsStore {
    pub fn new(bucket: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(60))
                .build()
                .expect("Failed to build GCS HTTP client"),
            bucket,
            auth: GcpTokenProvider::new(BACKEND),
        }
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    fn name(&self) -> &'static str {
        BACKEND
    }

    async fn ping(&self) -> StoreResult<()> {
        let token = self.auth.token().await?;
        let url = format!("https://storage.googleapis.com/storage/v1/b/{}", self.bucket);
        let response = self.client.get(&url).bearer_auth(token).send().await?;
        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            Ok(())
        } else {
            Err(http_error(status, response.text().await.unwrap_or_default()))
        }
    }

    async fn put(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> StoreResult<String> {
        let token = self.auth.token().await?;
        // Object names with slashes must be percent-encoded in the query param
        let encoded = path.replace('/', "%2F");
        let url = format!(
            "https://storage.googleapis.com/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket, encoded
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status().as_u16();
        if (200..300).contains(&status) {
            Ok(format!("gs://{}/{}", self.bucket, path))
        } else {
            Err(http_error(status, response.text().await.unwrap_or_default()))
        }
    }
}

fn http_error(status: u16, body: String) -> StoreError {
    StoreError::Http {
        backend: BACKEND,
        status,
        body: body.chars().take(400).collect(),
    }
}
