use async_trait::async_trait;

use crate::error::TtsError;

#[async_trait]
pub trait SpeechApi: Send + Sync {
    fn name(&self) -> &'static str;
    fn file_ext(&self) -> &'static str;
    fn content_type(&self) -> &'static str;

    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, TtsError>;
}
