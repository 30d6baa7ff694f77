pub mod chat;
pub mod daily;
pub mod watchlist;

use crate::error::LlmError;
use crate::llm::{Priority, TextGenerator};

use tracing::info;

/// A prompt persona. Each writer owns its system prompt; callers supply the
/// serialized day's inputs and pick a priority.
pub trait Writer {
    fn name(&self) -> &str;
    fn system_prompt(&self) -> &str;

    async fn run(&self, input: &str, llm: &dyn TextGenerator) -> Result<String, LlmError> {
        self.run_with_priority(input, llm, Priority::Normal).await
    }

    async fn run_high_priority(
        &self,
        input: &str,
        llm: &dyn TextGenerator,
    ) -> Result<String, LlmError> {
        self.run_with_priority(input, llm, Priority::High).await
    }

    async fn run_with_priority(
        &self,
        input: &str,
        llm: &dyn TextGenerator,
        priority: Priority,
    ) -> Result<String, LlmError> {
        info!("✍️ [WRITER] Dispatching {} request...", self.name());
        let response = llm.generate(self.system_prompt(), input, priority).await?;
        info!("✍️ [WRITER] {} returned {} chars", self.name(), response.len());
        Ok(response)
    }
}
