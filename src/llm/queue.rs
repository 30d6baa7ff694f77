use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tracing::info;

use super::LlmClient;
use crate::error::LlmError;

/// Priority level for model requests
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// High priority: interactive requests (API-triggered generation, chat)
    High,
    /// Normal priority: scheduled daily sweeps
    Normal,
}

struct QueuedRequest {
    system_prompt: String,
    user_input: String,
    response_tx: oneshot::Sender<Result<String, LlmError>>,
}

/// Bounds concurrent model calls and lets interactive requests jump ahead of
/// scheduled batch work.
#[derive(Clone)]
pub struct LlmQueue {
    high_tx: mpsc::Sender<QueuedRequest>,
    normal_tx: mpsc::Sender<QueuedRequest>,
}

impl LlmQueue {
    pub fn new(client: LlmClient, max_concurrent: usize, queue_size: usize) -> Self {
        let (high_tx, high_rx) = mpsc::channel::<QueuedRequest>(queue_size);
        let (normal_tx, normal_rx) = mpsc::channel::<QueuedRequest>(queue_size);

        let semaphore = Arc::new(Semaphore::new(max_concurrent));

        tokio::spawn(Self::process_queue(client, semaphore, high_rx, normal_rx));

        Self { high_tx, normal_tx }
    }

    async fn process_queue(
        client: LlmClient,
        semaphore: Arc<Semaphore>,
        mut high_rx: mpsc::Receiver<QueuedRequest>,
        mut normal_rx: mpsc::Receiver<QueuedRequest>,
    ) {
        info!(
            "📬 [QUEUE] LLM queue processor started (max concurrent: {})",
            semaphore.available_permits()
        );

        loop {
            let request = tokio::select! {
                biased;

                Some(req) = high_rx.recv() => req,
                Some(req) = normal_rx.recv() => req,
                else => {
                    info!("📬 [QUEUE] All channels closed, shutting down");
                    break;
                }
            };

            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    let _ = request.response_tx.send(Err(LlmError::QueueClosed));
                    continue;
                }
            };

            let client_clone = client.clone();
            tokio::spawn(async move {
                let result = client_clone
                    .chat(&request.system_prompt, &request.user_input)
                    .await;

                let _ = request.response_tx.send(result);
                drop(permit);
            });
        }
    }

    pub async fn chat(
        &self,
        system_prompt: &str,
        user_input: &str,
        priority: Priority,
    ) -> Result<String, LlmError> {
        let (response_tx, response_rx) = oneshot::channel();

        let request = QueuedRequest {
            system_prompt: system_prompt.to_string(),
            user_input: user_input.to_string(),
            response_tx,
        };

        let send_result = match priority {
            Priority::High => self.high_tx.send(request).await,
            Priority::Normal => self.normal_tx.send(request).await,
        };

        if send_result.is_err() {
            return Err(LlmError::QueueClosed);
        }

        match response_rx.await {
            Ok(result) => result,
            Err(_) => Err(LlmError::Cancelled),
        }
    }
}
