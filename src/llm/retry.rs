//! Retry-with-backoff around model calls. Only transport-class errors are
//! retried; API and parse failures surface immediately.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::LlmError;

pub async fn with_backoff<F, Fut, T>(max_attempts: u32, operation: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_error = None;

    for attempt in 1..=max_attempts.max(1) {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                let base_ms = 250u64 * 2u64.pow(attempt - 1);
                let jitter_ms = rand::thread_rng().gen_range(0..base_ms / 2 + 1);
                let delay = Duration::from_millis(base_ms + jitter_ms);
                warn!(
                    "Transient model error (attempt {}/{}), retrying in {:?}: {}",
                    attempt, max_attempts, delay, e
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(LlmError::Cancelled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, LlmError>(42) }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_backoff(3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(LlmError::Transport("connection reset".to_string()))
                } else {
                    Ok("ok")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_api_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(3, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Api("bad request".to_string())) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_backoff(2, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(LlmError::Transport("timeout".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(LlmError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
