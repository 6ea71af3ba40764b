// src/retry/mod.rs
// Retry Policy: exponential-backoff wrapper for a fallible async operation.
// The backoff delay is checked against the cancellation token while it
// waits, rather than sleeping blindly, so a cancellation can pre-empt it
// mid-delay instead of only being noticed on the next attempt.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::cancellation::CancellationToken;

#[derive(Debug)]
pub enum RetryOutcome<T> {
    Success(T),
    Cancelled,
    Failed(anyhow::Error),
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
        }
    }

    pub async fn run<F, Fut, T>(&self, cancel: &mut CancellationToken, mut op: F) -> RetryOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, anyhow::Error>>,
    {
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 1..=self.max_attempts {
            if cancel.is_cancelled() {
                return RetryOutcome::Cancelled;
            }

            match op().await {
                Ok(value) => return RetryOutcome::Success(value),
                Err(err) => {
                    if attempt == self.max_attempts {
                        last_err = Some(err);
                        break;
                    }

                    let delay_ms = self.base_delay_ms * (1u64 << (attempt - 1));
                    warn!(attempt, delay_ms, "retrying after failure: {err}");

                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_millis(delay_ms)) => {}
                        _ = cancel.cancelled() => return RetryOutcome::Cancelled,
                    }

                    last_err = Some(err);
                }
            }
        }

        RetryOutcome::Failed(last_err.unwrap_or_else(|| anyhow::anyhow!("retry exhausted with no error recorded")))
    }
}
