use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff at the ingestion boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

/// Result of a retried operation and how many attempts it took
#[derive(Debug)]
pub struct Attempted<T, E> {
    pub result: std::result::Result<T, E>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(PipelineError::config("retry.max_attempts must be at least 1"));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(PipelineError::config(
                "retry.base_delay_ms must not exceed retry.max_delay_ms",
            ));
        }
        Ok(())
    }

    /// Delay before retry number `retry` (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 1u64 << retry.saturating_sub(1).min(20);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts run out
    pub async fn run<T, E, F, Fut>(&self, mut op: F, is_retryable: impl Fn(&E) -> bool) -> Attempted<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempts = 0;
        loop {
            attempts += 1;
            match op().await {
                Err(err) if attempts < max_attempts && is_retryable(&err) => {
                    let delay = self.delay_for(attempts);
                    log::warn!(
                        "attempt {attempts}/{max_attempts} failed ({err}); retrying in {}ms",
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return Attempted { result, attempts },
            }
        }
    }
}
