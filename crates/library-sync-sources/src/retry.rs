use crate::error::SourceError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Exponential backoff for read-only lookups
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delay before retry number `attempt` (0-based): `min(base * 2^attempt, max)`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub fn should_retry(&self, error: &SourceError, failures: u32) -> bool {
        error.is_retryable() && failures <= self.max_retries
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut failures = 0u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    failures += 1;
                    if !self.should_retry(&e, failures) {
                        return Err(e);
                    }
                    let delay = self.delay_for(failures - 1);
                    warn!(operation = operation, attempt = failures, delay_ms = delay.as_millis() as u64, error = %e, "Retrying request");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
