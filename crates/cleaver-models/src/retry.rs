use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cleaver_core::{CleaverError, CompletionModel, CompletionParams};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Exponential backoff delay before the given 0-based attempt.
    pub fn delay_for(&self, attempt: usize) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt as u32)
    }
}

/// Wraps a completion model with bounded retry on transport/timeout errors.
pub struct RetryCompletionModel {
    inner: Arc<dyn CompletionModel>,
    policy: RetryPolicy,
}

impl RetryCompletionModel {
    pub fn new(inner: Arc<dyn CompletionModel>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl CompletionModel for RetryCompletionModel {
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, CleaverError> {
        let mut last_error = None;
        for attempt in 0..self.policy.max_attempts {
            match self.inner.complete(system, prompt, params).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt + 1 < self.policy.max_attempts => {
                    tracing::debug!(attempt, error = %e, "retrying completion after backoff");
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(last_error
            .unwrap_or_else(|| CleaverError::Provider("retry exhausted".to_string())))
    }
}
