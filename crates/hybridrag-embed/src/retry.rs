use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use hybridrag_core::config::EmbeddingConfig;
use hybridrag_core::error::Result;
use hybridrag_core::traits::EmbeddingProvider;

/// Bounded exponential backoff for rate-limited embedding calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay: Duration::from_millis(2000) }
    }
}

impl From<&EmbeddingConfig> for RetryPolicy {
    fn from(cfg: &EmbeddingConfig) -> Self {
        Self { max_attempts: cfg.max_attempts.max(1), base_delay: Duration::from_millis(cfg.base_delay_ms) }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following failed `attempt` (1-based):
    /// `base_delay * 2^(attempt-1)`, or the provider hint when it is longer.
    pub fn delay_for(&self, attempt: u32, retry_after_ms: Option<u64>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let backoff = self.base_delay.saturating_mul(1u32 << exponent);
        match retry_after_ms {
            Some(ms) => backoff.max(Duration::from_millis(ms)),
            None => backoff,
        }
    }
}

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices().nth(max_chars).map_or(text, |(i, _)| &text[..i])
}

/// Truncates input to the provider limit and retries `RateLimited` failures.
/// Every other error is returned on the first occurrence.
pub struct RetryingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    policy: RetryPolicy,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }
}

#[async_trait]
impl EmbeddingProvider for RetryingEmbedder {
    fn dim(&self) -> usize {
        self.inner.dim()
    }

    fn max_input_chars(&self) -> usize {
        self.inner.max_input_chars()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = truncate_chars(text, self.inner.max_input_chars());
        if input.len() < text.len() {
            debug!("Truncated embedding input from {} to {} bytes", text.len(), input.len());
        }

        let mut attempt = 1;
        loop {
            match self.inner.embed(input).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt, e.retry_after_ms());
                    warn!("Embedding rate limited (attempt {}/{}), retrying in {:?}", attempt, self.policy.max_attempts, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_per_attempt() {
        let p = RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(2000) };
        assert_eq!(p.delay_for(1, None), Duration::from_millis(2000));
        assert_eq!(p.delay_for(2, None), Duration::from_millis(4000));
        assert_eq!(p.delay_for(3, None), Duration::from_millis(8000));
    }

    #[test]
    fn longer_provider_hint_wins() {
        let p = RetryPolicy::default();
        assert_eq!(p.delay_for(1, Some(5000)), Duration::from_millis(5000));
        assert_eq!(p.delay_for(2, Some(10)), Duration::from_millis(4000));
    }

    #[test]
    fn truncation_counts_characters() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
