//! LLM provider implementations.
//!
//! Only the Anthropic Messages API is wired up. Use [`create_provider()`] to
//! build the configured provider; it comes wrapped in [`RetryingProvider`] so
//! transient failures are retried with exponential backoff.

pub mod anthropic;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub use crate::config::RetryConfig;
pub use anthropic::AnthropicProvider;

/// Execute an async operation with exponential backoff retry on transient errors.
///
/// Retries on `RateLimited` (respects `retry_after_secs`), `Connection`, and
/// `Timeout`. Permanent errors (auth, parse, HTTP status) return immediately.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation: F) -> Result<T, ProviderError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) => {
                if !is_retryable(&e) || attempt >= config.max_retries {
                    return Err(e);
                }

                let backoff_ms = compute_backoff(config, attempt, &e);
                tracing::warn!(
                    attempt = attempt + 1,
                    max = config.max_retries,
                    backoff_ms = backoff_ms,
                    error = %e,
                    "Retrying after transient error"
                );
                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                attempt += 1;
            }
        }
    }
}

fn is_retryable(err: &ProviderError) -> bool {
    matches!(
        err,
        ProviderError::RateLimited { .. }
            | ProviderError::Connection { .. }
            | ProviderError::Timeout { .. }
    )
}

/// Compute backoff delay, respecting rate limit retry-after hints.
fn compute_backoff(config: &RetryConfig, attempt: u32, err: &ProviderError) -> u64 {
    let computed = compute_exponential_backoff(config, attempt);
    if let ProviderError::RateLimited { retry_after_secs } = err {
        return retry_after_secs
            .saturating_mul(1000)
            .clamp(computed, config.max_backoff_ms.max(computed));
    }
    computed
}

fn compute_exponential_backoff(config: &RetryConfig, attempt: u32) -> u64 {
    let base = config.initial_backoff_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    base.min(config.max_backoff_ms as f64) as u64
}

/// Wraps a provider and retries transient failures.
pub struct RetryingProvider<P> {
    inner: P,
    retry: RetryConfig,
}

impl<P: LlmProvider> RetryingProvider<P> {
    pub fn new(inner: P, retry: RetryConfig) -> Self {
        Self { inner, retry }
    }
}

#[async_trait]
impl<P: LlmProvider> LlmProvider for RetryingProvider<P> {
    async fn query(&self, prompt: &str) -> Result<String, ProviderError> {
        with_retry(&self.retry, || self.inner.query(prompt)).await
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

/// Create the LLM provider named by `config.provider`.
pub fn create_provider(
    config: &LlmConfig,
    api_key: String,
) -> Result<Arc<dyn LlmProvider>, ProviderError> {
    match config.provider.as_str() {
        "anthropic" => {
            let provider = AnthropicProvider::new_with_key(config, api_key)?;
            Ok(Arc::new(RetryingProvider::new(
                provider,
                config.retry.clone(),
            )))
        }
        other => Err(ProviderError::Unsupported {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_retry(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
            backoff_multiplier: 2.0,
        }
    }

    #[tokio::test]
    async fn test_with_retry_recovers_from_transient_error() {
        let calls = AtomicU32::new(0);
        let result = with_retry(&fast_retry(3), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::Connection {
                    message: "reset".into(),
                })
            } else {
                Ok("ok")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_gives_up_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_retry(3), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::AuthFailed {
                provider: "Anthropic".into(),
            })
        })
        .await;
        assert!(matches!(result, Err(ProviderError::AuthFailed { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_stops_after_max_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(&fast_retry(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::Timeout { timeout_secs: 1 })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let config = RetryConfig {
            max_retries: 5,
            initial_backoff_ms: 100,
            max_backoff_ms: 1000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(compute_exponential_backoff(&config, 0), 100);
        assert_eq!(compute_exponential_backoff(&config, 2), 400);
        assert_eq!(compute_exponential_backoff(&config, 10), 1000);
    }

    #[test]
    fn test_rate_limit_backoff_respects_hint_within_cap() {
        let config = RetryConfig {
            max_retries: 2,
            initial_backoff_ms: 100,
            max_backoff_ms: 5000,
            backoff_multiplier: 2.0,
        };
        let hinted = ProviderError::RateLimited { retry_after_secs: 2 };
        assert_eq!(compute_backoff(&config, 0, &hinted), 2000);
        let huge = ProviderError::RateLimited {
            retry_after_secs: 600,
        };
        assert_eq!(compute_backoff(&config, 0, &huge), 5000);
    }

    #[test]
    fn test_rate_limit_hint_overflow_is_capped() {
        let config = RetryConfig::default();
        let hostile = ProviderError::RateLimited {
            retry_after_secs: u64::MAX,
        };
        assert_eq!(compute_backoff(&config, 0, &hostile), config.max_backoff_ms);
    }

    #[tokio::test]
    async fn test_retrying_provider_delegates() {
        let mock = MockLlmProvider::new();
        mock.queue_error(ProviderError::Connection {
            message: "flaky".into(),
        });
        mock.queue_response("CONFIDENCE: LOW");
        let provider = RetryingProvider::new(mock, fast_retry(1));
        assert_eq!(provider.query("p").await.unwrap(), "CONFIDENCE: LOW");
        assert_eq!(provider.model_name(), "mock-model");
    }

    #[test]
    fn test_create_provider_rejects_unknown_name() {
        let config = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        let result = create_provider(&config, "key".into());
        assert!(matches!(
            result,
            Err(ProviderError::Unsupported { ref name }) if name == "carrier-pigeon"
        ));
    }

    #[test]
    fn test_create_provider_anthropic() {
        let provider = create_provider(&LlmConfig::default(), "sk-ant-test".into()).unwrap();
        assert_eq!(provider.model_name(), LlmConfig::default().model);
    }
}
