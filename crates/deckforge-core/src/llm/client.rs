//! Timeout and retry wrapper around a single provider.
//!
//! Every outline stage goes through [`TextGenerator::complete`], so the
//! per-call deadline and the retry policy live in one place.

use super::provider::{LlmProvider, LlmRequest, LlmResponse};
use super::retry;
use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use std::sync::Arc;
use std::time::Duration;

/// Call policy for text generation.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,
    /// Extra attempts after the first failure (0 = single attempt)
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 60_000,
            retry_attempts: 0,
            retry_delay_ms: 1000,
        }
    }
}

impl GenerateOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout_ms: config.limits.llm_timeout_ms,
            retry_attempts: config.pipeline.retry_attempts,
            retry_delay_ms: config.pipeline.retry_delay_ms,
        }
    }
}

/// Shared handle to a provider plus its call policy.
#[derive(Clone)]
pub struct TextGenerator {
    provider: Arc<dyn LlmProvider>,
    options: GenerateOptions,
}

impl TextGenerator {
    pub fn new(provider: Box<dyn LlmProvider>, options: GenerateOptions) -> Self {
        Self {
            provider: Arc::from(provider),
            options,
        }
    }

    /// Name of the wrapped provider.
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Whether the wrapped provider reports itself usable.
    pub async fn is_available(&self) -> bool {
        self.provider.is_available().await
    }

    /// Send one prompt, retrying transient failures with exponential backoff.
    ///
    /// Returns the last error once attempts are exhausted or a non-retryable
    /// error is hit.
    pub async fn complete(&self, request: &LlmRequest) -> PipelineResult<LlmResponse> {
        let mut last_error = None;

        for attempt in 0..=self.options.retry_attempts {
            if attempt > 0 {
                let delay = retry::backoff_duration(attempt - 1, self.options.retry_delay_ms);
                tracing::debug!(
                    "Retry {attempt}/{} on {} after {delay:?}",
                    self.options.retry_attempts,
                    self.provider.name()
                );
                tokio::time::sleep(delay).await;
            }

            let result = tokio::time::timeout(
                Duration::from_millis(self.options.timeout_ms),
                self.provider.generate(request),
            )
            .await;

            match result {
                Ok(Ok(response)) => {
                    tracing::debug!(
                        model = %response.model,
                        latency_ms = response.latency_ms,
                        tokens = ?response.tokens_used,
                        "LLM call succeeded"
                    );
                    return Ok(response);
                }
                Ok(Err(e)) => {
                    let retryable = retry::is_retryable(&e);
                    tracing::warn!("{} call failed: {e}", self.provider.name());
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        "{} call timed out after {}ms",
                        self.provider.name(),
                        self.options.timeout_ms
                    );
                    last_error = Some(PipelineError::Timeout {
                        stage: "llm".to_string(),
                        timeout_ms: self.options.timeout_ms,
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::Llm {
            message: "no attempt was made".to_string(),
            status_code: None,
        }))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MockProvider;
    use super::*;
    use std::sync::atomic::Ordering;

    fn fast_options() -> GenerateOptions {
        GenerateOptions {
            timeout_ms: 5000,
            retry_attempts: 0,
            retry_delay_ms: 10,
        }
    }

    fn request() -> LlmRequest {
        LlmRequest::for_topic("Summarise.", "Rust")
    }

    #[tokio::test]
    async fn test_complete_success() {
        let generator = TextGenerator::new(Box::new(MockProvider::success("ok")), fast_options());
        let response = generator.complete(&request()).await.unwrap();
        assert_eq!(response.text, "ok");
        assert_eq!(response.model, "mock-v1");
        assert_eq!(generator.provider_name(), "mock");
    }

    #[tokio::test]
    async fn test_retry_on_rate_limit() {
        let provider = MockProvider::new(|idx, _| {
            if idx == 0 {
                Err(PipelineError::Llm {
                    message: "rate limited".to_string(),
                    status_code: Some(429),
                })
            } else {
                Ok("recovered".to_string())
            }
        });
        let calls = provider.call_count_handle();
        let options = GenerateOptions {
            retry_attempts: 1,
            ..fast_options()
        };
        let generator = TextGenerator::new(Box::new(provider), options);

        let response = generator.complete(&request()).await.unwrap();
        assert_eq!(response.text, "recovered");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_retry_on_auth_error() {
        let provider = MockProvider::failing(Some(401), "unauthorized");
        let calls = provider.call_count_handle();
        let options = GenerateOptions {
            retry_attempts: 3,
            ..fast_options()
        };
        let generator = TextGenerator::new(Box::new(provider), options);

        let err = generator.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("unauthorized"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhausts_retries() {
        let provider = MockProvider::failing(Some(503), "unavailable");
        let calls = provider.call_count_handle();
        let options = GenerateOptions {
            retry_attempts: 2,
            ..fast_options()
        };
        let generator = TextGenerator::new(Box::new(provider), options);

        let err = generator.complete(&request()).await.unwrap_err();
        assert!(err.to_string().contains("unavailable"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_timeout_error() {
        let provider = MockProvider::success("too slow").with_delay(Duration::from_secs(5));
        let options = GenerateOptions {
            timeout_ms: 50,
            ..fast_options()
        };
        let generator = TextGenerator::new(Box::new(provider), options);

        let err = generator.complete(&request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { timeout_ms: 50, .. }));
    }

    #[test]
    fn test_options_from_config() {
        let mut config = Config::default();
        config.pipeline.retry_attempts = 2;
        config.limits.llm_timeout_ms = 1234;
        let options = GenerateOptions::from_config(&config);
        assert_eq!(options.retry_attempts, 2);
        assert_eq!(options.timeout_ms, 1234);
    }
}
