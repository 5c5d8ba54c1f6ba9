//! Backoff policy for transient provider failures.

use std::future::Future;
use std::time::Duration;

use reqwest::Response;
use tracing::warn;

use crate::error::{AiError, Result};

/// Largest slice of an error body kept in [`AiError::LlmHttp`].
const MAX_ERROR_BODY: usize = 512;

/// Exponential backoff applied to retryable [`AiError`]s.
#[derive(Debug, Clone)]
pub struct LlmRetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
}

impl Default for LlmRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl LlmRetryConfig {
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Retry without waiting.
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (1-based). A server hint wins.
    pub fn backoff(&self, retry: u32, server_hint: Option<Duration>) -> Duration {
        if let Some(hint) = server_hint {
            return hint;
        }
        let factor = self
            .backoff_multiplier
            .powi(retry.saturating_sub(1) as i32);
        self.initial_delay.mul_f64(factor).min(self.max_delay)
    }

    /// Run `call` until it succeeds, fails permanently or the retry budget is spent.
    pub async fn run<T, F, Fut>(&self, provider: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut retry = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(error) if retry < self.max_retries && error.is_retryable() => {
                    retry += 1;
                    let delay = self.backoff(retry, error.retry_after());
                    warn!(
                        provider,
                        retry,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying LLM request"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Convert a non-success response into [`AiError::LlmHttp`].
pub(crate) async fn error_from_response(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let retry_after = parse_retry_after(&response);
    let mut message = response.text().await.unwrap_or_default();

    if message.len() > MAX_ERROR_BODY {
        let mut cut = MAX_ERROR_BODY;
        while !message.is_char_boundary(cut) {
            cut -= 1;
        }
        message.truncate(cut);
        message.push_str("... [truncated]");
    }

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message,
        retry_after,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn http_error(status: u16, retry_after: Option<Duration>) -> AiError {
        AiError::LlmHttp {
            provider: "test".to_string(),
            status,
            message: String::new(),
            retry_after,
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = LlmRetryConfig::default();
        assert_eq!(config.backoff(1, None), Duration::from_millis(200));
        assert_eq!(config.backoff(2, None), Duration::from_millis(400));
        assert_eq!(config.backoff(3, None), Duration::from_millis(800));
        assert_eq!(config.backoff(6, None), Duration::from_secs(5));
        assert_eq!(
            config.backoff(3, Some(Duration::from_secs(10))),
            Duration::from_secs(10)
        );
    }

    #[test]
    fn test_retryable_classification() {
        assert!(http_error(429, None).is_retryable());
        assert!(http_error(503, None).is_retryable());
        assert!(!http_error(401, None).is_retryable());
        assert_eq!(
            http_error(503, Some(Duration::from_secs(2))).retry_after(),
            Some(Duration::from_secs(2))
        );
        assert!(AiError::Llm("rate limit exceeded".to_string()).is_retryable());
        assert!(!AiError::Llm("bad request".to_string()).is_retryable());
    }

    #[tokio::test]
    async fn test_run_retries_until_success() {
        let attempts = AtomicU32::new(0);
        let result = LlmRetryConfig::immediate(3)
            .run("test", || async {
                if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(http_error(503, None))
                } else {
                    Ok("done")
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_on_permanent_error() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = LlmRetryConfig::immediate(3)
            .run("test", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(http_error(400, None))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_run_gives_up_after_budget() {
        let attempts = AtomicU32::new(0);
        let result: Result<()> = LlmRetryConfig::immediate(2)
            .run("test", || async {
                attempts.fetch_add(1, Ordering::SeqCst);
                Err(http_error(500, None))
            })
            .await;

        assert!(matches!(result, Err(AiError::LlmHttp { status: 500, .. })));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }
}
