//! Retry utilities for transient LLM and download failures.
//!
//! Provides classification of retryable errors, exponential backoff, and a
//! policy that drives an async operation through its attempts.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use std::future::Future;
use std::time::Duration;

/// Determine whether a pipeline error is worth retrying.
///
/// Retryable errors: timeouts, rate limits (429), server errors (5xx),
/// connection failures. Non-retryable: auth failures, bad requests, bad images.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } => true,
        PipelineError::Llm {
            status_code,
            message,
        } => {
            // Classify by HTTP status code when available (structured)
            if let Some(code) = status_code {
                return *code == 429 || (500..=599).contains(code);
            }
            // Fallback for non-HTTP errors (e.g., connection refused, DNS failure)
            message.contains("timed out") || message.contains("connect")
        }
        PipelineError::Fetch { message, .. } => {
            message.starts_with("HTTP 5") || message.starts_with("HTTP 429")
        }
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}

/// How many times to retry, and how long to wait in between.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// retries are exhausted. `label` names the item in logs.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    let delay = backoff_duration(attempt, self.base_delay_ms);
                    tracing::debug!(
                        "Retry {}/{} for {} after {:?}: {}",
                        attempt + 1,
                        self.max_retries,
                        label,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl From<&PipelineConfig> for RetryPolicy {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_retries: config.retry_attempts,
            base_delay_ms: config.retry_delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn rate_limited() -> PipelineError {
        PipelineError::Llm {
            message: "HTTP 429: rate limit exceeded".to_string(),
            status_code: Some(429),
        }
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = PipelineError::Timeout {
            path: PathBuf::from("test.jpg"),
            stage: "llm".to_string(),
            timeout_ms: 60000,
        };
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_rate_limit_and_server_errors_retryable() {
        assert!(is_retryable(&rate_limited()));
        assert!(is_retryable(&PipelineError::Llm {
            message: "HTTP 503: service unavailable".to_string(),
            status_code: Some(503),
        }));
    }

    #[test]
    fn test_auth_error_not_retryable() {
        let err = PipelineError::Llm {
            message: "HTTP 401: unauthorized".to_string(),
            status_code: Some(401),
        };
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_image_errors_not_retryable() {
        assert!(!is_retryable(&PipelineError::NotAnImage(PathBuf::from("a.jpg"))));
        assert!(!is_retryable(&PipelineError::Decode {
            path: PathBuf::from("test.jpg"),
            message: "invalid header".to_string(),
        }));
    }

    #[test]
    fn test_message_with_500_in_body_not_retryable_without_status() {
        let err = PipelineError::Llm {
            message: "Processed 500 tokens successfully".to_string(),
            status_code: None,
        };
        assert!(!is_retryable(&err));
    }

    #[test]
    fn test_connection_error_retryable_without_status() {
        let err = PipelineError::Llm {
            message: "connection refused".to_string(),
            status_code: None,
        };
        assert!(is_retryable(&err));
    }

    #[test]
    fn test_fetch_server_error_retryable() {
        let fetch = |message: &str| PipelineError::Fetch {
            url: "https://cdn.example.com/a.jpg".to_string(),
            message: message.to_string(),
        };
        assert!(is_retryable(&fetch("HTTP 502 Bad Gateway")));
        assert!(!is_retryable(&fetch("HTTP 404 Not Found")));
    }

    #[test]
    fn test_backoff_exponential() {
        assert_eq!(backoff_duration(0, 1000), Duration::from_millis(1000));
        assert_eq!(backoff_duration(1, 1000), Duration::from_millis(2000));
        assert_eq!(backoff_duration(3, 1000), Duration::from_millis(8000));
    }

    #[test]
    fn test_backoff_capped_at_30s() {
        assert_eq!(backoff_duration(10, 1000), Duration::from_millis(30_000));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_policy_retries_until_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 1,
        };
        let result = policy
            .run("a.jpg", move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited())
                } else {
                    Ok("ok")
                }
            })
            .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_policy_gives_up_after_max_retries() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 1,
        };
        let result: Result<(), _> = policy
            .run("a.jpg", move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_policy_does_not_retry_permanent_errors() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = RetryPolicy {
            max_retries: 5,
            base_delay_ms: 1,
        }
        .run("a.jpg", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(PipelineError::NotAnImage(PathBuf::from("a.jpg")))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(RetryPolicy::none().max_retries, 0);
    }
}
