//! HTTP fetching with bounded retry and exponential backoff
//!
//! Recoverable failures (HTTP 429, 500, 502, 503, 504, and request
//! timeouts) are retried up to the configured limit, sleeping
//! `base * 2^attempt` between attempts. Everything else (DNS failure,
//! connection refused, any other status) fails immediately.

use crate::config::{UserAgentConfig, WorkerConfig};
use reqwest::Client;
use std::time::Duration;

/// Status codes worth retrying
const RETRYABLE_STATUS: &[u16] = &[429, 500, 502, 503, 504];

/// Result of a page fetch after all retry attempts
#[derive(Debug)]
pub enum FetchOutcome {
    /// The final attempt returned a 2xx response
    Success {
        status: u16,
        content_type: String,
        body: String,
    },

    /// No attempt produced a success
    Failed {
        reason: String,
        /// Retries consumed before giving up
        retries_used: u32,
    },
}

/// Retry limits and backoff pacing for page fetches
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &WorkerConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_base: config.retry_backoff_base(),
        }
    }

    /// Sleep before retry number `attempt` (zero-based): base, 2x, 4x, ...
    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(attempt)
    }
}

/// Builds the HTTP client a crawl worker uses for all page fetches
///
/// The total request timeout applies per attempt; retries each get the full
/// window.
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a URL, retrying recoverable failures with exponential backoff
pub async fn fetch_with_retry(client: &Client, url: &str, policy: &RetryPolicy) -> FetchOutcome {
    let mut retries_used = 0u32;

    loop {
        let error = match client.get(url).send().await {
            Ok(response) => {
                let status = response.status().as_u16();

                if response.status().is_success() {
                    let content_type = response
                        .headers()
                        .get("content-type")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("text/html")
                        .to_string();

                    return match response.text().await {
                        Ok(body) => FetchOutcome::Success {
                            status,
                            content_type,
                            body,
                        },
                        Err(e) => FetchOutcome::Failed {
                            reason: format!("body read failed: {}", e),
                            retries_used,
                        },
                    };
                }

                if !RETRYABLE_STATUS.contains(&status) {
                    return FetchOutcome::Failed {
                        reason: format!("HTTP {}", status),
                        retries_used,
                    };
                }
                format!("HTTP {}", status)
            }
            Err(e) if e.is_timeout() => "request timeout".to_string(),
            Err(e) => {
                return FetchOutcome::Failed {
                    reason: e.to_string(),
                    retries_used,
                };
            }
        };

        if retries_used >= policy.max_retries {
            return FetchOutcome::Failed {
                reason: format!("{} (retries exhausted)", error),
                retries_used,
            };
        }

        let delay = policy.backoff(retries_used);
        tracing::debug!("Retrying {} after {:?}: {}", url, delay, error);
        tokio::time::sleep(delay).await;
        retries_used += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let config = UserAgentConfig::default();
        assert!(build_http_client(&config, Duration::from_secs(10)).is_ok());
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy {
            max_retries: 3,
            backoff_base: Duration::from_secs(1),
        };
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = WorkerConfig::default();
        let policy = RetryPolicy::from_config(&config);
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff_base, Duration::from_secs(1));
    }

    // HTTP behavior (retry on 5xx/429, immediate failure otherwise) is
    // covered with wiremock in tests/pipeline_tests.rs
}
