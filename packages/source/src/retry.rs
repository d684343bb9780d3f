//! HTTP retry with exponential backoff for transient police API errors.
//!
//! [`send`] retries connection failures, timeouts, `429 Too Many
//! Requests` and `5xx` responses. Once retries run out the last response
//! is handed back unchanged so the caller can classify its status code;
//! nothing here decides what a status means for the run.
//!
//! Every attempt takes a token from the shared [`RateLimiter`] first, and
//! backoff sleeps end early if the run is aborted.

use std::time::Duration;

use crate::FetchError;
use crate::abort::AbortSignal;
use crate::rate_limit::RateLimiter;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default delay before the first retry; doubles on each further retry.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Longest `Retry-After` we are willing to honour.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// How many times, and how patiently, to retry a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries, matching the API's original client.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Backoff before retry number `attempt` (1-based): base, 2×base, 4×base...
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// Whether a status code is worth retrying.
#[must_use]
pub const fn is_retryable_status(status: u16) -> bool {
    status == 429 || (status >= 500 && status <= 599)
}

/// Sends the request built by `build_request`, retrying transient failures.
///
/// The closure is called once per attempt since builders are consumed by
/// `send()`.
///
/// # Errors
///
/// Returns [`FetchError::Cancelled`] if `abort` fires before or between
/// attempts, or [`FetchError::Transport`] if the request itself keeps
/// failing.
pub async fn send<F>(
    build_request: F,
    policy: &RetryPolicy,
    limiter: &RateLimiter,
    abort: &AbortSignal,
) -> Result<reqwest::Response, FetchError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let mut retry_after: Option<Duration> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = retry_after
                .take()
                .unwrap_or_else(|| policy.delay_for(attempt));
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = abort.aborted() => return Err(FetchError::Cancelled),
            }
        }

        if abort.is_aborted() {
            return Err(FetchError::Cancelled);
        }

        limiter.acquire().await;

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && attempt < policy.max_retries {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(FetchError::Transport(e));
            }
            Ok(response) => {
                let status = response.status().as_u16();
                if !is_retryable_status(status) || attempt == policy.max_retries {
                    return Ok(response);
                }

                if status == 429 {
                    log::warn!("  HTTP 429 (rate limited)");
                    limiter.drain().await;
                    retry_after = parse_retry_after(response.headers());
                } else {
                    log::warn!("  HTTP {status} (server error)");
                }
            }
        }
    }

    unreachable!("retry loop always returns on its final attempt")
}

/// Reads a `Retry-After` header given in seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 4,
            base_delay: Duration::from_millis(500),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(2));
    }

    #[test]
    fn retries_rate_limits_and_server_errors_only() {
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(500));
        assert!(!is_retryable_status(404));
        assert!(!is_retryable_status(400));
        assert!(!is_retryable_status(200));
    }

    #[test]
    fn parses_retry_after_seconds() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::RETRY_AFTER,
            reqwest::header::HeaderValue::from_static("5"),
        );
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(5)));

        headers.insert(
            reqwest::header::RETRY_AFTER,
            reqwest::header::HeaderValue::from_static("3600"),
        );
        assert_eq!(parse_retry_after(&headers), Some(MAX_RETRY_AFTER));
    }

    #[test]
    fn ignores_http_date_retry_after() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::RETRY_AFTER,
            reqwest::header::HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }
}
