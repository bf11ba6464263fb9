//! HTTP retry helpers for transient errors.
//!
//! Every contract request goes through [`send_json`] rather than calling
//! `reqwest::RequestBuilder::send()` directly, so it gets automatic retry
//! with exponential backoff for transient failures (timeouts, connection
//! resets, server errors, rate limiting).
//!
//! ```ignore
//! let body = retry::send_json(&policy, || client.post(&url).json(&msg)).await?;
//! ```

use std::time::Duration;

use crate::QueryError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 500;

/// How many times, and how patiently, a request is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries on connection errors, timeouts, HTTP 429, and HTTP 5xx.
    pub max_retries: u32,
    /// Full re-fetches when the body arrives but cannot be decoded.
    pub max_body_retries: u32,
    /// Delay before the first retry; doubled on every further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    /// Three retries at 1s, 2s, 4s, and one body re-fetch. A page load is
    /// waiting on this, so the budget is far tighter than a batch job's.
    fn default() -> Self {
        Self {
            max_retries: 3,
            max_body_retries: 1,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            max_body_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << attempt.saturating_sub(1).min(16))
    }
}

/// What to do with a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusAction {
    Accept,
    Retry,
    Fail,
}

fn status_action(status: reqwest::StatusCode) -> StatusAction {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else if status.is_client_error() {
        StatusAction::Fail
    } else {
        StatusAction::Accept
    }
}

/// Sends an HTTP request and parses the response body as JSON.
///
/// The `build_request` closure is called on each attempt to construct a
/// fresh [`reqwest::RequestBuilder`] (builders are consumed by `.send()`).
///
/// Does **not** retry HTTP 4xx (except 429), those are permanent.
///
/// # Errors
///
/// Returns [`QueryError`] if the request fails after all retries, the
/// server returns a non-retryable status code, or the body cannot be
/// parsed as JSON after all body re-fetches.
#[allow(clippy::future_not_send)]
pub async fn send_json<F>(
    policy: &RetryPolicy,
    build_request: F,
) -> Result<serde_json::Value, QueryError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut body_attempt = 0;
    loop {
        let response = send_inner(policy, &build_request).await?;
        let url = response.url().to_string();
        let status = response.status();

        let error = match response.text().await {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(value) => return Ok(value),
                Err(json_err) => {
                    let preview = text.get(..BODY_PREVIEW_LEN).unwrap_or(&text);
                    log::warn!(
                        "JSON parse failed\n  \
                         url: {url}\n  \
                         status: {status}\n  \
                         received: {} bytes\n  \
                         parse error: {json_err}\n  \
                         body preview: {preview}",
                        text.len(),
                    );
                    QueryError::Json(json_err)
                }
            },
            Err(e) => {
                log::warn!("Response body read failed\n  url: {url}\n  status: {status}\n  error: {e}");
                QueryError::Http(e)
            }
        };

        if body_attempt >= policy.max_body_retries {
            log::error!("Giving up on {url} after {body_attempt} body re-fetches: {error}");
            return Err(error);
        }
        body_attempt += 1;
        let delay = policy.delay(body_attempt);
        log::warn!(
            "  body retry {body_attempt}/{} in {delay:?}...",
            policy.max_body_retries
        );
        tokio::time::sleep(delay).await;
    }
}

/// Sends the request, retrying transient failures per `policy`. Returns
/// the first response with a 2xx or 3xx status.
#[allow(clippy::future_not_send)]
async fn send_inner<F>(
    policy: &RetryPolicy,
    build_request: &F,
) -> Result<reqwest::Response, QueryError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!("  retry {attempt}/{} in {delay:?}...", policy.max_retries);
            tokio::time::sleep(delay).await;
        }
        let can_retry = attempt < policy.max_retries;
        attempt += 1;

        match build_request().send().await {
            Err(e) => {
                if is_transient(&e) && can_retry {
                    log::warn!("  transient error: {e}");
                    continue;
                }
                return Err(QueryError::Http(e));
            }
            Ok(response) => {
                let status = response.status();
                match status_action(status) {
                    StatusAction::Accept => return Ok(response),
                    StatusAction::Retry if can_retry => {
                        log::warn!("  HTTP {status}");
                    }
                    StatusAction::Retry => {
                        return Err(QueryError::Status {
                            message: format!(
                                "HTTP {status} after {} retries",
                                policy.max_retries
                            ),
                        });
                    }
                    StatusAction::Fail => {
                        return Err(QueryError::Status {
                            message: format!("HTTP {status}"),
                        });
                    }
                }
            }
        }
    }
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
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_secs(1));
        assert_eq!(policy.delay(2), Duration::from_secs(2));
        assert_eq!(policy.delay(3), Duration::from_secs(4));
    }

    #[test]
    fn no_retry_policy_has_no_delay() {
        assert_eq!(RetryPolicy::none().delay(5), Duration::ZERO);
    }

    #[test]
    fn classifies_statuses() {
        use reqwest::StatusCode;

        assert_eq!(status_action(StatusCode::OK), StatusAction::Accept);
        assert_eq!(
            status_action(StatusCode::TOO_MANY_REQUESTS),
            StatusAction::Retry
        );
        assert_eq!(status_action(StatusCode::BAD_GATEWAY), StatusAction::Retry);
        assert_eq!(status_action(StatusCode::NOT_FOUND), StatusAction::Fail);
        assert_eq!(status_action(StatusCode::BAD_REQUEST), StatusAction::Fail);
    }
}
