//! Retry with exponential back-off and jitter for the `YouTube` client.

use std::future::Future;
use std::time::Duration;

use crate::error::YouTubeError;

/// Transient failures worth another attempt: timeouts, connection errors,
/// HTTP 429 and 5xx. Quota, not-found and decode errors are final.
pub(crate) fn is_retriable(err: &YouTubeError) -> bool {
    match err {
        YouTubeError::Http(e) => {
            e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
        }
        YouTubeError::Api { status, .. } => *status == 429 || *status >= 500,
        YouTubeError::QuotaExceeded(_)
        | YouTubeError::NotFound(_)
        | YouTubeError::Deserialize { .. }
        | YouTubeError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on transient errors.
///
/// The delay before retry `n` is `backoff_base_ms × 2^(n-1)` with ±25 % jitter,
/// capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, YouTubeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, YouTubeError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "YouTube transient error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    #[test]
    fn quota_and_not_found_are_final() {
        assert!(!is_retriable(&YouTubeError::QuotaExceeded("daily".to_owned())));
        assert!(!is_retriable(&YouTubeError::NotFound("UCx".to_owned())));
    }

    #[test]
    fn rate_limit_and_server_errors_are_retriable() {
        let api = |status| YouTubeError::Api {
            status,
            message: String::new(),
        };
        assert!(is_retriable(&api(429)));
        assert!(is_retriable(&api(503)));
        assert!(!is_retriable(&api(400)));
        assert!(!is_retriable(&api(404)));
    }

    #[tokio::test]
    async fn retries_server_errors_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                let attempt = c.fetch_add(1, Ordering::SeqCst) + 1;
                if attempt < 3 {
                    Err(YouTubeError::Api {
                        status: 500,
                        message: "backend".to_owned(),
                    })
                } else {
                    Ok(7u32)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(YouTubeError::Api {
                    status: 503,
                    message: "unavailable".to_owned(),
                })
            }
        })
        .await;
        assert!(matches!(result, Err(YouTubeError::Api { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3, "1 attempt + 2 retries");
    }

    #[tokio::test]
    async fn does_not_retry_quota_exceeded() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<u32, _>(YouTubeError::QuotaExceeded("quotaExceeded".to_owned()))
            }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(YouTubeError::QuotaExceeded(_))));
    }
}
