//! Retry with exponential backoff for transient supplier API failures.
//!
//! Rate limiting (429), network failures and 5xx responses are retried.
//! Everything else (auth rejection, 404, malformed bodies, supplier-level
//! error envelopes) is returned immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::AdapterError;

/// Upper bound on random jitter added to each backoff sleep.
const MAX_JITTER_MS: u64 = 250;

fn is_retriable(err: &AdapterError) -> bool {
    match err {
        AdapterError::RateLimited { .. } | AdapterError::Http(_) => true,
        AdapterError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// The wait before retry `n` (1-based) is `backoff_base_secs * 2^(n-1)`
/// seconds, or the server's `Retry-After` when that is longer, plus up to
/// 250 ms of jitter. A `backoff_base_secs` of `0` disables both sleeping
/// and jitter. At most `max_retries + 1` attempts are made; the last error
/// is returned when they are exhausted.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, AdapterError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AdapterError>>,
{
    let mut attempt = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retriable(&err) || attempt >= max_retries {
            return Err(err);
        }

        let delay = backoff_delay(backoff_base_secs, attempt, &err);
        tracing::warn!(
            attempt,
            max_retries,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient supplier API error, retrying after backoff"
        );
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        attempt += 1;
    }
}

fn backoff_delay(backoff_base_secs: u64, attempt: u32, err: &AdapterError) -> Duration {
    if backoff_base_secs == 0 {
        return Duration::ZERO;
    }
    let exponential = backoff_base_secs.saturating_mul(1u64 << attempt.min(62));
    let secs = match err {
        AdapterError::RateLimited {
            retry_after_secs, ..
        } => exponential.max(*retry_after_secs),
        _ => exponential,
    };
    let jitter = rand::rng().random_range(0..=MAX_JITTER_MS);
    Duration::from_secs(secs) + Duration::from_millis(jitter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn rate_limited(retry_after_secs: u64) -> AdapterError {
        AdapterError::RateLimited {
            domain: "api.example.com".to_owned(),
            retry_after_secs,
        }
    }

    fn status(status: u16) -> AdapterError {
        AdapterError::UnexpectedStatus {
            status,
            url: "https://api.example.com/products".to_owned(),
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn succeeds_immediately_on_first_try() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Ok::<u32, AdapterError>(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_on_rate_limited_then_succeeds() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                let n = cc.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(rate_limited(0))
                } else {
                    Ok::<u32, AdapterError>(99)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 99);
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_server_errors_but_not_client_errors() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, AdapterError>(status(503))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 3);
        assert!(matches!(
            result,
            Err(AdapterError::UnexpectedStatus { status: 503, .. })
        ));

        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(2, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, AdapterError>(status(400))
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn does_not_retry_auth_rejection() {
        let call_count = Arc::new(AtomicU32::new(0));
        let cc = Arc::clone(&call_count);
        let result = retry_with_backoff(3, 0, || {
            let cc = Arc::clone(&cc);
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err::<u32, AdapterError>(AdapterError::Unauthorized {
                    status: 401,
                    url: "https://api.example.com".to_owned(),
                })
            }
        })
        .await;
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
        assert!(matches!(result, Err(AdapterError::Unauthorized { .. })));
    }

    #[test]
    fn zero_base_disables_backoff_sleep() {
        assert_eq!(backoff_delay(0, 3, &rate_limited(60)), Duration::ZERO);
    }

    #[test]
    fn retry_after_extends_the_exponential_delay() {
        let delay = backoff_delay(1, 0, &rate_limited(30));
        assert!(delay >= Duration::from_secs(30));
        assert!(delay <= Duration::from_secs(30) + Duration::from_millis(MAX_JITTER_MS));
    }

    #[test]
    fn exponential_delay_doubles_per_attempt() {
        let delay = backoff_delay(2, 2, &status(500));
        assert!(delay >= Duration::from_secs(8));
        assert!(delay <= Duration::from_secs(8) + Duration::from_millis(MAX_JITTER_MS));
    }
}
