use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::VendorError;

/// Upper bound on a single backoff sleep, whatever the attempt count.
const MAX_BACKOFF_MS: u64 = 30_000;

/// Bounded-retry policy for one vendor call: `max_retries` re-attempts after
/// the first try, exponential backoff between them.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

/// Run `operation` up to `max_retries + 1` times, sleeping between attempts.
///
/// Only retriable failures re-attempt (see [`VendorError::is_retriable`]);
/// anything else, and the last failure once attempts are exhausted,
/// propagates to the caller as the call's single outcome.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    vendor_id: &str,
    mut operation: F,
) -> Result<T, VendorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VendorError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt <= policy.max_retries && error.is_retriable() => {
                let delay_ms = backoff_delay_ms(policy.backoff_base_ms, attempt);
                tracing::warn!(
                    vendor_id,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %error,
                    "vendor call failed; retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            Err(error) => return Err(error),
        }
    }
}

/// Exponential backoff with ±25% jitter: `base × 2^(attempt−1)`, capped at
/// [`MAX_BACKOFF_MS`]. Jitter keeps concurrent retries against the same
/// vendor from landing in lockstep.
fn backoff_delay_ms(base_ms: u64, attempt: u32) -> u64 {
    let exponential = base_ms.saturating_mul(1_u64 << attempt.saturating_sub(1).min(10));
    let capped = exponential.min(MAX_BACKOFF_MS);
    if capped == 0 {
        return 0;
    }
    let jitter_span = capped / 4;
    rand::rng().random_range(capped - jitter_span..=capped + jitter_span)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn no_backoff(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_base_ms: 0,
        }
    }

    fn transient() -> VendorError {
        VendorError::UnexpectedStatus {
            status: 503,
            url: "http://vendor1.internal/products/ABC123".to_string(),
        }
    }

    fn permanent() -> VendorError {
        VendorError::NotFound {
            url: "http://vendor1.internal/products/ABC123".to_string(),
        }
    }

    #[tokio::test]
    async fn first_try_success_makes_one_call() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_with_backoff(no_backoff(2), "vendor1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, VendorError>(42)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn transient_failures_then_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_with_backoff(no_backoff(2), "vendor1", move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn exhausted_attempts_propagate_last_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, _> = retry_with_backoff(no_backoff(2), "vendor1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(VendorError::UnexpectedStatus { status: 503, .. })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn permanent_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, _> = retry_with_backoff(no_backoff(5), "vendor1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(permanent())
            }
        })
        .await;

        assert!(matches!(result, Err(VendorError::NotFound { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn zero_retries_means_single_attempt() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<u32, _> = retry_with_backoff(no_backoff(0), "vendor1", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(transient())
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_per_attempt_within_jitter() {
        for _ in 0..50 {
            let first = backoff_delay_ms(100, 1);
            let second = backoff_delay_ms(100, 2);
            let third = backoff_delay_ms(100, 3);
            assert!((75..=125).contains(&first), "attempt 1 delay {first}");
            assert!((150..=250).contains(&second), "attempt 2 delay {second}");
            assert!((300..=500).contains(&third), "attempt 3 delay {third}");
        }
    }

    #[test]
    fn backoff_is_capped() {
        let delay = backoff_delay_ms(10_000, 10);
        assert!(delay <= MAX_BACKOFF_MS + MAX_BACKOFF_MS / 4);
    }

    #[test]
    fn zero_base_never_sleeps() {
        assert_eq!(backoff_delay_ms(0, 3), 0);
    }
}
