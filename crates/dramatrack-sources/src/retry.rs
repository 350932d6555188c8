//! Exponential back-off with jitter for feed requests.

use std::future::Future;
use std::time::Duration;

use crate::SourceError;

const MAX_DELAY_MS: u64 = 60_000;

/// Retry settings for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure. `0` disables retries.
    pub max_retries: u32,
    /// Delay before the n-th retry is `backoff_base_ms * 2^(n-1)`, ±25 %.
    pub backoff_base_ms: u64,
}

/// Rate limiting, network failures, and server-side errors are transient.
/// Everything else fails the same way on a second attempt.
pub(crate) fn is_retriable(err: &SourceError) -> bool {
    match err {
        SourceError::RateLimited { .. } | SourceError::Http(_) => true,
        SourceError::UnexpectedStatus { status, .. } => *status >= 500,
        _ => false,
    }
}

pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SourceError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = policy
                    .backoff_base_ms
                    .saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient feed error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
