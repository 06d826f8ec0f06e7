//! Bounded retry with a fixed delay between attempts.

use std::future::Future;
use std::time::Duration;

/// Returned when every attempt of a retried operation failed.
#[derive(Debug, thiserror::Error)]
#[error("operation failed after {attempts} attempt(s): {source}")]
pub struct RetryError<E> {
    /// Number of attempts that were made.
    pub attempts: u32,
    /// Error produced by the final attempt.
    #[source]
    pub source: E,
}

/// Runs `operation` until it succeeds or `max_attempts` attempts have failed.
///
/// Sleeps for `delay` between consecutive failures but not after the last one.
/// A `max_attempts` of zero still runs the operation once.
pub async fn retry<T, E, F, Fut>(
    mut operation: F,
    max_attempts: u32,
    delay: Duration,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_attempts => {
                return Err(RetryError {
                    attempts: attempt,
                    source: err,
                });
            }
            Err(err) => {
                tracing::warn!(
                    "Attempt {}/{} failed: {}. Retrying in {:?}",
                    attempt,
                    max_attempts,
                    err,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
