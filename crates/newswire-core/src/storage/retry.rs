//! Retry with exponential backoff for transient SQLite failures.
//!
//! Concurrent source pipelines write through the same pool, so a write may
//! briefly see `SQLITE_BUSY` or `SQLITE_LOCKED` even with a busy timeout set.

use std::future::Future;
use std::time::Duration;

/// Maximum number of retry attempts for database operations
pub const MAX_RETRIES: u32 = 5;

/// Check if a SQLite error is transient and should be retried
///
/// Primary codes 5 (BUSY), 6 (LOCKED) and 10 (IOERR) plus their extended
/// variants (BUSY_SNAPSHOT, IOERR_READ, IOERR_WRITE, IOERR_FSYNC, ...).
pub fn is_transient_error(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err
            .code()
            .and_then(|c| c.parse::<u32>().ok())
            .is_some_and(|code| matches!(code & 0xff, 5 | 6 | 10)),
        sqlx::Error::PoolTimedOut => true,
        _ => false,
    }
}

/// Delay before retry `attempt` (1-based): 100ms, 200ms, 400ms, ...
pub(crate) fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt.saturating_sub(1).min(10)))
}

/// Run `operation`, retrying transient errors up to [`MAX_RETRIES`] times.
///
/// `operation` is re-invoked from scratch on each attempt, so it must open
/// its own transaction rather than reuse one.
pub async fn with_retry<F, Fut, T>(what: &str, operation: F) -> std::result::Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = std::result::Result<T, sqlx::Error>>,
{
    let mut attempts = 0;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if is_transient_error(&e) && attempts < MAX_RETRIES => {
                attempts += 1;
                let delay = backoff_delay(attempts);
                tracing::debug!(
                    error = %e,
                    operation = what,
                    attempt = attempts,
                    max_retries = MAX_RETRIES,
                    delay_ms = delay.as_millis() as u64,
                    "Transient database error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
