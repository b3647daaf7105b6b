//! Retry utilities for batch requests
//!
//! Exponential backoff with optional jitter. Every attempt and every backoff
//! sleep races the run's cancellation token, so a cancelled run never waits
//! out a retry schedule.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::errors::{FetchError, FetchResult};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay before first retry
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Execute a fetch operation with retry logic
///
/// Non-retryable errors (see [`FetchError::is_retryable`]) are returned
/// immediately. Cancellation yields [`FetchError::Cancelled`].
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
    operation_name: &str,
) -> FetchResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = FetchResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            outcome = operation() => outcome,
        };

        let err = match outcome {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        "Operation '{}' succeeded on attempt {}/{}",
                        operation_name, attempt, max_attempts
                    );
                }
                return Ok(result);
            }
            Err(err) => err,
        };

        if !err.is_retryable() {
            debug!(
                "Operation '{}' failed with non-retryable error: {}",
                operation_name, err
            );
            return Err(err);
        }

        if attempt >= max_attempts {
            warn!(
                "Operation '{}' failed after {} attempts: {}",
                operation_name, max_attempts, err
            );
            return Err(err);
        }

        let delay = calculate_delay(config, attempt);
        warn!(
            "Operation '{}' failed on attempt {}/{}, retrying in {:?}: {}",
            operation_name, attempt, max_attempts, delay, err
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            _ = sleep(delay) => {}
        }
        attempt += 1;
    }
}

/// Calculate delay with exponential backoff and optional jitter
pub(crate) fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponential_delay = config.initial_delay.as_millis() as f64
        * config.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);

    let delay_ms = exponential_delay.min(config.max_delay.as_millis() as f64) as u64;

    let final_delay = if config.jitter {
        // Up to 25% extra
        delay_ms + jitter_ms(delay_ms / 4)
    } else {
        delay_ms
    };

    Duration::from_millis(final_delay)
}

/// Pseudo-random value in `0..=max_jitter_ms` derived from the clock
fn jitter_ms(max_jitter_ms: u64) -> u64 {
    if max_jitter_ms == 0 {
        return 0;
    }
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos() as u64;
    nanos % (max_jitter_ms + 1)
}
