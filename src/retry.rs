//! Retry with exponential backoff for contract and node calls

use crate::error::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

const MAX_ATTEMPTS: usize = 10;
const BASE_DELAY: Duration = Duration::from_millis(100);
const MAX_DELAY: Duration = Duration::from_secs(5);

/// Retry policy for operations that talk to the chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: usize,
    base_delay: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
            base_delay: BASE_DELAY,
            max_delay: MAX_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Single attempt, errors surface immediately
    pub fn no_retry() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up
    pub async fn execute<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut delay = self.base_delay;
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!("Operation succeeded on attempt {}", attempt);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        category = e.category(),
                        "Operation failed: {}. Retrying in {:?}",
                        e,
                        delay
                    );
                    let jitter = delay.as_millis() as f64 * 0.1 * rand::random::<f64>();
                    tokio::time::sleep(delay + Duration::from_millis(jitter as u64)).await;
                    delay = std::cmp::min(delay * 2, self.max_delay);
                    attempt += 1;
                }
                Err(e) => {
                    if e.is_retryable() {
                        warn!("Operation failed after {} attempts: {}", attempt, e);
                    } else {
                        debug!("Non-retryable error: {}", e);
                    }
                    return Err(e);
                }
            }
        }
    }
}
