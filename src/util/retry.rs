use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::{debug, warn};

type RetryPredicate = Arc<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Bounded retry with exponential backoff.
///
/// The delay before retry `n` (0-based) is `base_delay * backoff_multiplier^n`,
/// capped at `max_delay`. Errors rejected by the retryable predicate are
/// returned immediately.
#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub max_delay: Duration,
    retryable: RetryPredicate,
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("base_delay", &self.base_delay)
            .field("backoff_multiplier", &self.backoff_multiplier)
            .field("max_delay", &self.max_delay)
            .finish_non_exhaustive()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1), 1.5)
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: usize, base_delay: Duration, backoff_multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_multiplier,
            max_delay: Duration::from_secs(60),
            retryable: Arc::new(|_| true),
        }
    }

    /// A policy that never waits between attempts
    pub fn immediate(max_attempts: usize) -> Self {
        Self::new(max_attempts, Duration::ZERO, 1.0)
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn with_retryable<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&anyhow::Error) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(predicate);
        self
    }

    pub fn is_retryable(&self, err: &anyhow::Error) -> bool {
        (self.retryable)(err)
    }

    /// Delay to wait after the failed attempt `attempt` (0-based)
    pub fn delay_for(&self, attempt: usize) -> Duration {
        let millis =
            self.base_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        std::cmp::min(Duration::from_millis(millis as u64), self.max_delay)
    }

    /// Whether a failure on `attempt` (0-based) should be followed by another attempt
    pub fn should_retry(&self, attempt: usize, err: &anyhow::Error) -> bool {
        attempt + 1 < self.max_attempts && self.is_retryable(err)
    }

    /// Execute `operation` until it succeeds, the error is not retryable, or
    /// the attempts are exhausted. The attempt number is passed to the closure.
    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation(attempt).await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Operation succeeded on attempt {}", attempt + 1);
                    }
                    return Ok(value);
                }
                Err(err) => {
                    if !self.should_retry(attempt, &err) {
                        return Err(err);
                    }
                    let delay = self.delay_for(attempt);
                    warn!(
                        "Operation failed on attempt {}/{}, retrying in {:?}: {:#}",
                        attempt + 1,
                        self.max_attempts,
                        delay,
                        err
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
