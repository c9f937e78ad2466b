//! Bounded retry with backoff for transient failures
//!
//! The executor re-runs an operation only while its failure is classified
//! recoverable; validation, referential, and fatal errors abort
//! immediately without consuming retry budget. Total attempts are bounded
//! — there is no unbounded retry loop anywhere in the crate.

use std::future::Future;
use std::time::Duration;

use log::warn;

use crate::types::LedgerError;

/// How the delay between attempts grows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// The same delay between every attempt
    Fixed,

    /// `base_delay * 2^attempt`
    Exponential,
}

/// Retry behavior configuration
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Total attempts, including the first (1-10)
    pub max_attempts: u32,

    /// Delay before the first retry
    pub base_delay: Duration,

    /// Fixed or exponential growth
    pub backoff: BackoffStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff: BackoffStrategy::Exponential,
        }
    }
}

impl RetryConfig {
    /// Create a config, clamping `max_attempts` into 1-10.
    pub fn new(max_attempts: u32, base_delay: Duration, backoff: BackoffStrategy) -> Self {
        let clamped = max_attempts.clamp(1, 10);
        if clamped != max_attempts {
            warn!(
                "retry max_attempts {} out of range, clamped to {}",
                max_attempts, clamped
            );
        }
        RetryConfig {
            max_attempts: clamped,
            base_delay,
            backoff,
        }
    }

    /// Delay to apply after the given zero-based failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            BackoffStrategy::Fixed => self.base_delay,
            BackoffStrategy::Exponential => {
                // Exponent capped so the multiplier cannot overflow.
                self.base_delay * 2u32.saturating_pow(attempt.min(16))
            }
        }
    }
}

/// Runs fallible async operations under a [`RetryConfig`]
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Create an executor with the given config.
    pub fn new(config: RetryConfig) -> Self {
        RetryExecutor { config }
    }

    /// Run `operation`, retrying recoverable failures with backoff.
    ///
    /// Returns the first success, the first non-recoverable error, or the
    /// last recoverable error once the attempt budget is exhausted.
    pub async fn run<T, F, Fut>(&self, label: &str, mut operation: F) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0u32;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(error) if error.is_recoverable() && attempt + 1 < self.config.max_attempts => {
                    let delay = self.config.delay_for(attempt);
                    warn!(
                        "{} failed on attempt {} ({}); retrying in {:?}",
                        label,
                        attempt + 1,
                        error,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
