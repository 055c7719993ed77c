//! Bounded retry around a single source call

use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Delay between attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    Fixed(Duration),
    /// Doubles per attempt, capped at `max`
    Exponential { base: Duration, max: Duration },
}

/// Retry policy value object.
///
/// Only errors accepted by the retryable predicate (transient network
/// failures by default) are retried. Anything else is returned after the
/// first attempt so the caller can fall through to another source.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff: Backoff,
    retryable: fn(&FetchError) -> bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Backoff::Fixed(Duration::from_secs(2)))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Backoff) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
            retryable: FetchError::is_transient,
        }
    }

    /// Policy with no delay between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Backoff::Fixed(Duration::ZERO))
    }

    pub fn with_retryable(mut self, predicate: fn(&FetchError) -> bool) -> Self {
        self.retryable = predicate;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(d) => d,
            Backoff::Exponential { base, max } => {
                let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.checked_mul(factor).unwrap_or(max).min(max)
            }
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempt budget is spent.
    ///
    /// Cancellation of `cancel` aborts both an in-flight attempt and the
    /// back-off sleep with [`FetchError::Cancelled`].
    pub async fn run<T, F, Fut>(
        &self,
        source_name: &str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                r = op() => r,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            if !(self.retryable)(&err) {
                tracing::warn!(
                    "{} failed with {} error, not retrying: {}",
                    source_name,
                    err.kind(),
                    err
                );
                return Err(err);
            }

            if attempt >= self.max_attempts {
                tracing::warn!(
                    "{} exhausted {} attempts: {}",
                    source_name,
                    self.max_attempts,
                    err
                );
                return Err(FetchError::SourceExhausted {
                    source_name: source_name.to_string(),
                    attempts: attempt,
                    last: Box::new(err),
                });
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                "{} attempt {}/{} failed: {}; retrying in {:?}",
                source_name,
                attempt,
                self.max_attempts,
                err,
                delay
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}
