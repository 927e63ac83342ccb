//! Bounded retry with back-off for a single fallible operation.
//!
//! [`RetryExecutor::run`] invokes an operation until it succeeds, fails with a
//! non-retryable error, or the configured number of attempts is used up.
//! Attempts are strictly sequential: attempt `n + 1` starts only after
//! attempt `n` has failed and its back-off delay has elapsed.
//!
//! The executor never invents a fallback value. Converting a failure into a
//! degraded result is the wrapped operation's job; the executor only decides
//! whether to try again.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{OperationError, RetryError, RetryPolicy};

const TRACING_TARGET: &str = "pipeline::retry";

// ---------------------------------------------------------------------------
// Policy configuration
// ---------------------------------------------------------------------------

/// Upper bound on the number of attempts, including the first one.
///
/// Always at least one. There is no unbounded setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct MaxAttempts(u32);

impl MaxAttempts {
    /// Creates a bound, returning `None` if `attempts` is zero.
    #[must_use]
    pub fn new(attempts: u32) -> Option<Self> {
        (attempts > 0).then_some(Self(attempts))
    }

    /// Returns the bound as an integer (always `>= 1`).
    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for MaxAttempts {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u32> for MaxAttempts {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| "max_attempts must be at least 1".to_owned())
    }
}

impl From<MaxAttempts> for u32 {
    fn from(value: MaxAttempts) -> Self {
        value.0
    }
}

impl std::fmt::Display for MaxAttempts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------

/// Delay schedule applied between a failed attempt and the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    None,

    /// Wait the same delay after every failure.
    Fixed {
        /// Delay between attempts.
        delay: Duration,
    },

    /// Wait `initial`, then multiply by `factor` after each further failure,
    /// never exceeding `max`.
    Exponential {
        /// Delay after the first failure.
        initial: Duration,
        /// Growth factor per failure.
        factor: u32,
        /// Upper bound for any single delay.
        max: Duration,
    },
}

impl Backoff {
    /// Returns the delay to wait after the `failed_attempt`-th failure (1-based).
    pub fn delay_after(&self, failed_attempt: u32) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fixed { delay } => *delay,
            Self::Exponential {
                initial,
                factor,
                max,
            } => {
                let exponent = failed_attempt.saturating_sub(1);
                let multiplier = factor.saturating_pow(exponent);
                initial.saturating_mul(multiplier).min(*max)
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::Exponential {
            initial: Duration::from_millis(200),
            factor: 2,
            max: Duration::from_secs(5),
        }
    }
}

// ---------------------------------------------------------------------------

/// Retry settings for one execution.
///
/// The default is three attempts with exponential back-off starting at
/// 200 ms (doubling, capped at 5 s) and no per-attempt timeout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: MaxAttempts,

    /// Delay schedule between attempts.
    pub backoff: Backoff,

    /// Limit on the duration of a single attempt. An attempt that exceeds it
    /// is cancelled and treated as a retryable failure.
    pub attempt_timeout: Option<Duration>,
}

impl RetryConfig {
    /// A configuration that makes exactly one attempt.
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: MaxAttempts(1),
            backoff: Backoff::None,
            attempt_timeout: None,
        }
    }

    /// Returns a copy with a different attempt bound.
    pub fn with_max_attempts(mut self, max_attempts: MaxAttempts) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Returns a copy with a different back-off schedule.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Returns a copy with a per-attempt timeout.
    pub fn with_attempt_timeout(mut self, limit: Duration) -> Self {
        self.attempt_timeout = Some(limit);
        self
    }
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// A successful value together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempted<T> {
    /// The operation's successful result.
    pub value: T,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

/// Runs a fallible asynchronous operation under a [`RetryConfig`].
#[derive(Debug, Clone, Default)]
pub struct RetryExecutor {
    config: RetryConfig,
}

impl RetryExecutor {
    /// Creates an executor for the given settings.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the settings this executor applies.
    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Invokes `operation` until it succeeds or the executor gives up.
    ///
    /// # Errors
    ///
    /// - [`RetryError::Aborted`] as soon as an attempt fails with
    ///   [`RetryPolicy::NonRetryable`].
    /// - [`RetryError::Exhausted`] when every permitted attempt failed.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> Result<Attempted<T>, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, OperationError>>,
    {
        let max_attempts = self.config.max_attempts.get();
        let mut attempt = 0;

        loop {
            attempt += 1;

            let outcome = match self.config.attempt_timeout {
                Some(limit) => match tokio::time::timeout(limit, operation()).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(OperationError::timed_out(limit)),
                },
                None => operation().await,
            };

            let error = match outcome {
                Ok(value) => {
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            let after = match error.retry_policy() {
                RetryPolicy::NonRetryable => {
                    tracing::error!(
                        target: TRACING_TARGET,
                        attempt,
                        error = %error,
                        "Attempt failed with non-retryable error"
                    );
                    return Err(RetryError::Aborted {
                        attempts: attempt,
                        source: error,
                    });
                }
                RetryPolicy::Retryable { after } => *after,
            };

            if attempt >= max_attempts {
                tracing::error!(
                    target: TRACING_TARGET,
                    attempts = attempt,
                    error = %error,
                    "Retry attempts exhausted"
                );
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last: error,
                });
            }

            let delay = self
                .config
                .backoff
                .delay_after(attempt)
                .max(after.unwrap_or_default());

            tracing::warn!(
                target: TRACING_TARGET,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed; retrying"
            );

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}
