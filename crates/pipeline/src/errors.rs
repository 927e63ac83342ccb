//! Error and retry-policy types for node execution.
//!
//! The taxonomy mirrors where a failure is handled:
//!
//! | Type | Raised by | Handled by |
//! |------|-----------|------------|
//! | [`ValidationError`] | schema checks at the node boundary | caller of `execute` |
//! | [`OperationError`] | one attempt of a node's work | [`RetryExecutor`](crate::RetryExecutor) |
//! | [`RetryError`] | the retry executor after giving up | `execute`, which wraps it in [`NodeError`] |
//! | [`NodeError`] | `Node::execute` | the orchestrator |
//!
//! [`RetryPolicy`] is a cross-cutting concern: every [`OperationError`]
//! carries one so the retry executor can decide whether to re-invoke the
//! operation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NodeType;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: timeouts, connection resets, transient upstream
///   failures.
/// - `NonRetryable` errors: conditions that will fail identically on every
///   attempt (malformed configuration, unsupported operation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    ///
    /// `after` optionally specifies the minimum delay before retrying (e.g.
    /// derived from a `Retry-After` response header).
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// executor's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// One field that does not conform to its declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Dotted path of the offending field (`"<root>"` for the value itself).
    pub path: String,

    /// Human-readable description of the expectation that was not met.
    pub message: String,
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A value does not conform to its declared [`Schema`](crate::Schema).
///
/// Always carries at least one [`FieldViolation`]; all violations found in a
/// single pass are reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{} field(s) invalid: {}", .violations.len(), join_violations(.violations))]
pub struct ValidationError {
    violations: Vec<FieldViolation>,
}

impl ValidationError {
    /// Creates a validation error from a non-empty list of violations.
    ///
    /// Returns `None` if `violations` is empty.
    pub fn new(violations: Vec<FieldViolation>) -> Option<Self> {
        if violations.is_empty() {
            None
        } else {
            Some(Self { violations })
        }
    }

    /// Creates a validation error for exactly one offending field.
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            violations: vec![FieldViolation {
                path: path.into(),
                message: message.into(),
            }],
        }
    }

    /// Returns every violation that was found.
    pub fn violations(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// Returns `true` if a violation was reported for `path`.
    pub fn has_violation_at(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }
}

fn join_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Attempt-level errors
// ---------------------------------------------------------------------------

/// Failure of a single attempt of a node's operation.
///
/// Nodes that contain failures locally (such as the HTTP node, which turns
/// them into a degraded result) rarely produce this; it is what the retry
/// executor reacts to.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{message}")]
pub struct OperationError {
    message: String,
    retry_policy: RetryPolicy,
}

impl OperationError {
    /// A failure that may succeed on a later attempt.
    pub fn retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_policy: RetryPolicy::Retryable { after: None },
        }
    }

    /// A retryable failure that must not be retried before `after` has elapsed.
    pub fn retryable_after(message: impl Into<String>, after: Duration) -> Self {
        Self {
            message: message.into(),
            retry_policy: RetryPolicy::Retryable { after: Some(after) },
        }
    }

    /// A failure that will recur on every attempt.
    pub fn non_retryable(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_policy: RetryPolicy::NonRetryable,
        }
    }

    /// The attempt did not complete within `limit`.
    pub fn timed_out(limit: Duration) -> Self {
        Self::retryable(format!("attempt timed out after {} ms", limit.as_millis()))
    }

    /// Returns the human-readable failure description.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns whether and when this failure may be retried.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }
}

/// The retry executor gave up on an operation.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum RetryError {
    /// Every permitted attempt failed.
    #[error("operation failed after {attempts} attempt(s): {last}")]
    Exhausted {
        /// Number of attempts made (equals the configured maximum).
        attempts: u32,
        /// Failure of the final attempt.
        last: OperationError,
    },

    /// An attempt failed with a non-retryable error; no further attempts were made.
    #[error("operation aborted on attempt {attempts}: {source}")]
    Aborted {
        /// Number of attempts made, including the aborting one.
        attempts: u32,
        /// The non-retryable failure.
        source: OperationError,
    },
}

impl RetryError {
    /// Returns the number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Aborted { attempts, .. } => *attempts,
        }
    }
}

// ---------------------------------------------------------------------------
// Node-level errors
// ---------------------------------------------------------------------------

/// Errors surfaced by `Node::execute` to the orchestrator.
///
/// Failures that a node contains locally never appear here; a node whose
/// operation degrades gracefully returns `Ok` with a degraded result instead.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum NodeError {
    /// The supplied configuration does not match the node's input schema.
    ///
    /// No attempt was made.
    #[error("invalid node input: {0}")]
    InvalidInput(ValidationError),

    /// The node produced a result that does not match its output schema.
    #[error("invalid node output: {0}")]
    InvalidOutput(ValidationError),

    /// The node's operation failed and the retry executor gave up.
    #[error(transparent)]
    Retry(#[from] RetryError),

    /// No node is registered under the requested type tag.
    #[error("unknown node type '{0}'")]
    UnknownNodeType(NodeType),

    /// The node or its runtime settings are misconfigured.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration problem.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn violation(path: &str, message: &str) -> FieldViolation {
        FieldViolation {
            path: path.into(),
            message: message.into(),
        }
    }

    #[test]
    fn validation_error_requires_violations() {
        assert!(ValidationError::new(Vec::new()).is_none());
    }

    #[test]
    fn validation_error_lists_every_violation() {
        let err = ValidationError::new(vec![
            violation("url", "expected an absolute URL"),
            violation("method", "expected one of GET, POST, PUT, DELETE"),
        ])
        .unwrap();

        assert_eq!(
            err.to_string(),
            "2 field(s) invalid: url: expected an absolute URL; \
             method: expected one of GET, POST, PUT, DELETE"
        );
        assert!(err.has_violation_at("method"));
        assert!(!err.has_violation_at("body"));
    }

    #[test]
    fn operation_error_constructors_set_policy() {
        assert_eq!(
            OperationError::retryable("reset").retry_policy(),
            &RetryPolicy::Retryable { after: None }
        );
        assert_eq!(
            OperationError::non_retryable("bad").retry_policy(),
            &RetryPolicy::NonRetryable
        );
        assert_eq!(
            OperationError::timed_out(Duration::from_millis(250)).message(),
            "attempt timed out after 250 ms"
        );
    }

    #[test]
    fn retry_error_reports_attempts() {
        let err = RetryError::Exhausted {
            attempts: 3,
            last: OperationError::retryable("connection reset"),
        };
        assert_eq!(err.attempts(), 3);
        assert_eq!(
            err.to_string(),
            "operation failed after 3 attempt(s): connection reset"
        );
    }
}
