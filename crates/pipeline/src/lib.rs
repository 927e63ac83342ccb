//! Core execution domain for Nodeflow.
//!
//! This crate defines what a pipeline node is and how one execution of it
//! behaves: validated configuration in, bounded retries, validated result
//! out. Concrete nodes live in infrastructure crates and implement the
//! [`Node`] trait defined here; they never re-implement validation or retry.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate performs no network I/O.
//! It uses `tokio` only for timers (retry back-off and attempt timeouts).
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`NodeType`, `ExecutionId`) |
//! | [`types`] | Boundary values (`NodeConfig`, `NodeResult`) and `ExecutionReport` |
//! | [`schema`] | Declarative schemas and validation |
//! | [`retry`] | `RetryConfig` and the `RetryExecutor` |
//! | [`node`] | The `Node` trait and its provided `execute` contract |
//! | [`errors`] | Error taxonomy and `RetryPolicy` |

pub mod errors;
pub mod identifiers;
pub mod node;
pub mod retry;
pub mod schema;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use errors::{
    FieldViolation, NodeError, OperationError, RetryError, RetryPolicy, ValidationError,
};
pub use identifiers::{ExecutionId, NodeType};
pub use node::Node;
pub use retry::{Attempted, Backoff, MaxAttempts, RetryConfig, RetryExecutor};
pub use schema::{FieldKind, FieldSpec, Schema, SchemaBuilder};
pub use types::{ExecutionReport, NodeConfig, NodeResult, Timestamp};
