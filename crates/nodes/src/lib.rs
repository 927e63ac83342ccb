//! Nodeflow node implementations and the node registry.
//!
//! This crate provides the concrete nodes that implement
//! [`pipeline::Node`] and the [`NodeRegistry`] the orchestrator uses to find
//! them by type tag.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request construction, and response
//! parsing live here. Validation, retry, and the execution contract come from
//! the [`pipeline`] crate; nodes only implement a single attempt.
//!
//! ## Built-in nodes
//!
//! | Type tag | Node |
//! |----------|------|
//! | `api` | [`HttpRequestNode`] |

pub mod http;
pub mod registry;

pub use http::{failure_payload, HttpClientConfig, HttpMethod, HttpRequestConfig, HttpRequestNode};
pub use registry::NodeRegistry;
