//! HTTP request node.
//!
//! [`HttpRequestNode`] issues one request per attempt with `reqwest`, parses
//! the response body as JSON, and reports `{status, data, headers}`. Request
//! failures are contained inside the attempt: they are logged on the
//! `nodes::http` target and replaced by [`failure_payload`], so the
//! pipeline's control flow is never interrupted by a network error.

mod config;
mod error;
mod node;

/// Tracing target for every event emitted by the HTTP node.
pub const TRACING_TARGET: &str = "nodes::http";

pub use config::{HttpClientConfig, HttpMethod, HttpRequestConfig, DEFAULT_HTTP_TIMEOUT};
pub use node::{failure_payload, HttpRequestNode, FAILURE_STATUS, HTTP_NODE_TYPE};
