//! Failures inside one HTTP attempt.
//!
//! None of these leave the node: they are logged and replaced by the failure
//! payload. They exist so the diagnostic event says which step failed.

use thiserror::Error;

#[derive(Debug, Error)]
pub(crate) enum HttpAttemptError {
    #[error("configuration does not describe a request: {0}")]
    Config(#[source] serde_json::Error),

    #[error("request body could not be encoded as JSON: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("request failed: {0}")]
    Send(#[source] reqwest::Error),

    #[error("response body could not be read: {0}")]
    Read(#[source] reqwest::Error),

    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
}
