//! The HTTP request node.

use async_trait::async_trait;
use pipeline::{
    FieldKind, Node, NodeConfig, NodeError, NodeResult, NodeType, OperationError, RetryConfig,
    Schema,
};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{json, Map, Value};

use super::config::{HttpClientConfig, HttpMethod, HttpRequestConfig};
use super::error::HttpAttemptError;
use super::TRACING_TARGET;

/// Type tag under which the HTTP request node is registered.
pub const HTTP_NODE_TYPE: &str = "api";

/// Status reported by the failure payload.
pub const FAILURE_STATUS: u16 = 500;

/// Result returned in place of an error when an attempt fails.
///
/// `{status: 500, data: {message: "Error"}, headers: {}}`. It conforms to the
/// node's output schema, so downstream steps always receive the same shape.
pub fn failure_payload() -> NodeResult {
    NodeResult::new()
        .with("status", FAILURE_STATUS)
        .with("data", json!({ "message": "Error" }))
        .with("headers", Value::Object(Map::new()))
}

/// Performs exactly one outbound HTTP request per attempt.
///
/// Configuration fields:
///
/// | Field | Kind | |
/// |-------|------|-|
/// | `url` | absolute URL | required |
/// | `method` | `GET`, `POST`, `PUT`, `DELETE` | required |
/// | `headers` | string → string | optional |
/// | `body` | any JSON | optional, sent as JSON when truthy |
///
/// The response body is parsed as JSON whatever its declared content type,
/// and the result is `{status, data, headers}`. Any status code, including
/// 4xx and 5xx, is a successful attempt.
///
/// Failures while sending, reading, or decoding are never returned as
/// errors. The node logs an `error` event carrying the request configuration
/// and returns [`failure_payload`].
pub struct HttpRequestNode {
    node_type: NodeType,
    input: Schema,
    output: Schema,
    client: Client,
    retry: RetryConfig,
}

impl std::fmt::Debug for HttpRequestNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequestNode")
            .field("node_type", &self.node_type)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl HttpRequestNode {
    /// Creates the node with its own HTTP client.
    ///
    /// # Errors
    ///
    /// [`NodeError::Configuration`] if the HTTP client cannot be built (for
    /// example when the TLS backend fails to initialise).
    pub fn new(config: HttpClientConfig) -> Result<Self, NodeError> {
        tracing::debug!(
            target: TRACING_TARGET,
            timeout_ms = config.timeout.as_millis() as u64,
            user_agent = %config.user_agent,
            "Creating HTTP request node client"
        );

        let client = config
            .build_client()
            .map_err(|err| NodeError::Configuration {
                message: format!("failed to create HTTP client: {err}"),
            })?;

        Ok(Self::with_client(client))
    }

    /// Creates the node around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self {
            node_type: NodeType::from_static(HTTP_NODE_TYPE),
            input: input_schema(),
            output: output_schema(),
            client,
            retry: RetryConfig::default(),
        }
    }

    /// Replaces the retry settings applied to each execution.
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn send(&self, config: &NodeConfig) -> Result<NodeResult, HttpAttemptError> {
        let request: HttpRequestConfig =
            config.deserialize_into().map_err(HttpAttemptError::Config)?;

        let mut builder = self
            .client
            .request(request.method.into(), request.url.clone());

        for (name, value) in request.headers.iter().flatten() {
            builder = builder.header(name, value);
        }

        if let Some(body) = request.sendable_body() {
            let payload = serde_json::to_vec(body).map_err(HttpAttemptError::Encode)?;
            if !request.has_content_type() {
                builder = builder.header(CONTENT_TYPE, "application/json");
            }
            builder = builder.body(payload);
        }

        tracing::debug!(
            target: TRACING_TARGET,
            method = %request.method,
            url = %request.url,
            "Sending HTTP request"
        );

        let response = builder.send().await.map_err(HttpAttemptError::Send)?;
        let status = response.status().as_u16();
        let headers = header_map_to_json(response.headers());
        let bytes = response.bytes().await.map_err(HttpAttemptError::Read)?;
        let data: Value = serde_json::from_slice(&bytes).map_err(HttpAttemptError::Decode)?;

        tracing::debug!(
            target: TRACING_TARGET,
            status,
            "Received HTTP response"
        );

        Ok(NodeResult::new()
            .with("status", status)
            .with("data", data)
            .with("headers", Value::Object(headers)))
    }
}

#[async_trait]
impl Node for HttpRequestNode {
    fn node_type(&self) -> &NodeType {
        &self.node_type
    }

    fn input_schema(&self) -> &Schema {
        &self.input
    }

    fn output_schema(&self) -> &Schema {
        &self.output
    }

    fn retry_config(&self) -> RetryConfig {
        self.retry.clone()
    }

    async fn attempt(&self, config: &NodeConfig) -> Result<NodeResult, OperationError> {
        match self.send(config).await {
            Ok(result) => Ok(result),
            Err(err) => {
                let url = config.get("url").and_then(Value::as_str).unwrap_or_default();
                tracing::error!(
                    target: TRACING_TARGET,
                    config = %config,
                    error = %err,
                    "Error making API request, {url}"
                );
                Ok(failure_payload())
            }
        }
    }
}

fn input_schema() -> Schema {
    Schema::builder()
        .required("url", FieldKind::Url)
        .required("method", FieldKind::one_of(HttpMethod::ALL))
        .optional("headers", FieldKind::map_of(FieldKind::String))
        .optional("body", FieldKind::Any)
        .build()
}

fn output_schema() -> Schema {
    Schema::builder()
        .required("status", FieldKind::Integer)
        .required("data", FieldKind::Any)
        .required("headers", FieldKind::map_of(FieldKind::String))
        .build()
}

/// Flattens response headers into a JSON object of strings.
///
/// Names are lower-case; repeated headers are joined with `", "`. Values that
/// are not valid visible ASCII are decoded lossily.
fn header_map_to_json(headers: &HeaderMap) -> Map<String, Value> {
    let mut out = Map::new();
    for (name, value) in headers {
        let text = match value.to_str() {
            Ok(s) => s.to_owned(),
            Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        };
        match out.get_mut(name.as_str()) {
            Some(Value::String(existing)) => {
                existing.push_str(", ");
                existing.push_str(&text);
            }
            _ => {
                out.insert(name.as_str().to_owned(), Value::String(text));
            }
        }
    }
    out
}
