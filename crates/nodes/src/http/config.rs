//! HTTP client settings and the typed request configuration.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Whole-request timeout used unless the caller picks another: 30 seconds.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// How the HTTP node builds its `reqwest::Client`.
///
/// One client is built per node and shared by every execution, so these
/// settings apply to all requests the node sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpClientConfig {
    /// Bound on one request from connect until the body is fully read.
    /// Expiry is a caught failure and produces the failure payload.
    pub timeout: Duration,

    /// Value of the `User-Agent` header.
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: concat!("nodeflow/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl HttpClientConfig {
    /// Replaces the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the `User-Agent` header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub(crate) fn build_client(&self) -> reqwest::Result<Client> {
        Client::builder()
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
    }
}

// ---------------------------------------------------------------------------
// Request configuration
// ---------------------------------------------------------------------------

/// HTTP methods the request node accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Fetch a resource.
    Get,
    /// Create a resource or submit data.
    Post,
    /// Replace a resource.
    Put,
    /// Remove a resource.
    Delete,
}

impl HttpMethod {
    /// Every accepted method, in the spelling the configuration uses.
    pub const ALL: [&'static str; 4] = ["GET", "POST", "PUT", "DELETE"];

    /// Returns the method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed view of an HTTP node's configuration.
///
/// Deserialized from a `NodeConfig` that has already passed the node's input
/// schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HttpRequestConfig {
    /// Absolute request URL.
    pub url: Url,

    /// Request method.
    pub method: HttpMethod,

    /// Extra request headers.
    #[serde(default)]
    pub headers: Option<BTreeMap<String, String>>,

    /// Payload serialized as JSON. Falsy values are not sent.
    #[serde(default)]
    pub body: Option<Value>,
}

impl HttpRequestConfig {
    /// Returns the body to send, if any.
    ///
    /// `null`, `false`, `0`, and `""` count as no body at all.
    pub fn sendable_body(&self) -> Option<&Value> {
        self.body.as_ref().filter(|body| is_truthy(body))
    }

    /// Returns `true` if a `content-type` header was configured.
    pub fn has_content_type(&self) -> bool {
        self.headers
            .iter()
            .flatten()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: Value) -> HttpRequestConfig {
        serde_json::from_value(json!({
            "url": "https://api.example.com/items",
            "method": "POST",
            "body": body,
        }))
        .unwrap()
    }

    #[test]
    fn client_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.user_agent.starts_with("nodeflow/"));
        assert!(config.build_client().is_ok());
    }

    #[test]
    fn client_overrides_replace_defaults() {
        let config = HttpClientConfig::default()
            .with_timeout(Duration::from_millis(250))
            .with_user_agent("batch-runner/1.0");
        assert_eq!(config.timeout, Duration::from_millis(250));
        assert_eq!(config.user_agent, "batch-runner/1.0");
    }

    #[test]
    fn methods_use_uppercase_names() {
        let method: HttpMethod = serde_json::from_value(json!("DELETE")).unwrap();
        assert_eq!(method, HttpMethod::Delete);
        assert_eq!(reqwest::Method::from(method), reqwest::Method::DELETE);
        assert!(serde_json::from_value::<HttpMethod>(json!("get")).is_err());
    }

    #[test]
    fn falsy_bodies_are_not_sent() {
        for body in [Value::Null, json!(false), json!(0), json!(0.0), json!("")] {
            assert_eq!(request(body.clone()).sendable_body(), None, "sent {body}");
        }
        for body in [json!(true), json!(1), json!("x"), json!([]), json!({})] {
            assert!(request(body.clone()).sendable_body().is_some(), "dropped {body}");
        }
    }

    #[test]
    fn content_type_lookup_ignores_case() {
        let mut config = request(json!({"a": 1}));
        assert!(!config.has_content_type());
        config.headers = Some(BTreeMap::from([(
            "Content-Type".to_owned(),
            "text/plain".to_owned(),
        )]));
        assert!(config.has_content_type());
    }
}
