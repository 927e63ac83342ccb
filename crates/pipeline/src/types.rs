//! Shared value types for node execution.
//!
//! [`NodeConfig`] and [`NodeResult`] are the two values that cross the node
//! boundary. Both are JSON objects whose shape is known only to the node type
//! that owns them; their shape is checked against the node's declared
//! [`Schema`](crate::Schema) at the boundary, not by these types.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{ExecutionId, NodeType};

// ---------------------------------------------------------------------------
// Node boundary values
// ---------------------------------------------------------------------------

macro_rules! json_object {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Map<String, Value>);

        impl $name {
            /// Creates an empty object.
            pub fn new() -> Self {
                Self(Map::new())
            }

            /// Wraps an existing JSON object.
            pub fn from_map(map: Map<String, Value>) -> Self {
                Self(map)
            }

            /// Converts a JSON value, returning `None` if it is not an object.
            pub fn from_value(value: Value) -> Option<Self> {
                match value {
                    Value::Object(map) => Some(Self(map)),
                    _ => None,
                }
            }

            /// Returns the value of `field`, if present.
            pub fn get(&self, field: &str) -> Option<&Value> {
                self.0.get(field)
            }

            /// Sets `field` to `value`, returning `self` for chaining.
            pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
                self.0.insert(field.into(), value.into());
                self
            }

            /// Returns the underlying JSON object.
            pub fn as_map(&self) -> &Map<String, Value> {
                &self.0
            }

            /// Consumes `self` and returns it as a JSON value.
            pub fn into_value(self) -> Value {
                Value::Object(self.0)
            }

            /// Deserializes the object into a typed structure.
            pub fn deserialize_into<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
                serde_json::from_value(Value::Object(self.0.clone()))
            }
        }

        impl From<Map<String, Value>> for $name {
            fn from(map: Map<String, Value>) -> Self {
                Self(map)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match serde_json::to_string(&self.0) {
                    Ok(s) => f.write_str(&s),
                    Err(_) => f.write_str("{..}"),
                }
            }
        }
    };
}

json_object! {
    /// Raw configuration supplied by the orchestrator for one execution.
    ///
    /// Field names and meaning are specific to the node type (for the HTTP
    /// node: `url`, `method`, `headers`, `body`). Owned per invocation and
    /// never persisted.
    NodeConfig
}

json_object! {
    /// Output produced by one node execution.
    ///
    /// Always conforms to the producing node's output schema when returned
    /// from `Node::execute`.
    NodeResult
}

// ---------------------------------------------------------------------------
// Execution reporting
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Creates a [`Timestamp`] from a [`DateTime<Utc>`].
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Returns the underlying [`DateTime<Utc>`].
    pub fn as_datetime(self) -> DateTime<Utc> {
        self.0
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------

/// Outcome of one successful node execution together with its metadata.
///
/// Produced by `Node::execute_with_report`; `result` has already passed
/// output validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Identifier recorded on every tracing event of this execution.
    pub execution_id: ExecutionId,

    /// Type tag of the node that ran.
    pub node_type: NodeType,

    /// When input validation started.
    pub started_at: Timestamp,

    /// When output validation finished.
    pub finished_at: Timestamp,

    /// Number of attempts made, including the successful one.
    pub attempts: u32,

    /// The validated node output.
    pub result: NodeResult,
}
