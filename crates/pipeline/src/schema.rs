//! Declarative schemas for node input and output.
//!
//! A [`Schema`] describes the fields of a JSON object: each field has a name,
//! a [`FieldKind`], and is either required or optional. Nodes declare one
//! schema for their configuration and one for their result; both are
//! immutable for the lifetime of the node.
//!
//! Validation collects every violation in one pass so the caller can report
//! all offending fields at once.
//!
//! ```
//! use pipeline::{FieldKind, Schema};
//! use serde_json::json;
//!
//! let schema = Schema::builder()
//!     .required("url", FieldKind::Url)
//!     .optional("headers", FieldKind::map_of(FieldKind::String))
//!     .build();
//!
//! assert!(schema.validate(&json!({"url": "https://example.com"})).is_ok());
//! assert!(schema.validate(&json!({"url": "/relative"})).is_err());
//! ```

use serde_json::{Map, Value};
use url::Url;

use crate::{FieldViolation, ValidationError};

const ROOT_PATH: &str = "<root>";

// ---------------------------------------------------------------------------
// Field kinds
// ---------------------------------------------------------------------------

/// Expected shape of a single value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    /// Any JSON value, including `null`.
    Any,
    /// A JSON string.
    String,
    /// Any JSON number.
    Number,
    /// A JSON number without a fractional part.
    Integer,
    /// A JSON boolean.
    Boolean,
    /// A string holding an absolute URL (scheme plus hierarchical part).
    Url,
    /// A string equal to one of the listed values.
    Enum(Vec<String>),
    /// An object whose values all have the given kind.
    Map(Box<FieldKind>),
    /// An array whose elements all have the given kind.
    List(Box<FieldKind>),
    /// A nested object with its own schema.
    Object(Schema),
}

impl FieldKind {
    /// Shorthand for [`FieldKind::Enum`].
    pub fn one_of<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum(values.into_iter().map(Into::into).collect())
    }

    /// Shorthand for [`FieldKind::Map`].
    pub fn map_of(values: FieldKind) -> Self {
        Self::Map(Box::new(values))
    }

    /// Shorthand for [`FieldKind::List`].
    pub fn list_of(elements: FieldKind) -> Self {
        Self::List(Box::new(elements))
    }

    fn check(&self, value: &Value, path: &str, violations: &mut Vec<FieldViolation>) {
        match self {
            Self::Any => {}
            Self::String => {
                if !value.is_string() {
                    mismatch(violations, path, "a string", value);
                }
            }
            Self::Number => {
                if !value.is_number() {
                    mismatch(violations, path, "a number", value);
                }
            }
            Self::Integer => {
                if !(value.is_i64() || value.is_u64()) {
                    mismatch(violations, path, "an integer", value);
                }
            }
            Self::Boolean => {
                if !value.is_boolean() {
                    mismatch(violations, path, "a boolean", value);
                }
            }
            Self::Url => match value.as_str() {
                Some(s) if is_absolute_url(s) => {}
                Some(_) => push(violations, path, "expected an absolute URL".to_owned()),
                None => mismatch(violations, path, "a URL string", value),
            },
            Self::Enum(allowed) => match value.as_str() {
                Some(s) if allowed.iter().any(|a| a == s) => {}
                _ => push(violations, path, format!("expected one of {}", allowed.join(", "))),
            },
            Self::Map(inner) => match value.as_object() {
                Some(map) => {
                    for (key, item) in map {
                        inner.check(item, &join_path(path, key), violations);
                    }
                }
                None => mismatch(violations, path, "an object", value),
            },
            Self::List(inner) => match value.as_array() {
                Some(items) => {
                    for (index, item) in items.iter().enumerate() {
                        inner.check(item, &join_path(path, &index.to_string()), violations);
                    }
                }
                None => mismatch(violations, path, "an array", value),
            },
            Self::Object(schema) => match value.as_object() {
                Some(map) => schema.check_object(map, path, violations),
                None => mismatch(violations, path, "an object", value),
            },
        }
    }
}

fn push(violations: &mut Vec<FieldViolation>, path: &str, message: String) {
    violations.push(FieldViolation {
        path: path.to_owned(),
        message,
    });
}

fn mismatch(violations: &mut Vec<FieldViolation>, path: &str, expected: &str, value: &Value) {
    push(violations, path, format!("expected {expected}, found {}", type_name(value)));
}

fn is_absolute_url(candidate: &str) -> bool {
    // Url::parse rejects relative references; cannot-be-a-base URLs such as
    // `mailto:` have no authority to send a request to.
    Url::parse(candidate).is_ok_and(|url| !url.cannot_be_a_base())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn join_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_owned()
    } else {
        format!("{parent}.{field}")
    }
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Declaration of one named field within a [`Schema`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    /// Field name as it appears in the JSON object.
    pub name: String,
    /// Expected shape of the field's value.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
}

/// Declarative description of a JSON object's expected shape.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Schema {
    fields: Vec<FieldSpec>,
    deny_unknown_fields: bool,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Returns the declared fields in declaration order.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Returns the declaration of `name`, if any.
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Validates `value`, which must be a JSON object conforming to this schema.
    pub fn validate(&self, value: &Value) -> Result<(), ValidationError> {
        match value.as_object() {
            Some(map) => self.validate_object(map),
            None => Err(ValidationError::single(
                ROOT_PATH,
                format!("expected an object, found {}", type_name(value)),
            )),
        }
    }

    /// Validates an already-unwrapped JSON object.
    pub fn validate_object(&self, map: &Map<String, Value>) -> Result<(), ValidationError> {
        let mut violations = Vec::new();
        self.check_object(map, "", &mut violations);
        match ValidationError::new(violations) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn check_object(
        &self,
        map: &Map<String, Value>,
        path: &str,
        violations: &mut Vec<FieldViolation>,
    ) {
        for spec in &self.fields {
            let field_path = join_path(path, &spec.name);
            match map.get(&spec.name) {
                Some(value) => spec.kind.check(value, &field_path, violations),
                None if spec.required => violations.push(FieldViolation {
                    path: field_path,
                    message: "required field is missing".to_owned(),
                }),
                None => {}
            }
        }

        if self.deny_unknown_fields {
            for key in map.keys().filter(|k| self.field(k).is_none()) {
                violations.push(FieldViolation {
                    path: join_path(path, key),
                    message: "unknown field".to_owned(),
                });
            }
        }
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Declares a field that must be present.
    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.schema.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: true,
        });
        self
    }

    /// Declares a field that may be absent. When present it must match `kind`.
    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.schema.fields.push(FieldSpec {
            name: name.into(),
            kind,
            required: false,
        });
        self
    }

    /// Rejects object fields that were not declared.
    pub fn deny_unknown_fields(mut self) -> Self {
        self.schema.deny_unknown_fields = true;
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request_schema() -> Schema {
        Schema::builder()
            .required("url", FieldKind::Url)
            .required("method", FieldKind::one_of(["GET", "POST", "PUT", "DELETE"]))
            .optional("headers", FieldKind::map_of(FieldKind::String))
            .optional("body", FieldKind::Any)
            .build()
    }

    #[test]
    fn accepts_conforming_object() {
        let value = json!({
            "url": "https://api.example.com/items?page=2",
            "method": "POST",
            "headers": {"authorization": "Bearer t"},
            "body": {"name": "widget"}
        });
        assert!(request_schema().validate(&value).is_ok());
    }

    #[test]
    fn rejects_non_object_at_root() {
        let err = request_schema().validate(&json!("https://example.com")).unwrap_err();
        assert!(err.has_violation_at("<root>"));
    }

    #[test]
    fn rejects_relative_and_malformed_urls() {
        for url in ["/items", "example.com/items", "http://", "not a url", "mailto:a@b.c"] {
            let err = request_schema()
                .validate(&json!({"url": url, "method": "GET"}))
                .unwrap_err();
            assert!(err.has_violation_at("url"), "accepted {url}");
        }
    }

    #[test]
    fn reports_every_offending_field() {
        let err = request_schema()
            .validate(&json!({"method": "PATCH", "headers": {"x-count": 3}}))
            .unwrap_err();

        let paths: Vec<_> = err.violations().iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, ["url", "method", "headers.x-count"]);
    }

    #[test]
    fn optional_field_rejects_null_unless_any() {
        let err = request_schema()
            .validate(&json!({"url": "https://example.com", "method": "GET", "headers": null}))
            .unwrap_err();
        assert!(err.has_violation_at("headers"));

        let ok = request_schema()
            .validate(&json!({"url": "https://example.com", "method": "GET", "body": null}));
        assert!(ok.is_ok());
    }

    #[test]
    fn unknown_fields_are_ignored_by_default() {
        let value = json!({"url": "https://example.com", "method": "GET", "retry": true});
        assert!(request_schema().validate(&value).is_ok());

        let strict = Schema::builder()
            .required("url", FieldKind::Url)
            .deny_unknown_fields()
            .build();
        let err = strict.validate(&value).unwrap_err();
        assert!(err.has_violation_at("method"));
        assert!(err.has_violation_at("retry"));
    }

    #[test]
    fn integer_rejects_fractional_numbers() {
        let schema = Schema::builder().required("status", FieldKind::Integer).build();
        assert!(schema.validate(&json!({"status": 200})).is_ok());
        assert!(schema.validate(&json!({"status": 200.5})).is_err());
        assert!(schema.validate(&json!({"status": "200"})).is_err());
    }

    #[test]
    fn nested_objects_and_lists_report_full_paths() {
        let schema = Schema::builder()
            .required(
                "items",
                FieldKind::list_of(FieldKind::Object(
                    Schema::builder().required("id", FieldKind::Integer).build(),
                )),
            )
            .build();

        let err = schema
            .validate(&json!({"items": [{"id": 1}, {"id": "two"}, {}]}))
            .unwrap_err();
        assert!(err.has_violation_at("items.1.id"));
        assert!(err.has_violation_at("items.2.id"));
        assert_eq!(err.violations().len(), 2);
    }
}
