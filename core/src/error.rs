use core::fmt;

use quarry_types::SchemaError;
use thiserror::Error;

/// Error type produced by third-party extension callables
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum QueryError {
    /// Structural argument error, or a validation error reported by the engine
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A compute function, method or query interceptor failed
    #[error("Error caused by {}: {source}", extension_label(.extension))]
    Extension {
        extension: Option<String>,
        #[source]
        source: BoxError,
    },

    /// A fluent data path names a field that its resolved model does not have
    #[error("Data path error: field `{field}` does not exist on model `{model}`")]
    DataPath { model: String, field: String },

    /// Computed fields of one extension depend on each other in a loop
    #[error("Computed field `{field}` on `{model}` has cyclic dependencies")]
    CyclicComputedField { model: String, field: String },

    #[error("Unknown model `{0}`")]
    UnknownModel(String),

    #[error("Unknown method `{0}`")]
    UnknownMethod(String),

    /// Error reported by the execution engine
    #[error("Engine error: {0}")]
    Engine(String),

    /// Error converting values to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

fn extension_label(extension: &Option<String>) -> String {
    match extension {
        Some(name) => format!("extension \"{name}\""),
        None => "an extension".to_string(),
    }
}

impl QueryError {
    /// Maps an error raised inside an extension callable
    ///
    /// Errors that already belong to the pipeline (for example a validation
    /// error surfacing through a query interceptor's `next` call) pass
    /// through untouched.
    pub fn from_extension(extension: Option<&str>, error: BoxError) -> Self {
        match error.downcast::<QueryError>() {
            Ok(inner) => *inner,
            Err(source) => QueryError::Extension {
                extension: extension.map(str::to_string),
                source,
            },
        }
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::Serialization(err.to_string())
    }
}

/// Result type for query pipeline operations
pub type Result<T> = std::result::Result<T, QueryError>;

/// Structured validation error handed to the error renderer
///
/// Local kinds are raised by the serializer. Engine kinds are carried
/// through without interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub selection_path: Vec<String>,
    pub argument_path: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// Two selection modifiers that cannot be combined on one node
    MutuallyExclusiveFields {
        first_field: String,
        second_field: String,
    },
    /// `include` names a field that is not a relation
    IncludeOnScalar { model: Option<String> },
    /// A value that cannot be put on the wire
    InvalidArgumentValue {
        argument_name: String,
        type_names: Vec<String>,
        underlying_error: String,
    },
    /// Reported by the engine; `details` holds the remaining payload
    Engine {
        kind: String,
        details: serde_json::Map<String, serde_json::Value>,
    },
}

impl ValidationErrorKind {
    pub fn name(&self) -> &str {
        match self {
            ValidationErrorKind::MutuallyExclusiveFields { .. } => "MutuallyExclusiveFields",
            ValidationErrorKind::IncludeOnScalar { .. } => "IncludeOnScalar",
            ValidationErrorKind::InvalidArgumentValue { .. } => "InvalidArgumentValue",
            ValidationErrorKind::Engine { kind, .. } => kind,
        }
    }
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind) -> Self {
        Self {
            kind,
            selection_path: Vec::new(),
            argument_path: Vec::new(),
        }
    }

    pub fn with_selection_path(mut self, path: impl Into<Vec<String>>) -> Self {
        self.selection_path = path.into();
        self
    }

    pub fn with_argument_path(mut self, path: impl Into<Vec<String>>) -> Self {
        self.argument_path = path.into();
        self
    }

    /// Wraps an engine-reported validation error
    ///
    /// Expects the engine's `{ "kind": ..., "selectionPath": [...],
    /// "argumentPath": [...], ... }` shape. Missing paths default to empty.
    pub fn from_engine_json(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(mut map) = value else {
            return Err(QueryError::Serialization(
                "engine validation error must be a JSON object".to_string(),
            ));
        };
        let kind = match map.remove("kind") {
            Some(serde_json::Value::String(kind)) => kind,
            _ => {
                return Err(QueryError::Serialization(
                    "engine validation error is missing `kind`".to_string(),
                ));
            }
        };
        let selection_path = take_path(&mut map, "selectionPath");
        let argument_path = take_path(&mut map, "argumentPath");
        Ok(Self {
            kind: ValidationErrorKind::Engine { kind, details: map },
            selection_path,
            argument_path,
        })
    }

    /// JSON shape consumed by the error renderer
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::{Value as Json, json};

        let mut map = serde_json::Map::new();
        map.insert("kind".into(), Json::String(self.kind.name().to_string()));
        match &self.kind {
            ValidationErrorKind::MutuallyExclusiveFields {
                first_field,
                second_field,
            } => {
                map.insert("firstField".into(), json!(first_field));
                map.insert("secondField".into(), json!(second_field));
            }
            ValidationErrorKind::IncludeOnScalar { model } => {
                if let Some(model) = model {
                    map.insert("outputType".into(), json!({ "name": model }));
                }
            }
            ValidationErrorKind::InvalidArgumentValue {
                argument_name,
                type_names,
                underlying_error,
            } => {
                map.insert(
                    "argument".into(),
                    json!({ "name": argument_name, "typeNames": type_names }),
                );
                map.insert("underlyingError".into(), json!(underlying_error));
            }
            ValidationErrorKind::Engine { details, .. } => {
                map.extend(details.clone());
            }
        }
        map.insert("selectionPath".into(), json!(self.selection_path));
        map.insert("argumentPath".into(), json!(self.argument_path));
        Json::Object(map)
    }
}

fn take_path(map: &mut serde_json::Map<String, serde_json::Value>, key: &str) -> Vec<String> {
    match map.remove(key) {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValidationErrorKind::MutuallyExclusiveFields {
                first_field,
                second_field,
            } => write!(
                f,
                "Please either use `{first_field}` or `{second_field}`, but not both at the same time"
            )?,
            ValidationErrorKind::IncludeOnScalar { .. } => {
                f.write_str("Invalid scalar field for `include` statement")?
            }
            ValidationErrorKind::InvalidArgumentValue {
                argument_name,
                underlying_error,
                ..
            } => write!(f, "Invalid value for argument `{argument_name}`: {underlying_error}")?,
            ValidationErrorKind::Engine { kind, .. } => write!(f, "{kind}")?,
        }
        if !self.selection_path.is_empty() {
            write!(f, " (selection: {})", self.selection_path.join("."))?;
        }
        if !self.argument_path.is_empty() {
            write!(f, " (argument: {})", self.argument_path.join("."))?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_error_round_trips_untouched() {
        let raw = json!({
            "kind": "UnknownArgument",
            "argumentPath": ["where", "nope"],
            "selectionPath": ["posts"],
            "arguments": [{ "name": "where", "typeNames": ["UserWhereInput"] }]
        });
        let err = ValidationError::from_engine_json(raw).unwrap();

        assert_eq!(err.kind.name(), "UnknownArgument");
        assert_eq!(err.argument_path, ["where", "nope"]);
        assert_eq!(err.selection_path, ["posts"]);
        assert_eq!(
            err.to_json(),
            json!({
                "kind": "UnknownArgument",
                "arguments": [{ "name": "where", "typeNames": ["UserWhereInput"] }],
                "selectionPath": ["posts"],
                "argumentPath": ["where", "nope"]
            })
        );
    }

    #[test]
    fn test_engine_error_requires_kind() {
        assert!(ValidationError::from_engine_json(json!({ "selectionPath": [] })).is_err());
        assert!(ValidationError::from_engine_json(json!("nope")).is_err());
    }

    #[test]
    fn test_extension_errors_keep_pipeline_errors() {
        let inner: BoxError = Box::new(QueryError::UnknownModel("Ghost".into()));
        assert!(matches!(
            QueryError::from_extension(Some("ext"), inner),
            QueryError::UnknownModel(_)
        ));

        let foreign: BoxError = "boom".into();
        let err = QueryError::from_extension(Some("ext"), foreign);
        assert_eq!(err.to_string(), "Error caused by extension \"ext\": boom");
    }

    #[test]
    fn test_display() {
        let err = ValidationError::new(ValidationErrorKind::MutuallyExclusiveFields {
            first_field: "select".into(),
            second_field: "include".into(),
        })
        .with_selection_path(vec!["posts".to_string()]);
        assert_eq!(
            err.to_string(),
            "Please either use `select` or `include`, but not both at the same time (selection: posts)"
        );
    }
}
