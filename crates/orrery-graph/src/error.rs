//! Error types for loading and configuring the body graph

use thiserror::Error;

/// Result type for graph-level operations
pub type GraphResult<T> = Result<T, GraphError>;

/// A problem with one body record or field.
///
/// These never abort a load: the record is skipped with a warning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("missing required field `{0}`")]
    MissingField(String),

    #[error("invalid value for `{key}`: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("unknown parent body `{0}`")]
    UnknownParent(String),

    #[error("unknown orbit type `{0}`")]
    UnknownOrbit(String),

    #[error("unknown body type `{0}`")]
    UnknownKind(String),
}

impl ConfigError {
    pub fn invalid(key: &str, value: &str) -> Self {
        ConfigError::InvalidValue { key: key.to_string(), value: value.to_string() }
    }
}

/// Failures that stop a whole system from loading
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid system `{name}`: {source}")]
    System {
        name: String,
        #[source]
        source: ConfigError,
    },
}
