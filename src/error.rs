//! Error types for API surface generation
//!
//! Only fatal conditions live here. Degraded resolution (unsupported type
//! shapes, generic arguments, duplicate declarations) is reported through
//! [`crate::diagnostics::Diagnostics`] and never aborts a run.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for generation operations
pub type Result<T> = std::result::Result<T, GenError>;

/// Fatal generation errors
#[derive(Error, Debug)]
pub enum GenError {
    #[error("unknown argument type for {context}: expected a string, an array of strings{object_hint}, found {found}")]
    UnknownArgumentType {
        context: String,
        found: String,
        object_hint: &'static str,
    },

    #[error("path parameter '{parameter}' of {controller}.{method} must name the path field it binds")]
    MissingPathField {
        controller: String,
        method: String,
        parameter: String,
    },

    #[error("Failed to parse source unit {path}: {source}")]
    SourceParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid source pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("No configuration task named '{0}'")]
    UnknownTask(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Source walk error: {0}")]
    Walk(#[from] ignore::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl GenError {
    /// Unknown argument shape on a method-level route annotation
    pub fn unknown_route_argument(context: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnknownArgumentType {
            context: context.into(),
            found: found.into(),
            object_hint: "",
        }
    }

    /// Unknown argument shape on a controller annotation (object literals allowed)
    pub fn unknown_controller_argument(context: impl Into<String>, found: impl Into<String>) -> Self {
        Self::UnknownArgumentType {
            context: context.into(),
            found: found.into(),
            object_hint: " or an object with a path field",
        }
    }
}
