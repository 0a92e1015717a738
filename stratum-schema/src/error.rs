//! Error types for model loading and validation.

// These warnings are false positives - the fields are used by derive macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Errors that can occur while loading or validating model definitions.
#[derive(Error, Debug, Diagnostic)]
pub enum SchemaError {
    /// Error reading a file.
    #[error("failed to read file: {path}")]
    #[diagnostic(code(stratum::schema::io_error))]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A model file could not be parsed.
    #[error("failed to parse model file: {path}")]
    #[diagnostic(
        code(stratum::schema::model_file),
        help("model files are TOML documents with a `name` and an `[attributes]` table")
    )]
    ModelFile {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Invalid model definition.
    #[error("invalid model `{name}`: {message}")]
    #[diagnostic(code(stratum::schema::invalid_model))]
    InvalidModel { name: String, message: String },

    /// Invalid attribute definition.
    #[error("invalid attribute `{model}.{attribute}`: {message}")]
    #[diagnostic(code(stratum::schema::invalid_attribute))]
    InvalidAttribute {
        model: String,
        attribute: String,
        message: String,
    },

    /// Two attributes render to the same column.
    #[error("duplicate column `{column}` in model `{model}`")]
    #[diagnostic(code(stratum::schema::duplicate_column))]
    DuplicateColumn { model: String, column: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    #[diagnostic(code(stratum::schema::config_error))]
    ConfigError { message: String },

    /// TOML parsing error.
    #[error("failed to parse TOML")]
    #[diagnostic(code(stratum::schema::toml_error))]
    TomlError {
        #[source]
        source: toml::de::Error,
    },
}

impl SchemaError {
    /// Create an I/O error for a path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid model error.
    pub fn invalid_model(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidModel {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an invalid attribute error.
    pub fn invalid_attribute(
        model: impl Into<String>,
        attribute: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidAttribute {
            model: model.into(),
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    /// Create a duplicate column error.
    pub fn duplicate_column(model: impl Into<String>, column: impl Into<String>) -> Self {
        Self::DuplicateColumn {
            model: model.into(),
            column: column.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }
}
