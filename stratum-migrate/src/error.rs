//! Error types for the migration engine.

use stratum_schema::SchemaError;
use thiserror::Error;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Error reported by a DDL emitter that refused a plan.
pub type EmitError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur during migration operations.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot store failure.
    #[error("Snapshot store error: {0}")]
    Snapshot(String),

    /// Ledger failure.
    #[error("Ledger error: {0}")]
    Ledger(String),

    /// Malformed model definition.
    #[error("Invalid model: {0}")]
    InvalidModel(#[from] SchemaError),

    /// The DDL emitter did not accept the plan.
    #[error("Migration for '{model}' was rejected: {source}")]
    EmitRejected {
        /// Model name.
        model: String,
        /// Emitter error.
        #[source]
        source: EmitError,
    },
}

impl MigrationError {
    /// Create a snapshot store error.
    pub fn snapshot(msg: impl Into<String>) -> Self {
        Self::Snapshot(msg.into())
    }

    /// Create a ledger error.
    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::Ledger(msg.into())
    }

    /// Create an emitter rejection.
    pub fn rejected(model: impl Into<String>, source: impl Into<EmitError>) -> Self {
        Self::EmitRejected {
            model: model.into(),
            source: source.into(),
        }
    }

    /// Whether this error must stop the whole run.
    ///
    /// Store and ledger failures are fatal because every later planning
    /// decision reads that state. Everything else only aborts the current
    /// model.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Snapshot(_) | Self::Ledger(_))
    }
}

impl From<rusqlite::Error> for MigrationError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Ledger(err.to_string())
    }
}
