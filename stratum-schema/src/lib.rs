//! # stratum-schema
//!
//! Model definitions for the Stratum migration engine.
//!
//! This crate provides:
//! - Model and attribute types with a closed set of validation rules
//! - Table and column naming conventions
//! - Loading of `*.toml` model files from a directory
//! - Configuration parser for `stratum.toml` files
//!
//! ## Example
//!
//! ```rust,ignore
//! use stratum_schema::{DirectoryModelSource, ModelSource, StratumConfig};
//!
//! let config = StratumConfig::from_file("stratum.toml")?;
//! let models = DirectoryModelSource::new(&config.models.directory).load()?;
//! ```
//!
//! A model file looks like:
//!
//! ```toml
//! name = "User"
//!
//! [traits]
//! use_timestamps = true
//!
//! [attributes.name]
//! required = true
//! rule = { type = "string", max = 100 }
//!
//! [attributes.email]
//! unique = true
//! rule = { type = "string", max = 255 }
//! ```

pub mod attribute;
pub mod config;
pub mod error;
pub mod loader;
pub mod model;
pub mod naming;
pub mod rule;

pub use attribute::{AttributeMap, AttributeSpec, arranged, same_attributes};
pub use config::{MatchStrategy, StratumConfig};
pub use error::{SchemaError, SchemaResult};
pub use loader::{DirectoryModelSource, ModelEntry, ModelSource};
pub use model::{ModelDefinition, ModelTraits};
pub use rule::{DateKind, NumberKind, ValidationRule};
