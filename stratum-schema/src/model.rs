//! Model definitions.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::attribute::{AttributeMap, AttributeSpec};
use crate::error::{SchemaError, SchemaResult};
use crate::naming;
use crate::rule::ValidationRule;

/// Optional behaviours that add framework-managed columns to a table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelTraits {
    /// Use a UUID primary key instead of an integer.
    pub use_uuid: bool,
    /// Add `created_at` and `updated_at` columns.
    pub use_timestamps: bool,
    /// Add a `deleted_at` column.
    pub use_soft_deletes: bool,
    /// Models this model belongs to; each adds a `<model>_id` column.
    pub belongs_to: Vec<String>,
}

/// A model as declared by the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelDefinition {
    /// Model name, e.g. `User`.
    pub name: String,
    /// Explicit table name; derived from the model name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    /// Primary key column name.
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    /// Whether an integer primary key auto-increments.
    #[serde(default = "default_auto_increment")]
    pub auto_increment: bool,
    /// Framework-managed behaviours.
    #[serde(default)]
    pub traits: ModelTraits,
    /// Declared attributes.
    #[serde(default)]
    pub attributes: AttributeMap,
}

fn default_primary_key() -> String {
    "id".to_string()
}

fn default_auto_increment() -> bool {
    true
}

impl ModelDefinition {
    /// Create a model with an auto-increment `id` key and no attributes.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            primary_key: default_primary_key(),
            auto_increment: default_auto_increment(),
            traits: ModelTraits::default(),
            attributes: AttributeMap::new(),
        }
    }

    /// Set an explicit table name.
    pub fn table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Set the primary key column.
    pub fn primary_key(mut self, column: impl Into<String>, auto_increment: bool) -> Self {
        self.primary_key = column.into();
        self.auto_increment = auto_increment;
        self
    }

    /// Set the model traits.
    pub fn traits(mut self, traits: ModelTraits) -> Self {
        self.traits = traits;
        self
    }

    /// Add an attribute.
    pub fn attribute(mut self, name: impl Into<String>, spec: AttributeSpec) -> Self {
        self.attributes.insert(name.into(), spec);
        self
    }

    /// Parse a model from a TOML document.
    pub fn from_toml(content: &str) -> SchemaResult<Self> {
        toml::from_str(content).map_err(|e| SchemaError::TomlError { source: e })
    }

    /// The table this model is stored in.
    pub fn table_name(&self) -> String {
        self.table
            .clone()
            .unwrap_or_else(|| naming::table_name_for(&self.name))
    }

    /// Check the definition is usable for planning.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.name.trim().is_empty() {
            return Err(SchemaError::invalid_model(&self.name, "model name is empty"));
        }

        if self
            .name
            .chars()
            .any(|c| c == '/' || c == '\\' || c == '.' || c.is_control())
        {
            return Err(SchemaError::invalid_model(
                &self.name,
                "model name may not contain path separators or dots",
            ));
        }

        if self.table.as_deref().is_some_and(|t| t.trim().is_empty()) {
            return Err(SchemaError::invalid_model(&self.name, "table name is empty"));
        }

        if self.primary_key.trim().is_empty() {
            return Err(SchemaError::invalid_model(&self.name, "primary key is empty"));
        }

        let mut columns = HashSet::new();
        for (attribute, spec) in &self.attributes {
            if attribute.trim().is_empty() {
                return Err(SchemaError::invalid_attribute(
                    &self.name,
                    attribute,
                    "attribute name is empty",
                ));
            }

            validate_rule(&self.name, attribute, spec)?;

            let column = naming::snake_case(attribute);
            if !columns.insert(column.clone()) {
                return Err(SchemaError::duplicate_column(&self.name, column));
            }
        }

        Ok(())
    }
}

fn validate_rule(model: &str, attribute: &str, spec: &AttributeSpec) -> SchemaResult<()> {
    match &spec.rule {
        ValidationRule::String {
            min: Some(min),
            max: Some(max),
        } if min > max => Err(SchemaError::invalid_attribute(
            model,
            attribute,
            format!("min length {min} is greater than max length {max}"),
        )),
        ValidationRule::String { max: Some(0), .. } | ValidationRule::Enum { max: Some(0), .. } => {
            Err(SchemaError::invalid_attribute(
                model,
                attribute,
                "max length must be greater than zero",
            ))
        }
        _ => Ok(()),
    }
}
