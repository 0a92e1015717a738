//! Model attributes.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::rule::ValidationRule;

/// Attributes of a model keyed by attribute name, in declaration order.
pub type AttributeMap = IndexMap<String, AttributeSpec>;

/// One declared field of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttributeSpec {
    /// Whether a value must be present (`NOT NULL`).
    #[serde(default, skip_serializing_if = "is_false")]
    pub required: bool,
    /// Whether values must be unique across rows.
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
    /// Default value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    /// Column position hint; attributes without one keep declaration order
    /// after the ordered ones.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    /// Type and constraints.
    pub rule: ValidationRule,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl AttributeSpec {
    /// Create an optional, non-unique attribute with the given rule.
    pub fn new(rule: ValidationRule) -> Self {
        Self {
            required: false,
            unique: false,
            default: None,
            order: None,
            rule,
        }
    }

    /// Mark the attribute as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the attribute as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Set a default value.
    pub fn default_value(mut self, value: impl Into<serde_json::Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Set the column position hint.
    pub fn order(mut self, order: u32) -> Self {
        self.order = Some(order);
        self
    }
}

/// Structural equality of two attribute maps, ignoring key order.
pub fn same_attributes(left: &AttributeMap, right: &AttributeMap) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(name, spec)| right.get(name).is_some_and(|other| other == spec))
}

/// Attributes sorted by their `order` hint; ties and unordered attributes
/// keep declaration order.
pub fn arranged(attributes: &AttributeMap) -> Vec<(&String, &AttributeSpec)> {
    let mut entries: Vec<_> = attributes.iter().collect();
    entries.sort_by_key(|(_, spec)| spec.order.unwrap_or(u32::MAX));
    entries
}
