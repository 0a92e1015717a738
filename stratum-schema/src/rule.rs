//! Validation rules attached to model attributes.
//!
//! Rules are a closed set of tags. Model files spell them as an inline table,
//! `rule = { type = "string", max = 100 }`; tags this crate does not know are
//! kept as [`ValidationRule::Unknown`] rather than rejected, so a model written
//! for a newer rule vocabulary still loads.

use serde::{Deserialize, Serialize};

/// Numeric storage class of a `number` rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum NumberKind {
    /// Whole numbers.
    #[default]
    Integer,
    /// Binary floating point.
    Float,
    /// Exact decimal.
    Decimal,
}

/// Whether a date rule carries a time component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DateKind {
    /// Calendar date only.
    #[default]
    Date,
    /// Date and time.
    Timestamp,
}

/// The declarative type and constraints of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawRule", into = "RawRule")]
pub enum ValidationRule {
    /// Text with optional length bounds.
    String {
        /// Minimum length.
        min: Option<u32>,
        /// Maximum length.
        max: Option<u32>,
    },
    /// A number.
    Number {
        /// Integer or fractional storage.
        kind: NumberKind,
    },
    /// A boolean flag.
    Boolean,
    /// A date or timestamp.
    Date {
        /// Date-only or date-time.
        kind: DateKind,
    },
    /// One of a fixed set of string literals.
    Enum {
        /// Allowed literals.
        values: Vec<String>,
        /// Explicit length bound, overriding the longest literal.
        max: Option<u32>,
    },
    /// A tag this crate does not recognise.
    Unknown {
        /// The tag as written in the model source.
        tag: String,
    },
}

impl ValidationRule {
    /// A string rule without length bounds.
    pub fn string() -> Self {
        Self::String {
            min: None,
            max: None,
        }
    }

    /// A string rule with a maximum length.
    pub fn string_max(max: u32) -> Self {
        Self::String {
            min: None,
            max: Some(max),
        }
    }

    /// A string rule with a minimum length only.
    pub fn string_min(min: u32) -> Self {
        Self::String {
            min: Some(min),
            max: None,
        }
    }

    /// An integer rule.
    pub fn integer() -> Self {
        Self::Number {
            kind: NumberKind::Integer,
        }
    }

    /// A fractional number rule.
    pub fn number(kind: NumberKind) -> Self {
        Self::Number { kind }
    }

    /// A date-only rule.
    pub fn date() -> Self {
        Self::Date {
            kind: DateKind::Date,
        }
    }

    /// A timestamp rule.
    pub fn timestamp() -> Self {
        Self::Date {
            kind: DateKind::Timestamp,
        }
    }

    /// An enum rule over the given literals.
    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Enum {
            values: values.into_iter().map(Into::into).collect(),
            max: None,
        }
    }

    /// A rule from a bare tag.
    ///
    /// Tags naming a known rule resolve to that rule, so only tags outside
    /// the vocabulary end up as [`ValidationRule::Unknown`].
    pub fn unknown(tag: impl Into<String>) -> Self {
        RawRule {
            kind: tag.into(),
            min: None,
            max: None,
            values: Vec::new(),
        }
        .into()
    }

    /// The tag name used in model files.
    pub fn tag(&self) -> &str {
        match self {
            Self::String { .. } => "string",
            Self::Number {
                kind: NumberKind::Integer,
            } => "number",
            Self::Number {
                kind: NumberKind::Float,
            } => "float",
            Self::Number {
                kind: NumberKind::Decimal,
            } => "decimal",
            Self::Boolean => "boolean",
            Self::Date {
                kind: DateKind::Date,
            } => "date",
            Self::Date {
                kind: DateKind::Timestamp,
            } => "timestamp",
            Self::Enum { .. } => "enum",
            Self::Unknown { tag } => tag,
        }
    }
}

/// Wire shape of a rule in model files and snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawRule {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<String>,
}

impl From<RawRule> for ValidationRule {
    fn from(raw: RawRule) -> Self {
        match raw.kind.to_ascii_lowercase().as_str() {
            "string" | "text" => Self::String {
                min: raw.min,
                max: raw.max,
            },
            "number" | "integer" | "int" => Self::integer(),
            "float" | "double" => Self::number(NumberKind::Float),
            "decimal" => Self::number(NumberKind::Decimal),
            "boolean" | "bool" => Self::Boolean,
            "date" => Self::date(),
            "timestamp" | "datetime" => Self::timestamp(),
            "enum" => Self::Enum {
                values: raw.values,
                max: raw.max,
            },
            _ => Self::Unknown { tag: raw.kind },
        }
    }
}

impl From<ValidationRule> for RawRule {
    fn from(rule: ValidationRule) -> Self {
        let kind = rule.tag().to_string();
        let mut raw = RawRule {
            kind,
            min: None,
            max: None,
            values: Vec::new(),
        };

        match rule {
            ValidationRule::String { min, max } => {
                raw.min = min;
                raw.max = max;
            }
            ValidationRule::Enum { values, max } => {
                raw.values = values;
                raw.max = max;
            }
            _ => {}
        }

        raw
    }
}
