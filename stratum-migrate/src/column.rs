//! Attribute-to-column type inference.
//!
//! Everything here is a pure function of its inputs: the same rule always
//! renders to the same column type, regardless of what was rendered before.

use serde::{Deserialize, Serialize};
use stratum_schema::naming::snake_case;
use stratum_schema::{AttributeSpec, DateKind, NumberKind, ValidationRule};

/// Length used for strings without an upper bound hint.
pub const DEFAULT_VARCHAR_LENGTH: u32 = 255;

/// Canonical description of one table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Canonical database type, e.g. `varchar(255)`.
    pub db_type: String,
    /// Whether NULL is allowed.
    pub nullable: bool,
    /// Whether values must be unique.
    pub unique: bool,
    /// Default value.
    pub default: Option<serde_json::Value>,
    /// Whether this is the primary key.
    pub primary_key: bool,
    /// Whether the key auto-increments.
    pub auto_increment: bool,
    /// Table referenced by a foreign key column.
    pub references: Option<String>,
}

impl ColumnSpec {
    /// A nullable, non-unique column.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            nullable: true,
            unique: false,
            default: None,
            primary_key: false,
            auto_increment: false,
            references: None,
        }
    }

    /// Mark the column as NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark the column as unique.
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Mark the column as the primary key.
    pub fn primary_key(mut self, auto_increment: bool) -> Self {
        self.primary_key = true;
        self.auto_increment = auto_increment;
        self.nullable = false;
        self
    }

    /// Make the column reference another table.
    pub fn references(mut self, table: impl Into<String>) -> Self {
        self.references = Some(table.into());
        self
    }
}

/// Map a validation rule to its canonical column type.
///
/// ```
/// use stratum_migrate::column::map_rule;
/// use stratum_schema::ValidationRule;
///
/// assert_eq!(map_rule(&ValidationRule::string_max(100)), "varchar(100)");
/// assert_eq!(map_rule(&ValidationRule::string_min(10)), "text");
/// assert_eq!(map_rule(&ValidationRule::string()), "varchar(255)");
/// assert_eq!(map_rule(&ValidationRule::unknown("geometry")), "text");
/// ```
pub fn map_rule(rule: &ValidationRule) -> String {
    match rule {
        ValidationRule::String { min, max } => string_type(*min, *max),
        ValidationRule::Number { kind } => match kind {
            NumberKind::Integer => "int".to_string(),
            NumberKind::Float => "float".to_string(),
            NumberKind::Decimal => "decimal".to_string(),
        },
        ValidationRule::Boolean => "boolean".to_string(),
        ValidationRule::Date { kind } => match kind {
            DateKind::Date => "date".to_string(),
            DateKind::Timestamp => "timestamp".to_string(),
        },
        ValidationRule::Enum { values, max } => {
            let longest = values
                .iter()
                .map(|v| v.chars().count())
                .max()
                .and_then(|len| u32::try_from(len).ok())
                .filter(|len| *len > 0);
            string_type(None, max.or(longest))
        }
        ValidationRule::Unknown { .. } => "text".to_string(),
    }
}

/// Length branch shared by strings and enums.
fn string_type(min: Option<u32>, max: Option<u32>) -> String {
    match (min, max) {
        (_, Some(max)) => format!("varchar({max})"),
        // Only a floor: long content is intentional.
        (Some(_), None) => "text".to_string(),
        (None, None) => format!("varchar({DEFAULT_VARCHAR_LENGTH})"),
    }
}

/// Render an attribute into its column.
pub fn render_column(attribute: &str, spec: &AttributeSpec) -> ColumnSpec {
    ColumnSpec {
        name: snake_case(attribute),
        db_type: map_rule(&spec.rule),
        nullable: !spec.required,
        unique: spec.unique,
        default: spec.default.clone(),
        primary_key: false,
        auto_increment: false,
        references: None,
    }
}
