//! Table and column naming conventions.

use convert_case::{Case, Casing};

/// Words whose plural is not formed by a suffix.
const IRREGULAR_PLURALS: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
];

/// Convert an identifier to `snake_case`.
///
/// ```
/// use stratum_schema::naming::snake_case;
///
/// assert_eq!(snake_case("firstName"), "first_name");
/// assert_eq!(snake_case("OrderItem"), "order_item");
/// assert_eq!(snake_case("created_at"), "created_at");
/// ```
pub fn snake_case(ident: &str) -> String {
    ident.to_case(Case::Snake)
}

/// Pluralize a single lowercase English word.
pub fn pluralize(word: &str) -> String {
    if let Some((_, plural)) = IRREGULAR_PLURALS.iter().find(|(single, _)| *single == word) {
        return (*plural).to_string();
    }

    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last();
        if before.is_some_and(|c| !"aeiou".contains(c)) {
            return format!("{stem}ies");
        }
    }

    if ["s", "x", "z", "ch", "sh"]
        .iter()
        .any(|suffix| word.ends_with(suffix))
    {
        return format!("{word}es");
    }

    format!("{word}s")
}

/// Derive the table name for a model: the snake_case plural of its name.
///
/// Only the last word is pluralized, so `OrderItem` becomes `order_items`.
pub fn table_name_for(model_name: &str) -> String {
    let snake = snake_case(model_name);

    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{head}_{}", pluralize(last)),
        None => pluralize(&snake),
    }
}

/// Name of the foreign key column pointing at `model_name`.
pub fn foreign_key_for(model_name: &str) -> String {
    format!("{}_id", snake_case(model_name))
}
