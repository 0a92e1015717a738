//! Configuration file parsing for `stratum.toml`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{SchemaError, SchemaResult};

/// Default config file name (lives in project root).
pub const CONFIG_FILE_NAME: &str = "stratum.toml";

/// Default ledger table name.
pub const LEDGER_TABLE: &str = "migrations";

/// Main configuration structure for `stratum.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StratumConfig {
    /// Database and ledger settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where model definitions live.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Migration artifacts and snapshots.
    #[serde(default)]
    pub migrations: MigrationsConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl StratumConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::io(path.display().to_string(), e))?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content)?;

        toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(db) = overrides.database {
                if let Some(path) = db.path {
                    self.database.path = path;
                }
                if let Some(table) = db.ledger_table {
                    self.database.ledger_table = table;
                }
            }
            if let Some(migrations) = overrides.migrations {
                if let Some(directory) = migrations.directory {
                    self.migrations.directory = directory;
                }
                if let Some(snapshots) = migrations.snapshots {
                    self.migrations.snapshots = snapshots;
                }
            }
        }
        self
    }

    /// Resolve every configured path against a project root.
    pub fn rooted_at(mut self, root: &Path) -> Self {
        self.database.path = root.join(&self.database.path);
        self.models.directory = root.join(&self.models.directory);
        self.migrations.directory = root.join(&self.migrations.directory);
        self.migrations.snapshots = root.join(&self.migrations.snapshots);
        self
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path of the embedded database file.
    pub path: PathBuf,

    /// Table holding the migration ledger.
    pub ledger_table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database/stratum.sqlite"),
            ledger_table: LEDGER_TABLE.to_string(),
        }
    }
}

/// Model source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelsConfig {
    /// Directory of `*.toml` model files.
    pub directory: PathBuf,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("app/models"),
        }
    }
}

/// Migration configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MigrationsConfig {
    /// Directory where the DDL emitter writes migration artifacts.
    pub directory: PathBuf,

    /// Directory of per-model schema snapshots.
    pub snapshots: PathBuf,

    /// Extension of migration files the emitter writes.
    pub artifact_extension: String,

    /// How ledger entries are matched against table names.
    pub match_strategy: MatchStrategy,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("database/migrations"),
            snapshots: PathBuf::from("storage/framework/models"),
            artifact_extension: "sql".to_string(),
            match_strategy: MatchStrategy::default(),
        }
    }
}

/// Strategy used to decide whether a ledger entry belongs to a table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    /// The migration name contains the table name anywhere.
    #[default]
    Containment,
    /// The table name appears as a whole `-`-separated segment.
    Delimited,
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Database overrides.
    pub database: Option<DatabaseOverride>,
    /// Migration overrides.
    pub migrations: Option<MigrationsOverride>,
}

/// Database configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseOverride {
    /// Override database path.
    pub path: Option<PathBuf>,
    /// Override ledger table.
    pub ledger_table: Option<String>,
}

/// Migration configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationsOverride {
    /// Override artifact directory.
    pub directory: Option<PathBuf>,
    /// Override snapshot directory.
    pub snapshots: Option<PathBuf>,
}

/// Expand `${VAR}` references from the process environment. Unset variables
/// are left as written.
fn expand_env_vars(content: &str) -> SchemaResult<String> {
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| SchemaError::config(e.to_string()))?;

    let mut result = content.to_string();
    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let full_match = &cap[0];

        if let Ok(value) = std::env::var(var_name) {
            result = result.replace(full_match, &value);
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StratumConfig::default();
        assert_eq!(config.database.ledger_table, "migrations");
        assert_eq!(config.migrations.match_strategy, MatchStrategy::Containment);
        assert_eq!(config.models.directory, PathBuf::from("app/models"));
    }

    #[test]
    fn test_parse_partial_config() {
        let config = StratumConfig::from_str(
            r#"
            [migrations]
            match_strategy = "delimited"
            "#,
        )
        .unwrap();

        assert_eq!(config.migrations.match_strategy, MatchStrategy::Delimited);
        assert_eq!(
            config.migrations.directory,
            PathBuf::from("database/migrations")
        );
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = StratumConfig::from_str("[cloud]\nregion = \"us-east-1\"\n").unwrap_err();
        assert!(matches!(err, SchemaError::TomlError { .. }));
    }

    #[test]
    fn test_environment_override() {
        let config = StratumConfig::from_str(
            r#"
            [database]
            path = "database/stratum.sqlite"

            [environments.testing.database]
            path = "database/stratum_testing.sqlite"
            "#,
        )
        .unwrap()
        .with_environment("testing");

        assert_eq!(
            config.database.path,
            PathBuf::from("database/stratum_testing.sqlite")
        );
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: This test runs single-threaded and we clean up after
        unsafe {
            std::env::set_var("STRATUM_TEST_DB_DIR", "/var/db");
        }
        let expanded = expand_env_vars("path = \"${STRATUM_TEST_DB_DIR}/app.sqlite\"").unwrap();
        assert_eq!(expanded, "path = \"/var/db/app.sqlite\"");
        unsafe {
            std::env::remove_var("STRATUM_TEST_DB_DIR");
        }
    }

    #[test]
    fn test_rooted_at() {
        let config = StratumConfig::default().rooted_at(Path::new("/srv/app"));
        assert_eq!(
            config.database.path,
            PathBuf::from("/srv/app/database/stratum.sqlite")
        );
        assert_eq!(
            config.migrations.snapshots,
            PathBuf::from("/srv/app/storage/framework/models")
        );
    }
}
