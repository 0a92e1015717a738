//! Integration tests for configuration parsing and handling.
//!
//! These tests verify that `stratum.toml` files drive the migration engine
//! configuration.

use std::path::PathBuf;

use stratum::migrate::MigrationConfig;
use stratum::schema::{MatchStrategy, SchemaError, StratumConfig};

/// Test minimal configuration
#[test]
fn test_config_minimal() {
    let config = StratumConfig::from_str("").expect("Failed to parse config");

    assert_eq!(config.database.path, PathBuf::from("database/stratum.sqlite"));
    assert_eq!(config.database.ledger_table, "migrations");
    assert_eq!(config.models.directory, PathBuf::from("app/models"));
}

/// Test full configuration with all options
#[test]
fn test_config_full() {
    let config_str = r#"
        [database]
        path = "var/app.sqlite"
        ledger_table = "schema_migrations"

        [models]
        directory = "src/models"

        [migrations]
        directory = "var/migrations"
        snapshots = "var/snapshots"
        match_strategy = "delimited"

        [environments.testing.database]
        path = "var/app_testing.sqlite"

        [environments.testing.migrations]
        snapshots = "var/snapshots_testing"
    "#;

    let config = StratumConfig::from_str(config_str).expect("Failed to parse config");

    assert_eq!(config.database.path, PathBuf::from("var/app.sqlite"));
    assert_eq!(config.database.ledger_table, "schema_migrations");
    assert_eq!(config.models.directory, PathBuf::from("src/models"));
    assert_eq!(config.migrations.directory, PathBuf::from("var/migrations"));
    assert_eq!(config.migrations.snapshots, PathBuf::from("var/snapshots"));
    assert_eq!(config.migrations.match_strategy, MatchStrategy::Delimited);
    assert!(config.environments.contains_key("testing"));
}

/// Test environment overrides
#[test]
fn test_config_environment_override() {
    let config_str = r#"
        [database]
        path = "var/app.sqlite"

        [environments.testing.database]
        path = "var/app_testing.sqlite"
        ledger_table = "test_migrations"

        [environments.testing.migrations]
        snapshots = "var/snapshots_testing"
    "#;

    let config = StratumConfig::from_str(config_str)
        .expect("Failed to parse config")
        .with_environment("testing");

    assert_eq!(config.database.path, PathBuf::from("var/app_testing.sqlite"));
    assert_eq!(config.database.ledger_table, "test_migrations");
    assert_eq!(
        config.migrations.snapshots,
        PathBuf::from("var/snapshots_testing")
    );
    assert_eq!(
        config.migrations.directory,
        PathBuf::from("database/migrations")
    );
}

/// Test unknown environment leaves the config untouched
#[test]
fn test_config_unknown_environment() {
    let config = StratumConfig::from_str("[database]\npath = \"a.sqlite\"\n")
        .expect("Failed to parse config")
        .with_environment("production");

    assert_eq!(config.database.path, PathBuf::from("a.sqlite"));
}

/// Test environment variable interpolation syntax
#[test]
fn test_config_env_vars_left_when_unset() {
    let config_str = r#"
        [database]
        path = "${STRATUM_INTEGRATION_UNSET_VAR}/app.sqlite"
    "#;

    let config = StratumConfig::from_str(config_str).expect("Failed to parse config");

    // Unset variables keep the ${} syntax
    assert_eq!(
        config.database.path,
        PathBuf::from("${STRATUM_INTEGRATION_UNSET_VAR}/app.sqlite")
    );
}

/// Test unknown keys are rejected
#[test]
fn test_config_unknown_keys_rejected() {
    let config_str = r#"
        [migrations]
        auto_migrate = true
    "#;

    let err = StratumConfig::from_str(config_str).unwrap_err();
    assert!(matches!(err, SchemaError::TomlError { .. }));
}

/// Test invalid match strategy
#[test]
fn test_config_invalid_match_strategy() {
    let config_str = r#"
        [migrations]
        match_strategy = "fuzzy"
    "#;

    assert!(StratumConfig::from_str(config_str).is_err());
}

/// Test loading from a file and rooting paths at the project directory
#[test]
fn test_config_from_file_into_engine_config() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stratum.toml");
    std::fs::write(
        &path,
        r#"
        [database]
        ledger_table = "history"

        [migrations]
        match_strategy = "delimited"
        "#,
    )
    .unwrap();

    let config = StratumConfig::from_file(&path)
        .expect("Failed to load config")
        .rooted_at(dir.path());
    let engine_config = MigrationConfig::from(&config);

    assert_eq!(
        engine_config.database_path,
        dir.path().join("database/stratum.sqlite")
    );
    assert_eq!(
        engine_config.snapshots_dir,
        dir.path().join("storage/framework/models")
    );
    assert_eq!(engine_config.ledger_table, "history");
    assert_eq!(engine_config.match_strategy, MatchStrategy::Delimited);
    assert!(!engine_config.dry_run);
}

/// Test a missing config file is an I/O error
#[test]
fn test_config_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = StratumConfig::from_file(dir.path().join("stratum.toml")).unwrap_err();
    assert!(matches!(err, SchemaError::IoError { .. }));
}
