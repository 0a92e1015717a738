//! Migration engine implementation.

use std::path::PathBuf;
use std::time::Instant;

use stratum_schema::config::LEDGER_TABLE;
use stratum_schema::{MatchStrategy, ModelDefinition, ModelEntry, ModelSource, StratumConfig};
use tracing::{debug, info, instrument, warn};

use crate::emitter::DdlEmitter;
use crate::error::{MigrateResult, MigrationError};
use crate::history::{ExecutionTracker, MigrationLedger, SqliteLedger};
use crate::plan::{MigrationPlan, MigrationPlanner, ModelOutcome, SnapshotAction};
use crate::reset::{ARTIFACT_EXTENSION, ResetSummary, ResetUtility};
use crate::snapshot::{FileSnapshotStore, SnapshotStore};

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory holding schema snapshots.
    pub snapshots_dir: PathBuf,
    /// Directory holding generated migration artifacts.
    pub migrations_dir: PathBuf,
    /// Extension of generated migration files, used by reset.
    pub artifact_extension: String,
    /// SQLite database holding the ledger.
    pub database_path: PathBuf,
    /// Ledger table name.
    pub ledger_table: String,
    /// How ledger entries are matched to tables.
    pub match_strategy: MatchStrategy,
    /// Whether to plan without handing off or saving anything.
    pub dry_run: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            snapshots_dir: PathBuf::from("./storage/framework/models"),
            migrations_dir: PathBuf::from("./database/migrations"),
            artifact_extension: ARTIFACT_EXTENSION.to_string(),
            database_path: PathBuf::from("./database/stratum.sqlite"),
            ledger_table: LEDGER_TABLE.to_string(),
            match_strategy: MatchStrategy::default(),
            dry_run: false,
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the snapshots directory.
    pub fn snapshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.snapshots_dir = dir.into();
        self
    }

    /// Set the migrations directory.
    pub fn migrations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.migrations_dir = dir.into();
        self
    }

    /// Set the extension of generated migration files.
    pub fn artifact_extension(mut self, extension: impl Into<String>) -> Self {
        self.artifact_extension = extension.into();
        self
    }

    /// Set the database file.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Set the ledger table.
    pub fn ledger_table(mut self, table: impl Into<String>) -> Self {
        self.ledger_table = table.into();
        self
    }

    /// Set the ledger matching strategy.
    pub fn match_strategy(mut self, strategy: MatchStrategy) -> Self {
        self.match_strategy = strategy;
        self
    }

    /// Enable dry-run mode.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl From<&StratumConfig> for MigrationConfig {
    fn from(config: &StratumConfig) -> Self {
        Self {
            snapshots_dir: config.migrations.snapshots.clone(),
            migrations_dir: config.migrations.directory.clone(),
            artifact_extension: config.migrations.artifact_extension.clone(),
            database_path: config.database.path.clone(),
            ledger_table: config.database.ledger_table.clone(),
            match_strategy: config.migrations.match_strategy,
            dry_run: false,
        }
    }
}

/// Result of migrating one model.
#[derive(Debug, Clone)]
pub struct ModelReport {
    /// Model name.
    pub model: String,
    /// Table name.
    pub table: String,
    /// What happened to the model.
    pub outcome: ModelOutcome,
    /// The decided plan.
    pub plan: MigrationPlan,
    /// Whether the snapshot was written.
    pub snapshot_saved: bool,
}

/// A model that could not be migrated.
#[derive(Debug)]
pub struct ModelFailure {
    /// Model name, or the origin of a model that failed to load.
    pub model: String,
    /// Why it failed.
    pub error: MigrationError,
}

/// Result of a migration run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Whether the ledger was empty and all snapshots were purged.
    pub fresh_start: bool,
    /// Whether the run was a dry run.
    pub dry_run: bool,
    /// Models that were planned.
    pub processed: Vec<ModelReport>,
    /// Models that failed.
    pub failures: Vec<ModelFailure>,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl RunReport {
    /// Whether every model was migrated.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Number of models with a given outcome.
    pub fn count(&self, outcome: ModelOutcome) -> usize {
        self.processed
            .iter()
            .filter(|report| report.outcome == outcome)
            .count()
    }

    /// Report for a model, if it was processed.
    pub fn report_for(&self, model: &str) -> Option<&ModelReport> {
        self.processed.iter().find(|report| report.model == model)
    }

    /// Check if any table was created or altered.
    pub fn has_changes(&self) -> bool {
        self.processed
            .iter()
            .any(|report| matches!(report.outcome, ModelOutcome::Created | ModelOutcome::Altered))
    }

    /// Get a summary of the run.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        for outcome in [
            ModelOutcome::Created,
            ModelOutcome::Altered,
            ModelOutcome::Tracked,
            ModelOutcome::Unchanged,
        ] {
            let count = self.count(outcome);
            if count > 0 {
                parts.push(format!("{count} {outcome}"));
            }
        }

        if !self.failures.is_empty() {
            parts.push(format!("{} failed", self.failures.len()));
        }

        if parts.is_empty() {
            "No models to migrate".to_string()
        } else {
            format!("{} in {}ms", parts.join(", "), self.duration_ms)
        }
    }
}

/// The main migration engine.
pub struct MigrationEngine<S: SnapshotStore, L: MigrationLedger> {
    config: MigrationConfig,
    store: S,
    tracker: ExecutionTracker<L>,
    planner: MigrationPlanner,
    /// Set by a dry-run fresh start: snapshots count as purged without
    /// being deleted.
    ignore_snapshots: bool,
}

impl MigrationEngine<FileSnapshotStore, SqliteLedger> {
    /// Create an engine over the snapshot directory and SQLite ledger named
    /// in the configuration.
    pub fn from_config(config: MigrationConfig) -> MigrateResult<Self> {
        let store = FileSnapshotStore::new(&config.snapshots_dir);
        let ledger = SqliteLedger::new(&config.database_path, &config.ledger_table)?;
        Ok(Self::new(config, store, ledger))
    }
}

impl<S: SnapshotStore, L: MigrationLedger> MigrationEngine<S, L> {
    /// Create a new migration engine.
    pub fn new(config: MigrationConfig, store: S, ledger: L) -> Self {
        let tracker = ExecutionTracker::with_matcher(ledger, config.match_strategy);
        Self {
            config,
            store,
            tracker,
            planner: MigrationPlanner::new(),
            ignore_snapshots: false,
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// Get the snapshot store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the execution tracker.
    pub fn tracker(&self) -> &ExecutionTracker<L> {
        &self.tracker
    }

    /// Get the ledger, e.g. to record an executed migration.
    pub fn ledger_mut(&mut self) -> &mut L {
        self.tracker.ledger_mut()
    }

    /// Apply the fresh-start rule: when no migration was ever recorded, every
    /// snapshot of every model is purged.
    ///
    /// Returns whether the ledger was empty.
    pub fn prepare(&mut self) -> MigrateResult<bool> {
        self.ignore_snapshots = false;
        if !self.tracker.ledger_is_empty()? {
            return Ok(false);
        }

        if self.config.dry_run {
            self.ignore_snapshots = true;
            info!("Ledger is empty, snapshots would be purged");
        } else {
            let purged = self.store.purge_all()?;
            info!(purged, "Ledger is empty, purged all schema snapshots");
        }

        Ok(true)
    }

    /// Plan one model, hand the plan off and record the snapshot.
    #[instrument(skip_all, fields(model = %model.name))]
    pub fn migrate_model<E>(
        &mut self,
        model: &ModelDefinition,
        emitter: &mut E,
    ) -> MigrateResult<ModelReport>
    where
        E: DdlEmitter + ?Sized,
    {
        model.validate()?;

        let table = model.table_name();
        let migrated = self.tracker.has_migrated(&table)?;
        let snapshot = if self.ignore_snapshots {
            None
        } else {
            self.store.load(&model.name)?
        };

        let outcome = self.planner.plan(model, snapshot.as_ref(), migrated);
        let kind = outcome.outcome();

        let snapshot_saved = if self.config.dry_run {
            debug!(table = %table, "Dry run, skipping hand-off");
            false
        } else {
            match outcome.snapshot {
                SnapshotAction::SaveAfterHandOff => {
                    emitter
                        .emit(model, &outcome.plan)
                        .map_err(|e| MigrationError::rejected(&model.name, e))?;
                    self.store.save(&model.name, &model.attributes)?;
                    true
                }
                SnapshotAction::SaveNow => {
                    self.store.save(&model.name, &model.attributes)?;
                    true
                }
                SnapshotAction::Keep => false,
            }
        };

        info!(table = %table, outcome = %kind, plan = %outcome.plan, "Migrated model");

        Ok(ModelReport {
            model: model.name.clone(),
            table,
            outcome: kind,
            plan: outcome.plan,
            snapshot_saved,
        })
    }

    /// Migrate every entry in order.
    ///
    /// A malformed model or a rejected hand-off is recorded in the report and
    /// the run continues; a snapshot store or ledger failure ends the run.
    pub fn run<E>(&mut self, entries: Vec<ModelEntry>, emitter: &mut E) -> MigrateResult<RunReport>
    where
        E: DdlEmitter + ?Sized,
    {
        let start = Instant::now();
        let mut report = RunReport {
            fresh_start: self.prepare()?,
            dry_run: self.config.dry_run,
            ..Default::default()
        };

        for entry in entries {
            let label = entry.label().to_string();
            let result = match entry.definition {
                Ok(model) => self.migrate_model(&model, emitter),
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(model_report) => report.processed.push(model_report),
                Err(e) if e.is_fatal() => {
                    warn!(model = %label, error = %e, "Aborting migration run");
                    return Err(e);
                }
                Err(e) => {
                    warn!(model = %label, error = %e, "Skipping model");
                    report.failures.push(ModelFailure {
                        model: label,
                        error: e,
                    });
                }
            }
        }

        report.duration_ms = start.elapsed().as_millis() as i64;
        info!(summary = %report.summary(), "Migration run finished");
        Ok(report)
    }

    /// Load every model from a source and migrate it.
    pub fn run_source<E>(
        &mut self,
        source: &dyn ModelSource,
        emitter: &mut E,
    ) -> MigrateResult<RunReport>
    where
        E: DdlEmitter + ?Sized,
    {
        let entries = source.load()?;
        self.run(entries, emitter)
    }

    /// Delete the database, every snapshot and every migration artifact.
    pub fn reset(&mut self) -> MigrateResult<ResetSummary> {
        let summary = ResetUtility::new(&self.config.database_path, &self.config.migrations_dir)
            .artifact_extension(&self.config.artifact_extension)
            .reset_all(&mut self.store)?;
        self.ignore_snapshots = false;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::PlanCollector;
    use crate::error::EmitError;
    use crate::history::MemoryLedger;
    use crate::snapshot::MemorySnapshotStore;
    use stratum_schema::{AttributeSpec, SchemaError, ValidationRule};

    type TestEngine = MigrationEngine<MemorySnapshotStore, MemoryLedger>;

    fn engine(ledger: MemoryLedger) -> TestEngine {
        MigrationEngine::new(MigrationConfig::new(), MemorySnapshotStore::new(), ledger)
    }

    fn user() -> ModelDefinition {
        ModelDefinition::new("User")
            .attribute("name", AttributeSpec::new(ValidationRule::string_max(100)))
            .attribute(
                "email",
                AttributeSpec::new(ValidationRule::string_max(255)).unique(),
            )
    }

    fn post() -> ModelDefinition {
        ModelDefinition::new("Post")
            .attribute("title", AttributeSpec::new(ValidationRule::string_max(200)))
    }

    #[test]
    fn test_config_default() {
        let config = MigrationConfig::default();
        assert_eq!(config.ledger_table, "migrations");
        assert_eq!(config.match_strategy, MatchStrategy::Containment);
        assert_eq!(config.artifact_extension, "sql");
        assert!(!config.dry_run);
    }

    #[test]
    fn test_config_builder() {
        let config = MigrationConfig::new()
            .snapshots_dir("./snapshots")
            .migrations_dir("./custom_migrations")
            .database_path("./app.sqlite")
            .ledger_table("schema_history")
            .match_strategy(MatchStrategy::Delimited)
            .dry_run(true);

        assert_eq!(config.snapshots_dir, PathBuf::from("./snapshots"));
        assert_eq!(config.migrations_dir, PathBuf::from("./custom_migrations"));
        assert_eq!(config.database_path, PathBuf::from("./app.sqlite"));
        assert_eq!(config.ledger_table, "schema_history");
        assert_eq!(config.match_strategy, MatchStrategy::Delimited);
        assert!(config.dry_run);
    }

    #[test]
    fn test_config_from_stratum_config() {
        let stratum = StratumConfig::from_str(
            r#"
            [database]
            path = "db/app.sqlite"

            [migrations]
            match_strategy = "delimited"
            artifact_extension = "json"
            "#,
        )
        .unwrap();

        let config = MigrationConfig::from(&stratum);
        assert_eq!(config.database_path, PathBuf::from("db/app.sqlite"));
        assert_eq!(config.artifact_extension, "json");
        assert_eq!(config.match_strategy, MatchStrategy::Delimited);
    }

    #[test]
    fn test_migrate_new_model_saves_after_hand_off() {
        let mut engine = engine(MemoryLedger::new());
        let mut emitter = PlanCollector::new();

        let report = engine.migrate_model(&user(), &mut emitter).unwrap();

        assert_eq!(report.outcome, ModelOutcome::Created);
        assert_eq!(report.table, "users");
        assert!(report.snapshot_saved);
        assert_eq!(emitter.len(), 1);
        assert_eq!(
            engine.store().load("User").unwrap(),
            Some(user().attributes)
        );
    }

    #[test]
    fn test_second_run_is_noop_without_write() {
        let mut engine = engine(MemoryLedger::new());
        let mut emitter = PlanCollector::new();

        engine.migrate_model(&user(), &mut emitter).unwrap();
        let second = engine.migrate_model(&user(), &mut emitter).unwrap();

        assert!(second.plan.is_noop());
        assert!(!second.snapshot_saved);
        assert_eq!(emitter.len(), 1);
    }

    #[test]
    fn test_rejected_hand_off_saves_nothing() {
        let mut engine = engine(MemoryLedger::new());
        let mut emitter = |_: &ModelDefinition, _: &MigrationPlan| -> Result<(), EmitError> {
            Err("no space left".into())
        };

        let err = engine.migrate_model(&user(), &mut emitter).unwrap_err();
        assert!(matches!(err, MigrationError::EmitRejected { .. }));
        assert!(!err.is_fatal());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_tracked_model_saves_without_hand_off() {
        let mut engine = engine(MemoryLedger::with_names(["1-create-users-table"]));
        let mut emitter = PlanCollector::new();

        let report = engine.migrate_model(&user(), &mut emitter).unwrap();

        assert_eq!(report.outcome, ModelOutcome::Tracked);
        assert!(report.snapshot_saved);
        assert!(emitter.is_empty());
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_prepare_purges_on_empty_ledger() {
        let mut engine = engine(MemoryLedger::new());
        let mut emitter = PlanCollector::new();
        engine.migrate_model(&user(), &mut emitter).unwrap();
        engine.migrate_model(&post(), &mut emitter).unwrap();
        assert_eq!(engine.store().len(), 2);

        assert!(engine.prepare().unwrap());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_prepare_keeps_snapshots_when_ledger_has_records() {
        let mut engine = engine(MemoryLedger::with_names(["1-create-users-table"]));
        let mut emitter = PlanCollector::new();
        engine.migrate_model(&user(), &mut emitter).unwrap();

        assert!(!engine.prepare().unwrap());
        assert_eq!(engine.store().len(), 1);
    }

    #[test]
    fn test_run_collects_non_fatal_failures() {
        let mut engine = engine(MemoryLedger::new());
        let mut emitter = PlanCollector::new();

        let entries = vec![
            ModelEntry::from(user()),
            ModelEntry {
                origin: "broken".to_string(),
                definition: Err(SchemaError::invalid_model("broken", "bad file")),
            },
            ModelEntry::from(post()),
        ];

        let report = engine.run(entries, &mut emitter).unwrap();

        assert!(report.fresh_start);
        assert!(!report.is_success());
        assert_eq!(report.count(ModelOutcome::Created), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].model, "broken");
        assert!(report.summary().starts_with("2 created, 1 failed"));
    }

    #[test]
    fn test_run_stops_on_fatal_error() {
        struct BrokenStore;
        impl SnapshotStore for BrokenStore {
            fn load(&self, _: &str) -> MigrateResult<Option<stratum_schema::AttributeMap>> {
                Err(MigrationError::snapshot("unreadable"))
            }
            fn save(&mut self, _: &str, _: &stratum_schema::AttributeMap) -> MigrateResult<()> {
                Ok(())
            }
            fn purge_all(&mut self) -> MigrateResult<usize> {
                Ok(0)
            }
        }

        let mut engine = MigrationEngine::new(
            MigrationConfig::new(),
            BrokenStore,
            MemoryLedger::with_names(["1-create-users-table"]),
        );

        let err = engine
            .run(vec![user().into(), post().into()], &mut PlanCollector::new())
            .unwrap_err();
        assert!(matches!(err, MigrationError::Snapshot(_)));
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let mut engine = MigrationEngine::new(
            MigrationConfig::new().dry_run(true),
            MemorySnapshotStore::new(),
            MemoryLedger::new(),
        );
        let mut emitter = PlanCollector::new();

        let report = engine.run(vec![user().into()], &mut emitter).unwrap();

        assert!(report.dry_run);
        assert_eq!(report.count(ModelOutcome::Created), 1);
        assert!(emitter.is_empty());
        assert!(engine.store().is_empty());
    }

    #[test]
    fn test_dry_run_reads_snapshots_again_once_ledger_has_records() {
        let mut store = MemorySnapshotStore::new();
        store.save("User", &user().attributes).unwrap();
        let mut engine = MigrationEngine::new(
            MigrationConfig::new().dry_run(true),
            store,
            MemoryLedger::new(),
        );
        let mut emitter = PlanCollector::new();

        assert!(engine.prepare().unwrap());
        let first = engine.migrate_model(&user(), &mut emitter).unwrap();
        assert_eq!(first.outcome, ModelOutcome::Created);

        engine.ledger_mut().append("1-create-users-table").unwrap();
        assert!(!engine.prepare().unwrap());
        let second = engine.migrate_model(&user(), &mut emitter).unwrap();
        assert_eq!(second.outcome, ModelOutcome::Unchanged);
        assert!(emitter.is_empty());
    }

    #[test]
    fn test_invalid_model_is_rejected_before_planning() {
        let mut engine = engine(MemoryLedger::new());
        let model = ModelDefinition::new("../User");

        let err = engine
            .migrate_model(&model, &mut PlanCollector::new())
            .unwrap_err();
        assert!(matches!(err, MigrationError::InvalidModel(_)));
        assert!(engine.store().is_empty());
    }
}
