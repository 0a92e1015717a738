//! # stratum-migrate
//!
//! Model-driven migration engine for Stratum.
//!
//! This crate provides functionality for:
//! - Inferring column types from attribute validation rules
//! - Snapshotting the attribute map a model was last migrated with
//! - Tracking executed migrations in a ledger
//! - Deciding per model whether its table is created, altered or left alone
//! - Tearing down all migration state
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────┐
//! │ Model Source │────▶│    Planner     │────▶│ DDL Emitter  │
//! └──────────────┘     └────────────────┘     └──────────────┘
//!                        ▲            ▲               │
//!                        │            │               ▼
//!               ┌────────────┐  ┌───────────┐  ┌──────────────┐
//!               │  Tracker   │  │ Snapshots │◀─│ save on ok   │
//!               │  (ledger)  │  └───────────┘  └──────────────┘
//!               └────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use stratum_migrate::{MigrationConfig, MigrationEngine, PlanCollector};
//! use stratum_schema::{DirectoryModelSource, StratumConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let stratum = StratumConfig::from_file("stratum.toml")?;
//! let mut engine = MigrationEngine::from_config(MigrationConfig::from(&stratum))?;
//!
//! let source = DirectoryModelSource::new(&stratum.models.directory);
//! let mut emitter = PlanCollector::new();
//! let report = engine.run_source(&source, &mut emitter)?;
//!
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! ## Planning
//!
//! | snapshot | ledger has table | plan          |
//! |----------|------------------|---------------|
//! | absent   | no               | `CreateTable` |
//! | absent   | yes              | `NoOp`, snapshot recorded |
//! | equal    | -                | `NoOp`        |
//! | differs  | -                | `AlterTable`  |
//!
//! When the ledger holds no migration at all, every snapshot is purged
//! before the first model is planned.

pub mod column;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod history;
pub mod plan;
pub mod reset;
pub mod snapshot;

pub use column::{ColumnSpec, map_rule, render_column};
pub use emitter::{DdlEmitter, PlanCollector};
pub use engine::{MigrationConfig, MigrationEngine, ModelFailure, ModelReport, RunReport};
pub use error::{EmitError, MigrateResult, MigrationError};
pub use history::{
    ExecutionTracker, MemoryLedger, MigrationLedger, MigrationRecord, SqliteLedger, TableMatcher,
};
pub use plan::{MigrationPlan, MigrationPlanner, ModelOutcome, PlanOutcome, SnapshotAction};
pub use reset::{ResetSummary, ResetUtility};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, SnapshotStore};
