//! # Stratum
//!
//! Model-driven schema migrations.
//!
//! Stratum provides:
//! - Declarative model definitions with validation rules
//! - Column type inference from those rules
//! - Schema snapshots that tell what changed since the last migration
//! - A planner that decides, per model, to create, alter or skip a table
//! - A ledger of executed migrations and a reset utility
//!
//! ## Quick Start
//!
//! ```rust
//! use stratum::prelude::*;
//!
//! # fn main() -> Result<(), stratum::MigrationError> {
//! let user = ModelDefinition::new("User")
//!     .attribute("name", AttributeSpec::new(ValidationRule::string_max(100)))
//!     .attribute(
//!         "email",
//!         AttributeSpec::new(ValidationRule::string_max(255)).unique(),
//!     );
//!
//! let mut engine = MigrationEngine::new(
//!     MigrationConfig::new(),
//!     MemorySnapshotStore::new(),
//!     MemoryLedger::new(),
//! );
//! let mut emitter = PlanCollector::new();
//!
//! let report = engine.migrate_model(&user, &mut emitter)?;
//! assert_eq!(report.table, "users");
//! assert!(matches!(report.plan, MigrationPlan::CreateTable { .. }));
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Model definitions, validation rules and configuration.
pub mod schema {
    pub use stratum_schema::*;
}

/// Type inference, snapshots, planning and the migration engine.
pub mod migrate {
    pub use stratum_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        DdlEmitter, FileSnapshotStore, MemoryLedger, MemorySnapshotStore, MigrationConfig,
        MigrationEngine, MigrationLedger, MigrationPlan, PlanCollector, SnapshotStore,
        SqliteLedger,
    };
    pub use crate::schema::{
        AttributeSpec, DirectoryModelSource, ModelDefinition, ModelSource, ModelTraits,
        StratumConfig, ValidationRule,
    };
}

// Re-export key types at the crate root
pub use migrate::{MigrationEngine, MigrationError, MigrationPlan};
pub use schema::{ModelDefinition, SchemaError, StratumConfig};
