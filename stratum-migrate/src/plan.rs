//! Migration planning: deciding whether a model's table is created, altered
//! or left alone.

use std::fmt;

use serde::{Deserialize, Serialize};
use stratum_schema::naming::{foreign_key_for, snake_case, table_name_for};
use stratum_schema::{AttributeMap, ModelDefinition, arranged, same_attributes};
use tracing::debug;

use crate::column::{ColumnSpec, render_column};

/// The action decided for a model's table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MigrationPlan {
    /// Create the table from scratch.
    CreateTable {
        /// Table name.
        table: String,
        /// Columns in creation order.
        columns: Vec<ColumnSpec>,
    },
    /// Change an existing table.
    AlterTable {
        /// Table name.
        table: String,
        /// Columns to add.
        added: Vec<ColumnSpec>,
        /// Names of columns to drop.
        removed: Vec<String>,
        /// Columns whose definition changed, in their new form.
        changed: Vec<ColumnSpec>,
    },
    /// Nothing to do.
    NoOp,
}

impl MigrationPlan {
    /// The table this plan touches.
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::CreateTable { table, .. } | Self::AlterTable { table, .. } => Some(table),
            Self::NoOp => None,
        }
    }

    /// Whether the plan does nothing.
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::NoOp)
    }

    /// Whether an alter plan carries no column changes.
    pub fn is_metadata_only(&self) -> bool {
        matches!(
            self,
            Self::AlterTable { added, removed, changed, .. }
                if added.is_empty() && removed.is_empty() && changed.is_empty()
        )
    }

    /// Get a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        match self {
            Self::CreateTable { table, columns } => {
                format!("Create table {table} ({} columns)", columns.len())
            }
            Self::AlterTable {
                table,
                added,
                removed,
                changed,
            } => {
                let mut parts = Vec::new();
                if !added.is_empty() {
                    parts.push(format!("add {}", added.len()));
                }
                if !removed.is_empty() {
                    parts.push(format!("drop {}", removed.len()));
                }
                if !changed.is_empty() {
                    parts.push(format!("change {}", changed.len()));
                }

                if parts.is_empty() {
                    format!("Alter table {table} (metadata only)")
                } else {
                    format!("Alter table {table} ({})", parts.join(", "))
                }
            }
            Self::NoOp => "No changes".to_string(),
        }
    }
}

impl fmt::Display for MigrationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

/// What to do with the model's snapshot once the plan is decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotAction {
    /// Save once the emitter has accepted the plan.
    SaveAfterHandOff,
    /// Save immediately; the plan is not handed off.
    SaveNow,
    /// Leave the snapshot as it is.
    Keep,
}

/// How a model ended up after planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelOutcome {
    /// The table is created.
    Created,
    /// The table is altered.
    Altered,
    /// Nothing changed.
    Unchanged,
    /// The table existed without a snapshot; the snapshot was recorded.
    Tracked,
}

impl fmt::Display for ModelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "created",
            Self::Altered => "altered",
            Self::Unchanged => "unchanged",
            Self::Tracked => "tracked",
        };
        f.write_str(label)
    }
}

/// A plan together with its snapshot bookkeeping.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanOutcome {
    /// The decided plan.
    pub plan: MigrationPlan,
    /// What happens to the snapshot.
    pub snapshot: SnapshotAction,
}

impl PlanOutcome {
    /// Whether the plan goes to the DDL emitter.
    pub fn needs_hand_off(&self) -> bool {
        self.snapshot == SnapshotAction::SaveAfterHandOff
    }

    /// Classify the outcome.
    pub fn outcome(&self) -> ModelOutcome {
        match (&self.plan, self.snapshot) {
            (MigrationPlan::CreateTable { .. }, _) => ModelOutcome::Created,
            (MigrationPlan::AlterTable { .. }, _) => ModelOutcome::Altered,
            (MigrationPlan::NoOp, SnapshotAction::SaveNow) => ModelOutcome::Tracked,
            (MigrationPlan::NoOp, _) => ModelOutcome::Unchanged,
        }
    }
}

/// Decides plans from a model, its snapshot and the ledger's verdict.
///
/// | snapshot | migrated | plan          | snapshot        |
/// |----------|----------|---------------|-----------------|
/// | absent   | no       | `CreateTable` | after hand-off  |
/// | absent   | yes      | `NoOp`        | saved now       |
/// | equal    | any      | `NoOp`        | kept            |
/// | differs  | any      | `AlterTable`  | after hand-off  |
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrationPlanner;

impl MigrationPlanner {
    /// Create a planner.
    pub fn new() -> Self {
        Self
    }

    /// Plan the migration of `model` against its current attributes.
    pub fn plan(
        &self,
        model: &ModelDefinition,
        snapshot: Option<&AttributeMap>,
        has_been_migrated: bool,
    ) -> PlanOutcome {
        let table = model.table_name();
        let current = &model.attributes;

        let outcome = match snapshot {
            None if !has_been_migrated => PlanOutcome {
                plan: MigrationPlan::CreateTable {
                    columns: create_columns(model),
                    table,
                },
                snapshot: SnapshotAction::SaveAfterHandOff,
            },
            None => PlanOutcome {
                plan: MigrationPlan::NoOp,
                snapshot: SnapshotAction::SaveNow,
            },
            Some(previous) if same_attributes(previous, current) => PlanOutcome {
                plan: MigrationPlan::NoOp,
                snapshot: SnapshotAction::Keep,
            },
            Some(previous) => PlanOutcome {
                plan: alter_plan(table, previous, current),
                snapshot: SnapshotAction::SaveAfterHandOff,
            },
        };

        debug!(
            model = %model.name,
            has_snapshot = snapshot.is_some(),
            has_been_migrated,
            plan = %outcome.plan,
            "Planned migration"
        );

        outcome
    }
}

/// Full column list of a new table.
fn create_columns(model: &ModelDefinition) -> Vec<ColumnSpec> {
    let mut columns: Vec<ColumnSpec> = arranged(&model.attributes)
        .into_iter()
        .map(|(name, spec)| render_column(name, spec))
        .collect();

    let has_column = |columns: &[ColumnSpec], name: &str| columns.iter().any(|c| c.name == name);

    // A declared key column keeps its type but always leads the table.
    let key_name = snake_case(&model.primary_key);
    let key = match columns.iter().position(|c| c.name == key_name) {
        Some(index) => {
            let declared = columns.remove(index);
            let auto_increment = model.auto_increment && declared.db_type == "int";
            declared.primary_key(auto_increment)
        }
        None if model.traits.use_uuid => ColumnSpec::new(key_name, "uuid").primary_key(false),
        None => ColumnSpec::new(key_name, "int").primary_key(model.auto_increment),
    };
    columns.insert(0, key);

    for parent in &model.traits.belongs_to {
        let column = foreign_key_for(parent);
        if !has_column(&columns, &column) {
            columns.push(ColumnSpec::new(column, "int").references(table_name_for(parent)));
        }
    }

    let mut managed = Vec::new();
    if model.traits.use_timestamps {
        managed.extend(["created_at", "updated_at"]);
    }
    if model.traits.use_soft_deletes {
        managed.push("deleted_at");
    }
    for column in managed {
        if !has_column(&columns, column) {
            columns.push(ColumnSpec::new(column, "timestamp"));
        }
    }

    columns
}

/// Column-level difference between a snapshot and the current attributes.
///
/// Columns are matched by rendered name, so renaming an attribute key to
/// another spelling of the same column is never a drop plus an add.
fn alter_plan(table: String, previous: &AttributeMap, current: &AttributeMap) -> MigrationPlan {
    let before: Vec<ColumnSpec> = previous
        .iter()
        .map(|(name, spec)| render_column(name, spec))
        .collect();
    let after: Vec<ColumnSpec> = arranged(current)
        .into_iter()
        .map(|(name, spec)| render_column(name, spec))
        .collect();

    let mut added = Vec::new();
    let mut changed = Vec::new();
    for column in &after {
        match before.iter().find(|old| old.name == column.name) {
            None => added.push(column.clone()),
            Some(old) if old != column => changed.push(column.clone()),
            Some(_) => {}
        }
    }

    let mut removed: Vec<String> = Vec::new();
    for old in before {
        if !after.iter().any(|c| c.name == old.name) && !removed.contains(&old.name) {
            removed.push(old.name);
        }
    }

    MigrationPlan::AlterTable {
        table,
        added,
        removed,
        changed,
    }
}
