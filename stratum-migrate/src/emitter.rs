//! The seam to the collaborator that turns plans into migration artifacts.

use stratum_schema::ModelDefinition;

use crate::error::EmitError;
use crate::plan::MigrationPlan;

/// Receives every plan that needs an artifact.
///
/// The emitter owns the artifact format (SQL text, migration class, ...).
/// Returning an error rejects the plan: the model's snapshot is not updated
/// and the model is planned again on the next run.
pub trait DdlEmitter {
    /// Produce the artifact for a plan.
    fn emit(&mut self, model: &ModelDefinition, plan: &MigrationPlan) -> Result<(), EmitError>;
}

impl<F> DdlEmitter for F
where
    F: FnMut(&ModelDefinition, &MigrationPlan) -> Result<(), EmitError>,
{
    fn emit(&mut self, model: &ModelDefinition, plan: &MigrationPlan) -> Result<(), EmitError> {
        self(model, plan)
    }
}

/// Emitter that keeps every plan it receives.
#[derive(Debug, Clone, Default)]
pub struct PlanCollector {
    plans: Vec<(String, MigrationPlan)>,
}

impl PlanCollector {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Collected `(model, plan)` pairs in hand-off order.
    pub fn plans(&self) -> &[(String, MigrationPlan)] {
        &self.plans
    }

    /// Plan handed off for a model, if any.
    pub fn plan_for(&self, model: &str) -> Option<&MigrationPlan> {
        self.plans
            .iter()
            .rev()
            .find(|(name, _)| name == model)
            .map(|(_, plan)| plan)
    }

    /// Number of collected plans.
    pub fn len(&self) -> usize {
        self.plans.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl DdlEmitter for PlanCollector {
    fn emit(&mut self, model: &ModelDefinition, plan: &MigrationPlan) -> Result<(), EmitError> {
        self.plans.push((model.name.clone(), plan.clone()));
        Ok(())
    }
}
