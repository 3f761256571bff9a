//! Scenario resolution: which steps of a workflow are visible

use crate::catalog::{Step, Workflow};
use crate::errors::ValidationError;

/// Ordered visible steps for a workflow under the selected scenario.
///
/// A step is visible when it has no condition or its condition equals the
/// selected scenario. Declaration order is preserved.
pub fn visible_steps<'a>(workflow: &'a Workflow, scenario: Option<&str>) -> Vec<&'a Step> {
    workflow.steps.iter().filter(|step| step.is_visible(scenario)).collect()
}

/// Validate a requested scenario, or pick the workflow default.
///
/// Workflows without scenarios resolve to `None`; requesting one for them is an error.
pub fn resolve_scenario(workflow: &Workflow, requested: Option<&str>) -> Result<Option<String>, ValidationError> {
    match requested {
        Some(id) => workflow
            .scenario(id)
            .map(|s| Some(s.id.clone()))
            .ok_or_else(|| ValidationError::UnknownScenario {
                workflow: workflow.id.clone(),
                scenario: id.to_string(),
            }),
        None => Ok(workflow.default_scenario().map(str::to_string)),
    }
}

/// Position of a step id within the visible list
pub fn position_of(visible: &[&Step], step_id: &str) -> Option<usize> {
    visible.iter().position(|s| s.id == step_id)
}
