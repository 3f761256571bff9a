//! Step results keyed by step id

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use super::executor::ExecutionOutcome;

/// Latest outcome of one step
#[derive(Debug, Clone, Serialize)]
pub struct StepResult {
    pub step_id: String,
    pub method: String,
    pub url: String,
    pub success: bool,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
    pub executed_at: DateTime<Local>,
}

impl StepResult {
    pub fn new(step_id: &str, method: &str, url: &str, outcome: ExecutionOutcome) -> Self {
        Self {
            step_id: step_id.to_string(),
            method: method.to_string(),
            url: url.to_string(),
            success: outcome.is_success(),
            outcome,
            executed_at: Local::now(),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }
}

/// Results by step id, independent of visible position
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: HashMap<String, StepResult>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result, replacing any earlier one for the same step
    pub fn record(&mut self, result: StepResult) {
        self.results.insert(result.step_id.clone(), result);
    }

    pub fn get(&self, step_id: &str) -> Option<&StepResult> {
        self.results.get(step_id)
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
