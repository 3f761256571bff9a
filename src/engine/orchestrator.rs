//! Run-all: execute every visible step in order, stopping at the first failure

use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::executor::Executor;
use super::results::StepResult;
use super::session::Session;
use crate::errors::ValidationError;
use crate::status::ExitStatus;

/// Pause between steps so the remote API is not hammered
pub const DEFAULT_RUN_DELAY: Duration = Duration::from_millis(500);

/// Why a run stopped early
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AbortReason {
    /// The request was sent and came back non-2xx (status 0: no response)
    StepFailed { status: u16 },
    /// The request could not be built; nothing was sent
    Validation { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Aborted { step_id: String, reason: AbortReason },
    /// Stopped by the operator before `next_step` ran
    Cancelled { next_step: Option<String> },
}

impl RunState {
    pub fn exit_status(&self) -> ExitStatus {
        match self {
            RunState::Idle | RunState::Running | RunState::Completed => ExitStatus::Success,
            RunState::Aborted { .. } => ExitStatus::StepFailed,
            RunState::Cancelled { .. } => ExitStatus::Interrupted,
        }
    }
}

/// What a run did
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub workflow_id: String,
    pub scenario: Option<String>,
    pub state: RunState,
    pub executed: Vec<StepResult>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.executed.iter().filter(|r| r.success()).count()
    }
}

pub struct Orchestrator<'a> {
    executor: &'a Executor,
    delay: Duration,
    cancel: CancellationToken,
}

impl<'a> Orchestrator<'a> {
    pub fn new(executor: &'a Executor, delay: Duration, cancel: CancellationToken) -> Self {
        Self { executor, delay, cancel }
    }

    /// Run all visible steps of the session's workflow from the first one.
    ///
    /// The cancellation token is honored before each step and during the
    /// pause between steps; an in-flight request is allowed to finish.
    pub async fn run_all(&self, session: &mut Session) -> Result<RunReport, ValidationError> {
        let workflow_id = session.workflow()?.id.clone();
        let scenario = session.scenario().map(str::to_string);
        let step_ids: Vec<String> = session.visible_steps()?.iter().map(|s| s.id.clone()).collect();

        let mut executed = Vec::new();
        let mut state = if step_ids.is_empty() { RunState::Completed } else { RunState::Running };
        info!(workflow = %workflow_id, steps = step_ids.len(), "Run started");

        for (index, step_id) in step_ids.iter().enumerate() {
            if self.cancel.is_cancelled() {
                state = RunState::Cancelled { next_step: Some(step_id.clone()) };
                break;
            }

            session.focus_index(index)?;
            let result = match session.execute_current(self.executor).await {
                Ok(result) => result,
                Err(error) => {
                    warn!(step = %step_id, error = %error, "Run aborted before sending");
                    state = RunState::Aborted {
                        step_id: step_id.clone(),
                        reason: AbortReason::Validation { message: error.to_string() },
                    };
                    break;
                }
            };

            let failed = !result.success();
            let status = result.outcome.status;
            executed.push(result);

            if failed {
                warn!(step = %step_id, status, "Run aborted on failed step");
                state = RunState::Aborted { step_id: step_id.clone(), reason: AbortReason::StepFailed { status } };
                break;
            }

            let Some(next) = step_ids.get(index + 1) else {
                state = RunState::Completed;
                break;
            };

            tokio::select! {
                _ = self.cancel.cancelled() => {
                    state = RunState::Cancelled { next_step: Some(next.clone()) };
                    break;
                }
                _ = tokio::time::sleep(self.delay) => {}
            }
        }

        info!(workflow = %workflow_id, state = ?state, executed = executed.len(), "Run finished");
        Ok(RunReport { workflow_id, scenario, state, executed })
    }
}
