//! Workflow simulation engine
//!
//! Scenario resolution, the step cursor, request synthesis from drafts,
//! execution, result tracking and run-all orchestration.

pub mod cursor;
pub mod draft;
pub mod executor;
pub mod line_items;
pub mod orchestrator;
pub mod path;
pub mod results;
pub mod scenario;
pub mod session;
pub mod synth;

pub use cursor::{StepCursor, StepStatus};
pub use draft::{BodyMode, StepDraft};
pub use executor::{ExecutionOutcome, Executor, Pagination, ResponsePayload};
pub use orchestrator::{AbortReason, Orchestrator, RunReport, RunState, DEFAULT_RUN_DELAY};
pub use path::FieldPath;
pub use results::{ResultStore, StepResult};
pub use scenario::{resolve_scenario, visible_steps};
pub use session::Session;
pub use synth::{Credentials, RequestBody, RequestSynthesizer, SynthesizedRequest, DEFAULT_BASE_URL};
