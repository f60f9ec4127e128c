//! modelsync-ci: the KiCad model-sync workflow as code.
//!
//! Provides a workflow orchestrator that:
//! - Decides from changed paths whether the workflow fires
//! - Runs the sync step and evaluates its exit code through a PR gate
//! - Plans a pull request carrying the modified footprints

pub mod error;
pub mod gate;
pub mod pipeline;
pub mod pull_request;
pub mod runner;
pub mod spec;
pub mod step;
pub mod trigger;
pub mod workflow_file;

// Re-export key types
pub use error::{Result, WorkflowError};
pub use gate::{GateVerdict, PrGate, PrTriggerPolicy};
pub use pipeline::{SyncWorkflow, WorkflowEvent, WorkflowEventKind, WorkflowResult};
pub use pull_request::{GitWorkingTree, PullRequestPlan, WorkingTree};
pub use runner::{CommandExecutor, StepExecutor, StepResult};
pub use spec::WorkflowSpec;
pub use step::{default_steps, BuiltinStep, StepCondition, StepConfig};
pub use trigger::{TriggerEvent, TriggerFilter, DEFAULT_FOOTPRINT_GLOB};
pub use workflow_file::{load_trigger_filter, parse_trigger_filter};
