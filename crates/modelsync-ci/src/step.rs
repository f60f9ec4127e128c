//! Workflow step definitions and configuration.

use serde::{Deserialize, Serialize};

/// Name of the binary the sync step invokes by default.
pub const SYNC_BINARY: &str = "kicad-model-sync";

/// Builtin workflow steps.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BuiltinStep {
    /// kicad-model-sync
    Sync,

    /// Collect the modified footprints into a pull-request plan.
    PlanPullRequest,
}

impl BuiltinStep {
    /// Get the step name as a string.
    pub fn name(&self) -> &'static str {
        match self {
            BuiltinStep::Sync => "sync",
            BuiltinStep::PlanPullRequest => "plan_pull_request",
        }
    }

    /// Default command. The PR planning step runs in-process and has none.
    pub fn command(&self) -> Vec<String> {
        match self {
            BuiltinStep::Sync => vec![SYNC_BINARY.to_string()],
            BuiltinStep::PlanPullRequest => Vec::new(),
        }
    }

    pub fn default_condition(&self) -> StepCondition {
        match self {
            BuiltinStep::Sync => StepCondition::Always,
            BuiltinStep::PlanPullRequest => StepCondition::OnGateOpen,
        }
    }
}

/// When a step runs, given what happened before it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StepCondition {
    #[default]
    Always,
    /// Only after the PR gate opened.
    OnGateOpen,
    /// Only after an earlier step failed.
    OnFailure,
}

/// Configuration for a workflow step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StepConfig {
    /// Human-readable step name.
    pub name: String,

    /// Command to execute (first element is executable).
    pub command: Vec<String>,

    /// Set for builtin steps.
    pub builtin: Option<BuiltinStep>,

    /// Timeout in seconds (0 = no timeout).
    pub timeout_secs: u64,

    /// Whether this step is enabled.
    pub enabled: bool,

    pub condition: StepCondition,
}

impl StepConfig {
    pub fn from_builtin(step: BuiltinStep, timeout_secs: u64) -> Self {
        Self {
            name: step.name().to_string(),
            command: step.command(),
            builtin: Some(step),
            timeout_secs,
            enabled: true,
            condition: step.default_condition(),
        }
    }

    /// The sync step with an explicit command line.
    pub fn sync(command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            command,
            ..Self::from_builtin(BuiltinStep::Sync, timeout_secs)
        }
    }

    pub fn custom(name: String, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name,
            command,
            builtin: None,
            timeout_secs,
            enabled: true,
            condition: StepCondition::Always,
        }
    }

    pub fn with_condition(mut self, condition: StepCondition) -> Self {
        self.condition = condition;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_sync(&self) -> bool {
        self.builtin == Some(BuiltinStep::Sync)
    }

    pub fn is_pull_request_plan(&self) -> bool {
        self.builtin == Some(BuiltinStep::PlanPullRequest)
    }
}

/// The standard two-step workflow: sync, then plan a PR if the gate opens.
pub fn default_steps(sync_command: Vec<String>, timeout_secs: u64) -> Vec<StepConfig> {
    vec![
        StepConfig::sync(sync_command, timeout_secs),
        StepConfig::from_builtin(BuiltinStep::PlanPullRequest, timeout_secs),
    ]
}
