//! Workflow run identity.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;

use crate::step::StepConfig;
use crate::trigger::TriggerEvent;

/// What a workflow run operates on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkflowSpec {
    /// Repository checkout the steps run in.
    pub workspace_path: PathBuf,

    pub event: TriggerEvent,

    /// Paths changed by the triggering push or pull request.
    pub changed_paths: Vec<String>,

    /// Commit the run started from, when known.
    pub git_sha: Option<String>,

    /// SHA-256 digest of ordered step names (deterministic).
    pub steps_digest: String,
}

impl WorkflowSpec {
    pub fn new(
        workspace_path: PathBuf,
        event: TriggerEvent,
        changed_paths: Vec<String>,
        git_sha: Option<String>,
        steps: &[StepConfig],
    ) -> Self {
        let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
        Self {
            workspace_path,
            event,
            changed_paths,
            git_sha,
            steps_digest: compute_steps_digest(&names),
        }
    }
}

/// Compute deterministic digest of ordered step names.
pub fn compute_steps_digest(steps: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for step in steps {
        hasher.update(step.as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
