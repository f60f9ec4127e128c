//! Step execution.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, WorkflowError};
use crate::step::StepConfig;
use modelsync_core::GITHUB_WORKSPACE_ENV;

/// Result of a step execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    /// Step name.
    pub step_name: String,

    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether execution succeeded.
    pub success: bool,
}

impl StepResult {
    /// Whether this step passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Result for a step that never produced an exit status.
    pub fn errored(step_name: &str, error: &str, duration_ms: u64) -> Self {
        Self {
            step_name: step_name.to_string(),
            exit_code: -1,
            stdout: String::new(),
            stderr: error.to_string(),
            duration_ms,
            success: false,
        }
    }
}

/// Runs one step inside a workspace.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, step: &StepConfig, workspace: &Path) -> Result<StepResult>;
}

/// Executes steps as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandExecutor;

#[async_trait]
impl StepExecutor for CommandExecutor {
    async fn execute(&self, step: &StepConfig, workspace: &Path) -> Result<StepResult> {
        let start = Instant::now();

        let Some((exe, args)) = step.command.split_first() else {
            return Err(WorkflowError::EmptyCommand(step.name.clone()));
        };

        // The child runs inside the workspace, so a relative path in
        // GITHUB_WORKSPACE would resolve against itself.
        let workspace = tokio::fs::canonicalize(workspace)
            .await
            .map_err(|source| WorkflowError::Workspace {
                path: workspace.to_path_buf(),
                source,
            })?;

        debug!(step = %step.name, command = ?step.command, workspace = %workspace.display(), "spawning step");
        let child = Command::new(exe)
            .args(args)
            .current_dir(&workspace)
            .env(GITHUB_WORKSPACE_ENV, &workspace)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| WorkflowError::Spawn {
                step: step.name.clone(),
                source,
            })?;

        let spawn_error = |source: std::io::Error| WorkflowError::Spawn {
            step: step.name.clone(),
            source,
        };
        let output = if step.timeout_secs > 0 {
            tokio::time::timeout(
                Duration::from_secs(step.timeout_secs),
                child.wait_with_output(),
            )
            .await
            .map_err(|_| WorkflowError::Timeout {
                step: step.name.clone(),
                secs: step.timeout_secs,
            })?
            .map_err(spawn_error)?
        } else {
            child.wait_with_output().await.map_err(spawn_error)?
        };

        Ok(StepResult {
            step_name: step.name.clone(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            success: output.status.success(),
        })
    }
}
