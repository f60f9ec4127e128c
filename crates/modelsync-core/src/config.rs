//! Run configuration.
//!
//! The search root comes from `GITHUB_WORKSPACE` when running inside a
//! GitHub Actions job, otherwise from the command line.

use std::path::{Path, PathBuf};

use crate::sync::{SyncOptions, DEFAULT_PROJECT_MODEL_DIR};

/// Set by GitHub Actions to the checked-out repository.
pub const GITHUB_WORKSPACE_ENV: &str = "GITHUB_WORKSPACE";

/// Overrides the project model directory.
pub const PROJECT_MODEL_DIR_ENV: &str = "MODELSYNC_PROJECT_MODEL_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Directory searched recursively for footprints.
    pub root: PathBuf,
    pub dry_run: bool,
    /// Directory below `${KIPRJMOD}` that holds the project models.
    pub project_model_dir: String,
    /// Where to write the JSON report, if anywhere.
    pub report_path: Option<PathBuf>,
}

impl SyncConfig {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            dry_run: false,
            project_model_dir: DEFAULT_PROJECT_MODEL_DIR.to_string(),
            report_path: None,
        }
    }

    /// Resolve the search root from the process environment.
    pub fn resolve_root(cli_dir: &Path) -> PathBuf {
        Self::resolve_root_with(cli_dir, std::env::var(GITHUB_WORKSPACE_ENV).ok())
    }

    /// A non-empty workspace value wins over the command-line directory.
    pub fn resolve_root_with(cli_dir: &Path, workspace: Option<String>) -> PathBuf {
        match workspace {
            Some(ws) if !ws.trim().is_empty() => PathBuf::from(ws),
            _ => cli_dir.to_path_buf(),
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_project_model_dir(mut self, dir: impl Into<String>) -> Self {
        self.project_model_dir = dir.into();
        self
    }

    pub fn with_report_path(mut self, path: Option<PathBuf>) -> Self {
        self.report_path = path;
        self
    }

    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            project_model_dir: self.project_model_dir.clone(),
        }
    }
}
