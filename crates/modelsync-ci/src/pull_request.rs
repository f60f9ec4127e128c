//! Pull-request planning.
//!
//! Creating the pull request is left to the hosting platform; this module
//! only works out what would go into it.

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::process::Command;
use uuid::Uuid;

use crate::error::{Result, WorkflowError};
use modelsync_core::{SyncReport, FOOTPRINT_SUFFIX};

/// Prefix of branches created for sync pull requests.
pub const BRANCH_PREFIX: &str = "kicad-model-sync";

pub const PR_TITLE: &str = "Sync KiCad 3D model references";

/// Source of the paths changed in the working tree.
#[async_trait]
pub trait WorkingTree: Send + Sync {
    /// Changed paths relative to the repository root, `/`-separated.
    async fn modified_paths(&self) -> Result<Vec<String>>;
}

/// A git checkout.
#[derive(Debug, Clone)]
pub struct GitWorkingTree {
    root: PathBuf,
}

impl GitWorkingTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The HEAD commit SHA, or `None` outside a repository.
    pub async fn head_sha(&self) -> Option<String> {
        let output = Command::new("git")
            .args(["rev-parse", "HEAD"])
            .current_dir(&self.root)
            .output()
            .await
            .ok()?;
        if !output.status.success() {
            return None;
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        (!sha.is_empty()).then_some(sha)
    }
}

#[async_trait]
impl WorkingTree for GitWorkingTree {
    async fn modified_paths(&self) -> Result<Vec<String>> {
        let output = Command::new("git")
            .args(["status", "--porcelain", "-z", "--untracked-files=all"])
            .current_dir(&self.root)
            .output()
            .await
            .map_err(|e| WorkflowError::Git(format!("failed to run git: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WorkflowError::Git(format!("git status failed: {stderr}")));
        }

        Ok(parse_porcelain_z(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse `git status --porcelain -z` output into paths.
///
/// Renames and copies carry a second NUL-terminated field with the old
/// path, which is skipped.
pub fn parse_porcelain_z(output: &str) -> Vec<String> {
    let mut paths = Vec::new();
    let mut fields = output.split('\0');
    while let Some(entry) = fields.next() {
        if entry.len() < 4 {
            continue;
        }
        let (status, path) = entry.split_at(3);
        if status.contains('R') || status.contains('C') {
            fields.next();
        }
        paths.push(path.to_string());
    }
    paths
}

/// What the pull request would contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestPlan {
    pub run_id: Uuid,
    pub branch: String,
    pub title: String,
    pub commit_message: String,
    pub body: String,
    /// Footprint files to commit.
    pub files: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl PullRequestPlan {
    /// Build a plan from the changed paths, keeping only footprint files.
    pub fn build(run_id: Uuid, report: Option<&SyncReport>, changed_paths: &[String]) -> Self {
        let mut files: Vec<String> = changed_paths
            .iter()
            .filter(|p| p.ends_with(FOOTPRINT_SUFFIX))
            .cloned()
            .collect();
        files.sort();
        files.dedup();

        let short_id: String = run_id.simple().to_string().chars().take(8).collect();
        let commit_message = format!(
            "{PR_TITLE}\n\nUpdated {} footprint file{}.",
            files.len(),
            if files.len() == 1 { "" } else { "s" }
        );
        let body = match report {
            Some(report) => report.render_pr_body(),
            None => fallback_body(&files),
        };

        Self {
            run_id,
            branch: format!("{BRANCH_PREFIX}/{short_id}"),
            title: PR_TITLE.to_string(),
            commit_message,
            body,
            files,
            created_at: Utc::now(),
        }
    }

    /// Nothing to commit.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self).context("serialize PR plan")?;
        std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }
}

fn fallback_body(files: &[String]) -> String {
    let mut body = String::from("## KiCad 3D model sync\n\nModified footprints:\n\n");
    for file in files {
        body.push_str(&format!("- `{file}`\n"));
    }
    body
}
