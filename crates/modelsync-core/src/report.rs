use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::process::{FileReport, FileStatus};

/// Process exit status of a sync run.
///
/// `ChangesPending` is a signal for the surrounding workflow, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncExit {
    Clean,
    ChangesPending,
    Failed,
}

impl SyncExit {
    pub fn code(&self) -> u8 {
        match self {
            SyncExit::Clean => 0,
            SyncExit::ChangesPending => 1,
            SyncExit::Failed => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(SyncExit::Clean),
            1 => Some(SyncExit::ChangesPending),
            2 => Some(SyncExit::Failed),
            _ => None,
        }
    }
}

/// Everything a sync run did, persisted as JSON for CI and PR reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub schema_version: String,
    pub generated_at: DateTime<Utc>,
    pub root: PathBuf,
    pub dry_run: bool,
    pub files: Vec<FileReport>,
}

impl SyncReport {
    pub const SCHEMA_VERSION: &'static str = "1.0";

    pub fn new(root: PathBuf, dry_run: bool, files: Vec<FileReport>) -> Self {
        Self {
            schema_version: Self::SCHEMA_VERSION.to_string(),
            generated_at: Utc::now(),
            root,
            dry_run,
            files,
        }
    }

    pub fn total(&self) -> usize {
        self.files.len()
    }

    pub fn modified_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_modified()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }

    pub fn modified_files(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.is_modified())
    }

    /// Failures win over pending changes; dry runs never report pending changes.
    pub fn exit_status(&self) -> SyncExit {
        if self.failed_count() > 0 {
            SyncExit::Failed
        } else if !self.dry_run && self.modified_count() > 0 {
            SyncExit::ChangesPending
        } else {
            SyncExit::Clean
        }
    }

    /// `path` relative to the run root, with forward slashes.
    pub fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Plain-text run summary for the console.
    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        out.push_str("Summary:\n");
        out.push_str(&format!("Total files processed: {}\n", self.total()));
        out.push_str(&format!(
            "Files {}modified: {}\n",
            if self.dry_run { "would be " } else { "" },
            self.modified_count()
        ));
        out.push_str(&format!("Files failed: {}\n", self.failed_count()));

        for file in self.files.iter().filter(|f| f.is_failed()) {
            if let FileStatus::Failed { error } = &file.status {
                out.push_str(&format!("  {}: {}\n", self.relative_path(&file.path), error));
            }
        }
        out
    }

    /// Markdown body for the pull request that carries the modified files.
    pub fn render_pr_body(&self) -> String {
        let mut out = String::new();
        out.push_str("## KiCad 3D model sync\n\n");
        out.push_str(
            "Project-local `${KIPRJMOD}` model entries were brought in line with \
             their `${KICAD_3RD_PARTY}` counterparts.\n\n",
        );

        if self.modified_count() > 0 {
            out.push_str("| Footprint | Change |\n|---|---|\n");
            for file in self.modified_files() {
                let change = file
                    .outcome
                    .as_ref()
                    .map(|o| o.describe())
                    .unwrap_or_default();
                out.push_str(&format!(
                    "| `{}` | {} |\n",
                    self.relative_path(&file.path),
                    change
                ));
            }
            out.push('\n');
        }

        out.push_str(&format!(
            "{} of {} footprint files changed.\n",
            self.modified_count(),
            self.total()
        ));
        if self.failed_count() > 0 {
            out.push_str(&format!(
                "\n{} footprint files could not be processed.\n",
                self.failed_count()
            ));
        }
        out
    }

    /// Write the report as pretty JSON.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self).context("serialize sync report")?;
        std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
        Ok(())
    }

    /// Read a report written by [`SyncReport::write_json`].
    pub fn read_json(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("parse sync report {:?}", path))
    }
}
