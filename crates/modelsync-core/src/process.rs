//! Per-file processing and whole-tree runs.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, info_span, warn};

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::report::SyncReport;
use crate::scan::find_footprint_files;
use crate::sync::{sync_source, SyncOptions, SyncOutcome};

/// What happened to one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Modified,
    WouldModify,
    Unchanged,
    Failed { error: String },
}

/// Result of processing one footprint file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub status: FileStatus,
    pub outcome: Option<SyncOutcome>,
    /// SHA-256 of the file as read.
    pub digest_before: Option<String>,
    /// SHA-256 of the file as (or as it would be) written.
    pub digest_after: Option<String>,
}

impl FileReport {
    /// Modified on disk, or would have been in a dry run.
    pub fn is_modified(&self) -> bool {
        matches!(self.status, FileStatus::Modified | FileStatus::WouldModify)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }

    fn failed(path: &Path, error: &SyncError) -> Self {
        Self {
            path: path.to_path_buf(),
            status: FileStatus::Failed {
                error: error.to_string(),
            },
            outcome: None,
            digest_before: None,
            digest_after: None,
        }
    }
}

/// SHA-256 hex digest of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Reconcile one footprint file, writing it back unless `dry_run`.
///
/// Never fails: errors end up in the returned report so the caller can move
/// on to the next file.
pub fn process_footprint_file(path: &Path, options: &SyncOptions, dry_run: bool) -> FileReport {
    let span = info_span!("footprint", path = %path.display());
    let _guard = span.enter();

    match try_process(path, options, dry_run) {
        Ok(report) => report,
        Err(err) => {
            warn!(error = %err, "failed to process footprint");
            FileReport::failed(path, &err)
        }
    }
}

fn try_process(path: &Path, options: &SyncOptions, dry_run: bool) -> Result<FileReport> {
    let source = std::fs::read_to_string(path).map_err(SyncError::io(path))?;
    let digest_before = content_digest(source.as_bytes());
    let result = sync_source(&source, options)?;

    let (status, digest_after) = match &result.output {
        Some(output) => {
            if dry_run {
                info!(change = %result.outcome.describe(), "would modify file");
                (FileStatus::WouldModify, content_digest(output.as_bytes()))
            } else {
                write_atomic(path, output)?;
                info!(change = %result.outcome.describe(), "file modified");
                (FileStatus::Modified, content_digest(output.as_bytes()))
            }
        }
        None => {
            debug!(outcome = %result.outcome.describe(), "no changes needed");
            (FileStatus::Unchanged, digest_before.clone())
        }
    };

    Ok(FileReport {
        path: path.to_path_buf(),
        status,
        outcome: Some(result.outcome),
        digest_before: Some(digest_before),
        digest_after: Some(digest_after),
    })
}

/// Atomic write: temp file in the same directory, then rename over `path`.
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir).map_err(SyncError::io(dir))?;
    tmp.write_all(contents.as_bytes())
        .map_err(SyncError::io(tmp.path()))?;
    if let Ok(metadata) = std::fs::metadata(path) {
        std::fs::set_permissions(tmp.path(), metadata.permissions())
            .map_err(SyncError::io(path))?;
    }
    tmp.persist(path).map_err(|e| SyncError::Io {
        path: path.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// Discover and process every footprint below `config.root`.
pub fn process_tree(config: &SyncConfig) -> Result<SyncReport> {
    info!(root = %config.root.display(), dry_run = config.dry_run, "searching for .kicad_mod files");
    let files = find_footprint_files(&config.root)?;

    if files.is_empty() {
        warn!(root = %config.root.display(), "no .kicad_mod files found");
    } else {
        info!(count = files.len(), "found .kicad_mod files");
    }

    let options = config.sync_options();
    let reports = files
        .iter()
        .map(|path| process_footprint_file(path, &options, config.dry_run))
        .collect();

    Ok(SyncReport::new(config.root.clone(), config.dry_run, reports))
}
