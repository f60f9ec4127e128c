//! Footprint file discovery.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, SyncError};

/// File name suffix of KiCad footprint files.
pub const FOOTPRINT_SUFFIX: &str = ".kicad_mod";

/// Whether `path` names a footprint file.
pub fn is_footprint_file(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(FOOTPRINT_SUFFIX))
        .unwrap_or(false)
}

/// Recursively collect every `.kicad_mod` file below `root`, sorted.
///
/// Hidden directories (`.git`, `.github`, ...) are not entered and directory
/// symlinks are not followed.
pub fn find_footprint_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        return Err(SyncError::RootNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();
    collect_recursive(root, &mut files)?;

    // Sort for deterministic ordering
    files.sort();

    debug!(root = %root.display(), count = files.len(), "footprint discovery finished");
    Ok(files)
}

fn collect_recursive(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).map_err(SyncError::io(dir))? {
        let entry = entry.map_err(SyncError::io(dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(SyncError::io(&path))?;

        if file_type.is_dir() {
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            collect_recursive(&path, files)?;
        } else if is_footprint_file(&path)
            && (file_type.is_file() || (file_type.is_symlink() && path.is_file()))
        {
            files.push(path);
        }
    }

    Ok(())
}
