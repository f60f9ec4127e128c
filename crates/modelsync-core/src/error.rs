//! Error taxonomy for model synchronisation.

use kicad_sexpr::SexprError;
use std::path::PathBuf;

/// Errors produced while reading, reconciling or writing footprints.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("not a KiCad footprint: {0}")]
    NotAFootprint(String),

    #[error("invalid model entry {path:?}: {reason}")]
    InvalidModel { path: String, reason: String },

    #[error("s-expression error: {0}")]
    Sexpr(#[from] SexprError),

    #[error("search root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("io error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Build a closure that wraps an `io::Error` with the path it concerns.
    pub(crate) fn io(path: &std::path::Path) -> impl FnOnce(std::io::Error) -> SyncError + '_ {
        move |source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for synchronisation operations.
pub type Result<T> = std::result::Result<T, SyncError>;
