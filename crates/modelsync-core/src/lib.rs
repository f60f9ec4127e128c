//! modelsync-core: keep project-local KiCad 3D model references in step with
//! their third-party library counterparts.
//!
//! A footprint may reference the same STEP/WRL model twice, once under
//! `${KICAD_3RD_PARTY}` and once under `${KIPRJMOD}`. The third-party entry is
//! authoritative for placement (offset, scale, rotation, visibility, opacity);
//! [`sync_source`] copies those properties onto the project entry, adding one
//! when it is missing, and leaves every other byte of the file untouched.
//!
//! ```
//! use modelsync_core::{sync_source, SyncOptions, SyncOutcome};
//!
//! let source = "(footprint \"R\"\n  (model \"${KICAD_3RD_PARTY}/r/R.step\"\n    (offset (xyz 0 0 0))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 90))\n  )\n)\n";
//! let result = sync_source(source, &SyncOptions::default()).unwrap();
//! assert!(matches!(result.outcome, SyncOutcome::Added { .. }));
//! assert!(result.output.unwrap().contains("${KIPRJMOD}/3d-models/R.step"));
//! ```

pub mod config;
pub mod error;
pub mod footprint;
pub mod process;
pub mod report;
pub mod scan;
pub mod sync;
pub mod telemetry;

pub use config::{SyncConfig, GITHUB_WORKSPACE_ENV, PROJECT_MODEL_DIR_ENV};
pub use error::{Result, SyncError};
pub use footprint::{
    EntryLayout, Footprint, HideStyle, Model, ModelEntry, ModelScope, Xyz, KICAD_3RD_PARTY,
    KIPRJMOD,
};
pub use process::{content_digest, process_footprint_file, process_tree, FileReport, FileStatus};
pub use report::{SyncExit, SyncReport};
pub use scan::{find_footprint_files, is_footprint_file, FOOTPRINT_SUFFIX};
pub use sync::{
    plan_sync, project_path_for, sync_source, ModelProperty, SyncOptions, SyncOutcome, SyncPlan,
    SyncResult, DEFAULT_PROJECT_MODEL_DIR,
};
pub use telemetry::init_tracing;

/// Crate version, reported by the CLI and embedded in sync reports.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
