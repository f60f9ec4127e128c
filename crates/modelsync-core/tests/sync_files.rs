//! End-to-end runs over a temporary library tree.

use modelsync_core::{process_tree, FileStatus, SyncConfig, SyncExit, SyncOutcome, SyncReport};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const KICAD7_NEEDS_PROJECT: &str = r#"(footprint "R_0603" (version 20221018) (generator pcbnew)
  (layer "F.Cu")
  (attr smd)
  (fp_text reference "REF**" (at 0 -1.43) (layer "F.SilkS"))
  (model "${KICAD_3RD_PARTY}/3dmodels/pkg/R_0603.step"
    (offset (xyz 0 0 0))
    (scale (xyz 1 1 1))
    (rotate (xyz 0 0 90))
  )
)
"#;

const KICAD8_DRIFTED: &str = "(footprint \"C_0402\"\n\t(version 20240108)\n\t(generator \"pcbnew\")\n\t(layer \"F.Cu\")\n\t(model \"${KICAD_3RD_PARTY}/3dmodels/pkg/C_0402.wrl\"\n\t\t(hide yes)\n\t\t(offset\n\t\t\t(xyz 0 0 0.2)\n\t\t)\n\t\t(scale\n\t\t\t(xyz 1 1 1)\n\t\t)\n\t\t(rotate\n\t\t\t(xyz 0 0 0)\n\t\t)\n\t)\n\t(model \"${KIPRJMOD}/3d-models/C_0402.wrl\"\n\t\t(offset\n\t\t\t(xyz 0 0 0)\n\t\t)\n\t\t(scale\n\t\t\t(xyz 1 1 1)\n\t\t)\n\t\t(rotate\n\t\t\t(xyz 0 0 0)\n\t\t)\n\t)\n)\n";

const NO_MODELS: &str = "(footprint \"TP\" (layer \"F.Cu\") (attr smd))\n";

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn status_of<'a>(report: &'a SyncReport, suffix: &str) -> &'a FileStatus {
    &report
        .files
        .iter()
        .find(|f| f.path.ends_with(suffix))
        .unwrap_or_else(|| panic!("no report for {suffix}"))
        .status
}

#[test]
fn test_sync_tree_modifies_and_reports() {
    let dir = tempdir().unwrap();
    write(dir.path(), "lib.pretty/R_0603.kicad_mod", KICAD7_NEEDS_PROJECT);
    write(dir.path(), "lib.pretty/C_0402.kicad_mod", KICAD8_DRIFTED);
    write(dir.path(), "lib.pretty/TP.kicad_mod", NO_MODELS);

    let report = process_tree(&SyncConfig::new(dir.path())).unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.modified_count(), 2);
    assert_eq!(report.exit_status(), SyncExit::ChangesPending);
    assert_eq!(status_of(&report, "TP.kicad_mod"), &FileStatus::Unchanged);

    let resistor = fs::read_to_string(dir.path().join("lib.pretty/R_0603.kicad_mod")).unwrap();
    let untouched = &KICAD7_NEEDS_PROJECT[..KICAD7_NEEDS_PROJECT.len() - 2];
    assert!(resistor.starts_with(untouched));
    assert!(resistor.ends_with("  )\n)\n"));
    assert!(resistor.contains("(model \"${KIPRJMOD}/3d-models/R_0603.step\""));
    assert!(resistor.contains("(rotate (xyz 0 0 90))"));

    let capacitor = fs::read_to_string(dir.path().join("lib.pretty/C_0402.kicad_mod")).unwrap();
    let project = &capacitor[capacitor.find("${KIPRJMOD}").unwrap()..];
    assert!(project.contains("(hide yes)"));
    assert!(project.contains("(xyz 0 0 0.2)"));
}

#[test]
fn test_second_run_is_clean() {
    let dir = tempdir().unwrap();
    write(dir.path(), "R.kicad_mod", KICAD7_NEEDS_PROJECT);
    write(dir.path(), "C.kicad_mod", KICAD8_DRIFTED);

    let config = SyncConfig::new(dir.path());
    let first = process_tree(&config).unwrap();
    assert_eq!(first.exit_status(), SyncExit::ChangesPending);

    let snapshot = fs::read_to_string(dir.path().join("R.kicad_mod")).unwrap();
    let second = process_tree(&config).unwrap();
    assert_eq!(second.exit_status(), SyncExit::Clean);
    assert_eq!(second.modified_count(), 0);
    assert!(second
        .files
        .iter()
        .all(|f| f.outcome == Some(SyncOutcome::InSync)));
    assert_eq!(
        fs::read_to_string(dir.path().join("R.kicad_mod")).unwrap(),
        snapshot
    );
}

#[test]
fn test_dry_run_reports_without_writing() {
    let dir = tempdir().unwrap();
    write(dir.path(), "R.kicad_mod", KICAD7_NEEDS_PROJECT);

    let config = SyncConfig::new(dir.path()).with_dry_run(true);
    let report = process_tree(&config).unwrap();

    assert_eq!(status_of(&report, "R.kicad_mod"), &FileStatus::WouldModify);
    assert_eq!(report.exit_status(), SyncExit::Clean);
    assert!(report.render_summary().contains("Files would be modified: 1"));
    assert_eq!(
        fs::read_to_string(dir.path().join("R.kicad_mod")).unwrap(),
        KICAD7_NEEDS_PROJECT
    );
}

#[test]
fn test_broken_file_does_not_stop_the_run() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a/Broken.kicad_mod", "(footprint \"Broken\" (model ");
    write(dir.path(), "b/R.kicad_mod", KICAD7_NEEDS_PROJECT);

    let report = process_tree(&SyncConfig::new(dir.path())).unwrap();

    assert_eq!(report.failed_count(), 1);
    assert_eq!(report.modified_count(), 1);
    assert_eq!(report.exit_status(), SyncExit::Failed);
    assert!(matches!(
        status_of(&report, "Broken.kicad_mod"),
        FileStatus::Failed { .. }
    ));
}

#[test]
fn test_custom_project_model_dir() {
    let dir = tempdir().unwrap();
    write(dir.path(), "R.kicad_mod", KICAD7_NEEDS_PROJECT);

    let config = SyncConfig::new(dir.path()).with_project_model_dir("packages3d/");
    process_tree(&config).unwrap();

    let written = fs::read_to_string(dir.path().join("R.kicad_mod")).unwrap();
    assert!(written.contains("${KIPRJMOD}/packages3d/R_0603.step"));
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    let err = process_tree(&SyncConfig::new(dir.path().join("absent"))).unwrap_err();
    assert!(err.to_string().contains("search root not found"));
}

#[test]
fn test_report_json_written_and_read_back() {
    let dir = tempdir().unwrap();
    write(dir.path(), "R.kicad_mod", KICAD7_NEEDS_PROJECT);

    let report = process_tree(&SyncConfig::new(dir.path())).unwrap();
    let out = dir.path().join("report.json");
    report.write_json(&out).unwrap();

    let loaded = SyncReport::read_json(&out).unwrap();
    assert_eq!(loaded.modified_count(), 1);
    assert_eq!(loaded.schema_version, SyncReport::SCHEMA_VERSION);
}
