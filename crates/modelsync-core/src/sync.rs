//! Reconciliation of `${KIPRJMOD}` model entries with their third-party source.
//!
//! The third-party entry is authoritative. The project entry either gets
//! created from it or has its transform and display settings copied over.
//! Edits are spliced into the original text, so everything else in the file
//! stays byte-for-byte identical.

use kicad_sexpr::Edit;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::error::Result;
use crate::footprint::{EntryLayout, Footprint, HideStyle, Model, ModelEntry, ModelScope, KIPRJMOD};

/// Directory below `${KIPRJMOD}` that newly created project entries point into.
pub const DEFAULT_PROJECT_MODEL_DIR: &str = "3d-models";

/// Knobs for [`plan_sync`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    pub project_model_dir: String,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            project_model_dir: DEFAULT_PROJECT_MODEL_DIR.to_string(),
        }
    }
}

/// A model setting that can drift between the two entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelProperty {
    Offset,
    Scale,
    Rotation,
    Visibility,
    Opacity,
}

impl ModelProperty {
    pub fn name(&self) -> &'static str {
        match self {
            ModelProperty::Offset => "offset",
            ModelProperty::Scale => "scale",
            ModelProperty::Rotation => "rotation",
            ModelProperty::Visibility => "visibility",
            ModelProperty::Opacity => "opacity",
        }
    }
}

impl fmt::Display for ModelProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What reconciling one footprint found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SyncOutcome {
    NoModels,
    NoThirdPartyModel,
    InSync,
    Added { path: String },
    Updated { properties: Vec<ModelProperty> },
}

impl SyncOutcome {
    pub fn modifies_file(&self) -> bool {
        matches!(self, SyncOutcome::Added { .. } | SyncOutcome::Updated { .. })
    }

    /// Short human-readable description, used in summaries and PR bodies.
    pub fn describe(&self) -> String {
        match self {
            SyncOutcome::NoModels => "no model entries".to_string(),
            SyncOutcome::NoThirdPartyModel => "no ${KICAD_3RD_PARTY} model".to_string(),
            SyncOutcome::InSync => "in sync".to_string(),
            SyncOutcome::Added { path } => format!("added `{path}`"),
            SyncOutcome::Updated { properties } => {
                let names: Vec<&str> = properties.iter().map(ModelProperty::name).collect();
                format!("updated {}", names.join(", "))
            }
        }
    }
}

/// Outcome plus the edits that realise it.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPlan {
    pub outcome: SyncOutcome,
    pub edits: Vec<Edit>,
}

impl SyncPlan {
    fn unchanged(outcome: SyncOutcome) -> Self {
        Self {
            outcome,
            edits: Vec::new(),
        }
    }
}

/// Outcome plus the rewritten source when the file changes.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncResult {
    pub outcome: SyncOutcome,
    pub output: Option<String>,
}

/// Properties of `project` that differ from `source`, in reporting order.
pub fn changed_properties(project: &Model, source: &Model) -> Vec<ModelProperty> {
    let mut changed = Vec::new();
    if project.offset != source.offset {
        changed.push(ModelProperty::Offset);
    }
    if project.scale != source.scale {
        changed.push(ModelProperty::Scale);
    }
    if project.rotate != source.rotate {
        changed.push(ModelProperty::Rotation);
    }
    if project.hide != source.hide {
        changed.push(ModelProperty::Visibility);
    }
    if project.opacity != source.opacity {
        changed.push(ModelProperty::Opacity);
    }
    changed
}

/// `${KIPRJMOD}/<dir>/<file name of the third-party model>`.
pub fn project_path_for(third_party: &Model, options: &SyncOptions) -> String {
    let dir = options.project_model_dir.trim_matches('/');
    if dir.is_empty() {
        format!("{KIPRJMOD}/{}", third_party.file_name())
    } else {
        format!("{KIPRJMOD}/{dir}/{}", third_party.file_name())
    }
}

/// Work out what, if anything, must change in `footprint`.
///
/// When several entries share a scope, the last one in the file is used.
pub fn plan_sync(footprint: &Footprint, options: &SyncOptions) -> Result<SyncPlan> {
    let entries = footprint.models()?;
    if entries.is_empty() {
        debug!("no model sections found");
        return Ok(SyncPlan::unchanged(SyncOutcome::NoModels));
    }

    let last_in_scope = |scope: ModelScope| -> Option<&ModelEntry> {
        entries.iter().filter(|e| e.model.scope() == scope).last()
    };

    let Some(third_party) = last_in_scope(ModelScope::ThirdParty) else {
        debug!("no KICAD_3RD_PARTY model found");
        return Ok(SyncPlan::unchanged(SyncOutcome::NoThirdPartyModel));
    };
    let version_style = HideStyle::for_version(footprint.version());
    let newline = footprint.newline().to_string();

    match last_in_scope(ModelScope::Project) {
        None => {
            let path = project_path_for(&third_party.model, options);
            let model = Model {
                path: path.clone(),
                ..third_party.model.clone()
            };
            let layout = EntryLayout {
                indent: third_party.indent.clone(),
                hide_style: third_party.hide_style.unwrap_or(version_style),
                newline,
            };

            let anchor = entries
                .last()
                .map(|entry| entry.span.end)
                .unwrap_or(third_party.span.end);
            let text = format!(
                "{}{}{}",
                layout.newline,
                layout.indent,
                layout.render(&model, &[])
            );

            info!(path = %path, "added project model");
            Ok(SyncPlan {
                outcome: SyncOutcome::Added { path },
                edits: vec![Edit::insert(anchor, text)],
            })
        }
        Some(project) => {
            let properties = changed_properties(&project.model, &third_party.model);
            if properties.is_empty() {
                debug!(path = %project.model.path, "project model already in sync");
                return Ok(SyncPlan::unchanged(SyncOutcome::InSync));
            }
            for property in &properties {
                info!(property = %property, path = %project.model.path, "updated project model");
            }
            if project.legacy_offset {
                debug!(path = %project.model.path, "rewriting legacy inch `at` as `offset`");
            }

            let model = Model {
                path: project.model.path.clone(),
                ..third_party.model.clone()
            };
            let layout = EntryLayout {
                indent: project.indent.clone(),
                hide_style: project
                    .hide_style
                    .or(third_party.hide_style)
                    .unwrap_or(version_style),
                newline,
            };

            Ok(SyncPlan {
                outcome: SyncOutcome::Updated { properties },
                edits: vec![Edit::replace(
                    project.span,
                    layout.render(&model, &project.extras),
                )],
            })
        }
    }
}

/// Parse, plan and apply in one go.
pub fn sync_source(source: &str, options: &SyncOptions) -> Result<SyncResult> {
    let footprint = Footprint::parse(source)?;
    let plan = plan_sync(&footprint, options)?;
    let output = if plan.outcome.modifies_file() {
        Some(footprint.document().splice(plan.edits)?)
    } else {
        None
    };
    Ok(SyncResult {
        outcome: plan.outcome,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::footprint::Xyz;

    const THIRD_PARTY_ONLY: &str = r#"(footprint "R_0603" (version 20221018) (generator pcbnew)
  (layer "F.Cu")
  (fp_text reference "REF**" (at 0 -1.43) (layer "F.SilkS"))
  (model "${KICAD_3RD_PARTY}/3dmodels/com_github_x/R_0603.step" hide
    (opacity 0.5)
    (offset (xyz 0 0 0.1))
    (scale (xyz 1 1 1))
    (rotate (xyz 0 0 90))
  )
)
"#;

    const DRIFTED: &str = r#"(footprint "R_0603" (version 20221018) (generator pcbnew)
  (layer "F.Cu")
  (model "${KICAD_3RD_PARTY}/3dmodels/R_0603.step"
    (offset (xyz 0 0 0.1))
    (scale (xyz 1 1 1))
    (rotate (xyz 0 0 90))
  )
  (model "${KIPRJMOD}/3d-models/R_0603.step"
    (offset (xyz 0 0 0))
    (scale (xyz 1 1 1))
    (rotate (xyz 0 0 0))
  )
)
"#;

    fn opts() -> SyncOptions {
        SyncOptions::default()
    }

    #[test]
    fn test_adds_missing_project_model() {
        let result = sync_source(THIRD_PARTY_ONLY, &opts()).unwrap();
        assert_eq!(
            result.outcome,
            SyncOutcome::Added {
                path: "${KIPRJMOD}/3d-models/R_0603.step".to_string()
            }
        );

        let output = result.output.unwrap();
        assert!(output.starts_with(THIRD_PARTY_ONLY.trim_end_matches(")\n")));
        assert!(output.contains(
            "  )\n  (model \"${KIPRJMOD}/3d-models/R_0603.step\" hide\n    (opacity 0.5)\n    (offset (xyz 0 0 0.1))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 90))\n  )\n)\n"
        ));

        let fp = Footprint::parse(&output).unwrap();
        let project = fp
            .models()
            .unwrap()
            .into_iter()
            .find(|e| e.model.scope() == ModelScope::Project)
            .unwrap();
        assert!(project.model.hide);
        assert_eq!(project.model.opacity, Some(0.5));
        assert_eq!(project.model.rotate, Xyz::new(0.0, 0.0, 90.0));
    }

    #[test]
    fn test_updates_drifted_properties() {
        let result = sync_source(DRIFTED, &opts()).unwrap();
        assert_eq!(
            result.outcome,
            SyncOutcome::Updated {
                properties: vec![ModelProperty::Offset, ModelProperty::Rotation]
            }
        );

        let output = result.output.unwrap();
        let expected = DRIFTED.replacen(
            "  (model \"${KIPRJMOD}/3d-models/R_0603.step\"\n    (offset (xyz 0 0 0))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 0))\n  )",
            "  (model \"${KIPRJMOD}/3d-models/R_0603.step\"\n    (offset (xyz 0 0 0.1))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 90))\n  )",
            1,
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_sync_is_idempotent() {
        for source in [THIRD_PARTY_ONLY, DRIFTED] {
            let first = sync_source(source, &opts()).unwrap().output.unwrap();
            let second = sync_source(&first, &opts()).unwrap();
            assert_eq!(second.outcome, SyncOutcome::InSync);
            assert!(second.output.is_none());
        }
    }

    #[test]
    fn test_no_models() {
        let result = sync_source("(footprint \"X\" (layer \"F.Cu\"))", &opts()).unwrap();
        assert_eq!(result.outcome, SyncOutcome::NoModels);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_project_only_is_left_alone() {
        let source = "(footprint \"X\" (model \"${KIPRJMOD}/a.step\"))";
        let result = sync_source(source, &opts()).unwrap();
        assert_eq!(result.outcome, SyncOutcome::NoThirdPartyModel);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_last_entry_in_scope_wins() {
        let source = "(footprint \"X\"\n  (model \"${KICAD_3RD_PARTY}/a.step\" (offset (xyz 1 1 1)))\n  (model \"${KICAD_3RD_PARTY}/b.step\" (offset (xyz 2 2 2)))\n)";
        let result = sync_source(source, &opts()).unwrap();
        assert_eq!(
            result.outcome,
            SyncOutcome::Added {
                path: "${KIPRJMOD}/3d-models/b.step".to_string()
            }
        );
        assert!(result.output.unwrap().contains("(offset (xyz 2 2 2))\n    (scale"));
    }

    #[test]
    fn test_unknown_children_survive_update() {
        let source = "(footprint \"X\"\n  (model \"${KICAD_3RD_PARTY}/a.step\" (scale (xyz 2 2 2)))\n  (model \"${KIPRJMOD}/a.step\" (vendor \"acme\"))\n)";
        let result = sync_source(source, &opts()).unwrap();
        assert_eq!(
            result.outcome,
            SyncOutcome::Updated {
                properties: vec![ModelProperty::Scale]
            }
        );
        assert!(result
            .output
            .unwrap()
            .contains("(rotate (xyz 0 0 0))\n    (vendor \"acme\")\n  )"));
    }

    #[test]
    fn test_kicad8_tabs_and_hide_list() {
        let source = "(footprint \"C\"\n\t(version 20240108)\n\t(model \"${KICAD_3RD_PARTY}/C.step\"\n\t\t(hide yes)\n\t\t(offset\n\t\t\t(xyz 0 0 0)\n\t\t)\n\t)\n)\n";
        let output = sync_source(source, &opts()).unwrap().output.unwrap();
        assert!(output.ends_with(
            "\t)\n\t(model \"${KIPRJMOD}/3d-models/C.step\"\n\t\t(hide yes)\n\t\t(offset (xyz 0 0 0))\n\t\t(scale (xyz 1 1 1))\n\t\t(rotate (xyz 0 0 0))\n\t)\n)\n"
        ));
    }

    #[test]
    fn test_legacy_inch_offset_matches_millimetres() {
        let source = "(module R_0603 (layer F.Cu)\n  (model ${KICAD_3RD_PARTY}/R_0603.wrl\n    (at (xyz 0.1 0 0))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 0))\n  )\n  (model ${KIPRJMOD}/3d-models/R_0603.wrl\n    (offset (xyz 2.54 0 0))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 0))\n  )\n)\n";
        let result = sync_source(source, &opts()).unwrap();
        assert_eq!(result.outcome, SyncOutcome::InSync);
        assert!(result.output.is_none());
    }

    #[test]
    fn test_legacy_module_gets_millimetre_offset() {
        let source = "(module R_0603 (layer F.Cu)\n  (model ${KICAD_3RD_PARTY}/R_0603.wrl\n    (at (xyz 0.1 0 0))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 0))\n  )\n)\n";
        let output = sync_source(source, &opts()).unwrap().output.unwrap();
        assert!(output.contains(
            "  (model \"${KIPRJMOD}/3d-models/R_0603.wrl\"\n    (offset (xyz 2.54 0 0))\n"
        ));
        assert!(output.contains("(at (xyz 0.1 0 0))"));
        assert_eq!(
            sync_source(&output, &opts()).unwrap().outcome,
            SyncOutcome::InSync
        );
    }

    #[test]
    fn test_legacy_project_entry_upgraded_to_offset() {
        let source = "(module R (layer F.Cu)\n  (model ${KICAD_3RD_PARTY}/R.wrl\n    (offset (xyz 1.27 0 0))\n  )\n  (model ${KIPRJMOD}/R.wrl\n    (at (xyz 0 0 0))\n  )\n)\n";
        let result = sync_source(source, &opts()).unwrap();
        assert_eq!(
            result.outcome,
            SyncOutcome::Updated {
                properties: vec![ModelProperty::Offset]
            }
        );
        let output = result.output.unwrap();
        assert!(output.contains("  (model \"${KIPRJMOD}/R.wrl\"\n    (offset (xyz 1.27 0 0))\n"));
        assert!(!output.contains("(at (xyz 0 0 0))"));
    }

    #[test]
    fn test_crlf_files_keep_crlf() {
        let source = "(footprint \"X\"\r\n  (model \"${KICAD_3RD_PARTY}/a.step\")\r\n)\r\n";
        let output = sync_source(source, &opts()).unwrap().output.unwrap();
        assert!(!output.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn test_custom_project_model_dir() {
        let options = SyncOptions {
            project_model_dir: "/libs/3d/".to_string(),
        };
        let model = Model::new("${KICAD_3RD_PARTY}/x/a.wrl");
        assert_eq!(
            project_path_for(&model, &options),
            "${KIPRJMOD}/libs/3d/a.wrl"
        );

        let flat = SyncOptions {
            project_model_dir: String::new(),
        };
        assert_eq!(project_path_for(&model, &flat), "${KIPRJMOD}/a.wrl");
    }

    #[test]
    fn test_changed_properties_order() {
        let source = Model::new("${KICAD_3RD_PARTY}/a.step");
        let mut project = Model::new("${KIPRJMOD}/a.step");
        project.opacity = Some(0.2);
        project.hide = true;
        project.scale = Xyz::new(2.0, 2.0, 2.0);
        assert_eq!(
            changed_properties(&project, &source),
            vec![
                ModelProperty::Scale,
                ModelProperty::Visibility,
                ModelProperty::Opacity
            ]
        );
    }

    #[test]
    fn test_outcome_describe() {
        let outcome = SyncOutcome::Updated {
            properties: vec![ModelProperty::Offset, ModelProperty::Opacity],
        };
        assert_eq!(outcome.describe(), "updated offset, opacity");
        assert!(outcome.modifies_file());
        assert!(!SyncOutcome::InSync.modifies_file());
    }

    #[test]
    fn test_outcome_serializes_with_kind_tag() {
        let json = serde_json::to_value(SyncOutcome::Added {
            path: "p".to_string(),
        })
        .unwrap();
        assert_eq!(json["kind"], "added");
        assert_eq!(json["path"], "p");
    }
}
