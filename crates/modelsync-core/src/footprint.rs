//! Footprint documents and their 3D-model entries.
//!
//! Three syntaxes are understood:
//!
//! - `(module ...)` files up to KiCad 5; the oldest write the model offset as
//!   `(at (xyz ...))` in inches,
//! - KiCad 6/7 `(footprint ...)` files with a bare `hide` token,
//! - KiCad 8+ files with `(hide yes)`.
//!
//! Offsets are always held in millimetres and always written as `offset`.

use kicad_sexpr::{format_number, parse_document, quote, Document, Node, Span};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SyncError};

/// Path placeholder for models stored next to the project.
pub const KIPRJMOD: &str = "${KIPRJMOD}";

/// Path placeholder for models shipped by a third-party library.
pub const KICAD_3RD_PARTY: &str = "${KICAD_3RD_PARTY}";

/// First footprint format version that writes `(hide yes)` instead of `hide`.
pub const HIDE_LIST_VERSION: u32 = 20240108;

/// Millimetres per inch, for legacy `(at (xyz ...))` offsets.
pub const MM_PER_INCH: f64 = 25.4;

/// A 3D vector as written in `(xyz x y z)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Xyz {
    pub const ZERO: Xyz = Xyz::new(0.0, 0.0, 0.0);
    pub const ONE: Xyz = Xyz::new(1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert an inch vector to millimetres, rounded to KiCad's 1 nm resolution.
    pub fn inches_to_mm(self) -> Self {
        let convert = |v: f64| (v * MM_PER_INCH * 1e6).round() / 1e6;
        Self::new(convert(self.x), convert(self.y), convert(self.z))
    }

    pub fn render(&self) -> String {
        format!(
            "(xyz {} {} {})",
            format_number(self.x),
            format_number(self.y),
            format_number(self.z)
        )
    }
}

/// Which placeholder a model path is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelScope {
    ThirdParty,
    Project,
    Other,
}

impl ModelScope {
    /// Classify a model path. The third-party placeholder wins when both appear.
    pub fn of(path: &str) -> Self {
        if path.contains(KICAD_3RD_PARTY) {
            ModelScope::ThirdParty
        } else if path.contains(KIPRJMOD) {
            ModelScope::Project
        } else {
            ModelScope::Other
        }
    }
}

/// Transform and display settings of one `(model ...)` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub path: String,
    pub offset: Xyz,
    pub scale: Xyz,
    pub rotate: Xyz,
    pub hide: bool,
    pub opacity: Option<f64>,
}

impl Model {
    /// A model at `path` with KiCad's default transform.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            offset: Xyz::ZERO,
            scale: Xyz::ONE,
            rotate: Xyz::ZERO,
            hide: false,
            opacity: None,
        }
    }

    pub fn scope(&self) -> ModelScope {
        ModelScope::of(&self.path)
    }

    /// Last path component, accepting both `/` and `\` separators.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(&self.path)
    }
}

/// How an entry spells "hidden".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HideStyle {
    /// Bare `hide` token after the path (KiCad 6/7).
    Flag,
    /// `(hide yes)` child (KiCad 8+).
    List,
}

impl HideStyle {
    pub fn for_version(version: Option<u32>) -> Self {
        match version {
            Some(v) if v >= HIDE_LIST_VERSION => HideStyle::List,
            _ => HideStyle::Flag,
        }
    }
}

/// A `(model ...)` entry together with where and how it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelEntry {
    pub model: Model,
    pub span: Span,
    /// Leading whitespace of the line the entry starts on.
    pub indent: String,
    pub hide_style: Option<HideStyle>,
    /// The offset was read from a legacy inch `(at ...)` child.
    pub legacy_offset: bool,
    /// Raw text of children this crate does not interpret.
    pub extras: Vec<String>,
}

/// Layout choices used when writing a model entry back out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLayout {
    pub indent: String,
    pub hide_style: HideStyle,
    pub newline: String,
}

impl EntryLayout {
    /// One indentation step, matching the file's use of tabs or spaces.
    fn unit(&self) -> &'static str {
        if self.indent.contains('\t') {
            "\t"
        } else {
            "  "
        }
    }

    /// Render `model` as a multi-line entry. The first line carries no indent.
    pub fn render(&self, model: &Model, extras: &[String]) -> String {
        let inner = format!("{}{}", self.indent, self.unit());
        let nl = &self.newline;

        let mut out = format!("(model {}", quote(&model.path));
        if model.hide && self.hide_style == HideStyle::Flag {
            out.push_str(" hide");
        }
        if model.hide && self.hide_style == HideStyle::List {
            out.push_str(&format!("{nl}{inner}(hide yes)"));
        }
        if let Some(opacity) = model.opacity {
            out.push_str(&format!("{nl}{inner}(opacity {})", format_number(opacity)));
        }
        out.push_str(&format!("{nl}{inner}(offset {})", model.offset.render()));
        out.push_str(&format!("{nl}{inner}(scale {})", model.scale.render()));
        out.push_str(&format!("{nl}{inner}(rotate {})", model.rotate.render()));
        for extra in extras {
            out.push_str(&format!("{nl}{inner}{extra}"));
        }
        out.push_str(&format!("{nl}{})", self.indent));
        out
    }
}

/// A parsed `.kicad_mod` file.
#[derive(Debug, Clone)]
pub struct Footprint {
    doc: Document,
    root: Node,
}

impl Footprint {
    /// Parse footprint source. The single root must be `footprint` or `module`.
    pub fn parse(source: &str) -> Result<Self> {
        let doc = parse_document(source)?;
        let root = match doc.root() {
            Some(root) if matches!(root.head(), Some("footprint") | Some("module")) => {
                root.clone()
            }
            Some(root) => {
                return Err(SyncError::NotAFootprint(format!(
                    "unexpected root element {:?}",
                    root.head().unwrap_or("<none>")
                )))
            }
            None => {
                return Err(SyncError::NotAFootprint(format!(
                    "expected one root element, found {}",
                    doc.nodes().len()
                )))
            }
        };
        Ok(Self { doc, root })
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn source(&self) -> &str {
        self.doc.source()
    }

    pub fn name(&self) -> Option<&str> {
        self.root.items().get(1).and_then(Node::text)
    }

    /// Value of `(version N)`; `module` files have none.
    pub fn version(&self) -> Option<u32> {
        self.root
            .child("version")
            .and_then(|v| v.items().get(1))
            .and_then(Node::as_atom)
            .and_then(|text| text.parse().ok())
    }

    /// Newline sequence used by the file.
    pub fn newline(&self) -> &'static str {
        if self.source().contains("\r\n") {
            "\r\n"
        } else {
            "\n"
        }
    }

    /// All direct `(model ...)` children in file order.
    pub fn models(&self) -> Result<Vec<ModelEntry>> {
        self.root
            .children("model")
            .map(|node| self.read_model(node))
            .collect()
    }

    fn read_model(&self, node: &Node) -> Result<ModelEntry> {
        let path = node
            .items()
            .get(1)
            .and_then(Node::text)
            .ok_or_else(|| SyncError::InvalidModel {
                path: String::new(),
                reason: "model has no path".to_string(),
            })?
            .to_string();

        let (legacy_offset, offset) = match node.child("offset") {
            Some(offset) => (false, read_xyz(&path, "offset", offset)?),
            None => match node.child("at") {
                Some(at) => (true, read_xyz(&path, "at", at)?.inches_to_mm()),
                None => (false, Xyz::ZERO),
            },
        };
        let scale = match node.child("scale") {
            Some(scale) => read_xyz(&path, "scale", scale)?,
            None => Xyz::ONE,
        };
        let rotate = match node.child("rotate") {
            Some(rotate) => read_xyz(&path, "rotate", rotate)?,
            None => Xyz::ZERO,
        };

        let (hide, hide_style) = match node.child("hide") {
            Some(hide) => (
                hide.items().get(1).and_then(Node::as_atom) == Some("yes"),
                Some(HideStyle::List),
            ),
            None if node.has_flag("hide") => (true, Some(HideStyle::Flag)),
            None => (false, None),
        };

        let opacity = match node.child("opacity") {
            Some(opacity) => Some(opacity.items().get(1).and_then(Node::number).ok_or_else(
                || SyncError::InvalidModel {
                    path: path.clone(),
                    reason: "opacity is not a number".to_string(),
                },
            )?),
            None => None,
        };

        let extras = node
            .items()
            .iter()
            .skip(2)
            .filter(|item| !is_known_child(item))
            .map(|item| self.doc.slice(item.span()).to_string())
            .collect();

        Ok(ModelEntry {
            model: Model {
                path,
                offset,
                scale,
                rotate,
                hide,
                opacity,
            },
            span: node.span(),
            indent: self.doc.indent_of(node.span()).to_string(),
            hide_style,
            legacy_offset,
            extras,
        })
    }
}

fn is_known_child(item: &Node) -> bool {
    if item.as_atom() == Some("hide") {
        return true;
    }
    matches!(
        item.head(),
        Some("offset" | "at" | "scale" | "rotate" | "hide" | "opacity")
    )
}

fn read_xyz(path: &str, keyword: &str, node: &Node) -> Result<Xyz> {
    let invalid = |reason: String| SyncError::InvalidModel {
        path: path.to_string(),
        reason,
    };
    let xyz = node
        .child("xyz")
        .ok_or_else(|| invalid(format!("{keyword} has no xyz")))?;
    let values: Vec<f64> = xyz.items().iter().skip(1).filter_map(Node::number).collect();
    match values.as_slice() {
        [x, y, z] if xyz.items().len() == 4 => Ok(Xyz::new(*x, *y, *z)),
        _ => Err(invalid(format!("{keyword} xyz must hold three numbers"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KICAD7: &str = r#"(footprint "R_0603" (version 20221018) (generator pcbnew)
  (layer "F.Cu")
  (model "${KICAD_3RD_PARTY}/3dmodels/R_0603.step" hide
    (opacity 0.5)
    (offset (xyz 0 0 0.1))
    (scale (xyz 1 1 1))
    (rotate (xyz 0 0 90))
  )
)
"#;

    const KICAD8: &str = "(footprint \"C_0402\"\n\t(version 20240108)\n\t(model \"${KIPRJMOD}/3d-models/C_0402.step\"\n\t\t(hide yes)\n\t\t(offset\n\t\t\t(xyz 0 0 0)\n\t\t)\n\t)\n)\n";

    const LEGACY: &str = "(module LED_3mm (layer F.Cu)\n  (model ${KISYS3DMOD}/LED_THT.3dshapes/LED_3mm.wrl\n    (at (xyz 0.1 0 -0.05))\n    (scale (xyz 1 1 1))\n    (rotate (xyz 0 0 0))\n  )\n)\n";

    #[test]
    fn test_read_kicad7_model() {
        let fp = Footprint::parse(KICAD7).unwrap();
        assert_eq!(fp.name(), Some("R_0603"));
        assert_eq!(fp.version(), Some(20221018));

        let models = fp.models().unwrap();
        assert_eq!(models.len(), 1);
        let entry = &models[0];
        assert_eq!(entry.model.scope(), ModelScope::ThirdParty);
        assert_eq!(entry.model.offset, Xyz::new(0.0, 0.0, 0.1));
        assert_eq!(entry.model.rotate, Xyz::new(0.0, 0.0, 90.0));
        assert!(entry.model.hide);
        assert_eq!(entry.hide_style, Some(HideStyle::Flag));
        assert_eq!(entry.model.opacity, Some(0.5));
        assert_eq!(entry.indent, "  ");
        assert!(!entry.legacy_offset);
        assert!(entry.extras.is_empty());
    }

    #[test]
    fn test_read_kicad8_model_defaults() {
        let fp = Footprint::parse(KICAD8).unwrap();
        let models = fp.models().unwrap();
        let entry = &models[0];
        assert_eq!(entry.model.scope(), ModelScope::Project);
        assert!(entry.model.hide);
        assert_eq!(entry.hide_style, Some(HideStyle::List));
        assert_eq!(entry.model.scale, Xyz::ONE);
        assert_eq!(entry.model.rotate, Xyz::ZERO);
        assert_eq!(entry.indent, "\t");
    }

    #[test]
    fn test_read_legacy_module_converts_inches() {
        let fp = Footprint::parse(LEGACY).unwrap();
        assert_eq!(fp.name(), Some("LED_3mm"));
        assert_eq!(fp.version(), None);
        let models = fp.models().unwrap();
        assert!(models[0].legacy_offset);
        assert_eq!(models[0].model.offset, Xyz::new(2.54, 0.0, -1.27));
        assert_eq!(models[0].model.scope(), ModelScope::Other);
        assert_eq!(models[0].model.file_name(), "LED_3mm.wrl");
    }

    #[test]
    fn test_unknown_children_are_kept_as_extras() {
        let source = "(footprint \"X\" (model \"a.step\" (offset (xyz 0 0 0)) (vendor \"acme\")))";
        let fp = Footprint::parse(source).unwrap();
        let models = fp.models().unwrap();
        assert_eq!(models[0].extras, vec!["(vendor \"acme\")".to_string()]);
    }

    #[test]
    fn test_rejects_non_footprint_root() {
        let err = Footprint::parse("(kicad_pcb (version 1))").unwrap_err();
        assert!(matches!(err, SyncError::NotAFootprint(_)));

        let err = Footprint::parse("(footprint a) (footprint b)").unwrap_err();
        assert!(matches!(err, SyncError::NotAFootprint(_)));
    }

    #[test]
    fn test_rejects_malformed_xyz() {
        let source = "(footprint \"X\" (model \"a.step\" (scale (xyz 1 1))))";
        let err = Footprint::parse(source).unwrap().models().unwrap_err();
        assert!(err.to_string().contains("scale xyz must hold three numbers"));
    }

    #[test]
    fn test_scope_prefers_third_party() {
        assert_eq!(
            ModelScope::of("${KICAD_3RD_PARTY}/x/${KIPRJMOD}.step"),
            ModelScope::ThirdParty
        );
        assert_eq!(ModelScope::of("${KIPRJMOD}/a.step"), ModelScope::Project);
        assert_eq!(ModelScope::of("/abs/a.step"), ModelScope::Other);
    }

    #[test]
    fn test_file_name_handles_backslashes() {
        assert_eq!(Model::new("C:\\models\\a.step").file_name(), "a.step");
        assert_eq!(Model::new("a.step").file_name(), "a.step");
    }

    #[test]
    fn test_render_kicad8_layout() {
        let layout = EntryLayout {
            indent: "\t".to_string(),
            hide_style: HideStyle::List,
            newline: "\n".to_string(),
        };
        let mut model = Model::new("${KIPRJMOD}/3d-models/a.step");
        model.hide = true;
        let out = layout.render(&model, &[]);
        assert_eq!(
            out,
            "(model \"${KIPRJMOD}/3d-models/a.step\"\n\t\t(hide yes)\n\t\t(offset (xyz 0 0 0))\n\t\t(scale (xyz 1 1 1))\n\t\t(rotate (xyz 0 0 0))\n\t)"
        );
    }

    #[test]
    fn test_hide_style_for_version() {
        assert_eq!(HideStyle::for_version(None), HideStyle::Flag);
        assert_eq!(HideStyle::for_version(Some(20221018)), HideStyle::Flag);
        assert_eq!(HideStyle::for_version(Some(20240108)), HideStyle::List);
    }
}
