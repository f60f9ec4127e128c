//! kicad-sexpr: lossless KiCad s-expression handling
//!
//! KiCad stores footprints, symbols and boards as s-expressions. This crate
//! parses them into span-annotated nodes and edits them by splicing byte
//! ranges, so a rewrite touches only the nodes it means to change.
//!
//! ```
//! use kicad_sexpr::{parse_document, Edit};
//!
//! let doc = parse_document("(model \"a.step\" (scale (xyz 1 1 1)))").unwrap();
//! let xyz = doc.root().unwrap().child("scale").unwrap().child("xyz").unwrap();
//! let out = doc.splice(vec![Edit::replace(xyz.span(), "(xyz 2 2 2)")]).unwrap();
//! assert_eq!(out, "(model \"a.step\" (scale (xyz 2 2 2)))");
//! ```

pub mod document;
pub mod error;
pub mod format;
pub mod node;
pub mod parser;

pub use document::{Document, Edit};
pub use error::{Result, SexprError};
pub use format::{format_number, quote};
pub use node::{Node, Span};
pub use parser::parse_document;
