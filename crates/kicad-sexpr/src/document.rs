//! Parsed document plus span-based editing.
//!
//! Edits never re-serialise the tree: they replace byte ranges of the
//! original source, so formatting outside the edited nodes survives as-is.

use crate::error::{Result, SexprError};
use crate::node::{Node, Span};

/// A replacement of `span` with `replacement`. An empty span inserts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub span: Span,
    pub replacement: String,
}

impl Edit {
    pub fn replace(span: Span, replacement: impl Into<String>) -> Self {
        Self {
            span,
            replacement: replacement.into(),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self {
            span: Span::at(offset),
            replacement: text.into(),
        }
    }
}

/// Source text together with its parsed top-level nodes.
#[derive(Debug, Clone)]
pub struct Document {
    source: String,
    nodes: Vec<Node>,
}

impl Document {
    pub(crate) fn new(source: String, nodes: Vec<Node>) -> Self {
        Self { source, nodes }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The only top-level node, if there is exactly one.
    pub fn root(&self) -> Option<&Node> {
        match self.nodes.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    /// Source text covered by `span`.
    pub fn slice(&self, span: Span) -> &str {
        &self.source[span.start..span.end]
    }

    /// Leading whitespace of the line `span` starts on.
    pub fn indent_of(&self, span: Span) -> &str {
        let line_start = self.source[..span.start]
            .rfind('\n')
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let line = &self.source[line_start..span.start];
        let width = line
            .find(|c: char| c != ' ' && c != '\t')
            .unwrap_or(line.len());
        &line[..width]
    }

    /// Apply non-overlapping edits and return the new source text.
    ///
    /// Insertions at the same offset keep the order they were given in.
    pub fn splice(&self, mut edits: Vec<Edit>) -> Result<String> {
        let len = self.source.len();
        for edit in &edits {
            let Span { start, end } = edit.span;
            if start > end
                || end > len
                || !self.source.is_char_boundary(start)
                || !self.source.is_char_boundary(end)
            {
                return Err(SexprError::InvalidSpan { start, end, len });
            }
        }

        edits.sort_by_key(|edit| (edit.span.start, edit.span.end));
        for pair in edits.windows(2) {
            let (first, second) = (&pair[0], &pair[1]);
            if first.span.end > second.span.start {
                return Err(SexprError::OverlappingEdits {
                    first_start: first.span.start,
                    first_end: first.span.end,
                    second_start: second.span.start,
                    second_end: second.span.end,
                });
            }
        }

        let added: usize = edits.iter().map(|edit| edit.replacement.len()).sum();
        let mut out = String::with_capacity(len + added);
        let mut cursor = 0;
        for edit in &edits {
            out.push_str(&self.source[cursor..edit.span.start]);
            out.push_str(&edit.replacement);
            cursor = edit.span.end;
        }
        out.push_str(&self.source[cursor..]);
        Ok(out)
    }
}
