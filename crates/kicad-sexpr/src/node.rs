//! Parsed s-expression nodes.

use crate::format::quote;

/// Byte range of a node in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Offset of the first byte.
    pub start: usize,

    /// Offset one past the last byte.
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Empty span at `offset`, used for insertions.
    pub fn at(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A node of a KiCad s-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// `( ... )`
    List { items: Vec<Node>, span: Span },

    /// Bare token: symbol, keyword or number.
    Atom { text: String, span: Span },

    /// Quoted string, unescaped.
    Str { value: String, span: Span },
}

impl Node {
    pub fn span(&self) -> Span {
        match self {
            Node::List { span, .. } | Node::Atom { span, .. } | Node::Str { span, .. } => *span,
        }
    }

    /// Items of a list; empty for atoms and strings.
    pub fn items(&self) -> &[Node] {
        match self {
            Node::List { items, .. } => items,
            _ => &[],
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Node::List { .. })
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Node::Atom { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Atom text or string value.
    pub fn text(&self) -> Option<&str> {
        match self {
            Node::Atom { text, .. } => Some(text),
            Node::Str { value, .. } => Some(value),
            Node::List { .. } => None,
        }
    }

    /// Finite number held by an atom.
    pub fn number(&self) -> Option<f64> {
        self.as_atom()
            .and_then(|text| text.parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }

    /// Leading keyword of a list, e.g. `model` for `(model "x.step" ...)`.
    pub fn head(&self) -> Option<&str> {
        self.items().first().and_then(Node::as_atom)
    }

    /// Direct list children whose head is `name`.
    pub fn children<'a, 'n: 'a>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Node> + 'a {
        self.items()
            .iter()
            .filter(move |item| item.is_list() && item.head() == Some(name))
    }

    /// First direct list child whose head is `name`.
    pub fn child<'a>(&'a self, name: &str) -> Option<&'a Node> {
        self.items()
            .iter()
            .find(|item| item.is_list() && item.head() == Some(name))
    }

    /// Whether a bare atom `name` appears after the head.
    pub fn has_flag(&self, name: &str) -> bool {
        self.items()
            .iter()
            .skip(1)
            .any(|item| item.as_atom() == Some(name))
    }

    /// Single-line rendering with one space between items.
    pub fn to_compact(&self) -> String {
        match self {
            Node::Atom { text, .. } => text.clone(),
            Node::Str { value, .. } => quote(value),
            Node::List { items, .. } => {
                let inner: Vec<String> = items.iter().map(Node::to_compact).collect();
                format!("({})", inner.join(" "))
            }
        }
    }
}
