//! Error types for kicad-sexpr

use thiserror::Error;

/// Errors produced while parsing or editing an s-expression document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SexprError {
    /// Source text is not a well-formed s-expression
    #[error("{message} at line {line}, column {column}")]
    Syntax {
        message: String,
        line: usize,
        column: usize,
    },

    /// Two edits touch the same bytes
    #[error("overlapping edits at {first_start}..{first_end} and {second_start}..{second_end}")]
    OverlappingEdits {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    /// Edit span does not fall on valid positions in the source
    #[error("edit span {start}..{end} is invalid for a source of {len} bytes")]
    InvalidSpan { start: usize, end: usize, len: usize },
}

/// Result type for s-expression operations
pub type Result<T> = std::result::Result<T, SexprError>;
