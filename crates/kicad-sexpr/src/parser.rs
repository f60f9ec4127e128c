//! nom-based parser producing span-annotated nodes.
//!
//! Grammar accepted:
//!
//! ```text
//! document := ws node* ws
//! node     := list | string | atom
//! list     := "(" ws (node ws)* ")"
//! string   := '"' (escape | [^"\\])* '"'
//! atom     := [^ whitespace ( ) "]+
//! ```

use nom::{
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{char, multispace0},
    combinator::{all_consuming, cut},
    error::{context, ContextError, ErrorKind, ParseError, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::terminated,
    IResult,
};

use crate::document::Document;
use crate::error::{Result, SexprError};
use crate::node::{Node, Span};

// ============================================================================
// Public API
// ============================================================================

/// Parse a complete s-expression document.
///
/// Accepts zero or more top-level nodes separated by whitespace. A KiCad
/// footprint file holds exactly one.
pub fn parse_document(source: &str) -> Result<Document> {
    match all_consuming(|i| document::<VerboseError<&str>>(i, source))(source) {
        Ok((_, nodes)) => Ok(Document::new(source.to_string(), nodes)),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(describe(source, e)),
        Err(nom::Err::Incomplete(_)) => Err(SexprError::Syntax {
            message: "incomplete input".to_string(),
            line: 1,
            column: 1,
        }),
    }
}

// ============================================================================
// Internal Parsers
// ============================================================================

fn document<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    original: &'a str,
) -> IResult<&'a str, Vec<Node>, E> {
    let (input, _) = multispace0(input)?;
    many0(terminated(|i| node(i, original), multispace0))(input)
}

fn node<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    original: &'a str,
) -> IResult<&'a str, Node, E> {
    alt((
        |i| list(i, original),
        |i| string(i, original),
        |i| atom(i, original),
    ))(input)
}

fn list<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    original: &'a str,
) -> IResult<&'a str, Node, E> {
    let start = offset(original, input);

    let (input, _) = char('(')(input)?;
    let (input, _) = multispace0(input)?;
    let (input, items) = many0(terminated(|i| node(i, original), multispace0))(input)?;
    let (input, _) = cut(context("missing closing parenthesis", char(')')))(input)?;

    let end = offset(original, input);
    Ok((
        input,
        Node::List {
            items,
            span: Span::new(start, end),
        },
    ))
}

fn string<'a, E: ParseError<&'a str> + ContextError<&'a str>>(
    input: &'a str,
    original: &'a str,
) -> IResult<&'a str, Node, E> {
    let start = offset(original, input);
    let (body, _) = char('"')(input)?;

    let mut value = String::new();
    let mut chars = body.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => {
                let rest = &body[idx + 1..];
                let end = offset(original, rest);
                return Ok((
                    rest,
                    Node::Str {
                        value,
                        span: Span::new(start, end),
                    },
                ));
            }
            '\\' => match chars.next() {
                Some((_, escaped)) => value.push(unescape(escaped)),
                None => break,
            },
            other => value.push(other),
        }
    }

    Err(nom::Err::Failure(E::add_context(
        input,
        "unterminated string",
        E::from_error_kind(input, ErrorKind::Char),
    )))
}

fn atom<'a, E: ParseError<&'a str>>(
    input: &'a str,
    original: &'a str,
) -> IResult<&'a str, Node, E> {
    let start = offset(original, input);
    let (rest, text) = take_while1(is_atom_char)(input)?;
    Ok((
        rest,
        Node::Atom {
            text: text.to_string(),
            span: Span::new(start, offset(original, rest)),
        },
    ))
}

// ============================================================================
// Helpers
// ============================================================================

fn is_atom_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"')
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

fn offset(original: &str, remaining: &str) -> usize {
    original.len() - remaining.len()
}

/// Turn a nom error into a positioned message, preferring the innermost context.
fn describe(source: &str, err: VerboseError<&str>) -> SexprError {
    let contextual = err.errors.iter().find_map(|(at, kind)| match kind {
        VerboseErrorKind::Context(ctx) => Some((*at, (*ctx).to_string())),
        _ => None,
    });

    let (at, message) = contextual
        .or_else(|| {
            err.errors.first().map(|(at, kind)| {
                let message = match kind {
                    VerboseErrorKind::Char(c) => format!("expected '{c}'"),
                    VerboseErrorKind::Nom(ErrorKind::Eof) => "unexpected trailing input".to_string(),
                    VerboseErrorKind::Nom(kind) => format!("unexpected input ({kind:?})"),
                    VerboseErrorKind::Context(ctx) => (*ctx).to_string(),
                };
                (*at, message)
            })
        })
        .unwrap_or((source, "invalid input".to_string()));

    let (line, column) = line_column(source, offset(source, at));
    SexprError::Syntax {
        message,
        line,
        column,
    }
}

fn line_column(source: &str, byte_offset: usize) -> (usize, usize) {
    let before = &source[..byte_offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() + 1,
        None => before.chars().count() + 1,
    };
    (line, column)
}
