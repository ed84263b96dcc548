//! Parse error types.
//!
//! Parsing is all-or-nothing: any `ParseError` aborts before execution.
//! The error converts losslessly into a `Diagnostic` for the host.

use quill_diagnostic::{Diagnostic, ErrorCode};
use quill_ir::Span;
use thiserror::Error;

/// A fatal parse error with its source position.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub code: ErrorCode,
    pub message: String,
    pub span: Span,
}

impl ParseError {
    pub fn new(code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        ParseError {
            code,
            message: message.into(),
            span,
        }
    }

    /// Convert to a diagnostic with a primary label at the error position.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::error(self.code, self.message.clone()).with_label(self.span, "here")
    }
}

pub(crate) fn unexpected_token(found: impl std::fmt::Display, span: Span) -> ParseError {
    ParseError::new(
        ErrorCode::UnexpectedToken,
        format!("unexpected {found}"),
        span,
    )
}

pub(crate) fn unclosed_tag(name: &str, span: Span) -> ParseError {
    ParseError::new(
        ErrorCode::UnclosedTag,
        format!("`<{name}>` is never closed"),
        span,
    )
}

pub(crate) fn mismatched_tag(expected: &str, found: &str, span: Span) -> ParseError {
    ParseError::new(
        ErrorCode::MismatchedTag,
        format!("expected `</{expected}>`, found `</{found}>`"),
        span,
    )
}

pub(crate) fn unterminated_expr(span: Span) -> ParseError {
    ParseError::new(
        ErrorCode::UnterminatedExpr,
        "expression span is never closed by `}`",
        span,
    )
}

pub(crate) fn malformed_attribute(message: impl Into<String>, span: Span) -> ParseError {
    ParseError::new(ErrorCode::MalformedAttribute, message, span)
}

pub(crate) fn unknown_tag(name: &str, span: Span) -> ParseError {
    ParseError::new(
        ErrorCode::UnknownTag,
        format!("unknown tag `<{name}>` (strict mode)"),
        span,
    )
}
