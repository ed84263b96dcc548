//! Parser for Quill templates.
//!
//! Turns template text into a `Document` (tag tree) plus an `ExprArena`
//! holding every parsed `{...}` expression. Parsing is all-or-nothing: a
//! `ParseError` means nothing executes. Non-fatal observations (unknown
//! pass-through tags) come back as warning diagnostics.
//!
//! ```
//! use quill_ir::StringInterner;
//! use quill_parse::{parse, ParseOptions};
//!
//! let interner = StringInterner::new();
//! let result = parse(
//!     "<q:if condition=\"{count > 0}\">yes</q:if>",
//!     &interner,
//!     ParseOptions::default(),
//! )
//! .unwrap();
//! assert_eq!(result.document.roots.len(), 1);
//! ```

mod cursor;
mod error;
mod grammar;
mod stack;
mod template;

#[cfg(test)]
mod tests;

pub use error::ParseError;
pub use grammar::parse_expression;

use quill_diagnostic::Diagnostic;
use quill_ir::{Document, ExprArena, StringInterner};

/// Parser configuration.
#[derive(Copy, Clone, Debug, Default)]
pub struct ParseOptions {
    /// Reject unknown `q:` tags instead of passing them through.
    pub strict_tags: bool,
}

/// A successfully parsed template.
#[derive(Clone, Debug)]
pub struct ParseResult {
    pub document: Document,
    pub arena: ExprArena,
    /// Non-fatal observations (warnings); fatal errors are `ParseError`.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse template text.
pub fn parse(
    text: &str,
    interner: &StringInterner,
    options: ParseOptions,
) -> Result<ParseResult, ParseError> {
    template::parse(text, interner, options)
}
