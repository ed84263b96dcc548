//! Core IR types for the Quill template interpreter.
//!
//! Leaf crate of the workspace: spans, the string interner, expression and
//! template ASTs, and the token kinds produced by `quill_lexer`. Everything
//! above (parser, evaluator) speaks in these types.

mod ast;
mod expr;
mod interner;
mod span;
mod token;

pub use ast::{Attr, AttrValue, Document, Node, NodeKind, Segment};
pub use expr::{Arg, BinaryOp, Expr, ExprArena, ExprId, ExprKind, UnaryOp};
pub use interner::{Name, SharedInterner, StringInterner};
pub use span::Span;
pub use token::{Token, TokenKind, TokenList};
