//! Diagnostic system for template errors and warnings.
//!
//! Every failure surfaced to a host — parse errors, evaluation errors, soft
//! warnings — is carried as a `Diagnostic`: an error code, a message, and
//! labeled source spans. The execution result envelope accumulates
//! diagnostics instead of only throwing, so callers decide whether to
//! surface partial results.

mod diagnostic;
mod emitter;
mod error_code;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use emitter::render;
pub use error_code::ErrorCode;
