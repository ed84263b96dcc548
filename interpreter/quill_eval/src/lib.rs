//! Quill Eval - scoped execution engine for parsed templates.
//!
//! The evaluator walks a [`quill_ir::Document`] and produces an output
//! tree plus diagnostics. The moving parts:
//!
//! - `Value`: the closed runtime value union and its coercion rules
//! - `ScopeChain`: Local/Component frames plus shared
//!   Request/Session/Application frames
//! - `FunctionRegistry`: harvested `<q:function>` definitions, builtins,
//!   memo caches
//! - `Executor`: the tree walker (`exec::expr`, `exec::control`,
//!   `exec::call`)
//! - `Engine`: the host-facing entry point
//!
//! # Example
//!
//! ```
//! use quill_eval::{Engine, ScopeSeed};
//!
//! let engine = Engine::new();
//! let parsed = quill_parse::parse(
//!     "<q:set name=\"greeting\" value=\"hello\" />{greeting} world",
//!     engine.interner(),
//!     quill_parse::ParseOptions::default(),
//! )
//! .unwrap();
//! let result = engine.execute(&parsed.document, &parsed.arena, ScopeSeed::fresh());
//! assert_eq!(result.rendered(), "hello world");
//! ```

pub mod adapter;
mod builtins;
mod engine;
pub mod errors;
pub mod exec;
mod functions;
mod names;
mod operators;
mod output;
mod scope;
mod stack;
mod value;

#[cfg(test)]
mod tests;

pub use engine::{Engine, EngineConfig, ExecutionResult};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use functions::{
    FunctionDef, FunctionModifiers, FunctionRegistry, Param, ParamType, ValidationRules,
};
pub use output::{render_to_string, OutputNode};
pub use scope::{
    shared_frame, Frame, ScopeChain, ScopeKind, ScopeSeed, SetOperation, SharedFrame,
};
pub use value::{format_number, Value};
