//! The execution engine.
//!
//! One `Engine` is long-lived and shared by a host; each `execute` call is
//! synchronous and single-threaded. Concurrency happens outside: hosts run
//! many executions at once against shared Request/Session/Application
//! frames and shared memo caches.

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use quill_diagnostic::Diagnostic;
use quill_ir::{Document, ExprArena, Name, SharedInterner, Span, StringInterner};

use crate::adapter::RecordSet;
use crate::errors::misplaced_control;
use crate::exec::{Executor, Flow};
use crate::functions::{self, FunctionDef, FunctionRegistry};
use crate::names::AttrNames;
use crate::output::{render_to_string, OutputNode};
use crate::scope::{ScopeChain, ScopeSeed};

/// Execution policy knobs.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Undefined identifiers become hard reference errors instead of
    /// `Null` plus a warning.
    pub strict_vars: bool,
    /// Runtime and type errors become inline `[error: ...]` text plus a
    /// diagnostic instead of aborting. Validation errors abort regardless.
    pub lenient_errors: bool,
    /// Call depth ceiling; exceeding it is a runtime error.
    pub max_call_depth: usize,
    /// Delimiter for the list loop form when the tag names none.
    pub list_delimiter_default: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            strict_vars: false,
            lenient_errors: false,
            max_call_depth: 64,
            list_delimiter_default: ",".to_string(),
        }
    }
}

/// Everything one execution produced.
pub struct ExecutionResult {
    pub output: Vec<OutputNode>,
    pub diagnostics: Vec<Diagnostic>,
    /// Final scope state, for host inspection.
    pub scopes: ScopeChain,
}

impl ExecutionResult {
    /// The output tree flattened to one string.
    pub fn rendered(&self) -> String {
        render_to_string(&self.output)
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Template execution engine.
///
/// Owns the interner (parse with [`Engine::interner`] so interned names
/// line up), the function registry that memo caches live in, and the
/// record sets the query loop form can reach.
pub struct Engine {
    interner: SharedInterner,
    config: EngineConfig,
    registry: Mutex<FunctionRegistry>,
    record_sets: FxHashMap<Name, Arc<dyn RecordSet>>,
}

impl Engine {
    pub fn new() -> Self {
        Engine::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Engine {
            interner: Arc::new(StringInterner::new()),
            config,
            registry: Mutex::new(FunctionRegistry::new()),
            record_sets: FxHashMap::default(),
        }
    }

    /// The interner templates for this engine must be parsed with.
    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Make tabular host data reachable from `<q:loop query="name">`.
    pub fn register_record_set(&mut self, name: &str, records: Arc<dyn RecordSet>) {
        self.record_sets.insert(self.interner.intern(name), records);
    }

    /// Look up a harvested definition, e.g. to inspect its declared
    /// modifiers or clear its memo cache.
    pub fn function(&self, name: &str) -> Option<Arc<FunctionDef>> {
        self.registry.lock().get(self.interner.intern(name))
    }

    /// Run one parsed template against host-seeded shared frames.
    ///
    /// Never panics and never returns `Err`: failures come back as error
    /// diagnostics alongside whatever output was produced before the
    /// abort.
    pub fn execute(&self, document: &Document, arena: &ExprArena, seed: ScopeSeed) -> ExecutionResult {
        let attr_names = AttrNames::new(&self.interner);
        let (registry, mut diagnostics) = {
            let mut guard = self.registry.lock();
            let diagnostics =
                functions::harvest(document, &attr_names, &self.interner, &mut guard);
            (guard.clone(), diagnostics)
        };
        tracing::debug!(functions = registry.len(), "definitions harvested");

        let scopes = ScopeChain::new(seed, self.interner.clone());
        let mut executor = Executor::new(
            arena,
            scopes,
            Arc::new(registry),
            &self.config,
            &self.record_sets,
        );

        match executor.exec_nodes(&document.roots) {
            Ok(Flow::Normal) => {}
            Ok(Flow::Break | Flow::Continue) => {
                diagnostics.push(
                    misplaced_control("`q:break`/`q:continue` outside a loop", Span::DUMMY)
                        .to_diagnostic(),
                );
            }
            Ok(Flow::Return(_)) => {
                diagnostics.push(
                    misplaced_control("`q:return` outside a function", Span::DUMMY)
                        .to_diagnostic(),
                );
            }
            Err(err) => {
                tracing::debug!(error = %err, "execution aborted");
                diagnostics.push(err.to_diagnostic());
            }
        }

        diagnostics.extend(executor.diagnostics);
        ExecutionResult {
            output: executor.output.into_nodes(),
            diagnostics,
            scopes: executor.scopes,
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}
