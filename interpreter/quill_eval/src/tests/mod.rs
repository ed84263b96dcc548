//! Evaluator integration tests: real templates through parse + execute.

mod control_tests;
mod engine_tests;

use quill_parse::ParseOptions;

use crate::scope::ScopeSeed;
use crate::{Engine, ExecutionResult};

/// Parse and execute against a fresh engine and empty shared frames.
fn run(template: &str) -> ExecutionResult {
    run_with(template, &Engine::new(), ScopeSeed::fresh())
}

fn run_with(template: &str, engine: &Engine, seed: ScopeSeed) -> ExecutionResult {
    let parsed = quill_parse::parse(template, engine.interner(), ParseOptions::default())
        .expect("template parses");
    engine.execute(&parsed.document, &parsed.arena, seed)
}

/// Execute and assert a clean run.
fn render(template: &str) -> String {
    let result = run(template);
    assert!(
        !result.has_errors(),
        "unexpected errors: {:?}",
        result.diagnostics
    );
    result.rendered()
}
