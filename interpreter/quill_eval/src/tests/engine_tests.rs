use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::adapter::MemoryRecordSet;
use crate::scope::{ScopeKind, ScopeSeed};
use crate::{Engine, OutputNode, Value};

use super::{render, run, run_with};

#[test]
fn dual_plus_in_templates() {
    assert_eq!(render("{1 + 2}|{\'a\' + 1}|{\'3\' + \'4\'}"), "3|a1|7");
}

#[test]
fn ternary_and_precedence() {
    assert_eq!(render("{1 + 2 * 3 == 7 ? \'yes\' : \'no\'}"), "yes");
    assert_eq!(render("{(1 + 2) * 3}"), "9");
}

#[test]
fn short_circuit_guards_the_right_operand() {
    assert_eq!(render("{false && 1 / 0 > 0}"), "false");
    assert_eq!(render("{true || 1 / 0 > 0}"), "true");
}

#[test]
fn field_and_index_access() {
    let template = concat!(
        "<q:set name=\"o\" operation=\"setProperty\" key=\"xs\" value=\"{[5, 6]}\" />",
        "{o.xs[1]}|{o.missing}|{o[\'xs\'][0]}",
    );
    assert_eq!(render(template), "6||5");
}

#[test]
fn null_renders_empty_and_is_falsy() {
    assert_eq!(
        render("{null}<q:if condition=\"{null}\">t</q:if><q:else>f</q:else>"),
        "f"
    );
}

#[test]
fn query_loop_binds_columns_rows_and_index() {
    let mut engine = Engine::new();
    engine.register_record_set(
        "users",
        Arc::new(MemoryRecordSet::new(
            vec!["name".to_string(), "age".to_string()],
            vec![
                vec![Value::string("ada"), Value::Number(36.0)],
                vec![Value::string("alan"), Value::Number(41.0)],
            ],
        )),
    );
    let template = concat!(
        "<q:loop query=\"users\" item=\"row\" index=\"i\">",
        "{i}:{name}/{age}:{row.name};",
        "</q:loop>",
    );
    let result = run_with(template, &engine, ScopeSeed::fresh());
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    assert_eq!(result.rendered(), "0:ada/36:ada;1:alan/41:alan;");
}

#[test]
fn host_adapters_feed_queries_and_seeded_scopes() {
    use crate::adapter::{
        ExternalError, HttpInvoker, HttpRequest, HttpResponse, QueryExecutor, RecordSet,
    };

    struct FixtureSource;

    impl QueryExecutor for FixtureSource {
        fn run(
            &self,
            statement: &str,
            params: &[Value],
        ) -> Result<Box<dyn RecordSet>, ExternalError> {
            if statement != "select name" || params.len() != 1 {
                return Err(ExternalError::new("unexpected statement"));
            }
            Ok(Box::new(MemoryRecordSet::new(
                vec!["name".to_string()],
                vec![vec![params[0].clone()]],
            )))
        }
    }

    struct CannedHttp;

    impl HttpInvoker for CannedHttp {
        fn call(&self, request: HttpRequest) -> Result<HttpResponse, ExternalError> {
            Ok(HttpResponse {
                status: 200,
                headers: Vec::new(),
                body: Value::string(format!("{} {}", request.method, request.url)),
            })
        }
    }

    // The host runs the collaborators, then hands the results to the engine:
    // record sets by name, everything else through seeded scopes.
    let records = FixtureSource
        .run("select name", &[Value::string("ada")])
        .unwrap();
    let mut engine = Engine::new();
    engine.register_record_set("users", Arc::from(records));

    let response = CannedHttp
        .call(HttpRequest {
            method: "GET".to_string(),
            url: "/status".to_string(),
            headers: Vec::new(),
            body: None,
        })
        .unwrap();
    let seed = ScopeSeed::fresh();
    seed.seed(engine.interner(), "request.upstream", response.body);

    let template = "<q:loop query=\"users\" item=\"r\">{r.name}</q:loop>|{request.upstream}";
    let result = run_with(template, &engine, seed);
    assert!(!result.has_errors(), "{:?}", result.diagnostics);
    assert_eq!(result.rendered(), "ada|GET /status");
}

#[test]
fn unregistered_query_is_an_external_failure() {
    let result = run("<q:loop query=\"nope\" item=\"r\">x</q:loop>");
    assert!(result.has_errors());
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("no record set registered")));
}

#[test]
fn output_tree_keeps_element_structure() {
    let result = run("before<section id=\"s\">inner</section>after");
    assert!(!result.has_errors());
    assert_eq!(
        result.output,
        vec![
            OutputNode::Text("before".to_string()),
            OutputNode::Element {
                name: "section".to_string(),
                attrs: vec![("id".to_string(), "s".to_string())],
                children: vec![OutputNode::Text("inner".to_string())],
            },
            OutputNode::Text("after".to_string()),
        ]
    );
}

#[test]
fn return_at_top_level_is_misplaced() {
    let result = run("<q:return value=\"{1}\" />");
    assert!(result.has_errors());
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("outside a function")));
}

#[test]
fn final_scope_state_is_inspectable() {
    let result = run(concat!(
        "<q:set name=\"x\" value=\"{1}\" />",
        "<q:set name=\"session.y\" value=\"{2}\" />",
    ));
    let locals = result.scopes.snapshot(ScopeKind::Local);
    let session = result.scopes.snapshot(ScopeKind::Session);
    assert_eq!(
        locals,
        Value::object([("x".to_string(), Value::Number(1.0))].into())
    );
    assert_eq!(
        session,
        Value::object([("y".to_string(), Value::Number(2.0))].into())
    );
}

#[test]
fn diagnostics_render_against_source() {
    let source = "{1 / 0}";
    let result = run(source);
    assert!(result.has_errors());
    let diag = result
        .diagnostics
        .iter()
        .find(|d| d.is_error())
        .expect("an error diagnostic");
    let rendered = quill_diagnostic::render(diag, source, "inline.qml");
    assert!(rendered.contains("division by zero"));
}

#[test]
fn number_formatting_drops_integral_fractions() {
    assert_eq!(render("{10 / 4}|{10 / 5}"), "2.5|2");
}
