use pretty_assertions::assert_eq;

use crate::scope::ScopeSeed;
use crate::{Engine, EngineConfig};

use super::{render, run, run_with};

#[test]
fn first_truthy_branch_wins() {
    let template = concat!(
        "<q:set name=\"n\" value=\"{5}\" />",
        "<q:if condition=\"{n > 10}\">big</q:if>",
        "<q:elseif condition=\"{n > 3}\">medium</q:elseif>",
        "<q:else>small</q:else>",
    );
    assert_eq!(render(template), "medium");
}

#[test]
fn later_conditions_are_never_evaluated() {
    // The second condition would divide by zero; taking the first branch
    // must never touch it.
    let template = concat!(
        "<q:if condition=\"{true}\">ok</q:if>",
        "<q:elseif condition=\"{1 / 0}\">boom</q:elseif>",
    );
    assert_eq!(render(template), "ok");
}

#[test]
fn else_branch_runs_when_nothing_matched() {
    let template = concat!(
        "<q:if condition=\"{false}\">a</q:if>",
        "<q:elseif condition=\"{false}\">b</q:elseif>",
        "<q:else>c</q:else>",
    );
    assert_eq!(render(template), "c");
}

#[test]
fn whitespace_between_branches_is_chain_syntax() {
    let template = "<q:if condition=\"{false}\">a</q:if>\n  <q:else>b</q:else>";
    assert_eq!(render(template), "b");
}

#[test]
fn dangling_else_is_an_error() {
    let result = run("<q:else>orphan</q:else>");
    assert!(result.has_errors());
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("without a preceding")));
}

#[test]
fn range_loop_inclusive_bounds() {
    assert_eq!(
        render("<q:loop from=\"1\" to=\"4\" index=\"i\">{i},</q:loop>"),
        "1,2,3,4,"
    );
}

#[test]
fn range_loop_steps_down() {
    assert_eq!(
        render("<q:loop from=\"3\" to=\"1\" step=\"-1\" index=\"i\">{i}</q:loop>"),
        "321"
    );
}

#[test]
fn range_loop_fractional_step_reaches_inclusive_bound() {
    // 0.1 accumulated ten times lands just under 1; the bound must still
    // be visited exactly once.
    let template = concat!(
        "<q:loop from=\"0\" to=\"1\" step=\"0.1\" index=\"i\">",
        "<q:set name=\"request.count\" operation=\"increment\" />",
        "<q:set name=\"request.last\" value=\"{i}\" />",
        "</q:loop>",
        "{request.count}|{request.last}",
    );
    assert_eq!(render(template), "11|1");
}

#[test]
fn range_loop_direction_mismatch_runs_zero_times() {
    assert_eq!(
        render("<q:loop from=\"5\" to=\"1\" index=\"i\">{i}</q:loop>never:{5}"),
        "never:5"
    );
}

#[test]
fn zero_step_is_a_runtime_error() {
    let result = run("<q:loop from=\"1\" to=\"3\" step=\"0\" index=\"i\">x</q:loop>");
    assert!(result.has_errors());
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("step must not be zero")));
}

#[test]
fn array_loop_binds_item_and_zero_based_index() {
    let template = concat!(
        "<q:set name=\"xs\" value=\"{[10, 20, 30]}\" />",
        "<q:loop array=\"{xs}\" item=\"x\" index=\"i\">{i}:{x} </q:loop>",
    );
    assert_eq!(render(template), "0:10 1:20 2:30 ");
}

#[test]
fn list_loop_trims_items() {
    assert_eq!(
        render("<q:loop list=\"a, b ,c\" item=\"x\">[{x}]</q:loop>"),
        "[a][b][c]"
    );
}

#[test]
fn list_loop_honors_delimiter() {
    assert_eq!(
        render("<q:loop list=\"a|b|c\" delimiter=\"|\" item=\"x\">{x}</q:loop>"),
        "abc"
    );
}

#[test]
fn object_loop_iterates_in_key_order() {
    let template = concat!(
        "<q:set name=\"o\" operation=\"setProperty\" key=\"b\" value=\"2\" />",
        "<q:set name=\"o\" operation=\"setProperty\" key=\"a\" value=\"1\" />",
        "<q:loop object=\"{o}\" key=\"k\" value=\"v\">{k}={v};</q:loop>",
    );
    assert_eq!(render(template), "a=1;b=2;");
}

#[test]
fn break_stops_the_nearest_loop() {
    let template = concat!(
        "<q:loop from=\"1\" to=\"9\" index=\"i\">",
        "<q:if condition=\"{i > 3}\"><q:break /></q:if>",
        "{i}",
        "</q:loop>",
    );
    assert_eq!(render(template), "123");
}

#[test]
fn continue_skips_to_the_next_iteration() {
    let template = concat!(
        "<q:loop from=\"1\" to=\"5\" index=\"i\">",
        "<q:if condition=\"{i == 3}\"><q:continue /></q:if>",
        "{i}",
        "</q:loop>",
    );
    assert_eq!(render(template), "1245");
}

#[test]
fn break_outside_a_loop_is_misplaced() {
    let result = run("<q:break />");
    assert!(result.has_errors());
    assert!(result
        .diagnostics
        .iter()
        .any(|d| d.message.contains("outside a loop")));
}

#[test]
fn nested_loops_break_innermost_only() {
    let template = concat!(
        "<q:loop from=\"1\" to=\"2\" index=\"i\">",
        "<q:loop from=\"1\" to=\"9\" index=\"j\">",
        "<q:if condition=\"{j == 2}\"><q:break /></q:if>",
        "{i}{j},",
        "</q:loop>",
        "</q:loop>",
    );
    assert_eq!(render(template), "11,21,");
}

#[test]
fn top_level_param_defines_only_when_missing() {
    let template = concat!(
        "<q:param name=\"page\" default=\"home\" />",
        "<q:set name=\"size\" value=\"5\" />",
        "<q:param name=\"size\" default=\"10\" />",
        "{page}/{size}",
    );
    assert_eq!(render(template), "home/5");
}

#[test]
fn required_param_without_binding_aborts() {
    let result = run("<q:param name=\"user\" required=\"true\" />ok");
    assert!(result.has_errors());
}

#[test]
fn lenient_mode_inlines_the_failure_and_continues() {
    let engine = Engine::with_config(EngineConfig {
        lenient_errors: true,
        ..EngineConfig::default()
    });
    let result = run_with("a<q:set name=\"x\" value=\"{1 / 0}\" />b", &engine, ScopeSeed::fresh());
    assert_eq!(result.rendered(), "a[error: division by zero]b");
    assert!(result.has_errors());
}

#[test]
fn strict_mode_stops_at_the_failure() {
    let result = run("a<q:set name=\"x\" value=\"{1 / 0}\" />b");
    assert_eq!(result.rendered(), "a");
    assert!(result.has_errors());
}

#[test]
fn strict_vars_rejects_undefined_identifiers() {
    let engine = Engine::with_config(EngineConfig {
        strict_vars: true,
        ..EngineConfig::default()
    });
    let result = run_with("{ghost}", &engine, ScopeSeed::fresh());
    assert!(result.has_errors());
}

#[test]
fn opaque_tags_pass_through_with_evaluated_attrs() {
    let template = concat!(
        "<q:set name=\"cls\" value=\"row\" />",
        "<div class=\"{cls}\"><q:output>{1 + 1}</q:output></div>",
    );
    assert_eq!(render(template), "<div class=\"row\">2</div>");
}

#[test]
fn literal_brace_escapes_render() {
    assert_eq!(render("{{not an expr}}"), "{not an expr}");
}

#[test]
fn truthiness_of_zero_string_is_true() {
    assert_eq!(
        render("<q:if condition=\"{\'0\'}\">t</q:if><q:else>f</q:else>"),
        "t"
    );
}
