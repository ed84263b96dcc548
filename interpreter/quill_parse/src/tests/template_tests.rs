//! Template scanner tests: tags, attributes, interpolation, errors.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use quill_diagnostic::ErrorCode;
use quill_ir::{AttrValue, NodeKind, Segment, StringInterner};

use crate::{parse, ParseOptions, ParseResult};

fn parse_ok(text: &str) -> ParseResult {
    let interner = StringInterner::new();
    parse(text, &interner, ParseOptions::default())
        .unwrap_or_else(|e| panic!("parse failed for `{text}`: {e}"))
}

fn parse_err(text: &str) -> ErrorCode {
    let interner = StringInterner::new();
    match parse(text, &interner, ParseOptions::default()) {
        Ok(_) => panic!("expected parse error for `{text}`"),
        Err(e) => e.code,
    }
}

#[test]
fn test_plain_text() {
    let result = parse_ok("hello world");
    assert_eq!(result.document.roots.len(), 1);
    let NodeKind::Text(segments) = &result.document.roots[0].kind else {
        panic!("expected text node");
    };
    assert_eq!(segments, &[Segment::Text("hello world".into())]);
}

#[test]
fn test_text_with_interpolation() {
    let result = parse_ok("Hello {name}, you have {count} items");
    let NodeKind::Text(segments) = &result.document.roots[0].kind else {
        panic!("expected text node");
    };
    assert_eq!(segments.len(), 5);
    assert!(matches!(segments[1], Segment::Expr(_)));
    assert!(matches!(segments[3], Segment::Expr(_)));
}

#[test]
fn test_brace_escapes() {
    let result = parse_ok("a {{literal}} b");
    let NodeKind::Text(segments) = &result.document.roots[0].kind else {
        panic!("expected text node");
    };
    assert_eq!(segments, &[Segment::Text("a {literal} b".into())]);
}

#[test]
fn test_nested_tags() {
    let result = parse_ok("<q:if condition=\"{x}\"><q:loop from=\"1\" to=\"3\">.</q:loop></q:if>");
    let root = &result.document.roots[0];
    assert_eq!(root.kind, NodeKind::If);
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].kind, NodeKind::Loop);
}

#[test]
fn test_void_set_needs_no_close() {
    let result = parse_ok("<q:set name=\"x\" value=\"{1}\">after");
    assert_eq!(result.document.roots.len(), 2);
    assert_eq!(result.document.roots[0].kind, NodeKind::Set);
}

#[test]
fn test_self_closing_tag() {
    let result = parse_ok("<q:break/>");
    assert_eq!(result.document.roots[0].kind, NodeKind::Break);
}

#[test]
fn test_attr_value_forms() {
    let interner = StringInterner::new();
    let result = parse(
        "<q:set name=\"x\" value=\"{a + 1}\" label=\"id-{a}-suffix\">",
        &interner,
        ParseOptions::default(),
    )
    .unwrap();
    let node = &result.document.roots[0];

    let name = node.attr(interner.intern("name")).unwrap();
    assert_eq!(*name, AttrValue::Literal("x".into()));

    let value = node.attr(interner.intern("value")).unwrap();
    assert!(matches!(value, AttrValue::Expr(_)));

    let label = node.attr(interner.intern("label")).unwrap();
    let AttrValue::Segments(segments) = label else {
        panic!("expected mixed segments");
    };
    assert_eq!(segments.len(), 3);
}

#[test]
fn test_single_quoted_attr() {
    let result = parse_ok("<q:set name='x' value='{1}'>");
    assert_eq!(result.document.roots[0].attrs.len(), 2);
}

#[test]
fn test_comment_is_skipped() {
    let result = parse_ok("a<!-- <q:if> ignored -->b");
    let NodeKind::Text(first) = &result.document.roots[0].kind else {
        panic!("expected text");
    };
    assert_eq!(first, &[Segment::Text("a".into())]);
    assert_eq!(result.document.roots.len(), 2);
}

#[test]
fn test_unknown_q_tag_passes_through_with_warning() {
    let result = parse_ok("<q:widget size=\"2\"></q:widget>");
    assert!(matches!(result.document.roots[0].kind, NodeKind::Opaque(_)));
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].code, ErrorCode::UnknownTag);
}

#[test]
fn test_unknown_q_tag_strict_mode_fails() {
    let interner = StringInterner::new();
    let err = parse(
        "<q:widget></q:widget>",
        &interner,
        ParseOptions { strict_tags: true },
    )
    .unwrap_err();
    assert_eq!(err.code, ErrorCode::UnknownTag);
}

#[test]
fn test_html_tag_is_opaque_without_warning() {
    let result = parse_ok("<div class=\"row\">{x}</div>");
    assert!(matches!(result.document.roots[0].kind, NodeKind::Opaque(_)));
    assert!(result.diagnostics.is_empty());
}

#[test]
fn test_unclosed_tag_error() {
    assert_eq!(parse_err("<q:if condition=\"{x}\">body"), ErrorCode::UnclosedTag);
}

#[test]
fn test_mismatched_close_error() {
    assert_eq!(
        parse_err("<q:if condition=\"{x}\"></q:loop>"),
        ErrorCode::MismatchedTag
    );
}

#[test]
fn test_unterminated_expr_error() {
    assert_eq!(parse_err("hello {name"), ErrorCode::UnterminatedExpr);
}

#[test]
fn test_expr_span_with_string_brace() {
    let result = parse_ok("{x == \"}\"}");
    let NodeKind::Text(segments) = &result.document.roots[0].kind else {
        panic!("expected text");
    };
    assert!(matches!(segments[0], Segment::Expr(_)));
}

#[test]
fn test_unquoted_attr_error() {
    assert_eq!(
        parse_err("<q:set name=x value=\"{1}\">"),
        ErrorCode::MalformedAttribute
    );
}

#[test]
fn test_stray_close_tag_error() {
    assert_eq!(parse_err("</q:if>"), ErrorCode::UnexpectedToken);
}

#[test]
fn test_deterministic_parse() {
    let text = "<q:loop array=\"{items}\" item=\"it\"><b>{it}</b></q:loop>";
    let interner = StringInterner::new();
    let a = parse(text, &interner, ParseOptions::default()).unwrap();
    let b = parse(text, &interner, ParseOptions::default()).unwrap();
    assert_eq!(a.document, b.document);
    assert_eq!(a.arena, b.arena);
}

proptest! {
    /// Parsing the same input twice always yields structurally equal trees,
    /// for any input (well-formed or not, both runs must agree).
    #[test]
    fn prop_parse_is_deterministic(text in "[a-z <>{}/\"=:]{0,64}") {
        let interner = StringInterner::new();
        let a = parse(&text, &interner, ParseOptions::default());
        let b = parse(&text, &interner, ParseOptions::default());
        match (a, b) {
            (Ok(left), Ok(right)) => {
                prop_assert_eq!(left.document, right.document);
                prop_assert_eq!(left.arena, right.arena);
            }
            (Err(left), Err(right)) => prop_assert_eq!(left, right),
            _ => prop_assert!(false, "parse determinism violated"),
        }
    }
}
