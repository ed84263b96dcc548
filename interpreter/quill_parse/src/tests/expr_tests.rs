//! Expression grammar tests: precedence, associativity, postfix chains.

use pretty_assertions::assert_eq;
use quill_ir::{BinaryOp, ExprArena, ExprId, ExprKind, StringInterner, UnaryOp};

use crate::parse_expression;

fn parse_one(text: &str) -> (ExprArena, ExprId) {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let id = parse_expression(text, 0, &interner, &mut arena)
        .unwrap_or_else(|e| panic!("parse failed for `{text}`: {e}"));
    (arena, id)
}

fn kind(arena: &ExprArena, id: ExprId) -> &ExprKind {
    &arena.get(id).kind
}

#[test]
fn test_mul_binds_tighter_than_add() {
    let (arena, root) = parse_one("2 + 3 * 4");
    let ExprKind::Binary { op, left, right } = kind(&arena, root) else {
        panic!("expected binary root");
    };
    assert_eq!(*op, BinaryOp::Add);
    assert_eq!(*kind(&arena, *left), ExprKind::Number(2.0));
    let ExprKind::Binary { op: inner, .. } = kind(&arena, *right) else {
        panic!("expected binary rhs");
    };
    assert_eq!(*inner, BinaryOp::Mul);
}

#[test]
fn test_parens_override_precedence() {
    let (arena, root) = parse_one("(2 + 3) * 4");
    let ExprKind::Binary { op, left, .. } = kind(&arena, root) else {
        panic!("expected binary root");
    };
    assert_eq!(*op, BinaryOp::Mul);
    let ExprKind::Binary { op: inner, .. } = kind(&arena, *left) else {
        panic!("expected binary lhs");
    };
    assert_eq!(*inner, BinaryOp::Add);
}

#[test]
fn test_comparison_below_additive() {
    let (arena, root) = parse_one("a + 1 < b - 2");
    let ExprKind::Binary { op, .. } = kind(&arena, root) else {
        panic!("expected binary root");
    };
    assert_eq!(*op, BinaryOp::Lt);
}

#[test]
fn test_logical_below_comparison() {
    let (arena, root) = parse_one("a == 1 && b != 2 || c");
    let ExprKind::Binary { op, left, .. } = kind(&arena, root) else {
        panic!("expected binary root");
    };
    assert_eq!(*op, BinaryOp::Or);
    let ExprKind::Binary { op: and_op, .. } = kind(&arena, *left) else {
        panic!("expected && lhs");
    };
    assert_eq!(*and_op, BinaryOp::And);
}

#[test]
fn test_ternary_is_lowest() {
    let (arena, root) = parse_one("a > 0 ? 'pos' : 'neg'");
    let ExprKind::Ternary { cond, .. } = kind(&arena, root) else {
        panic!("expected ternary root");
    };
    let ExprKind::Binary { op, .. } = kind(&arena, *cond) else {
        panic!("expected comparison condition");
    };
    assert_eq!(*op, BinaryOp::Gt);
}

#[test]
fn test_nested_ternary_right_associates() {
    let (arena, root) = parse_one("a ? 1 : b ? 2 : 3");
    let ExprKind::Ternary { otherwise, .. } = kind(&arena, root) else {
        panic!("expected ternary root");
    };
    assert!(matches!(kind(&arena, *otherwise), ExprKind::Ternary { .. }));
}

#[test]
fn test_unary_chain() {
    let (arena, root) = parse_one("!-x");
    let ExprKind::Unary { op, operand } = kind(&arena, root) else {
        panic!("expected unary root");
    };
    assert_eq!(*op, UnaryOp::Not);
    let ExprKind::Unary { op: inner, .. } = kind(&arena, *operand) else {
        panic!("expected nested unary");
    };
    assert_eq!(*inner, UnaryOp::Neg);
}

#[test]
fn test_postfix_field_index_chain() {
    let (arena, root) = parse_one("user.roles[0]");
    let ExprKind::Index { base, index } = kind(&arena, root) else {
        panic!("expected index root");
    };
    assert!(matches!(kind(&arena, *base), ExprKind::Field { .. }));
    assert_eq!(*kind(&arena, *index), ExprKind::Number(0.0));
}

#[test]
fn test_call_with_named_and_positional_args() {
    let (arena, root) = parse_one("replace(s, search='a', replacement='b')");
    let ExprKind::Call { args, .. } = kind(&arena, root) else {
        panic!("expected call root");
    };
    assert_eq!(args.len(), 3);
    assert!(args[0].name.is_none());
    assert!(args[1].name.is_some());
    assert!(args[2].name.is_some());
}

#[test]
fn test_array_literal() {
    let (arena, root) = parse_one("[1, 'two', x]");
    let ExprKind::Array(elements) = kind(&arena, root) else {
        panic!("expected array root");
    };
    assert_eq!(elements.len(), 3);
}

#[test]
fn test_empty_array_literal() {
    let (arena, root) = parse_one("[]");
    let ExprKind::Array(elements) = kind(&arena, root) else {
        panic!("expected array root");
    };
    assert!(elements.is_empty());
}

#[test]
fn test_trailing_garbage_is_error() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    assert!(parse_expression("1 + 2 3", 0, &interner, &mut arena).is_err());
}

#[test]
fn test_missing_ternary_colon_is_error() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    assert!(parse_expression("a ? 1", 0, &interner, &mut arena).is_err());
}

#[test]
fn test_dangling_operator_is_error() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    assert!(parse_expression("a >", 0, &interner, &mut arena).is_err());
}

#[test]
fn test_spans_are_template_relative() {
    let interner = StringInterner::new();
    let mut arena = ExprArena::new();
    let id = parse_expression("x + y", 100, &interner, &mut arena).unwrap();
    let span = arena.get(id).span;
    assert_eq!(span.start, 100);
    assert_eq!(span.end, 105);
}
