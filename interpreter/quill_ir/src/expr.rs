//! Expression AST, arena-allocated.
//!
//! Expressions are stored in an `ExprArena` and referenced by `ExprId`
//! handles. A parsed document owns exactly one arena; every `{...}` span in
//! text or attribute values points into it.

use crate::{Name, Span};
use smallvec::SmallVec;
use std::fmt;

/// Handle to an expression in an `ExprArena`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

/// Binary operators, in evaluation-rule groups.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BinaryOp {
    // Additive (dual semantic: numeric add or string concat)
    Add,
    Sub,
    // Multiplicative
    Mul,
    Div,
    // Comparison
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Logical (short-circuiting)
    And,
    Or,
}

impl BinaryOp {
    /// Operator text as written in templates.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Unary operators.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum UnaryOp {
    /// Logical negation `!`.
    Not,
    /// Numeric negation `-`.
    Neg,
}

/// A call argument: positional, or named via `name=expr`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Arg {
    /// `Some` for `name=expr` arguments.
    pub name: Option<Name>,
    pub value: ExprId,
}

/// Expression node kind.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Null,
    Bool(bool),
    Number(f64),
    Str(Name),
    Ident(Name),
    /// Array literal `[a, b, c]`.
    Array(SmallVec<[ExprId; 4]>),
    /// Property access `base.name`.
    Field { base: ExprId, name: Name },
    /// Index access `base[index]`.
    Index { base: ExprId, index: ExprId },
    /// Function call `name(args...)`.
    Call {
        name: Name,
        args: SmallVec<[Arg; 4]>,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    /// Ternary `cond ? then : otherwise`.
    Ternary {
        cond: ExprId,
        then: ExprId,
        otherwise: ExprId,
    },
}

/// An expression with its source span.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    #[inline]
    pub const fn new(kind: ExprKind, span: Span) -> Self {
        Expr { kind, span }
    }
}

/// Arena owning all expressions of one parsed document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena { exprs: Vec::new() }
    }

    /// Allocate an expression, returning its handle.
    #[inline]
    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = u32::try_from(self.exprs.len()).unwrap_or(u32::MAX);
        self.exprs.push(expr);
        ExprId(id)
    }

    /// Get an expression by handle.
    ///
    /// # Panics
    /// Panics if the handle came from a different arena and is out of range.
    #[inline]
    pub fn get(&self, id: ExprId) -> &Expr {
        &self.exprs[id.index()]
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_alloc_get() {
        let mut arena = ExprArena::new();
        let id = arena.alloc(Expr::new(ExprKind::Number(1.5), Span::new(0, 3)));
        assert_eq!(arena.get(id).kind, ExprKind::Number(1.5));
        assert_eq!(arena.get(id).span, Span::new(0, 3));
    }

    #[test]
    fn test_arena_handles_are_sequential() {
        let mut arena = ExprArena::new();
        let a = arena.alloc(Expr::new(ExprKind::Null, Span::DUMMY));
        let b = arena.alloc(Expr::new(ExprKind::Bool(true), Span::DUMMY));
        assert_ne!(a, b);
        assert_eq!(arena.len(), 2);
    }
}
