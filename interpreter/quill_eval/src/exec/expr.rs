//! Expression evaluation.

use quill_ir::{BinaryOp, ExprId, ExprKind, Name, Span};

use crate::errors::{type_mismatch, undefined_variable, EvalError, EvalResult};
use crate::operators;
use crate::stack::ensure_sufficient_stack;
use crate::Value;

use super::Executor;

impl Executor<'_> {
    /// Evaluate one expression. Nested expressions recurse stack-safely.
    pub fn eval_expr(&mut self, id: ExprId) -> EvalResult {
        ensure_sufficient_stack(|| self.eval_expr_inner(id))
    }

    fn eval_expr_inner(&mut self, id: ExprId) -> EvalResult {
        let expr = self.arena.get(id);
        let span = expr.span;
        match &expr.kind {
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(name) => Ok(Value::string(self.interner.lookup(*name).as_ref())),
            ExprKind::Ident(name) => self.eval_ident(*name, span),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval_expr(*item)?);
                }
                Ok(Value::array(values))
            }
            ExprKind::Field { base, name } => self.eval_field(*base, *name, span),
            ExprKind::Index { base, index } => {
                let base = self.eval_expr(*base)?;
                let index = self.eval_expr(*index)?;
                eval_index(&base, &index).map_err(|err| err.with_span(span))
            }
            ExprKind::Call { name, args } => {
                let mut evaluated = Vec::with_capacity(args.len());
                for arg in args {
                    evaluated.push((arg.name, self.eval_expr(arg.value)?));
                }
                self.call_function(*name, &evaluated, span)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval_expr(*operand)?;
                operators::unary(*op, &operand).map_err(|err| err.with_span(span))
            }
            ExprKind::Binary { op, left, right } => self.eval_binary(*op, *left, *right, span),
            ExprKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                if self.eval_expr(*cond)?.is_truthy() {
                    self.eval_expr(*then)
                } else {
                    self.eval_expr(*otherwise)
                }
            }
        }
    }

    /// Resolve an identifier through the scope chain.
    ///
    /// A bare scope keyword evaluates to a snapshot of that frame. An
    /// undefined name is `Null` plus a warning, or a hard error under
    /// `strict_vars`.
    fn eval_ident(&mut self, name: Name, span: Span) -> EvalResult {
        if let Some(kind) = self.scope_names.kind_of(name) {
            return Ok(self.scopes.snapshot(kind));
        }
        match self.scopes.lookup(name) {
            Some(value) => Ok(value),
            None => self.undefined(name, span),
        }
    }

    fn eval_field(&mut self, base: ExprId, name: Name, span: Span) -> EvalResult {
        // `scope.member` routes to the frame directly, bypassing chain
        // search and the snapshot object.
        if let ExprKind::Ident(base_name) = self.arena.get(base).kind {
            if let Some(kind) = self.scope_names.kind_of(base_name) {
                return match self.scopes.get_in(kind, name) {
                    Some(value) => Ok(value),
                    None => self.undefined(name, span),
                };
            }
        }
        let base = self.eval_expr(base)?;
        match &base {
            // Field access on null stays null; under `strict_vars` the
            // undefined base already failed.
            Value::Null => Ok(Value::Null),
            Value::Object(entries) => Ok(entries
                .get(self.interner.lookup(name).as_ref())
                .cloned()
                .unwrap_or(Value::Null)),
            other => Err(type_mismatch("object", other).with_span(span)),
        }
    }

    fn eval_binary(
        &mut self,
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
        span: Span,
    ) -> EvalResult {
        // Short-circuit before evaluating the right operand.
        match op {
            BinaryOp::And => {
                let lhs = self.eval_expr(left)?;
                if !lhs.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                let rhs = self.eval_expr(right)?;
                return Ok(Value::Bool(rhs.is_truthy()));
            }
            BinaryOp::Or => {
                let lhs = self.eval_expr(left)?;
                if lhs.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                let rhs = self.eval_expr(right)?;
                return Ok(Value::Bool(rhs.is_truthy()));
            }
            _ => {}
        }
        let lhs = self.eval_expr(left)?;
        let rhs = self.eval_expr(right)?;
        operators::binary(op, &lhs, &rhs).map_err(|err| err.with_span(span))
    }

    fn undefined(&mut self, name: Name, span: Span) -> EvalResult {
        let text = self.interner.lookup(name);
        let err = undefined_variable(text.as_ref(), span);
        if self.config.strict_vars {
            Err(err)
        } else {
            self.warn(err.to_diagnostic().into_warning());
            Ok(Value::Null)
        }
    }
}

/// Index access: zero-based on arrays, key lookup on objects, character
/// access on strings. Out-of-range and missing keys yield `Null`.
pub fn eval_index(base: &Value, index: &Value) -> EvalResult {
    match base {
        Value::Array(items) => match usize_index(index)? {
            Some(i) => Ok(items.get(i).cloned().unwrap_or(Value::Null)),
            None => Ok(Value::Null),
        },
        Value::Object(entries) => Ok(entries
            .get(&index.to_display_string())
            .cloned()
            .unwrap_or(Value::Null)),
        Value::Str(s) => match usize_index(index)? {
            Some(i) => Ok(s
                .chars()
                .nth(i)
                .map_or(Value::Null, |c| Value::string(c.to_string()))),
            None => Ok(Value::Null),
        },
        Value::Null => Ok(Value::Null),
        other => Err(type_mismatch("array, object, or string", other)),
    }
}

/// A non-negative integral index; negative or fractional indexes are in
/// range for nothing and resolve to `Null` upstream.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn usize_index(index: &Value) -> Result<Option<usize>, EvalError> {
    let Some(i) = index.as_number() else {
        return Err(type_mismatch("number", index));
    };
    if i < 0.0 || i.fract() != 0.0 {
        return Ok(None);
    }
    Ok(Some(i as usize))
}
