//! Function calls: binding, validation, memoization, depth limiting.

use std::sync::Arc;

use quill_ir::{Name, Node, NodeKind, Span};

use crate::builtins;
use crate::errors::{
    misplaced_control, missing_required_param, param_rule_violation, recursion_limit,
    undefined_function, EvalError, EvalResult,
};
use crate::functions::{validate_param, FunctionDef};
use crate::scope::{Frame, SetOperation};
use crate::Value;

use super::{Executor, Flow};

impl Executor<'_> {
    /// Resolve and call by name: user definitions shadow builtins.
    pub fn call_function(
        &mut self,
        name: Name,
        args: &[(Option<Name>, Value)],
        span: Span,
    ) -> EvalResult {
        if let Some(def) = self.registry.get(name) {
            return self.call_user(&def, args, span);
        }
        let text = self.interner.lookup(name);
        if builtins::exists(&text) {
            // Builtins take positional arguments only.
            if let Some((arg_name, _)) = args.iter().find(|(n, _)| n.is_some()) {
                let arg = arg_name.map_or_else(String::new, |n| self.interner.lookup(n).to_string());
                return Err(
                    param_rule_violation(text.as_ref(), arg, "positional arguments only")
                        .with_span(span),
                );
            }
            let positional: Vec<Value> = args.iter().map(|(_, v)| v.clone()).collect();
            return match builtins::call(&text, &positional) {
                Some(result) => result.map_err(|err| err.with_span(span)),
                None => Err(undefined_function(text.as_ref(), span)),
            };
        }
        Err(undefined_function(text.as_ref(), span))
    }

    fn call_user(
        &mut self,
        def: &Arc<FunctionDef>,
        args: &[(Option<Name>, Value)],
        span: Span,
    ) -> EvalResult {
        if self.call_depth >= self.config.max_call_depth {
            return Err(recursion_limit(self.config.max_call_depth).with_span(span));
        }
        let fname = self.interner.lookup(def.name).to_string();
        tracing::trace!(function = %fname, depth = self.call_depth, "call");

        // Named arguments land on their parameter; positional ones fill the
        // remaining slots in declaration order. Extra positional arguments
        // are dropped.
        let mut bound: Vec<Option<Value>> = vec![None; def.params.len()];
        let mut next_slot = 0usize;
        for (arg_name, value) in args {
            match arg_name {
                Some(arg_name) => {
                    match def.params.iter().position(|p| p.name == *arg_name) {
                        Some(idx) => bound[idx] = Some(value.clone()),
                        None => {
                            return Err(param_rule_violation(
                                &fname,
                                self.interner.lookup(*arg_name).as_ref(),
                                "no such parameter",
                            )
                            .with_span(span));
                        }
                    }
                }
                None => {
                    while next_slot < bound.len() && bound[next_slot].is_some() {
                        next_slot += 1;
                    }
                    if next_slot < bound.len() {
                        bound[next_slot] = Some(value.clone());
                        next_slot += 1;
                    }
                }
            }
        }

        // Defaults evaluate in the caller's environment at bind time;
        // required parameters fail before any body execution.
        let mut finals = Vec::with_capacity(def.params.len());
        for (param, slot) in def.params.iter().zip(bound) {
            let value = match slot {
                Some(value) => value,
                None => match &param.default {
                    Some(default) => self.eval_attr(default)?,
                    None if param.required => {
                        return Err(missing_required_param(
                            &fname,
                            self.interner.lookup(param.name).as_ref(),
                        )
                        .with_span(span));
                    }
                    None => Value::Null,
                },
            };
            let value = validate_param(&fname, param, value, &self.interner)
                .map_err(|err| err.with_span(span))?;
            finals.push(value);
        }

        let memo_key = def.modifiers.memoize.then(|| def.memo_key(&finals));
        if let Some(key) = &memo_key {
            if let Some(hit) = def.memo_lookup(key) {
                tracing::trace!(function = %fname, "memo hit");
                return Ok(hit);
            }
        }

        let mut frame = Frame::new();
        for (param, value) in def.params.iter().zip(&finals) {
            frame.define(param.name, value.clone());
        }

        // Fresh local stack, suppressed output: a function computes a
        // value. Memoized calls would otherwise emit on miss but not on
        // hit.
        let saved_locals = self.scopes.enter_function(frame);
        let saved_output = self.output.take();
        self.call_depth += 1;
        let flow = self.exec_nodes(&def.body);
        self.call_depth -= 1;
        self.output.restore(saved_output);
        self.scopes.exit_function(saved_locals);

        let result = match flow? {
            Flow::Return(value) => value,
            Flow::Normal => Value::Null,
            Flow::Break | Flow::Continue => {
                return Err(misplaced_control(
                    "`q:break`/`q:continue` cannot cross a function boundary",
                    span,
                ));
            }
        };
        if let Some(key) = memo_key {
            def.memo_store(key, result.clone());
        }
        Ok(result)
    }

    /// `<q:invoke function= result=>` with `<q:arg name= value=>` children.
    pub(super) fn exec_invoke(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let span = node.span;
        let function = self.require_attr_text(node, self.attrs.function, "`q:invoke`", span)?;
        let name = self.interner.intern(&function);

        let mut args: Vec<(Option<Name>, Value)> = Vec::new();
        for child in &node.children {
            if !matches!(child.kind, NodeKind::Arg) {
                continue;
            }
            let arg_name = self
                .attr_text(child, self.attrs.name)?
                .map(|text| self.interner.intern(&text));
            let value = self
                .attr_value(child, self.attrs.value)?
                .unwrap_or(Value::Null);
            args.push((arg_name, value));
        }

        let result = self.call_function(name, &args, span)?;
        if let Some(target) = self.attr_text(node, self.attrs.result)? {
            self.scopes
                .set_path(&target, &SetOperation::Assign, Some(result))
                .map_err(|err| err.with_span(span))?;
        }
        Ok(Flow::Normal)
    }
}
