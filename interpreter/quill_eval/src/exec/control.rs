//! `q:set`, conditional chains, and the loop forms.

use std::collections::BTreeMap;

use quill_ir::{Node, NodeKind};

use crate::errors::{
    external_error, missing_operand, missing_required_param, type_mismatch, zero_step, EvalError,
};
use crate::scope::SetOperation;
use crate::Value;

use super::{Executor, Flow};

impl Executor<'_> {
    /// `<q:set name= value= operation= key=>`.
    pub(super) fn exec_set(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let span = node.span;
        let name = self.require_attr_text(node, self.attrs.name, "`q:set`", span)?;
        let operation = self
            .attr_text(node, self.attrs.operation)?
            .unwrap_or_else(|| "assign".to_string());
        let key = self.attr_text(node, self.attrs.key)?;
        let operand = self.attr_value(node, self.attrs.value)?;

        let op = SetOperation::parse(&operation, key).map_err(|err| err.with_span(span))?;
        self.scopes
            .set_path(&name, &op, operand)
            .map_err(|err| err.with_span(span))?;
        Ok(Flow::Normal)
    }

    /// Top-level `<q:param>`: define the variable with its default when it
    /// is not already bound anywhere in the chain.
    pub(super) fn exec_param(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let span = node.span;
        let name = self.require_attr_text(node, self.attrs.name, "`q:param`", span)?;
        if self.scopes.get_path(&name).is_some() {
            return Ok(Flow::Normal);
        }
        match self.attr_value(node, self.attrs.default)? {
            Some(default) => {
                self.scopes
                    .set_path(&name, &SetOperation::Assign, Some(default))
                    .map_err(|err| err.with_span(span))?;
                Ok(Flow::Normal)
            }
            None => {
                let required = self
                    .attr_text(node, self.attrs.required)?
                    .is_some_and(|text| text == "true");
                if required {
                    Err(missing_required_param("template", name).with_span(span))
                } else {
                    Ok(Flow::Normal)
                }
            }
        }
    }

    /// Execute a gathered `If`/`ElseIf`/`Else` chain: first truthy branch
    /// wins, later conditions are never evaluated.
    pub(super) fn exec_conditional(&mut self, chain: &[&Node]) -> Result<Flow, EvalError> {
        for branch in chain {
            let taken = match branch.kind {
                NodeKind::Else => true,
                _ => {
                    let condition = branch.attr(self.attrs.condition).ok_or_else(|| {
                        missing_operand("q:if condition").with_span(branch.span)
                    })?;
                    self.eval_attr(condition)?.is_truthy()
                }
            };
            if taken {
                return self.exec_nodes(&branch.children);
            }
        }
        Ok(Flow::Normal)
    }

    /// `<q:loop>` in any of its forms, dispatched by attribute.
    pub(super) fn exec_loop(&mut self, node: &Node) -> Result<Flow, EvalError> {
        if node.has_attr(self.attrs.from) {
            self.exec_range_loop(node)
        } else if node.has_attr(self.attrs.array) {
            let items = match self.attr_value(node, self.attrs.array)? {
                Some(Value::Array(items)) => items.as_ref().clone(),
                Some(Value::Null) | None => Vec::new(),
                Some(other) => {
                    return Err(type_mismatch("array", &other).with_span(node.span))
                }
            };
            self.exec_items_loop(node, items)
        } else if node.has_attr(self.attrs.list) {
            self.exec_list_loop(node)
        } else if node.has_attr(self.attrs.object) {
            self.exec_object_loop(node)
        } else if node.has_attr(self.attrs.query) {
            self.exec_query_loop(node)
        } else {
            Err(missing_operand("q:loop (from/array/list/object/query)")
                .with_span(node.span))
        }
    }

    /// `from= to= step= index=`; inclusive bounds, direction follows the
    /// step's sign, mismatched direction runs zero iterations.
    fn exec_range_loop(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let span = node.span;
        let from = self.numeric_attr(node, self.attrs.from, "q:loop from")?;
        let to = self.numeric_attr(node, self.attrs.to, "q:loop to")?;
        let step = match self.attr_value(node, self.attrs.step)? {
            Some(value) => value
                .as_number()
                .ok_or_else(|| type_mismatch("number", &value).with_span(span))?,
            None => 1.0,
        };
        if step == 0.0 {
            return Err(zero_step(span));
        }
        let index = self.loop_binding(node, self.attrs.index)?;

        // Each value is computed from the iteration count, not accumulated,
        // so fractional steps do not drift at the inclusive upper bound.
        let mut iteration = 0.0;
        loop {
            let current = from + iteration * step;
            if (step > 0.0 && current > to) || (step < 0.0 && current < to) {
                break;
            }
            self.scopes.push_local();
            if let Some(index) = index {
                self.scopes.define_local(index, Value::Number(current));
            }
            let flow = self.exec_nodes(&node.children);
            self.scopes.pop_local();
            match flow? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                ret @ Flow::Return(_) => return Ok(ret),
            }
            iteration += 1.0;
        }
        Ok(Flow::Normal)
    }

    /// Shared body of the array and list forms: `item=` (required) and a
    /// zero-based `index=`.
    fn exec_items_loop(&mut self, node: &Node, items: Vec<Value>) -> Result<Flow, EvalError> {
        let span = node.span;
        let item = self
            .loop_binding(node, self.attrs.item)?
            .ok_or_else(|| missing_operand("q:loop item").with_span(span))?;
        let index = self.loop_binding(node, self.attrs.index)?;

        for (i, value) in items.into_iter().enumerate() {
            self.scopes.push_local();
            self.scopes.define_local(item, value);
            if let Some(index) = index {
                #[allow(clippy::cast_precision_loss)]
                self.scopes.define_local(index, Value::Number(i as f64));
            }
            let flow = self.exec_nodes(&node.children);
            self.scopes.pop_local();
            match flow? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    /// `list= delimiter=?` splits into trimmed string items, then runs the
    /// array form.
    fn exec_list_loop(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let list = self
            .attr_text(node, self.attrs.list)?
            .unwrap_or_default();
        let delimiter = match self.attr_text(node, self.attrs.delimiter)? {
            Some(d) => d,
            None => self.config.list_delimiter_default.clone(),
        };
        let items = if list.is_empty() {
            Vec::new()
        } else if delimiter.is_empty() {
            list.chars().map(|c| Value::string(c.to_string())).collect()
        } else {
            list.split(&delimiter)
                .map(|item| Value::string(item.trim()))
                .collect()
        };
        self.exec_items_loop(node, items)
    }

    /// `object= key= value=?` iterates entries in key order.
    fn exec_object_loop(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let span = node.span;
        let entries: BTreeMap<String, Value> = match self.attr_value(node, self.attrs.object)? {
            Some(Value::Object(entries)) => entries.as_ref().clone(),
            Some(Value::Null) | None => BTreeMap::new(),
            Some(other) => return Err(type_mismatch("object", &other).with_span(span)),
        };
        let key = self
            .loop_binding(node, self.attrs.key)?
            .ok_or_else(|| missing_operand("q:loop key").with_span(span))?;
        let value_name = self.loop_binding(node, self.attrs.value)?;

        for (entry_key, entry_value) in entries {
            self.scopes.push_local();
            self.scopes.define_local(key, Value::string(entry_key));
            if let Some(value_name) = value_name {
                self.scopes.define_local(value_name, entry_value);
            }
            let flow = self.exec_nodes(&node.children);
            self.scopes.pop_local();
            match flow? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    /// `query= item=? index=?` iterates a host-registered record set; each
    /// row binds its columns directly, plus the whole row when `item` is
    /// named.
    fn exec_query_loop(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let span = node.span;
        let query = self.require_attr_text(node, self.attrs.query, "`q:loop`", span)?;
        let query_name = self.interner.intern(&query);
        let records = self
            .record_sets
            .get(&query_name)
            .cloned()
            .ok_or_else(|| {
                external_error(format!("no record set registered as `{query}`")).with_span(span)
            })?;
        let item = self.loop_binding(node, self.attrs.item)?;
        let index = self.loop_binding(node, self.attrs.index)?;

        let columns = records.columns();
        let column_names: Vec<_> = columns
            .iter()
            .map(|column| self.interner.intern(column))
            .collect();

        for i in 0..records.record_count() {
            let row = records.row(i);
            self.scopes.push_local();
            for (name, value) in column_names.iter().zip(row.iter()) {
                self.scopes.define_local(*name, value.clone());
            }
            if let Some(item) = item {
                let object: BTreeMap<String, Value> = columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect();
                self.scopes.define_local(item, Value::object(object));
            }
            if let Some(index) = index {
                #[allow(clippy::cast_precision_loss)]
                self.scopes.define_local(index, Value::Number(i as f64));
            }
            let flow = self.exec_nodes(&node.children);
            self.scopes.pop_local();
            match flow? {
                Flow::Normal | Flow::Continue => {}
                Flow::Break => break,
                ret @ Flow::Return(_) => return Ok(ret),
            }
        }
        Ok(Flow::Normal)
    }

    fn numeric_attr(
        &mut self,
        node: &Node,
        name: quill_ir::Name,
        what: &str,
    ) -> Result<f64, EvalError> {
        let value = self
            .attr_value(node, name)?
            .ok_or_else(|| missing_operand(what).with_span(node.span))?;
        value
            .as_number()
            .ok_or_else(|| type_mismatch("number", &value).with_span(node.span))
    }

    /// A binding attribute (`item=`, `index=`, ...) interned to a `Name`.
    fn loop_binding(
        &mut self,
        node: &Node,
        attr: quill_ir::Name,
    ) -> Result<Option<quill_ir::Name>, EvalError> {
        Ok(self
            .attr_text(node, attr)?
            .map(|text| self.interner.intern(&text)))
    }
}
