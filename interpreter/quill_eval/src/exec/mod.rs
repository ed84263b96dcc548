//! Tree-walking executor.
//!
//! Organized by category:
//!
//! - `expr`: expression evaluation (literals, operators, access paths)
//! - `control`: `q:set`, conditional chains, the five loop forms
//! - `call`: user functions, builtins, `q:invoke`
//!
//! One `Executor` lives for one `Engine::execute` call. Control signals
//! (`break`, `continue`, `return`) travel as the `Flow` result of node
//! execution, never as errors.

pub mod call;
pub mod control;
pub mod expr;

use std::sync::Arc;

use rustc_hash::FxHashMap;

use quill_diagnostic::Diagnostic;
use quill_ir::{
    AttrValue, ExprArena, Name, Node, NodeKind, Segment, SharedInterner, Span,
};

use crate::adapter::RecordSet;
use crate::errors::{misplaced_control, EvalError};
use crate::functions::FunctionRegistry;
use crate::names::AttrNames;
use crate::output::OutputBuffer;
use crate::scope::{ScopeChain, ScopeNames};
use crate::stack::ensure_sufficient_stack;
use crate::{EngineConfig, Value};

/// How execution of a node list ended.
#[derive(Clone, Debug, PartialEq)]
pub enum Flow {
    /// Ran to completion.
    Normal,
    /// A `q:break` is looking for its loop.
    Break,
    /// A `q:continue` is looking for its loop.
    Continue,
    /// A `q:return` is looking for its function call.
    Return(Value),
}

pub struct Executor<'a> {
    pub(crate) arena: &'a ExprArena,
    pub(crate) interner: SharedInterner,
    pub(crate) scopes: ScopeChain,
    pub(crate) registry: Arc<FunctionRegistry>,
    pub(crate) config: &'a EngineConfig,
    pub(crate) attrs: AttrNames,
    pub(crate) scope_names: ScopeNames,
    pub(crate) record_sets: &'a FxHashMap<Name, Arc<dyn RecordSet>>,
    pub(crate) output: OutputBuffer,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) call_depth: usize,
}

impl<'a> Executor<'a> {
    pub fn new(
        arena: &'a ExprArena,
        scopes: ScopeChain,
        registry: Arc<FunctionRegistry>,
        config: &'a EngineConfig,
        record_sets: &'a FxHashMap<Name, Arc<dyn RecordSet>>,
    ) -> Self {
        let interner = scopes.interner().clone();
        let attrs = AttrNames::new(&interner);
        let scope_names = scopes.scope_names();
        Executor {
            arena,
            interner,
            scopes,
            registry,
            config,
            attrs,
            scope_names,
            record_sets,
            output: OutputBuffer::new(),
            diagnostics: Vec::new(),
            call_depth: 0,
        }
    }

    /// Execute a sibling list, grouping conditional chains.
    pub fn exec_nodes(&mut self, nodes: &[Node]) -> Result<Flow, EvalError> {
        let mut i = 0;
        while i < nodes.len() {
            let node = &nodes[i];
            if matches!(node.kind, NodeKind::If) {
                let (chain, next) = collect_chain(nodes, i);
                let flow = self.exec_conditional(&chain)?;
                if flow != Flow::Normal {
                    return Ok(flow);
                }
                i = next;
                continue;
            }
            let flow = self.exec_node(node)?;
            if flow != Flow::Normal {
                return Ok(flow);
            }
            i += 1;
        }
        Ok(Flow::Normal)
    }

    /// Execute one node. Nesting recursion is stack-safe.
    pub fn exec_node(&mut self, node: &Node) -> Result<Flow, EvalError> {
        ensure_sufficient_stack(|| self.exec_node_inner(node))
    }

    fn exec_node_inner(&mut self, node: &Node) -> Result<Flow, EvalError> {
        let result = self.dispatch(node);
        match result {
            Ok(flow) => Ok(flow),
            Err(err) => {
                // Validation failures abort even in lenient mode; so does
                // everything when lenient mode is off.
                if self.config.lenient_errors && !err.kind.is_validation() {
                    self.output.push_text(&format!("[error: {err}]"));
                    self.diagnostics.push(err.to_diagnostic());
                    Ok(Flow::Normal)
                } else {
                    Err(err)
                }
            }
        }
    }

    fn dispatch(&mut self, node: &Node) -> Result<Flow, EvalError> {
        tracing::trace!(kind = node.kind.describe(), span = ?node.span, "dispatch");
        match &node.kind {
            NodeKind::Text(segments) => {
                self.emit_segments(segments)?;
                Ok(Flow::Normal)
            }
            NodeKind::Set => self.exec_set(node),
            // A direct `If` only reaches here from `dispatch` via a chain
            // head; bare `ElseIf`/`Else` siblings are structural errors.
            NodeKind::If => {
                let chain = [node];
                self.exec_conditional(&chain)
            }
            NodeKind::ElseIf => Err(misplaced_control(
                "`q:elseif` without a preceding `q:if`",
                node.span,
            )),
            NodeKind::Else => Err(misplaced_control(
                "`q:else` without a preceding `q:if`",
                node.span,
            )),
            NodeKind::Loop => self.exec_loop(node),
            NodeKind::Break => Ok(Flow::Break),
            NodeKind::Continue => Ok(Flow::Continue),
            // Definitions are harvested before execution; the tag itself
            // renders nothing.
            NodeKind::Function => Ok(Flow::Normal),
            NodeKind::Param => self.exec_param(node),
            NodeKind::Return => {
                let value = match node.attr(self.attrs.value) {
                    Some(attr) => self.eval_attr(attr)?,
                    None => Value::Null,
                };
                Ok(Flow::Return(value))
            }
            NodeKind::Invoke => self.exec_invoke(node),
            NodeKind::Arg => Err(misplaced_control(
                "`q:arg` outside a `q:invoke`",
                node.span,
            )),
            NodeKind::Output => self.exec_nodes(&node.children),
            NodeKind::Opaque(name) => self.exec_opaque(node, *name),
        }
    }

    /// Render an unknown tag back out with evaluated attributes.
    fn exec_opaque(&mut self, node: &Node, name: Name) -> Result<Flow, EvalError> {
        let mut attrs = Vec::with_capacity(node.attrs.len());
        for attr in &node.attrs {
            let value = self.eval_attr(&attr.value)?;
            let key = self.interner.lookup(attr.name).to_string();
            attrs.push((key, value.to_display_string()));
        }

        let parent = self.output.take();
        let flow = self.exec_nodes(&node.children);
        let children = self.output.take();
        self.output.restore(parent);
        let flow = flow?;

        let tag = self.interner.lookup(name).to_string();
        self.output.push_element(tag, attrs, children);
        Ok(flow)
    }

    pub(crate) fn emit_segments(&mut self, segments: &[Segment]) -> Result<(), EvalError> {
        for segment in segments {
            match segment {
                Segment::Text(text) => self.output.push_text(text),
                Segment::Expr(id) => {
                    let value = self.eval_expr(*id)?;
                    self.output.push_text(&value.to_display_string());
                }
            }
        }
        Ok(())
    }

    /// Evaluate an attribute value: a lone expression span keeps its value
    /// type; mixed segments render to a string.
    pub(crate) fn eval_attr(&mut self, attr: &AttrValue) -> Result<Value, EvalError> {
        match attr {
            AttrValue::Literal(text) => Ok(Value::string(text.clone())),
            AttrValue::Expr(id) => self.eval_expr(*id),
            AttrValue::Segments(segments) => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        Segment::Text(text) => out.push_str(text),
                        Segment::Expr(id) => {
                            out.push_str(&self.eval_expr(*id)?.to_display_string());
                        }
                    }
                }
                Ok(Value::string(out))
            }
        }
    }

    /// Attribute as a value, `None` when absent.
    pub(crate) fn attr_value(
        &mut self,
        node: &Node,
        name: Name,
    ) -> Result<Option<Value>, EvalError> {
        match node.attr(name) {
            Some(attr) => Ok(Some(self.eval_attr(attr)?)),
            None => Ok(None),
        }
    }

    /// Attribute rendered to text, `None` when absent.
    pub(crate) fn attr_text(&mut self, node: &Node, name: Name) -> Result<Option<String>, EvalError> {
        Ok(self.attr_value(node, name)?.map(|v| v.to_display_string()))
    }

    /// Attribute rendered to text, with a structural error when absent.
    pub(crate) fn require_attr_text(
        &mut self,
        node: &Node,
        name: Name,
        what: &str,
        span: Span,
    ) -> Result<String, EvalError> {
        self.attr_text(node, name)?
            .ok_or_else(|| misplaced_control(format!("{what} requires a `{}` attribute", self.interner.lookup(name)), span))
    }

    pub(crate) fn warn(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }
}

/// Gather `If` + following `ElseIf`/`Else` siblings into one chain.
///
/// Whitespace-only text between branches is part of the chain syntax and is
/// not emitted; an `Else` ends the chain. Returns the chain and the index
/// of the first sibling after it.
fn collect_chain(nodes: &[Node], start: usize) -> (Vec<&Node>, usize) {
    let mut chain = vec![&nodes[start]];
    let mut i = start + 1;
    loop {
        let mut j = i;
        while j < nodes.len() && is_blank_text(&nodes[j]) {
            j += 1;
        }
        match nodes.get(j).map(|n| &n.kind) {
            Some(NodeKind::ElseIf) => {
                chain.push(&nodes[j]);
                i = j + 1;
            }
            Some(NodeKind::Else) => {
                chain.push(&nodes[j]);
                return (chain, j + 1);
            }
            _ => return (chain, i),
        }
    }
}

fn is_blank_text(node: &Node) -> bool {
    match &node.kind {
        NodeKind::Text(segments) => segments.iter().all(|segment| match segment {
            Segment::Text(text) => text.trim().is_empty(),
            Segment::Expr(_) => false,
        }),
        _ => false,
    }
}
