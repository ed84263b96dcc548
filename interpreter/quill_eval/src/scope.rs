//! Scoped variable environment.
//!
//! Five frame kinds, innermost first: Local (a stack, one frame per loop
//! body or function invocation) → Component → Request → Session →
//! Application. Local and Component are owned by one execution;
//! Request/Session/Application are shared with the host and with concurrent
//! executions behind one mutex per frame, so every compound set operation
//! is atomic end to end.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

use quill_ir::{Name, SharedInterner, StringInterner};

use crate::errors::{missing_operand, type_mismatch, unknown_operation, EvalError};
use crate::operators::loose_eq;
use crate::Value;

/// Which frame a name resolves to.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScopeKind {
    Local,
    Component,
    Request,
    Session,
    Application,
}

/// One frame of bindings.
#[derive(Clone, Debug, Default)]
pub struct Frame {
    bindings: FxHashMap<Name, Value>,
}

impl Frame {
    pub fn new() -> Self {
        Frame {
            bindings: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn get(&self, name: Name) -> Option<Value> {
        self.bindings.get(&name).cloned()
    }

    #[inline]
    pub fn define(&mut self, name: Name, value: Value) {
        self.bindings.insert(name, value);
    }

    #[inline]
    pub fn contains(&self, name: Name) -> bool {
        self.bindings.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Snapshot as a `Value::Object` (keys resolved through the interner).
    pub fn to_object(&self, interner: &StringInterner) -> Value {
        let entries: BTreeMap<String, Value> = self
            .bindings
            .iter()
            .map(|(name, value)| (interner.lookup(*name).to_string(), value.clone()))
            .collect();
        Value::object(entries)
    }
}

/// A frame shared across executions behind a single lock.
pub type SharedFrame = Arc<Mutex<Frame>>;

/// Create an empty shared frame.
pub fn shared_frame() -> SharedFrame {
    Arc::new(Mutex::new(Frame::new()))
}

/// Host-seeded shared frames, cloned into each execution's `ScopeChain`.
///
/// The host owns Request/Session/Application contents (§ environment
/// seeding); the engine never creates their initial bindings.
#[derive(Clone, Debug, Default)]
pub struct ScopeSeed {
    pub request: SharedFrame,
    pub session: SharedFrame,
    pub application: SharedFrame,
}

impl ScopeSeed {
    /// Three fresh, empty shared frames.
    pub fn fresh() -> Self {
        ScopeSeed {
            request: shared_frame(),
            session: shared_frame(),
            application: shared_frame(),
        }
    }

    /// Seed a value by qualified path, e.g. `"session.user"`.
    pub fn seed(&self, interner: &StringInterner, path: &str, value: Value) {
        if let Some((kind, rest)) = split_scope_prefix(path) {
            let name = interner.intern(rest);
            match kind {
                ScopeKind::Request => self.request.lock().define(name, value),
                ScopeKind::Session => self.session.lock().define(name, value),
                ScopeKind::Application => self.application.lock().define(name, value),
                ScopeKind::Local | ScopeKind::Component => {}
            }
        }
    }
}

/// Pre-interned scope keywords, checked on every qualified access.
#[derive(Copy, Clone, Debug)]
pub struct ScopeNames {
    pub request: Name,
    pub session: Name,
    pub application: Name,
    pub component: Name,
}

impl ScopeNames {
    pub fn new(interner: &StringInterner) -> Self {
        ScopeNames {
            request: interner.intern("request"),
            session: interner.intern("session"),
            application: interner.intern("application"),
            component: interner.intern("component"),
        }
    }

    /// The frame a keyword routes to, if `name` is a scope keyword.
    pub fn kind_of(&self, name: Name) -> Option<ScopeKind> {
        if name == self.request {
            Some(ScopeKind::Request)
        } else if name == self.session {
            Some(ScopeKind::Session)
        } else if name == self.application {
            Some(ScopeKind::Application)
        } else if name == self.component {
            Some(ScopeKind::Component)
        } else {
            None
        }
    }
}

/// Split a dotted path on its first `.` if the prefix is a scope keyword.
fn split_scope_prefix(path: &str) -> Option<(ScopeKind, &str)> {
    let (prefix, rest) = path.split_once('.')?;
    let kind = match prefix {
        "request" => ScopeKind::Request,
        "session" => ScopeKind::Session,
        "application" => ScopeKind::Application,
        "component" => ScopeKind::Component,
        _ => return None,
    };
    Some((kind, rest))
}

/// The full variable environment of one execution.
pub struct ScopeChain {
    interner: SharedInterner,
    names: ScopeNames,
    /// Local frames, innermost last. Never empty.
    locals: Vec<Frame>,
    component: Frame,
    request: SharedFrame,
    session: SharedFrame,
    application: SharedFrame,
}

impl ScopeChain {
    pub fn new(seed: ScopeSeed, interner: SharedInterner) -> Self {
        let names = ScopeNames::new(&interner);
        ScopeChain {
            interner,
            names,
            locals: vec![Frame::new()],
            component: Frame::new(),
            request: seed.request,
            session: seed.session,
            application: seed.application,
        }
    }

    pub fn scope_names(&self) -> ScopeNames {
        self.names
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    /// Push a fresh Local frame (loop body, branch body).
    #[inline]
    pub fn push_local(&mut self) {
        self.locals.push(Frame::new());
    }

    /// Pop the innermost Local frame. The bottom frame is never popped.
    #[inline]
    pub fn pop_local(&mut self) {
        if self.locals.len() > 1 {
            self.locals.pop();
        }
    }

    /// Swap in a fresh Local stack for a function invocation.
    ///
    /// Functions do not see caller locals; only Component and the shared
    /// frames remain visible. Returns the caller's stack for `exit_function`.
    #[must_use]
    pub fn enter_function(&mut self, frame: Frame) -> Vec<Frame> {
        std::mem::replace(&mut self.locals, vec![frame])
    }

    /// Restore the caller's Local stack after a function returns.
    pub fn exit_function(&mut self, saved: Vec<Frame>) {
        self.locals = saved;
    }

    /// Define a name in the innermost Local frame.
    #[inline]
    pub fn define_local(&mut self, name: Name, value: Value) {
        if let Some(frame) = self.locals.last_mut() {
            frame.define(name, value);
        }
    }

    /// First-match search through the chain, innermost first.
    pub fn lookup(&self, name: Name) -> Option<Value> {
        for frame in self.locals.iter().rev() {
            if let Some(value) = frame.get(name) {
                return Some(value);
            }
        }
        if let Some(value) = self.component.get(name) {
            return Some(value);
        }
        if let Some(value) = self.request.lock().get(name) {
            return Some(value);
        }
        if let Some(value) = self.session.lock().get(name) {
            return Some(value);
        }
        self.application.lock().get(name)
    }

    /// Direct read from one frame kind.
    pub fn get_in(&self, kind: ScopeKind, name: Name) -> Option<Value> {
        match kind {
            ScopeKind::Local => self.locals.iter().rev().find_map(|frame| frame.get(name)),
            ScopeKind::Component => self.component.get(name),
            ScopeKind::Request => self.request.lock().get(name),
            ScopeKind::Session => self.session.lock().get(name),
            ScopeKind::Application => self.application.lock().get(name),
        }
    }

    /// Read by dotted path: scope-keyword prefix routes directly, anything
    /// else is an unqualified chain search on the whole path as one key.
    pub fn get_path(&self, path: &str) -> Option<Value> {
        match split_scope_prefix(path) {
            Some((kind, rest)) => self.get_in(kind, self.interner.intern(rest)),
            None => self.lookup(self.interner.intern(path)),
        }
    }

    /// Apply a set operation by dotted path.
    ///
    /// Unqualified writes always land in the innermost Local frame (the
    /// current value for compound operations is still read through the
    /// chain); writes never leak into outer frames implicitly. Operations
    /// on shared frames hold that frame's lock for the whole
    /// read-modify-write.
    pub fn set_path(
        &mut self,
        path: &str,
        op: &SetOperation,
        operand: Option<Value>,
    ) -> Result<(), EvalError> {
        match split_scope_prefix(path) {
            Some((kind, rest)) => {
                let key = self.interner.intern(rest);
                match kind {
                    ScopeKind::Component => {
                        let current = self.component.get(key);
                        let next = apply_operation(op, current, operand)?;
                        self.component.define(key, next);
                    }
                    ScopeKind::Request => apply_shared(&self.request, key, op, operand)?,
                    ScopeKind::Session => apply_shared(&self.session, key, op, operand)?,
                    ScopeKind::Application => apply_shared(&self.application, key, op, operand)?,
                    // No `local.` keyword exists; unreachable via split.
                    ScopeKind::Local => {}
                }
            }
            None => {
                let key = self.interner.intern(path);
                let current = self.lookup(key);
                let next = apply_operation(op, current, operand)?;
                self.define_local(key, next);
            }
        }
        Ok(())
    }

    /// Shared-frame handles, for hosts that keep executing with the same
    /// environment.
    pub fn request_frame(&self) -> SharedFrame {
        Arc::clone(&self.request)
    }

    pub fn session_frame(&self) -> SharedFrame {
        Arc::clone(&self.session)
    }

    pub fn application_frame(&self) -> SharedFrame {
        Arc::clone(&self.application)
    }

    /// Snapshot one frame kind as a `Value::Object`.
    pub fn snapshot(&self, kind: ScopeKind) -> Value {
        match kind {
            ScopeKind::Local => self
                .locals
                .last()
                .map_or(Value::Null, |frame| frame.to_object(&self.interner)),
            ScopeKind::Component => self.component.to_object(&self.interner),
            ScopeKind::Request => self.request.lock().to_object(&self.interner),
            ScopeKind::Session => self.session.lock().to_object(&self.interner),
            ScopeKind::Application => self.application.lock().to_object(&self.interner),
        }
    }
}

/// One lock acquisition for the whole read-modify-write.
fn apply_shared(
    frame: &SharedFrame,
    key: Name,
    op: &SetOperation,
    operand: Option<Value>,
) -> Result<(), EvalError> {
    let mut guard = frame.lock();
    let current = guard.get(key);
    let next = apply_operation(op, current, operand)?;
    guard.define(key, next);
    Ok(())
}

/// Mutating operations beyond plain assignment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SetOperation {
    Assign,
    Increment,
    Decrement,
    Add,
    Subtract,
    Multiply,
    Append,
    Prepend,
    Remove,
    Merge,
    /// Set a single key inside an object; the key comes from the tag's
    /// `key` attribute.
    SetProperty(String),
    Toggle,
    Clear,
    Uppercase,
    Lowercase,
    Trim,
}

impl SetOperation {
    /// Parse an `operation` attribute value. `key` is only consulted for
    /// `setProperty`.
    pub fn parse(name: &str, key: Option<String>) -> Result<Self, EvalError> {
        Ok(match name {
            "assign" => SetOperation::Assign,
            "increment" => SetOperation::Increment,
            "decrement" => SetOperation::Decrement,
            "add" => SetOperation::Add,
            "subtract" => SetOperation::Subtract,
            "multiply" => SetOperation::Multiply,
            "append" => SetOperation::Append,
            "prepend" => SetOperation::Prepend,
            "remove" => SetOperation::Remove,
            "merge" => SetOperation::Merge,
            "setProperty" => {
                let key = key.ok_or_else(|| missing_operand("setProperty (missing `key`)"))?;
                SetOperation::SetProperty(key)
            }
            "toggle" => SetOperation::Toggle,
            "clear" => SetOperation::Clear,
            "uppercase" => SetOperation::Uppercase,
            "lowercase" => SetOperation::Lowercase,
            "trim" => SetOperation::Trim,
            other => return Err(unknown_operation(other)),
        })
    }

    fn name(&self) -> &'static str {
        match self {
            SetOperation::Assign => "assign",
            SetOperation::Increment => "increment",
            SetOperation::Decrement => "decrement",
            SetOperation::Add => "add",
            SetOperation::Subtract => "subtract",
            SetOperation::Multiply => "multiply",
            SetOperation::Append => "append",
            SetOperation::Prepend => "prepend",
            SetOperation::Remove => "remove",
            SetOperation::Merge => "merge",
            SetOperation::SetProperty(_) => "setProperty",
            SetOperation::Toggle => "toggle",
            SetOperation::Clear => "clear",
            SetOperation::Uppercase => "uppercase",
            SetOperation::Lowercase => "lowercase",
            SetOperation::Trim => "trim",
        }
    }
}

/// Compute the next value for a binding.
///
/// `current` is the existing binding (if any); `operand` is the tag's
/// `value` (if any). Numeric operations treat a missing or null current
/// value as 0; array operations treat it as an empty array; object
/// operations as an empty object.
pub fn apply_operation(
    op: &SetOperation,
    current: Option<Value>,
    operand: Option<Value>,
) -> Result<Value, EvalError> {
    let current = current.unwrap_or(Value::Null);

    match op {
        SetOperation::Assign => operand.ok_or_else(|| missing_operand(op.name())),
        SetOperation::Increment => Ok(Value::Number(current_number(&current)? + 1.0)),
        SetOperation::Decrement => Ok(Value::Number(current_number(&current)? - 1.0)),
        SetOperation::Add | SetOperation::Subtract | SetOperation::Multiply => {
            let operand = operand.ok_or_else(|| missing_operand(op.name()))?;
            let rhs = operand
                .as_number()
                .ok_or_else(|| type_mismatch("number", &operand))?;
            let lhs = current_number(&current)?;
            Ok(Value::Number(match op {
                SetOperation::Add => lhs + rhs,
                SetOperation::Subtract => lhs - rhs,
                _ => lhs * rhs,
            }))
        }
        SetOperation::Append | SetOperation::Prepend => {
            let operand = operand.ok_or_else(|| missing_operand(op.name()))?;
            let mut items = current_array(&current)?;
            match op {
                SetOperation::Append => items.push(operand),
                _ => items.insert(0, operand),
            }
            Ok(Value::array(items))
        }
        SetOperation::Remove => {
            let operand = operand.ok_or_else(|| missing_operand(op.name()))?;
            let mut items = current_array(&current)?;
            if let Some(pos) = items.iter().position(|item| loose_eq(item, &operand)) {
                items.remove(pos);
            }
            Ok(Value::array(items))
        }
        SetOperation::Merge => {
            let operand = operand.ok_or_else(|| missing_operand(op.name()))?;
            let Value::Object(incoming) = &operand else {
                return Err(type_mismatch("object", &operand));
            };
            let mut entries = current_object(&current)?;
            for (k, v) in incoming.iter() {
                entries.insert(k.clone(), v.clone());
            }
            Ok(Value::object(entries))
        }
        SetOperation::SetProperty(key) => {
            let operand = operand.ok_or_else(|| missing_operand(op.name()))?;
            let mut entries = current_object(&current)?;
            entries.insert(key.clone(), operand);
            Ok(Value::object(entries))
        }
        SetOperation::Toggle => Ok(Value::Bool(!current.is_truthy())),
        SetOperation::Clear => Ok(match current {
            Value::Str(_) => Value::string(""),
            Value::Number(_) => Value::Number(0.0),
            Value::Bool(_) => Value::Bool(false),
            Value::Array(_) => Value::array(vec![]),
            Value::Object(_) => Value::object(std::collections::BTreeMap::new()),
            _ => Value::Null,
        }),
        SetOperation::Uppercase => Ok(Value::string(current.to_display_string().to_uppercase())),
        SetOperation::Lowercase => Ok(Value::string(current.to_display_string().to_lowercase())),
        SetOperation::Trim => Ok(Value::string(current.to_display_string().trim())),
    }
}

fn current_number(current: &Value) -> Result<f64, EvalError> {
    if current.is_null() {
        return Ok(0.0);
    }
    current
        .as_number()
        .ok_or_else(|| type_mismatch("number", current))
}

fn current_array(current: &Value) -> Result<Vec<Value>, EvalError> {
    match current {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items.as_ref().clone()),
        other => Err(type_mismatch("array", other)),
    }
}

fn current_object(current: &Value) -> Result<BTreeMap<String, Value>, EvalError> {
    match current {
        Value::Null => Ok(BTreeMap::new()),
        Value::Object(entries) => Ok(entries.as_ref().clone()),
        other => Err(type_mismatch("object", other)),
    }
}
