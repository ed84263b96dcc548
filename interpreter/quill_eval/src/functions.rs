//! User-defined functions: registry, parameter contracts, memoization.
//!
//! Definitions are harvested from the document before execution starts, so
//! call order and definition order are independent. A definition registers
//! once per name; re-registering the same name keeps the existing entry
//! (and its memo cache) intact.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::sync::Arc;

use quill_diagnostic::{Diagnostic, ErrorCode};
use quill_ir::{AttrValue, Document, Name, Node, NodeKind, StringInterner};
use regex::Regex;

use crate::errors::{param_rule_violation, EvalError};
use crate::names::AttrNames;
use crate::operators::loose_eq;
use crate::Value;

/// Declared parameter type. `Any` skips the check.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum ParamType {
    #[default]
    Any,
    Number,
    String,
    Boolean,
    Array,
    Object,
    Date,
}

impl ParamType {
    pub fn parse(text: &str) -> Option<Self> {
        Some(match text {
            "any" => ParamType::Any,
            "number" | "numeric" => ParamType::Number,
            "string" => ParamType::String,
            "boolean" => ParamType::Boolean,
            "array" => ParamType::Array,
            "object" | "struct" => ParamType::Object,
            "date" => ParamType::Date,
            _ => return None,
        })
    }

    fn describe(self) -> &'static str {
        match self {
            ParamType::Any => "any",
            ParamType::Number => "number",
            ParamType::String => "string",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
            ParamType::Date => "date",
        }
    }
}

/// Declarative constraints beyond the type check.
#[derive(Clone, Debug, Default)]
pub struct ValidationRules {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub pattern: Option<Regex>,
    pub one_of: Option<Vec<Value>>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.pattern.is_none() && self.one_of.is_none()
    }
}

/// One declared parameter of a function.
#[derive(Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub ty: ParamType,
    pub required: bool,
    /// Default expression, evaluated in the callee's environment at bind
    /// time, not at definition time.
    pub default: Option<AttrValue>,
    pub rules: ValidationRules,
}

/// Check and normalize a bound argument against its parameter contract.
///
/// Type checks coerce where the value model allows it (a numeric string
/// satisfies `number` and is normalized to a `Number`); rule checks never
/// coerce. All failures are validation errors and abort the run even in
/// lenient mode.
pub fn validate_param(
    function: &str,
    param: &Param,
    value: Value,
    interner: &StringInterner,
) -> Result<Value, EvalError> {
    let param_name = interner.lookup(param.name);
    let violation = |rule: String| param_rule_violation(function, param_name.as_ref(), rule);

    let value = match param.ty {
        ParamType::Any => value,
        ParamType::Number => match value.as_number() {
            Some(n) => Value::Number(n),
            None => return Err(violation(format!("type number (got {})", value.type_name()))),
        },
        ParamType::String => match &value {
            Value::Str(_) => value,
            Value::Number(_) | Value::Bool(_) => Value::string(value.to_display_string()),
            _ => return Err(violation(format!("type string (got {})", value.type_name()))),
        },
        ParamType::Boolean => match &value {
            Value::Bool(_) => value,
            Value::Str(s) if s.as_ref() == "true" => Value::Bool(true),
            Value::Str(s) if s.as_ref() == "false" => Value::Bool(false),
            _ => {
                return Err(violation(format!(
                    "type boolean (got {})",
                    value.type_name()
                )))
            }
        },
        ParamType::Array => match &value {
            Value::Array(_) => value,
            _ => return Err(violation(format!("type array (got {})", value.type_name()))),
        },
        ParamType::Object => match &value {
            Value::Object(_) => value,
            _ => return Err(violation(format!("type object (got {})", value.type_name()))),
        },
        ParamType::Date => match &value {
            Value::Date(_) | Value::DateTime(_) => value,
            _ => return Err(violation(format!("type date (got {})", value.type_name()))),
        },
    };

    if param.rules.min.is_some() || param.rules.max.is_some() {
        let n = value
            .as_number()
            .ok_or_else(|| violation(format!("min/max on non-number {}", value.type_name())))?;
        if let Some(min) = param.rules.min {
            if n < min {
                return Err(violation(format!("min {min} (got {n})")));
            }
        }
        if let Some(max) = param.rules.max {
            if n > max {
                return Err(violation(format!("max {max} (got {n})")));
            }
        }
    }
    if let Some(pattern) = &param.rules.pattern {
        let text = value.to_display_string();
        if !pattern.is_match(&text) {
            return Err(violation(format!("pattern {}", pattern.as_str())));
        }
    }
    if let Some(allowed) = &param.rules.one_of {
        if !allowed.iter().any(|candidate| loose_eq(candidate, &value)) {
            return Err(violation("oneOf".to_string()));
        }
    }

    Ok(value)
}

/// `<q:function>` attribute modifiers. `return_type` and `pure` are
/// declared contracts the engine records but does not enforce; `access`
/// is a host-facing visibility marker (the engine itself calls every
/// registered function).
#[derive(Copy, Clone, Debug, Default)]
pub struct FunctionModifiers {
    pub return_type: ParamType,
    pub access: Option<Name>,
    pub pure: bool,
    pub memoize: bool,
}

/// A harvested function definition.
pub struct FunctionDef {
    pub name: Name,
    pub params: Vec<Param>,
    /// Body nodes, `Param` declarations excluded.
    pub body: Vec<Node>,
    pub modifiers: FunctionModifiers,
    memo: Mutex<FxHashMap<String, Value>>,
}

impl FunctionDef {
    pub fn new(
        name: Name,
        params: Vec<Param>,
        body: Vec<Node>,
        modifiers: FunctionModifiers,
    ) -> Self {
        FunctionDef {
            name,
            params,
            body,
            modifiers,
            memo: Mutex::new(FxHashMap::default()),
        }
    }

    /// Cache key: the bound arguments, in declaration order, as canonical
    /// JSON. `BTreeMap`-backed objects make this deterministic.
    pub fn memo_key(&self, bound: &[Value]) -> String {
        let args: Vec<serde_json::Value> = bound.iter().map(Value::to_json).collect();
        serde_json::Value::Array(args).to_string()
    }

    pub fn memo_lookup(&self, key: &str) -> Option<Value> {
        self.memo.lock().get(key).cloned()
    }

    pub fn memo_store(&self, key: String, value: Value) {
        self.memo.lock().insert(key, value);
    }

    /// Drop every cached result. Hosts call this when the data a memoized
    /// function reads has changed.
    pub fn memo_clear(&self) {
        self.memo.lock().clear();
    }

    #[cfg(test)]
    pub fn memo_len(&self) -> usize {
        self.memo.lock().len()
    }
}

impl std::fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("params", &self.params.len())
            .field("modifiers", &self.modifiers)
            .finish_non_exhaustive()
    }
}

/// Name → definition table. Cloning shares the `Arc`-backed definitions
/// (and therefore their memo caches).
#[derive(Clone, Debug, Default)]
pub struct FunctionRegistry {
    defs: FxHashMap<Name, Arc<FunctionDef>>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        FunctionRegistry::default()
    }

    /// First definition of a name wins; later duplicates are ignored so an
    /// already-populated memo cache survives re-harvesting.
    pub fn register(&mut self, def: Arc<FunctionDef>) {
        self.defs.entry(def.name).or_insert(def);
    }

    pub fn get(&self, name: Name) -> Option<Arc<FunctionDef>> {
        self.defs.get(&name).cloned()
    }

    pub fn contains(&self, name: Name) -> bool {
        self.defs.contains_key(&name)
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}

/// Pre-execution pass: walk the document and register every
/// `<q:function>` definition, so calls may precede definitions in source
/// order.
///
/// Definition-shape problems (non-literal names, bad patterns, unknown
/// types) are warnings, not errors; a definition with no usable name is
/// skipped.
pub fn harvest(
    document: &Document,
    names: &AttrNames,
    interner: &StringInterner,
    registry: &mut FunctionRegistry,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    harvest_nodes(&document.roots, names, interner, registry, &mut diagnostics);
    diagnostics
}

fn harvest_nodes(
    nodes: &[Node],
    names: &AttrNames,
    interner: &StringInterner,
    registry: &mut FunctionRegistry,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for node in nodes {
        if matches!(node.kind, NodeKind::Function) {
            if let Some(def) = harvest_function(node, names, interner, diagnostics) {
                registry.register(Arc::new(def));
            }
        }
        harvest_nodes(&node.children, names, interner, registry, diagnostics);
    }
}

fn harvest_function(
    node: &Node,
    names: &AttrNames,
    interner: &StringInterner,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<FunctionDef> {
    let Some(name_text) = literal_attr(node, names.name) else {
        diagnostics.push(
            Diagnostic::warning(
                ErrorCode::MalformedAttribute,
                "function definitions need a literal `name`; skipping",
            )
            .with_label(node.span, "this definition"),
        );
        return None;
    };
    let name = interner.intern(&name_text);

    let return_type = match literal_attr(node, names.returns) {
        Some(text) => match ParamType::parse(&text) {
            Some(ty) => ty,
            None => {
                diagnostics.push(
                    Diagnostic::warning(
                        ErrorCode::MalformedAttribute,
                        format!("unknown return type `{text}` on `{name_text}`; treating as `any`"),
                    )
                    .with_label(node.span, "declared here"),
                );
                ParamType::Any
            }
        },
        None => ParamType::Any,
    };
    let modifiers = FunctionModifiers {
        return_type,
        access: literal_attr(node, names.access).map(|text| interner.intern(&text)),
        pure: literal_attr(node, names.pure).as_deref() == Some("true"),
        memoize: literal_attr(node, names.memoize).as_deref() == Some("true"),
    };

    let mut params = Vec::new();
    let mut body = Vec::new();
    for child in &node.children {
        if matches!(child.kind, NodeKind::Param) {
            if let Some(param) = harvest_param(child, &name_text, names, interner, diagnostics) {
                params.push(param);
            }
        } else {
            body.push(child.clone());
        }
    }
    Some(FunctionDef::new(name, params, body, modifiers))
}

fn harvest_param(
    node: &Node,
    function: &str,
    names: &AttrNames,
    interner: &StringInterner,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<Param> {
    let Some(name_text) = literal_attr(node, names.name) else {
        diagnostics.push(
            Diagnostic::warning(
                ErrorCode::MalformedAttribute,
                format!("parameter of `{function}` needs a literal `name`; skipping"),
            )
            .with_label(node.span, "this parameter"),
        );
        return None;
    };

    let ty = match literal_attr(node, names.ty) {
        Some(text) => match ParamType::parse(&text) {
            Some(ty) => ty,
            None => {
                diagnostics.push(
                    Diagnostic::warning(
                        ErrorCode::MalformedAttribute,
                        format!("unknown parameter type `{text}`; treating as `any`"),
                    )
                    .with_label(node.span, "declared here"),
                );
                ParamType::Any
            }
        },
        None => ParamType::Any,
    };

    let pattern = literal_attr(node, names.pattern).and_then(|text| match Regex::new(&text) {
        Ok(regex) => Some(regex),
        Err(err) => {
            diagnostics.push(
                Diagnostic::warning(
                    ErrorCode::MalformedAttribute,
                    format!("invalid `pattern` for parameter `{name_text}`: {err}"),
                )
                .with_label(node.span, "declared here"),
            );
            None
        }
    });

    let rules = ValidationRules {
        min: numeric_literal(node, names.min),
        max: numeric_literal(node, names.max),
        pattern,
        one_of: literal_attr(node, names.one_of).map(|text| {
            text.split(',')
                .map(|item| Value::string(item.trim()))
                .collect()
        }),
    };

    Some(Param {
        name: interner.intern(&name_text),
        ty,
        required: literal_attr(node, names.required).as_deref() == Some("true"),
        default: node.attr(names.default).cloned(),
        rules,
    })
}

fn literal_attr(node: &Node, name: Name) -> Option<String> {
    match node.attr(name) {
        Some(AttrValue::Literal(text)) => Some(text.clone()),
        _ => None,
    }
}

fn numeric_literal(node: &Node, name: Name) -> Option<f64> {
    literal_attr(node, name).and_then(|text| text.trim().parse().ok())
}
