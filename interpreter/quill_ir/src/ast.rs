//! Template AST.
//!
//! A parsed template is a `Document`: an ordered list of root `Node`s, each
//! with an attribute list and child list. The tag vocabulary is a closed
//! enum (`NodeKind`); execution dispatches on it with a single `match`, so
//! adding a tag kind is a local change. Tags outside the vocabulary are kept
//! as `Opaque` pass-through nodes.

use crate::{ExprId, Name, Span};

/// One piece of interpolated text: literal text or a `{...}` expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    Text(String),
    Expr(ExprId),
}

/// An attribute value.
///
/// Expression spans are parsed at parse time and stored as arena handles,
/// never as raw strings.
#[derive(Clone, Debug, PartialEq)]
pub enum AttrValue {
    /// Plain text with no expression spans.
    Literal(String),
    /// A value that is exactly one `{expr}` span.
    Expr(ExprId),
    /// Mixed literal text and expression spans.
    Segments(Vec<Segment>),
}

/// A tag attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct Attr {
    pub name: Name,
    pub value: AttrValue,
    pub span: Span,
}

/// Template tag vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Text between tags, with interpolation segments.
    Text(Vec<Segment>),
    /// `<q:set name= value= operation= ...>`
    Set,
    /// `<q:if condition=>`
    If,
    /// `<q:elseif condition=>`
    ElseIf,
    /// `<q:else>`
    Else,
    /// `<q:loop>` in any of its forms (range, array, list, object, query).
    Loop,
    /// `<q:break>`
    Break,
    /// `<q:continue>`
    Continue,
    /// `<q:function name= ...>`
    Function,
    /// `<q:param name= ...>` inside a function.
    Param,
    /// `<q:return value=>` inside a function.
    Return,
    /// `<q:invoke function= ...>`
    Invoke,
    /// `<q:arg name= value=>` inside an invoke.
    Arg,
    /// `<q:output>` — emits its interpolated body.
    Output,
    /// Unknown tag, retained for pass-through rendering.
    Opaque(Name),
}

impl NodeKind {
    /// Short label for diagnostics and trace events.
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Text(_) => "text",
            NodeKind::Set => "q:set",
            NodeKind::If => "q:if",
            NodeKind::ElseIf => "q:elseif",
            NodeKind::Else => "q:else",
            NodeKind::Loop => "q:loop",
            NodeKind::Break => "q:break",
            NodeKind::Continue => "q:continue",
            NodeKind::Function => "q:function",
            NodeKind::Param => "q:param",
            NodeKind::Return => "q:return",
            NodeKind::Invoke => "q:invoke",
            NodeKind::Arg => "q:arg",
            NodeKind::Output => "q:output",
            NodeKind::Opaque(_) => "opaque",
        }
    }
}

/// One node of the template tree. Immutable once parsed.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub attrs: Vec<Attr>,
    pub children: Vec<Node>,
    pub span: Span,
}

impl Node {
    pub fn new(kind: NodeKind, span: Span) -> Self {
        Node {
            kind,
            attrs: Vec::new(),
            children: Vec::new(),
            span,
        }
    }

    /// Look up an attribute value by interned name.
    pub fn attr(&self, name: Name) -> Option<&AttrValue> {
        self.attrs
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| &attr.value)
    }

    /// Whether this node carries an attribute at all.
    pub fn has_attr(&self, name: Name) -> bool {
        self.attrs.iter().any(|attr| attr.name == name)
    }
}

/// A parsed template: the ordered forest of root nodes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    pub roots: Vec<Node>,
}

impl Document {
    pub fn new(roots: Vec<Node>) -> Self {
        Document { roots }
    }
}
