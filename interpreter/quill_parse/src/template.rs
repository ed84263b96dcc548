//! Template scanner: tags, attributes, text, interpolation spans.
//!
//! Hand-written over the raw bytes. All structural delimiters (`<`, `>`,
//! `{`, `}`, quotes) are ASCII, so byte-level scanning is UTF-8 safe as long
//! as text is copied out in whole ranges. `{{` and `}}` escape literal
//! braces in text and attribute values.

use quill_diagnostic::{Diagnostic, ErrorCode};
use quill_ir::{
    Attr, AttrValue, Document, ExprArena, Node, NodeKind, Segment, Span, StringInterner,
};

use crate::error::{
    malformed_attribute, mismatched_tag, unclosed_tag, unexpected_token, unknown_tag,
    unterminated_expr, ParseError,
};
use crate::grammar::parse_expression;
use crate::stack::ensure_sufficient_stack;
use crate::{ParseOptions, ParseResult};

/// Parse a full template.
pub fn parse(
    text: &str,
    interner: &StringInterner,
    options: ParseOptions,
) -> Result<ParseResult, ParseError> {
    let mut parser = TemplateParser {
        src: text,
        pos: 0,
        interner,
        arena: ExprArena::new(),
        options,
        diagnostics: Vec::new(),
    };
    let roots = parser.parse_children(None)?;
    Ok(ParseResult {
        document: Document::new(roots),
        arena: parser.arena,
        diagnostics: parser.diagnostics,
    })
}

/// Tags that never take children and need no close tag.
fn is_void(kind: &NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Set
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Param
            | NodeKind::Return
            | NodeKind::Arg
    )
}

struct TemplateParser<'src> {
    src: &'src str,
    pos: usize,
    interner: &'src StringInterner,
    arena: ExprArena,
    options: ParseOptions,
    diagnostics: Vec<Diagnostic>,
}

impl TemplateParser<'_> {
    #[inline]
    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    #[inline]
    fn byte(&self) -> u8 {
        self.src.as_bytes()[self.pos]
    }

    #[inline]
    fn byte_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    #[inline]
    fn starts_with(&self, prefix: &str) -> bool {
        self.src[self.pos..].starts_with(prefix)
    }

    #[inline]
    fn here(&self) -> u32 {
        u32::try_from(self.pos).unwrap_or(u32::MAX)
    }

    fn skip_ws(&mut self) {
        while !self.at_end() && self.byte().is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Parse nodes until EOF (top level) or the close tag of `parent`.
    fn parse_children(&mut self, parent: Option<(&str, Span)>) -> Result<Vec<Node>, ParseError> {
        let mut nodes = Vec::new();

        loop {
            let text_node = self.scan_text()?;
            if let Some(node) = text_node {
                nodes.push(node);
            }

            if self.at_end() {
                return match parent {
                    Some((name, open_span)) => Err(unclosed_tag(name, open_span)),
                    None => Ok(nodes),
                };
            }

            // scan_text only stops at `<` or EOF
            if self.starts_with("<!--") {
                self.skip_comment()?;
            } else if self.starts_with("</") {
                let close_start = self.here();
                self.pos += 2;
                let name = self.scan_tag_name();
                self.skip_ws();
                if self.at_end() || self.byte() != b'>' {
                    return Err(malformed_attribute(
                        format!("`</{name}` is missing its `>`"),
                        Span::new(close_start, self.here()),
                    ));
                }
                self.pos += 1;
                return match parent {
                    Some((open_name, _)) if open_name == name => Ok(nodes),
                    Some((open_name, _)) => Err(mismatched_tag(
                        open_name,
                        &name,
                        Span::new(close_start, self.here()),
                    )),
                    None => Err(unexpected_token(
                        format!("close tag `</{name}>` with no open tag"),
                        Span::new(close_start, self.here()),
                    )),
                };
            } else {
                let node = ensure_sufficient_stack(|| self.parse_element())?;
                nodes.push(node);
            }
        }
    }

    /// Scan text and interpolation up to the next `<` or EOF.
    ///
    /// Returns a `Text` node unless the run is empty.
    fn scan_text(&mut self) -> Result<Option<Node>, ParseError> {
        let start = self.here();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut run_start = self.pos;

        while !self.at_end() {
            match self.byte() {
                b'<' => break,
                b'{' => {
                    literal.push_str(&self.src[run_start..self.pos]);
                    if self.byte_at(1) == Some(b'{') {
                        literal.push('{');
                        self.pos += 2;
                    } else {
                        if !literal.is_empty() {
                            segments.push(Segment::Text(std::mem::take(&mut literal)));
                        }
                        let expr = self.scan_expr_span()?;
                        segments.push(Segment::Expr(expr));
                    }
                    run_start = self.pos;
                }
                b'}' if self.byte_at(1) == Some(b'}') => {
                    literal.push_str(&self.src[run_start..self.pos]);
                    literal.push('}');
                    self.pos += 2;
                    run_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }

        literal.push_str(&self.src[run_start..self.pos]);
        if !literal.is_empty() {
            segments.push(Segment::Text(literal));
        }
        if segments.is_empty() {
            return Ok(None);
        }
        Ok(Some(Node::new(
            NodeKind::Text(segments),
            Span::new(start, self.here()),
        )))
    }

    /// Scan one `{...}` span (cursor on `{`) and parse its expression.
    ///
    /// The closing `}` is found with string-literal awareness so `{"}"}`
    /// parses; the text between the braces goes through the expression
    /// grammar with its template offset preserved.
    fn scan_expr_span(&mut self) -> Result<quill_ir::ExprId, ParseError> {
        let open = self.here();
        self.pos += 1;
        let expr_start = self.pos;
        let mut in_string: Option<u8> = None;

        while !self.at_end() {
            let b = self.byte();
            match in_string {
                Some(quote) => {
                    if b == b'\\' {
                        self.pos += 1; // skip the escaped byte too
                    } else if b == quote {
                        in_string = None;
                    }
                }
                None => match b {
                    b'"' | b'\'' => in_string = Some(b),
                    b'}' => {
                        let text = &self.src[expr_start..self.pos];
                        let offset = u32::try_from(expr_start).unwrap_or(u32::MAX);
                        let expr = parse_expression(text, offset, self.interner, &mut self.arena)?;
                        self.pos += 1;
                        return Ok(expr);
                    }
                    _ => {}
                },
            }
            self.pos += 1;
        }

        Err(unterminated_expr(Span::new(open, self.here())))
    }

    /// Skip `<!-- ... -->`.
    fn skip_comment(&mut self) -> Result<(), ParseError> {
        let start = self.here();
        match self.src[self.pos..].find("-->") {
            Some(rel) => {
                self.pos += rel + 3;
                Ok(())
            }
            None => Err(ParseError::new(
                ErrorCode::UnclosedTag,
                "comment is never closed by `-->`",
                Span::new(start, self.here()),
            )),
        }
    }

    fn scan_tag_name(&mut self) -> String {
        let start = self.pos;
        while !self.at_end() {
            let b = self.byte();
            if b.is_ascii_alphanumeric() || b == b':' || b == b'_' || b == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    /// Parse one element (cursor on `<`).
    fn parse_element(&mut self) -> Result<Node, ParseError> {
        let open_start = self.here();
        self.pos += 1;
        let name = self.scan_tag_name();
        if name.is_empty() {
            return Err(unexpected_token(
                "`<` with no tag name",
                Span::new(open_start, self.here()),
            ));
        }

        let kind = self.node_kind(&name, Span::new(open_start, self.here()))?;
        let mut attrs = Vec::new();
        let mut self_closing = false;

        loop {
            self.skip_ws();
            if self.at_end() {
                return Err(unclosed_tag(&name, Span::new(open_start, self.here())));
            }
            if self.starts_with("/>") {
                self.pos += 2;
                self_closing = true;
                break;
            }
            if self.byte() == b'>' {
                self.pos += 1;
                break;
            }
            attrs.push(self.parse_attr()?);
        }

        let open_span = Span::new(open_start, self.here());
        let mut node = Node::new(kind, open_span);
        node.attrs = attrs;

        if !self_closing && !is_void(&node.kind) {
            node.children = self.parse_children(Some((&name, open_span)))?;
            node.span = Span::new(open_start, self.here());
        }
        Ok(node)
    }

    /// Parse one `name="value"` attribute.
    fn parse_attr(&mut self) -> Result<Attr, ParseError> {
        let start = self.here();
        let name = self.scan_attr_name();
        if name.is_empty() {
            return Err(malformed_attribute(
                "expected attribute name",
                Span::new(start, self.here()),
            ));
        }
        self.skip_ws();
        if self.at_end() || self.byte() != b'=' {
            return Err(malformed_attribute(
                format!("attribute `{name}` is missing `=`"),
                Span::new(start, self.here()),
            ));
        }
        self.pos += 1;
        self.skip_ws();
        if self.at_end() || (self.byte() != b'"' && self.byte() != b'\'') {
            return Err(malformed_attribute(
                format!("attribute `{name}` value must be quoted"),
                Span::new(start, self.here()),
            ));
        }
        let quote = self.byte();
        self.pos += 1;
        let value = self.parse_attr_value(quote, start)?;
        Ok(Attr {
            name: self.interner.intern(&name),
            value,
            span: Span::new(start, self.here()),
        })
    }

    fn scan_attr_name(&mut self) -> String {
        let start = self.pos;
        while !self.at_end() {
            let b = self.byte();
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'-' {
                self.pos += 1;
            } else {
                break;
            }
        }
        self.src[start..self.pos].to_string()
    }

    /// Parse a quoted attribute value with interpolation.
    fn parse_attr_value(&mut self, quote: u8, attr_start: u32) -> Result<AttrValue, ParseError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut run_start = self.pos;

        while !self.at_end() {
            let b = self.byte();
            if b == quote {
                literal.push_str(&self.src[run_start..self.pos]);
                self.pos += 1;
                if !literal.is_empty() {
                    segments.push(Segment::Text(literal));
                }
                return Ok(collapse_segments(segments));
            }
            match b {
                b'{' => {
                    literal.push_str(&self.src[run_start..self.pos]);
                    if self.byte_at(1) == Some(b'{') {
                        literal.push('{');
                        self.pos += 2;
                    } else {
                        if !literal.is_empty() {
                            segments.push(Segment::Text(std::mem::take(&mut literal)));
                        }
                        let expr = self.scan_expr_span()?;
                        segments.push(Segment::Expr(expr));
                    }
                    run_start = self.pos;
                }
                b'}' if self.byte_at(1) == Some(b'}') => {
                    literal.push_str(&self.src[run_start..self.pos]);
                    literal.push('}');
                    self.pos += 2;
                    run_start = self.pos;
                }
                _ => self.pos += 1,
            }
        }

        Err(malformed_attribute(
            "attribute value is never closed by its quote",
            Span::new(attr_start, self.here()),
        ))
    }

    /// Map a tag name onto the closed `NodeKind` vocabulary.
    ///
    /// Unknown `q:` tags are pass-through (with a warning) unless strict
    /// mode is on; tags outside the `q:` namespace are always pass-through.
    fn node_kind(&mut self, name: &str, span: Span) -> Result<NodeKind, ParseError> {
        let Some(rest) = name.strip_prefix("q:") else {
            return Ok(NodeKind::Opaque(self.interner.intern(name)));
        };
        let kind = match rest {
            "set" => NodeKind::Set,
            "if" => NodeKind::If,
            "elseif" => NodeKind::ElseIf,
            "else" => NodeKind::Else,
            "loop" => NodeKind::Loop,
            "break" => NodeKind::Break,
            "continue" => NodeKind::Continue,
            "function" => NodeKind::Function,
            "param" => NodeKind::Param,
            "return" => NodeKind::Return,
            "invoke" => NodeKind::Invoke,
            "arg" => NodeKind::Arg,
            "output" => NodeKind::Output,
            _ => {
                if self.options.strict_tags {
                    return Err(unknown_tag(name, span));
                }
                self.diagnostics.push(
                    Diagnostic::warning(
                        ErrorCode::UnknownTag,
                        format!("unknown tag `<{name}>` passed through"),
                    )
                    .with_label(span, "not part of the tag vocabulary"),
                );
                NodeKind::Opaque(self.interner.intern(name))
            }
        };
        Ok(kind)
    }
}

/// Fold an attribute's segments into the simplest `AttrValue` form.
fn collapse_segments(mut segments: Vec<Segment>) -> AttrValue {
    match segments.len() {
        0 => AttrValue::Literal(String::new()),
        1 => match segments.pop() {
            Some(Segment::Text(text)) => AttrValue::Literal(text),
            Some(Segment::Expr(id)) => AttrValue::Expr(id),
            None => AttrValue::Literal(String::new()),
        },
        _ => AttrValue::Segments(segments),
    }
}
