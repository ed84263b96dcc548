//! Expression grammar.
//!
//! Recursive-descent precedence chain, low to high:
//! ternary `? :` → `||` → `&&` → comparison → additive → multiplicative →
//! unary `! -` → postfix (field, index) → primary (literal, identifier,
//! call, parenthesized, array literal).

use quill_ir::{
    Arg, BinaryOp, Expr, ExprArena, ExprId, ExprKind, Span, StringInterner, TokenKind, UnaryOp,
};
use smallvec::SmallVec;

use crate::cursor::Cursor;
use crate::error::{unexpected_token, ParseError};
use crate::stack::ensure_sufficient_stack;

/// Parse the full text of one `{...}` span into the arena.
///
/// `offset` is the byte position of `text` within the template; all spans
/// produced here are template-relative.
pub fn parse_expression(
    text: &str,
    offset: u32,
    interner: &StringInterner,
    arena: &mut ExprArena,
) -> Result<ExprId, ParseError> {
    let tokens = quill_lexer::lex(text, offset, interner);
    let mut parser = ExprParser {
        cursor: Cursor::new(tokens),
        arena,
    };
    let expr = parser.parse_expr()?;
    if !parser.cursor.at_eof() {
        let token = parser.cursor.peek();
        return Err(unexpected_token(token.kind.describe(), token.span));
    }
    Ok(expr)
}

struct ExprParser<'a> {
    cursor: Cursor,
    arena: &'a mut ExprArena,
}

impl ExprParser<'_> {
    fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        self.arena.alloc(Expr::new(kind, span))
    }

    fn span_of(&self, id: ExprId) -> Span {
        self.arena.get(id).span
    }

    /// Parse an expression (ternary is the lowest precedence).
    fn parse_expr(&mut self) -> Result<ExprId, ParseError> {
        ensure_sufficient_stack(|| self.parse_ternary())
    }

    fn parse_ternary(&mut self) -> Result<ExprId, ParseError> {
        let cond = self.parse_or()?;

        if self.cursor.eat(TokenKind::Question) {
            let then = self.parse_expr()?;
            if !self.cursor.eat(TokenKind::Colon) {
                let token = self.cursor.peek();
                return Err(unexpected_token(
                    format!("{} (expected `:`)", token.kind.describe()),
                    token.span,
                ));
            }
            let otherwise = self.parse_expr()?;
            let span = self.span_of(cond).merge(self.span_of(otherwise));
            return Ok(self.alloc(
                ExprKind::Ternary {
                    cond,
                    then,
                    otherwise,
                },
                span,
            ));
        }

        Ok(cond)
    }

    fn parse_or(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_and()?;

        while self.cursor.eat(TokenKind::PipePipe) {
            let right = self.parse_and()?;
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.alloc(
                ExprKind::Binary {
                    op: BinaryOp::Or,
                    left,
                    right,
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_comparison()?;

        while self.cursor.eat(TokenKind::AmpAmp) {
            let right = self.parse_comparison()?;
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.alloc(
                ExprKind::Binary {
                    op: BinaryOp::And,
                    left,
                    right,
                },
                span,
            );
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.cursor.peek().kind {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.cursor.advance();
            let right = self.parse_additive()?;
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.alloc(ExprKind::Binary { op, left, right }, span);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.cursor.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.cursor.advance();
            let right = self.parse_multiplicative()?;
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.alloc(ExprKind::Binary { op, left, right }, span);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<ExprId, ParseError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.cursor.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.cursor.advance();
            let right = self.parse_unary()?;
            let span = self.span_of(left).merge(self.span_of(right));
            left = self.alloc(ExprKind::Binary { op, left, right }, span);
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<ExprId, ParseError> {
        let token = self.cursor.peek();
        let op = match token.kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            _ => None,
        };
        if let Some(op) = op {
            self.cursor.advance();
            let operand = self.parse_unary()?;
            let span = token.span.merge(self.span_of(operand));
            return Ok(self.alloc(ExprKind::Unary { op, operand }, span));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<ExprId, ParseError> {
        let mut base = self.parse_primary()?;

        loop {
            if self.cursor.eat(TokenKind::Dot) {
                let token = self.cursor.advance();
                let TokenKind::Ident(name) = token.kind else {
                    return Err(unexpected_token(
                        format!("{} (expected property name)", token.kind.describe()),
                        token.span,
                    ));
                };
                let span = self.span_of(base).merge(token.span);
                base = self.alloc(ExprKind::Field { base, name }, span);
            } else if self.cursor.eat(TokenKind::LBracket) {
                let index = self.parse_expr()?;
                let close = self.cursor.peek();
                if !self.cursor.eat(TokenKind::RBracket) {
                    return Err(unexpected_token(
                        format!("{} (expected `]`)", close.kind.describe()),
                        close.span,
                    ));
                }
                let span = self.span_of(base).merge(close.span);
                base = self.alloc(ExprKind::Index { base, index }, span);
            } else {
                break;
            }
        }

        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<ExprId, ParseError> {
        let token = self.cursor.advance();
        match token.kind {
            TokenKind::Number(n) => Ok(self.alloc(ExprKind::Number(n), token.span)),
            TokenKind::Str(name) => Ok(self.alloc(ExprKind::Str(name), token.span)),
            TokenKind::True => Ok(self.alloc(ExprKind::Bool(true), token.span)),
            TokenKind::False => Ok(self.alloc(ExprKind::Bool(false), token.span)),
            TokenKind::Null => Ok(self.alloc(ExprKind::Null, token.span)),
            TokenKind::Ident(name) => {
                if self.cursor.check(TokenKind::LParen) {
                    return self.parse_call(name, token.span);
                }
                Ok(self.alloc(ExprKind::Ident(name), token.span))
            }
            TokenKind::LParen => {
                let inner = self.parse_expr()?;
                let close = self.cursor.peek();
                if !self.cursor.eat(TokenKind::RParen) {
                    return Err(unexpected_token(
                        format!("{} (expected `)`)", close.kind.describe()),
                        close.span,
                    ));
                }
                Ok(inner)
            }
            TokenKind::LBracket => self.parse_array(token.span),
            other => Err(unexpected_token(other.describe(), token.span)),
        }
    }

    /// Parse `[a, b, c]` (the opening bracket is already consumed).
    fn parse_array(&mut self, open_span: Span) -> Result<ExprId, ParseError> {
        let mut elements: SmallVec<[ExprId; 4]> = SmallVec::new();

        if !self.cursor.check(TokenKind::RBracket) {
            loop {
                elements.push(self.parse_expr()?);
                if !self.cursor.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let close = self.cursor.peek();
        if !self.cursor.eat(TokenKind::RBracket) {
            return Err(unexpected_token(
                format!("{} (expected `]`)", close.kind.describe()),
                close.span,
            ));
        }
        Ok(self.alloc(ExprKind::Array(elements), open_span.merge(close.span)))
    }

    /// Parse `name(args...)` (the name is consumed, `(` is current).
    ///
    /// Arguments are positional or named (`arg=expr`); a bare `=` cannot
    /// occur anywhere else in the grammar, so the lookahead is unambiguous.
    fn parse_call(&mut self, name: quill_ir::Name, name_span: Span) -> Result<ExprId, ParseError> {
        self.cursor.advance(); // consume `(`
        let mut args: SmallVec<[Arg; 4]> = SmallVec::new();

        if !self.cursor.check(TokenKind::RParen) {
            loop {
                let arg_name = match (self.cursor.peek().kind, self.cursor.peek_ahead().kind) {
                    (TokenKind::Ident(n), TokenKind::Eq) => {
                        self.cursor.advance();
                        self.cursor.advance();
                        Some(n)
                    }
                    _ => None,
                };
                let value = self.parse_expr()?;
                args.push(Arg {
                    name: arg_name,
                    value,
                });
                if !self.cursor.eat(TokenKind::Comma) {
                    break;
                }
            }
        }

        let close = self.cursor.peek();
        if !self.cursor.eat(TokenKind::RParen) {
            return Err(unexpected_token(
                format!("{} (expected `)`)", close.kind.describe()),
                close.span,
            ));
        }
        Ok(self.alloc(ExprKind::Call { name, args }, name_span.merge(close.span)))
    }
}
