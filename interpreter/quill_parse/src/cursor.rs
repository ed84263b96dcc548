//! Token cursor for the expression grammar.

use quill_ir::{Span, Token, TokenKind, TokenList};

/// Cursor over a lexed expression span.
pub struct Cursor {
    tokens: TokenList,
    pos: usize,
}

impl Cursor {
    pub fn new(tokens: TokenList) -> Self {
        Cursor { tokens, pos: 0 }
    }

    /// Current token without consuming it.
    #[inline]
    pub fn peek(&self) -> Token {
        self.tokens.get(self.pos)
    }

    /// Token after the current one.
    #[inline]
    pub fn peek_ahead(&self) -> Token {
        self.tokens.get(self.pos + 1)
    }

    /// Consume and return the current token.
    #[inline]
    pub fn advance(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    /// Whether the current token matches `kind` exactly.
    #[inline]
    pub fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    /// Consume the current token if it matches `kind`.
    #[inline]
    pub fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    /// Whether the cursor has reached the trailing `Eof`.
    #[inline]
    pub fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    /// Span of the current token.
    #[inline]
    pub fn span(&self) -> Span {
        self.peek().span
    }
}
