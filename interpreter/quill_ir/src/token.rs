//! Tokens for the expression language inside `{...}` spans.

use crate::{Name, Span};
use std::fmt;

/// Kind of an expression token.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    Str(Name),
    Ident(Name),
    True,
    False,
    Null,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Dot,
    Question,
    Colon,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Bang,
    AmpAmp,
    PipePipe,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Eq,

    /// Byte the lexer could not tokenize.
    Error,
    /// End of the expression span.
    Eof,
}

impl TokenKind {
    /// Human-readable description for diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            TokenKind::Number(_) => "number",
            TokenKind::Str(_) => "string",
            TokenKind::Ident(_) => "identifier",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::Null => "`null`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Dot => "`.`",
            TokenKind::Question => "`?`",
            TokenKind::Colon => "`:`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Bang => "`!`",
            TokenKind::AmpAmp => "`&&`",
            TokenKind::PipePipe => "`||`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Lt => "`<`",
            TokenKind::LtEq => "`<=`",
            TokenKind::Gt => "`>`",
            TokenKind::GtEq => "`>=`",
            TokenKind::Eq => "`=`",
            TokenKind::Error => "invalid token",
            TokenKind::Eof => "end of expression",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// A token with its source span.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    #[inline]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Token { kind, span }
    }
}

/// Token list produced by the lexer, always terminated by `Eof`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenList {
    tokens: Vec<Token>,
}

impl TokenList {
    pub fn new() -> Self {
        TokenList { tokens: Vec::new() }
    }

    #[inline]
    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Token at `idx`, clamped to the trailing `Eof`.
    #[inline]
    pub fn get(&self, idx: usize) -> Token {
        self.tokens
            .get(idx)
            .or_else(|| self.tokens.last())
            .copied()
            .unwrap_or(Token::new(TokenKind::Eof, Span::DUMMY))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }
}

impl std::ops::Index<usize> for TokenList {
    type Output = Token;

    fn index(&self, idx: usize) -> &Token {
        &self.tokens[idx]
    }
}
