//! Lexer for `{...}` expression spans, built on logos.
//!
//! The template scanner in `quill_parse` isolates the text of each
//! expression span; this crate turns that text into a `TokenList` with
//! interned identifiers and string literals. Spans are rebased by `offset`
//! so they index into the full template, not the substring.

use logos::Logos;
use quill_ir::{Span, StringInterner, Token, TokenKind, TokenList};

/// Raw token from logos (before interning).
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum RawToken {
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token("<")]
    Lt,
    #[token(">=")]
    GtEq,
    #[token(">")]
    Gt,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,

    #[regex(r"[0-9]+(\.[0-9]+)?([eE][+-]?[0-9]+)?", |lex| {
        lex.slice().parse::<f64>().ok()
    })]
    Number(f64),

    // Double- or single-quoted strings; no unescaped newlines.
    #[regex(r#""([^"\\\n\r]|\\.)*""#)]
    #[regex(r"'([^'\\\n\r]|\\.)*'")]
    String,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,
}

/// Lex one expression span into a `TokenList`.
///
/// `offset` is the byte position of the span's text within the enclosing
/// template; every token span is shifted by it.
pub fn lex(source: &str, offset: u32, interner: &StringInterner) -> TokenList {
    let mut result = TokenList::new();
    let mut logos = RawToken::lexer(source);

    while let Some(token_result) = logos.next() {
        let span = Span::from_range(logos.span()).offset(offset);
        let slice = logos.slice();

        match token_result {
            Ok(raw) => {
                let kind = convert_token(&raw, slice, interner);
                result.push(Token::new(kind, span));
            }
            Err(()) => {
                result.push(Token::new(TokenKind::Error, span));
            }
        }
    }

    let eof_pos = u32::try_from(source.len()).unwrap_or(u32::MAX) + offset;
    result.push(Token::new(TokenKind::Eof, Span::point(eof_pos)));
    result
}

/// Convert a raw token to a `TokenKind`, interning strings.
fn convert_token(raw: &RawToken, slice: &str, interner: &StringInterner) -> TokenKind {
    match raw {
        RawToken::Number(n) => TokenKind::Number(*n),
        RawToken::String => {
            let content = &slice[1..slice.len() - 1];
            let unescaped = unescape_string(content);
            TokenKind::Str(interner.intern(&unescaped))
        }
        RawToken::Ident => TokenKind::Ident(interner.intern(slice)),

        RawToken::True => TokenKind::True,
        RawToken::False => TokenKind::False,
        RawToken::Null => TokenKind::Null,

        RawToken::LParen => TokenKind::LParen,
        RawToken::RParen => TokenKind::RParen,
        RawToken::LBracket => TokenKind::LBracket,
        RawToken::RBracket => TokenKind::RBracket,
        RawToken::Comma => TokenKind::Comma,
        RawToken::Dot => TokenKind::Dot,
        RawToken::Question => TokenKind::Question,
        RawToken::Colon => TokenKind::Colon,

        RawToken::Plus => TokenKind::Plus,
        RawToken::Minus => TokenKind::Minus,
        RawToken::Star => TokenKind::Star,
        RawToken::Slash => TokenKind::Slash,
        RawToken::Bang => TokenKind::Bang,
        RawToken::AmpAmp => TokenKind::AmpAmp,
        RawToken::PipePipe => TokenKind::PipePipe,
        RawToken::EqEq => TokenKind::EqEq,
        RawToken::NotEq => TokenKind::NotEq,
        RawToken::Lt => TokenKind::Lt,
        RawToken::LtEq => TokenKind::LtEq,
        RawToken::Gt => TokenKind::Gt,
        RawToken::GtEq => TokenKind::GtEq,
        RawToken::Eq => TokenKind::Eq,
    }
}

/// Process string escape sequences.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') | None => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_interner() -> StringInterner {
        StringInterner::new()
    }

    #[test]
    fn test_lex_arithmetic() {
        let interner = test_interner();
        let tokens = lex("2 + 3 * 4", 0, &interner);

        assert_eq!(tokens.len(), 6); // 2, +, 3, *, 4, EOF
        assert!(matches!(tokens[0].kind, TokenKind::Number(n) if n == 2.0));
        assert!(matches!(tokens[1].kind, TokenKind::Plus));
        assert!(matches!(tokens[3].kind, TokenKind::Star));
        assert!(matches!(tokens[5].kind, TokenKind::Eof));
    }

    #[test]
    fn test_lex_string_both_quotes() {
        let interner = test_interner();
        let tokens = lex(r#""a" 'b'"#, 0, &interner);

        if let (TokenKind::Str(a), TokenKind::Str(b)) = (tokens[0].kind, tokens[1].kind) {
            assert_eq!(&*interner.lookup(a), "a");
            assert_eq!(&*interner.lookup(b), "b");
        } else {
            panic!("expected two string tokens");
        }
    }

    #[test]
    fn test_lex_string_escapes() {
        let interner = test_interner();
        let tokens = lex(r#""line\none""#, 0, &interner);

        if let TokenKind::Str(name) = tokens[0].kind {
            assert_eq!(&*interner.lookup(name), "line\none");
        } else {
            panic!("expected string token");
        }
    }

    #[test]
    fn test_lex_comparison_operators() {
        let interner = test_interner();
        let tokens = lex("a <= b != c", 0, &interner);

        assert!(matches!(tokens[1].kind, TokenKind::LtEq));
        assert!(matches!(tokens[3].kind, TokenKind::NotEq));
    }

    #[test]
    fn test_lex_offset_rebases_spans() {
        let interner = test_interner();
        let tokens = lex("x + 1", 10, &interner);

        assert_eq!(tokens[0].span, Span::new(10, 11));
        assert_eq!(tokens[2].span, Span::new(14, 15));
    }

    #[test]
    fn test_lex_keywords() {
        let interner = test_interner();
        let tokens = lex("true false null truthy", 0, &interner);

        assert!(matches!(tokens[0].kind, TokenKind::True));
        assert!(matches!(tokens[1].kind, TokenKind::False));
        assert!(matches!(tokens[2].kind, TokenKind::Null));
        // `truthy` is a plain identifier, not a keyword prefix match
        assert!(matches!(tokens[3].kind, TokenKind::Ident(_)));
    }

    #[test]
    fn test_lex_invalid_byte() {
        let interner = test_interner();
        let tokens = lex("a # b", 0, &interner);
        assert!(matches!(tokens[1].kind, TokenKind::Error));
    }

    #[test]
    fn test_lex_scientific_notation() {
        let interner = test_interner();
        let tokens = lex("1.5e2", 0, &interner);
        assert!(matches!(tokens[0].kind, TokenKind::Number(n) if (n - 150.0).abs() < f64::EPSILON));
    }
}
