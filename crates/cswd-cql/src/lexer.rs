//! Lexer for CQL text using logos.
//!
//! CQL keywords are case-insensitive; property names keep their case
//! because logical queryable names (`apiso:Title`) are matched verbatim
//! against the registry.

use crate::span::Span;
use logos::Logos;

/// Token types for CQL text.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // Logical operators
    #[token("AND", ignore(ascii_case))]
    And,
    #[token("OR", ignore(ascii_case))]
    Or,
    #[token("NOT", ignore(ascii_case))]
    Not,

    // Keyword predicates
    #[token("LIKE", ignore(ascii_case))]
    Like,
    #[token("BETWEEN", ignore(ascii_case))]
    Between,
    #[token("IS", ignore(ascii_case))]
    Is,
    #[token("NULL", ignore(ascii_case))]
    Null,
    #[token("BBOX", ignore(ascii_case))]
    Bbox,
    #[token("INTERSECTS", ignore(ascii_case))]
    Intersects,

    // Comparison operators
    #[token("=")]
    Eq,
    #[token("<>")]
    Ne,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Property name, optionally namespace-qualified (apiso:Title)
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*(:[a-zA-Z_][a-zA-Z0-9_]*)?", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    // String literal, SQL style: single quotes, '' escapes a quote
    #[regex(r"'([^']|'')*'", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].replace("''", "'")
    })]
    String(String),

    // Numeric literal
    #[regex(r"-?[0-9]+(\.[0-9]+)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),

    // Punctuation
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer that produces spanned tokens with one-token lookahead.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<Result<SpannedToken, Span>>>,
}

impl<'source> Lexer<'source> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    /// Peek at the next token without consuming it.
    pub fn peek(&mut self) -> Option<&Result<SpannedToken, Span>> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_inner());
        }
        self.peeked.as_ref().and_then(|o| o.as_ref())
    }

    /// Get the next token. `Err(span)` marks an unlexable character.
    pub fn next_token(&mut self) -> Option<Result<SpannedToken, Span>> {
        if let Some(peeked) = self.peeked.take() {
            peeked
        } else {
            self.next_inner()
        }
    }

    fn next_inner(&mut self) -> Option<Result<SpannedToken, Span>> {
        match self.inner.next() {
            Some(Ok(token)) => Some(Ok(SpannedToken {
                token,
                span: self.inner.span().into(),
            })),
            Some(Err(())) => Some(Err(self.inner.span().into())),
            None => None,
        }
    }

    /// The span at the current lexer position.
    pub fn span(&self) -> Span {
        self.inner.span().into()
    }
}

/// Tokenize a source string, dropping error markers (for tests).
pub fn tokenize(source: &str) -> Vec<SpannedToken> {
    let mut lexer = Lexer::new(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next_token() {
        if let Ok(token) = result {
            tokens.push(token);
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_comparison() {
        let tokens = tokenize("title = 'Lake Ontario'");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].token, Token::Ident("title".to_string()));
        assert_eq!(tokens[1].token, Token::Eq);
        assert_eq!(tokens[2].token, Token::String("Lake Ontario".to_string()));
    }

    #[test]
    fn test_qualified_property_name() {
        let tokens = tokenize("apiso:Title LIKE 'Lake%'");
        assert_eq!(tokens[0].token, Token::Ident("apiso:Title".to_string()));
        assert_eq!(tokens[1].token, Token::Like);
        assert_eq!(tokens[2].token, Token::String("Lake%".to_string()));
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let tokens = tokenize("a = 1 and b = 2 Or not c = 3");
        assert!(tokens.iter().any(|t| t.token == Token::And));
        assert!(tokens.iter().any(|t| t.token == Token::Or));
        assert!(tokens.iter().any(|t| t.token == Token::Not));
    }

    #[test]
    fn test_quote_escape() {
        let tokens = tokenize("title = 'O''Brien'");
        assert_eq!(tokens[2].token, Token::String("O'Brien".to_string()));
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("x = 42 AND y = -3.5");
        assert_eq!(tokens[2].token, Token::Number(42.0));
        assert_eq!(tokens[6].token, Token::Number(-3.5));
    }

    #[test]
    fn test_bbox_call() {
        let tokens = tokenize("BBOX(csw:BoundingBox, -180, -90, 180, 90)");
        assert_eq!(tokens[0].token, Token::Bbox);
        assert_eq!(tokens[1].token, Token::LParen);
        assert_eq!(
            tokens[2].token,
            Token::Ident("csw:BoundingBox".to_string())
        );
        assert!(tokens.iter().filter(|t| t.token == Token::Comma).count() == 4);
    }

    #[test]
    fn test_comparison_operators() {
        let tokens = tokenize("a = 1 a <> 1 a < 1 a <= 1 a > 1 a >= 1");
        let ops: Vec<_> = tokens
            .iter()
            .filter(|t| !matches!(t.token, Token::Ident(_) | Token::Number(_)))
            .map(|t| t.token.clone())
            .collect();
        assert_eq!(
            ops,
            vec![
                Token::Eq,
                Token::Ne,
                Token::Lt,
                Token::Le,
                Token::Gt,
                Token::Ge
            ]
        );
    }

    #[test]
    fn test_lexer_peek_does_not_consume() {
        let mut lexer = Lexer::new("title = 'x'");
        let peeked = lexer.peek().cloned();
        let next = lexer.next_token();
        assert_eq!(peeked, next);
        assert_eq!(
            lexer.next_token().unwrap().unwrap().token,
            Token::Eq
        );
    }
}
