//! Recursive descent parser for CQL text.
//!
//! Grammar (precedence low to high):
//!
//! ```text
//! expression := or_expr
//! or_expr    := and_expr (OR and_expr)*
//! and_expr   := unary (AND unary)*
//! unary      := NOT unary | primary
//! primary    := '(' expression ')' | predicate
//! predicate  := BBOX '(' name ',' num ',' num ',' num ',' num ')'
//!             | INTERSECTS '(' name ',' string ')'
//!             | name op literal
//!             | name [NOT] LIKE string
//!             | name BETWEEN literal AND literal
//!             | name IS [NOT] NULL
//! ```

use cswd_proto::{ComparisonOp, FilterExpr, Literal, SpatialOp};

use crate::error::ParseError;
use crate::lexer::{Lexer, SpannedToken, Token};

/// Parser for CQL constraint text.
pub struct Parser<'source> {
    lexer: Lexer<'source>,
}

impl<'source> Parser<'source> {
    /// Create a new parser for the given source.
    pub fn new(source: &'source str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Parse a complete constraint expression.
    pub fn parse_expression(&mut self) -> Result<FilterExpr, ParseError> {
        let expr = self.parse_or()?;
        if let Some(tok) = self.peek()? {
            return Err(ParseError::new(
                format!("unexpected trailing input {:?}", tok.token),
                tok.span,
            ));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<FilterExpr, ParseError> {
        let mut children = vec![self.parse_and()?];

        while let Some(tok) = self.peek()? {
            if tok.token != Token::Or {
                break;
            }
            self.next()?;
            children.push(self.parse_and()?);
        }

        Ok(FilterExpr::or(children))
    }

    fn parse_and(&mut self) -> Result<FilterExpr, ParseError> {
        let mut children = vec![self.parse_unary()?];

        while let Some(tok) = self.peek()? {
            if tok.token != Token::And {
                break;
            }
            self.next()?;
            children.push(self.parse_unary()?);
        }

        Ok(FilterExpr::and(children))
    }

    fn parse_unary(&mut self) -> Result<FilterExpr, ParseError> {
        if let Some(tok) = self.peek()? {
            if tok.token == Token::Not {
                self.next()?;
                let inner = self.parse_unary()?;
                return Ok(FilterExpr::Not(Box::new(inner)));
            }
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<FilterExpr, ParseError> {
        let tok = self.expect_any("expected a predicate or '('")?;

        match tok.token {
            Token::LParen => {
                let inner = self.parse_or()?;
                self.expect_token(Token::RParen, "expected ')'")?;
                Ok(inner)
            }
            Token::Bbox => self.parse_bbox(),
            Token::Intersects => self.parse_intersects(),
            Token::Ident(name) => self.parse_predicate(name),
            other => Err(ParseError::new(
                format!("expected a predicate, found {:?}", other),
                tok.span,
            )),
        }
    }

    /// Parse `BBOX(name, minx, miny, maxx, maxy)`.
    fn parse_bbox(&mut self) -> Result<FilterExpr, ParseError> {
        self.expect_token(Token::LParen, "expected '(' after BBOX")?;
        let name = self.expect_ident()?;

        let mut bounds = [0f64; 4];
        for slot in bounds.iter_mut() {
            self.expect_token(Token::Comma, "expected ',' between BBOX coordinates")?;
            *slot = self.expect_number()?;
        }

        self.expect_token(Token::RParen, "expected ')' to close BBOX")?;
        Ok(FilterExpr::bbox(name, bounds, true))
    }

    /// Parse `INTERSECTS(name, 'wkt')`.
    fn parse_intersects(&mut self) -> Result<FilterExpr, ParseError> {
        self.expect_token(Token::LParen, "expected '(' after INTERSECTS")?;
        let name = self.expect_ident()?;
        self.expect_token(Token::Comma, "expected ',' before geometry literal")?;
        let wkt = self.expect_string()?;
        self.expect_token(Token::RParen, "expected ')' to close INTERSECTS")?;
        Ok(FilterExpr::Spatial {
            name,
            op: SpatialOp::Intersects,
            wkt,
            ranked: true,
        })
    }

    /// Parse a predicate rooted at a property name.
    fn parse_predicate(&mut self, name: String) -> Result<FilterExpr, ParseError> {
        let tok = self.expect_any("expected an operator after property name")?;

        match tok.token {
            Token::Eq | Token::Ne | Token::Lt | Token::Le | Token::Gt | Token::Ge => {
                let op = match tok.token {
                    Token::Eq => ComparisonOp::Eq,
                    Token::Ne => ComparisonOp::Ne,
                    Token::Lt => ComparisonOp::Lt,
                    Token::Le => ComparisonOp::Le,
                    Token::Gt => ComparisonOp::Gt,
                    Token::Ge => ComparisonOp::Ge,
                    _ => unreachable!(),
                };
                let literal = self.parse_literal()?;
                Ok(FilterExpr::Comparison { name, op, literal })
            }

            Token::Like => {
                let pattern = self.expect_string()?;
                Ok(FilterExpr::Comparison {
                    name,
                    op: ComparisonOp::Like,
                    literal: Literal::String(pattern),
                })
            }

            Token::Not => {
                let next = self.expect_any("expected LIKE after NOT")?;
                if next.token != Token::Like {
                    return Err(ParseError::new(
                        format!("expected LIKE after NOT, found {:?}", next.token),
                        next.span,
                    ));
                }
                let pattern = self.expect_string()?;
                Ok(FilterExpr::Comparison {
                    name,
                    op: ComparisonOp::NotLike,
                    literal: Literal::String(pattern),
                })
            }

            Token::Between => {
                let low = self.parse_literal()?;
                self.expect_token(Token::And, "expected AND in BETWEEN predicate")?;
                let high = self.parse_literal()?;
                Ok(FilterExpr::Between { name, low, high })
            }

            Token::Is => {
                let negated = match self.peek()? {
                    Some(tok) if tok.token == Token::Not => {
                        self.next()?;
                        true
                    }
                    _ => false,
                };
                self.expect_token(Token::Null, "expected NULL after IS")?;
                Ok(FilterExpr::IsNull { name, negated })
            }

            other => Err(ParseError::new(
                format!("expected a comparison operator, found {:?}", other),
                tok.span,
            )),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let tok = self.expect_any("expected a literal value")?;
        match tok.token {
            Token::String(s) => Ok(Literal::String(s)),
            Token::Number(n) => Ok(Literal::Number(n)),
            other => Err(ParseError::new(
                format!("expected a literal value, found {:?}", other),
                tok.span,
            )),
        }
    }

    // Token helpers -----------------------------------------------------

    fn peek(&mut self) -> Result<Option<&SpannedToken>, ParseError> {
        match self.lexer.peek() {
            Some(Ok(tok)) => Ok(Some(tok)),
            Some(Err(span)) => Err(ParseError::new("unexpected character", *span)),
            None => Ok(None),
        }
    }

    fn next(&mut self) -> Result<Option<SpannedToken>, ParseError> {
        match self.lexer.next_token() {
            Some(Ok(tok)) => Ok(Some(tok)),
            Some(Err(span)) => Err(ParseError::new("unexpected character", span)),
            None => Ok(None),
        }
    }

    fn expect_any(&mut self, message: &str) -> Result<SpannedToken, ParseError> {
        let span = self.lexer.span();
        self.next()?
            .ok_or_else(|| ParseError::new(format!("{message}, found end of input"), span))
    }

    fn expect_token(&mut self, expected: Token, message: &str) -> Result<SpannedToken, ParseError> {
        let tok = self.expect_any(message)?;
        if tok.token == expected {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("{message}, found {:?}", tok.token),
                tok.span,
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, ParseError> {
        let tok = self.expect_any("expected a property name")?;
        match tok.token {
            Token::Ident(name) => Ok(name),
            other => Err(ParseError::new(
                format!("expected a property name, found {:?}", other),
                tok.span,
            )),
        }
    }

    fn expect_string(&mut self) -> Result<String, ParseError> {
        let tok = self.expect_any("expected a quoted string")?;
        match tok.token {
            Token::String(s) => Ok(s),
            other => Err(ParseError::new(
                format!("expected a quoted string, found {:?}", other),
                tok.span,
            )),
        }
    }

    fn expect_number(&mut self) -> Result<f64, ParseError> {
        let tok = self.expect_any("expected a number")?;
        match tok.token {
            Token::Number(n) => Ok(n),
            other => Err(ParseError::new(
                format!("expected a number, found {:?}", other),
                tok.span,
            )),
        }
    }
}

/// Parse CQL text into a filter tree.
pub fn parse(source: &str) -> Result<FilterExpr, ParseError> {
    Parser::new(source).parse_expression()
}
