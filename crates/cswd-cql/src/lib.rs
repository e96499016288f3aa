//! CQL text front end for cswd.
//!
//! This crate parses Common Query Language constraint text into the
//! normalized [`FilterExpr`](cswd_proto::FilterExpr) tree that the engine's
//! constraint translator consumes. A Filter/FES XML decoder produces the
//! same tree shape, so both encodings compile to equivalent backend queries.
//!
//! # Syntax
//!
//! ```text
//! title LIKE 'Lake%'
//! apiso:Type = 'dataset' AND apiso:Modified >= '2020-01-01'
//! (creator = 'NOAA' OR publisher = 'NOAA') AND NOT type = 'service'
//! date BETWEEN '2020-01-01' AND '2020-12-31'
//! parentidentifier IS NULL
//! BBOX(csw:BoundingBox, -75.5, 45.0, -74.0, 46.5)
//! INTERSECTS(csw:BoundingBox, 'POLYGON((0 0, 0 10, 10 10, 10 0, 0 0))')
//! ```
//!
//! Keywords are case-insensitive; property names are matched verbatim
//! against the queryable registry (by the translator, not here). A syntax
//! error is a [`ParseError`]; unknown property names are semantic errors
//! raised later with the registry in hand.

pub mod error;
pub mod lexer;
pub mod parser;
pub mod span;

pub use error::ParseError;
pub use span::Span;

/// Parse CQL constraint text into a filter tree.
///
/// # Example
///
/// ```rust
/// let expr = cswd_cql::parse("title LIKE 'Lake%'").unwrap();
/// ```
pub fn parse(source: &str) -> Result<cswd_proto::FilterExpr, ParseError> {
    parser::parse(source)
}

/// Tokenize a source string (for debugging/testing).
pub fn tokenize(source: &str) -> Vec<lexer::SpannedToken> {
    lexer::tokenize(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cswd_proto::{ComparisonOp, FilterExpr};

    #[test]
    fn test_parse_comparison() {
        let expr = parse("apiso:Title = 'Lake Ontario'").unwrap();
        assert!(matches!(
            expr,
            FilterExpr::Comparison {
                op: ComparisonOp::Eq,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_error_with_source_context() {
        let source = "title = ";
        let err = parse(source).unwrap_err();
        let formatted = err.format_with_source(source);
        assert!(formatted.contains("error"));
        assert!(formatted.contains("line 1"));
    }

    #[test]
    fn test_complex_constraint() {
        let expr = parse(
            "(creator = 'NOAA' OR publisher = 'NOAA') \
             AND type = 'dataset' \
             AND BBOX(csw:BoundingBox, -180, -90, 180, 90)",
        )
        .unwrap();
        if let FilterExpr::And(children) = expr {
            assert_eq!(children.len(), 3);
        } else {
            panic!("expected And at the root");
        }
    }
}
