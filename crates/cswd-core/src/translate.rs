//! Constraint translation: filter trees to parameterized SQL fragments.
//!
//! The translator walks a [`FilterExpr`] (parsed from CQL text or decoded
//! from Filter XML upstream), resolves every logical property name through
//! the queryable registry, and emits a where-fragment with `?` placeholders
//! and an ordered parameter list. Client literals are never interpolated
//! into the SQL text.

use crate::error::Result;
use crate::mappings::{MappingTable, QueryableRegistry};
use cswd_proto::{ComparisonOp, Constraint, FilterExpr, Literal, SortOrder, SortSpec};
use std::sync::Arc;
use tracing::debug;

/// A compiled constraint: where-fragment plus ordered bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslatedQuery {
    /// SQL boolean fragment with `?` placeholders, parenthesized.
    pub where_sql: String,
    /// Parameters in placeholder order.
    pub params: Vec<Literal>,
    /// Spatial ranking request, when the constraint asked for one.
    pub rank: Option<SpatialRank>,
}

impl TranslatedQuery {
    /// The match-all query an empty constraint compiles to.
    pub fn match_all() -> Self {
        Self {
            where_sql: "1 = 1".to_string(),
            params: Vec::new(),
            rank: None,
        }
    }
}

/// Orders results by overlap score against a query geometry, descending.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialRank {
    /// Geometry column the score is computed against.
    pub column: String,
    /// Query geometry as WKT, bound as a parameter.
    pub wkt: String,
}

/// A resolved sort key: physical column plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub column: String,
    pub order: SortOrder,
}

/// Compiles constraints against one registry.
pub struct ConstraintTranslator {
    registry: Arc<QueryableRegistry>,
}

impl ConstraintTranslator {
    pub fn new(registry: Arc<QueryableRegistry>) -> Self {
        Self { registry }
    }

    /// Compile a constraint for a typename.
    ///
    /// `None` compiles to match-all. CQL syntax errors surface as
    /// `OperationParsingFailed`; unknown property names as
    /// `InvalidParameterValue` naming the offending token.
    pub fn translate(
        &self,
        constraint: Option<&Constraint>,
        typename: &str,
    ) -> Result<TranslatedQuery> {
        let expr = match constraint {
            None => return Ok(TranslatedQuery::match_all()),
            Some(Constraint::Filter(expr)) => expr.clone(),
            Some(Constraint::CqlText(text)) => {
                if text.trim().is_empty() {
                    return Ok(TranslatedQuery::match_all());
                }
                cswd_cql::parse(text)?
            }
        };

        // One snapshot for the whole walk; a concurrent remap cannot be
        // observed mid-translation.
        let table = self.registry.snapshot();
        let mut walker = Walker {
            table: &table,
            typename,
            params: Vec::new(),
            rank: None,
        };
        let where_sql = walker.emit(&expr)?;
        debug!(%typename, sql = %where_sql, "translated constraint");

        Ok(TranslatedQuery {
            where_sql,
            params: walker.params,
            rank: walker.rank,
        })
    }

    /// Resolve one logical property name to its physical column.
    pub fn resolve_column(&self, name: &str, typename: &str) -> Result<String> {
        let table = self.registry.snapshot();
        Ok(table.resolve(name, typename)?.column.clone())
    }

    /// Resolve client sort specs to physical sort keys.
    pub fn sort_keys(&self, sortby: &[SortSpec], typename: &str) -> Result<Vec<SortKey>> {
        let table = self.registry.snapshot();
        sortby
            .iter()
            .map(|spec| {
                let def = table.resolve(&spec.name, typename)?;
                Ok(SortKey {
                    column: def.column.clone(),
                    order: spec.order,
                })
            })
            .collect()
    }
}

struct Walker<'a> {
    table: &'a MappingTable,
    typename: &'a str,
    params: Vec<Literal>,
    rank: Option<SpatialRank>,
}

impl Walker<'_> {
    fn emit(&mut self, expr: &FilterExpr) -> Result<String> {
        match expr {
            FilterExpr::Comparison { name, op, literal } => {
                let def = self.table.resolve(name, self.typename)?;
                let case_folded = def.case_insensitive
                    && matches!(literal, Literal::String(_))
                    && matches!(
                        op,
                        ComparisonOp::Eq | ComparisonOp::Ne | ComparisonOp::Like | ComparisonOp::NotLike
                    );
                self.params.push(literal.clone());
                if case_folded {
                    Ok(format!("(lower({}) {} lower(?))", def.column, op.sql()))
                } else {
                    Ok(format!("({} {} ?)", def.column, op.sql()))
                }
            }
            FilterExpr::Between { name, low, high } => {
                let def = self.table.resolve(name, self.typename)?;
                self.params.push(low.clone());
                self.params.push(high.clone());
                Ok(format!("({} BETWEEN ? AND ?)", def.column))
            }
            FilterExpr::IsNull { name, negated } => {
                let def = self.table.resolve(name, self.typename)?;
                if *negated {
                    Ok(format!("({} IS NOT NULL)", def.column))
                } else {
                    Ok(format!("({} IS NULL)", def.column))
                }
            }
            FilterExpr::Spatial {
                name,
                op: _,
                wkt,
                ranked,
            } => {
                let def = self.table.resolve(name, self.typename)?;
                // BBOX and Intersects both evaluate on envelopes.
                if *ranked && self.rank.is_none() {
                    self.rank = Some(SpatialRank {
                        column: def.column.clone(),
                        wkt: wkt.clone(),
                    });
                }
                self.params.push(Literal::String(wkt.clone()));
                Ok(format!("(bbox_overlaps({}, ?) = 1)", def.column))
            }
            FilterExpr::And(children) => self.emit_joined(children, " AND "),
            FilterExpr::Or(children) => self.emit_joined(children, " OR "),
            FilterExpr::Not(child) => Ok(format!("(NOT {})", self.emit(child)?)),
        }
    }

    fn emit_joined(&mut self, children: &[FilterExpr], joiner: &str) -> Result<String> {
        if children.is_empty() {
            return Ok("(1 = 1)".to_string());
        }
        let fragments: Vec<String> = children
            .iter()
            .map(|c| self.emit(c))
            .collect::<Result<_>>()?;
        Ok(format!("({})", fragments.join(joiner)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use cswd_proto::Pagination;

    fn translator() -> ConstraintTranslator {
        ConstraintTranslator::new(Arc::new(QueryableRegistry::with_core_profiles().unwrap()))
    }

    fn cql(text: &str) -> Constraint {
        Constraint::CqlText(text.to_string())
    }

    #[test]
    fn test_empty_constraint_matches_all() {
        let t = translator();
        let q = t.translate(None, "csw:Record").unwrap();
        assert_eq!(q.where_sql, "1 = 1");
        assert!(q.params.is_empty());
        let q = t.translate(Some(&cql("   ")), "csw:Record").unwrap();
        assert_eq!(q.where_sql, "1 = 1");
    }

    #[test]
    fn test_like_binds_wildcard_parameter() {
        let t = translator();
        let q = t
            .translate(Some(&cql("apiso:Title like 'Lake%'")), "gmd:MD_Metadata")
            .unwrap();
        assert!(q.where_sql.contains("title"));
        assert!(q.where_sql.contains("LIKE"));
        assert!(!q.where_sql.contains("Lake"));
        assert_eq!(q.params, vec![Literal::String("Lake%".into())]);
    }

    #[test]
    fn test_case_insensitive_queryable_folds_both_sides() {
        let t = translator();
        let q = t
            .translate(Some(&cql("dc:title = 'Lake Ontario'")), "csw:Record")
            .unwrap();
        assert_eq!(q.where_sql, "(lower(title) = lower(?))");
    }

    #[test]
    fn test_case_sensitive_queryable_compares_verbatim() {
        let t = translator();
        let q = t
            .translate(Some(&cql("dc:type = 'dataset'")), "csw:Record")
            .unwrap();
        assert_eq!(q.where_sql, "(type = ?)");
    }

    #[test]
    fn test_logical_nesting_keeps_parentheses() {
        let t = translator();
        let q = t
            .translate(
                Some(&cql(
                    "(dc:creator = 'NOAA' OR dc:publisher = 'NOAA') AND NOT dc:type = 'service'",
                )),
                "csw:Record",
            )
            .unwrap();
        assert_eq!(
            q.where_sql,
            "(((lower(creator) = lower(?)) OR (lower(publisher) = lower(?))) \
             AND (NOT (type = ?)))"
        );
        assert_eq!(q.params.len(), 3);
    }

    #[test]
    fn test_between_binds_two_parameters() {
        let t = translator();
        let q = t
            .translate(
                Some(&cql("dc:date BETWEEN '2020-01-01' AND '2020-12-31'")),
                "csw:Record",
            )
            .unwrap();
        assert_eq!(q.where_sql, "(date BETWEEN ? AND ?)");
        assert_eq!(q.params.len(), 2);
    }

    #[test]
    fn test_bbox_requests_ranking() {
        let t = translator();
        let q = t
            .translate(
                Some(&cql("BBOX(ows:BoundingBox, -75.5, 45.0, -74.0, 46.5)")),
                "csw:Record",
            )
            .unwrap();
        assert_eq!(q.where_sql, "(bbox_overlaps(wkt_geometry, ?) = 1)");
        let rank = q.rank.expect("bbox requests ranking");
        assert_eq!(rank.column, "wkt_geometry");
        assert!(rank.wkt.starts_with("POLYGON"));
        assert_eq!(q.params.len(), 1);
    }

    #[test]
    fn test_unknown_property_is_semantic_error() {
        let t = translator();
        let err = t
            .translate(Some(&cql("dc:bogus = 'x'")), "csw:Record")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameterValue { .. }));
    }

    #[test]
    fn test_syntax_error_is_parsing_error() {
        let t = translator();
        let err = t
            .translate(Some(&cql("dc:title = ")), "csw:Record")
            .unwrap_err();
        assert!(matches!(err, Error::OperationParsingFailed { .. }));
    }

    #[test]
    fn test_filter_tree_and_cql_compile_alike() {
        let t = translator();
        let from_text = t
            .translate(Some(&cql("dc:title LIKE 'Lake%'")), "csw:Record")
            .unwrap();
        let tree = FilterExpr::comparison("dc:title", ComparisonOp::Like, Literal::from("Lake%"));
        let from_tree = t
            .translate(Some(&Constraint::Filter(tree)), "csw:Record")
            .unwrap();
        assert_eq!(from_text, from_tree);
    }

    #[test]
    fn test_sort_keys_resolve_columns() {
        let t = translator();
        let keys = t
            .sort_keys(&[SortSpec::desc("dct:modified")], "csw:Record")
            .unwrap();
        assert_eq!(keys[0].column, "date_modified");
        assert_eq!(keys[0].order, SortOrder::Desc);

        assert!(t
            .sort_keys(&[SortSpec::asc("dc:bogus")], "csw:Record")
            .is_err());
    }

    #[test]
    fn test_pagination_defaults() {
        let page = Pagination::default();
        assert_eq!(page.max_records, 10);
        assert_eq!(page.offset(), 0);
    }
}
