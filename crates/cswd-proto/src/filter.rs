//! Normalized constraint tree and result-shaping specs.
//!
//! A [`Constraint`] arrives either as raw CQL text or as an already
//! normalized [`FilterExpr`] tree (the shape a Filter/FES XML decoder
//! produces). Both compile to the same backend fragment; the engine never
//! sees the difference past translation.

use serde::{Deserialize, Serialize};

/// A client-supplied search constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constraint {
    /// Raw CQL text, parsed by `cswd-cql` during translation.
    CqlText(String),
    /// An already normalized filter tree.
    Filter(FilterExpr),
}

/// Comparison operators available on queryable properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// SQL LIKE; `%` and `_` wildcards pass through verbatim.
    Like,
    NotLike,
}

impl ComparisonOp {
    /// The SQL operator token for this comparison.
    pub fn sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
            ComparisonOp::Like => "LIKE",
            ComparisonOp::NotLike => "NOT LIKE",
        }
    }
}

/// Spatial predicates over the geometry column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpatialOp {
    /// Bounding-box overlap (the CSW BBOX predicate).
    BBox,
    /// Geometry intersection; evaluated on envelopes by the engine.
    Intersects,
}

/// A literal operand in a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Number(f64),
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<f64> for Literal {
    fn from(n: f64) -> Self {
        Literal::Number(n)
    }
}

impl From<i64> for Literal {
    fn from(n: i64) -> Self {
        Literal::Number(n as f64)
    }
}

/// A node in the normalized constraint tree.
///
/// Leaves reference queryable properties by their logical name (e.g.
/// `csw:Title`, `apiso:Abstract`); resolution to storage columns happens in
/// the translator, never here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    /// `property OP literal`.
    Comparison {
        name: String,
        op: ComparisonOp,
        literal: Literal,
    },
    /// `property BETWEEN low AND high`, inclusive.
    Between {
        name: String,
        low: Literal,
        high: Literal,
    },
    /// `property IS NULL` (negated: `IS NOT NULL`).
    IsNull { name: String, negated: bool },
    /// Spatial predicate against the geometry column, operand as WKT.
    Spatial {
        name: String,
        op: SpatialOp,
        wkt: String,
        /// Request overlap-score ranking of the result set.
        ranked: bool,
    },
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

impl FilterExpr {
    /// Build a comparison leaf.
    pub fn comparison(name: impl Into<String>, op: ComparisonOp, literal: Literal) -> Self {
        FilterExpr::Comparison {
            name: name.into(),
            op,
            literal,
        }
    }

    /// Build a BBOX predicate from numeric bounds (minx, miny, maxx, maxy).
    pub fn bbox(name: impl Into<String>, bounds: [f64; 4], ranked: bool) -> Self {
        let [minx, miny, maxx, maxy] = bounds;
        FilterExpr::Spatial {
            name: name.into(),
            op: SpatialOp::BBox,
            wkt: format!(
                "POLYGON(({minx} {miny}, {minx} {maxy}, {maxx} {maxy}, {maxx} {miny}, {minx} {miny}))"
            ),
            ranked,
        }
    }

    /// Combine children with AND, flattening single-element vectors.
    pub fn and(mut children: Vec<FilterExpr>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            FilterExpr::And(children)
        }
    }

    /// Combine children with OR, flattening single-element vectors.
    pub fn or(mut children: Vec<FilterExpr>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            FilterExpr::Or(children)
        }
    }

    /// Whether any node in the tree requests spatial ranking.
    pub fn requests_ranking(&self) -> bool {
        match self {
            FilterExpr::Spatial { ranked, .. } => *ranked,
            FilterExpr::And(children) | FilterExpr::Or(children) => {
                children.iter().any(FilterExpr::requests_ranking)
            }
            FilterExpr::Not(child) => child.requests_ranking(),
            _ => false,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A single sort criterion referencing a logical property name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortSpec {
    pub name: String,
    pub order: SortOrder,
}

impl SortSpec {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            order: SortOrder::Desc,
        }
    }
}

/// Pagination window. `start_position` is 1-based per the CSW model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub max_records: u32,
    pub start_position: u32,
}

impl Pagination {
    /// Build a window; a start position of 0 is normalized to 1.
    pub fn new(max_records: u32, start_position: u32) -> Self {
        Self {
            max_records,
            start_position: start_position.max(1),
        }
    }

    /// The zero-based offset of the first record in the window. A start
    /// position of 0 (fields are public) reads as the first record.
    pub fn offset(&self) -> u64 {
        u64::from(self.start_position.max(1)) - 1
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            max_records: 10,
            start_position: 1,
        }
    }
}
