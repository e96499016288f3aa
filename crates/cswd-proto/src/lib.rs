//! Shared types for the cswd catalogue engine.
//!
//! This crate defines the value types that cross component boundaries:
//!
//! - [`filter`] - the normalized constraint tree, sort and paging specs
//! - [`record`] - the canonical metadata record
//! - [`exception`] - the CSW exception code taxonomy and report triplet
//! - [`version`] - the protocol version tag
//!
//! External front ends (the CQL parser, a Filter/FES XML decoder) produce
//! [`FilterExpr`] trees; the engine consumes them. Everything here is plain
//! data with serde derives so mapping documents and configuration can carry
//! these shapes directly.

pub mod exception;
pub mod filter;
pub mod record;
pub mod version;

pub use exception::{ExceptionCode, ExceptionReport};
pub use filter::{
    ComparisonOp, Constraint, FilterExpr, Literal, Pagination, SortOrder, SortSpec, SpatialOp,
};
pub use record::Record;
pub use version::Version;
