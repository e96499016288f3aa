//! Catalogue query and mapping engine.
//!
//! Three components, layered bottom-up:
//!
//! - [`mappings`] - the queryable registry: logical property names to
//!   physical columns, per profile and typename, behind immutable
//!   snapshots with atomic whole-table swaps
//! - [`translate`] - compiles constraint trees into parameterized SQL
//!   fragments using registry mappings
//! - [`repository`] - executes compiled queries against the record store
//!   with ranking, sorting, pagination, and transactional CRUD
//!
//! The protocol front end lives in `cswd-server`; record and filter value
//! types in `cswd-proto`; the CQL parser in `cswd-cql`.

pub mod error;
pub mod geometry;
pub mod mappings;
pub mod repository;
pub mod translate;

pub use error::{Error, Result};
pub use mappings::{
    ElementSetName, MappingOverrides, Profile, QueryableDefinition, QueryableRegistry,
};
pub use repository::{
    InsertBound, PropertyUpdate, Repository, RepositoryFilter, DEFAULT_TYPENAME,
};
pub use translate::{ConstraintTranslator, SpatialRank, TranslatedQuery};
