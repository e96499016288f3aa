//! The catalogue service: protocol operations over the repository engine.
//!
//! Handlers registered with the dispatcher ultimately call into this
//! type. It owns the element-set masking and the `updateSequence`
//! handshake; search, ranking, and transactions are the engine's job.

use crate::error::Result;
use cswd_core::{
    ElementSetName, InsertBound, PropertyUpdate, QueryableDefinition, QueryableRegistry,
    Repository, DEFAULT_TYPENAME,
};
use cswd_proto::{Constraint, Pagination, Record, SortSpec, Version};
use std::sync::Arc;
use tracing::info;

/// Output schema advertised when a request names none.
pub const DEFAULT_OUTPUT_SCHEMA: &str = "http://www.opengis.net/cat/csw/2.0.2";

/// A GetRecords request after protocol decoding.
#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub constraint: Option<Constraint>,
    pub sortby: Vec<SortSpec>,
    pub typenames: Vec<String>,
    pub elementset: ElementSetName,
    /// Requested output schema URI; serializer context only.
    pub outputschema: Option<String>,
    pub pagination: Pagination,
}

/// A search result page plus the context a serializer needs.
#[derive(Debug, Clone)]
pub struct SearchResults {
    /// All matches, before pagination.
    pub total: u64,
    /// Records in this page.
    pub returned: u64,
    /// 1-based position of the next record, 0 when exhausted.
    pub next_record: u64,
    pub records: Vec<Record>,
    pub elementset: ElementSetName,
    /// Output schema the serializer should render against.
    pub outputschema: String,
}

/// Capabilities payload handed to the serializer.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub version: Version,
    /// Latest `insert_date` in the store; absent on an empty store.
    pub update_sequence: Option<String>,
    /// The client's sequence already matches; serializers emit the
    /// minimal document.
    pub unchanged: bool,
    pub typenames: Vec<String>,
    pub operations: Vec<&'static str>,
}

/// GetDomain result: the distinct values of one queryable.
#[derive(Debug, Clone)]
pub struct DomainValues {
    pub property: String,
    pub values: Vec<String>,
}

/// One action of a Transaction request.
#[derive(Debug, Clone)]
pub enum TransactionOp {
    Insert(Record),
    Update(Record),
    UpdateProperties {
        constraint: Option<Constraint>,
        updates: Vec<PropertyUpdate>,
        typename: String,
    },
    Delete {
        constraint: Option<Constraint>,
        typename: String,
    },
}

/// Counts reported back for a Transaction request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionSummary {
    pub inserted: u64,
    pub updated: u64,
    pub deleted: u64,
}

pub struct CatalogueService {
    repo: Arc<Repository>,
    registry: Arc<QueryableRegistry>,
}

impl CatalogueService {
    pub fn new(repo: Arc<Repository>, registry: Arc<QueryableRegistry>) -> Self {
        Self { repo, registry }
    }

    /// Capabilities discovery with the `updateSequence` handshake: a
    /// client sequence equal to the current one yields the minimal
    /// unchanged document; a sequence ahead of the store is an error.
    pub fn get_capabilities(
        &self,
        version: Version,
        client_sequence: Option<&str>,
    ) -> Result<Capabilities> {
        let update_sequence = self
            .repo
            .query_insert_bound(InsertBound::Latest)?
            .map(|r| r.insert_date);

        let unchanged = match (client_sequence, update_sequence.as_deref()) {
            (Some(client), Some(current)) if client == current => true,
            (Some(client), Some(current)) if client > current => {
                return Err(cswd_core::Error::InvalidUpdateSequence {
                    message: format!(
                        "client sequence '{client}' is ahead of the catalogue ('{current}')"
                    ),
                }
                .into());
            }
            (Some(client), None) => {
                return Err(cswd_core::Error::InvalidUpdateSequence {
                    message: format!("client sequence '{client}' on an empty catalogue"),
                }
                .into());
            }
            _ => false,
        };

        Ok(Capabilities {
            version,
            update_sequence,
            unchanged,
            typenames: self
                .registry
                .snapshot()
                .typenames()
                .into_iter()
                .map(String::from)
                .collect(),
            operations: vec![
                "GetCapabilities",
                "GetRecords",
                "GetRecordById",
                "GetDomain",
                "Transaction",
            ],
        })
    }

    /// Search and return one page, masked to the requested element set.
    pub fn get_records(&self, request: &SearchRequest) -> Result<SearchResults> {
        let (total, records) = self.repo.query(
            request.constraint.as_ref(),
            &request.sortby,
            &request.typenames,
            request.pagination,
        )?;

        let returned = records.len() as u64;
        let last = request.pagination.offset() + returned;
        let next_record = if returned == 0 || last >= total {
            0
        } else {
            last + 1
        };

        Ok(SearchResults {
            total,
            returned,
            next_record,
            records: records
                .into_iter()
                .map(|r| mask_record(r, request.elementset))
                .collect(),
            elementset: request.elementset,
            outputschema: request
                .outputschema
                .clone()
                .unwrap_or_else(|| DEFAULT_OUTPUT_SCHEMA.to_string()),
        })
    }

    /// Fetch records by identifier. An empty result for a non-empty id
    /// list is NotFound naming the first missing identifier.
    pub fn get_record_by_id(
        &self,
        ids: &[String],
        elementset: ElementSetName,
    ) -> Result<Vec<Record>> {
        if ids.is_empty() {
            return Err(cswd_core::Error::MissingParameterValue {
                locator: "id".to_string(),
            }
            .into());
        }
        let records = self.repo.query_by_ids(ids)?;
        if records.is_empty() {
            return Err(cswd_core::Error::NotFound {
                identifier: ids[0].clone(),
            }
            .into());
        }
        Ok(records
            .into_iter()
            .map(|r| mask_record(r, elementset))
            .collect())
    }

    /// Distinct values of one queryable, for GetDomain.
    pub fn get_domain(&self, property: &str, typename: Option<&str>) -> Result<DomainValues> {
        let typename = typename.unwrap_or(DEFAULT_TYPENAME);
        let values = self.repo.domain_values(property, typename)?;
        Ok(DomainValues {
            property: property.to_string(),
            values,
        })
    }

    /// The queryables advertised for a typename, for capabilities and
    /// GetDomain introspection.
    pub fn queryables(
        &self,
        typename: &str,
        elementset: ElementSetName,
    ) -> Result<Vec<QueryableDefinition>> {
        Ok(self.registry.list_queryables(typename, elementset)?)
    }

    /// Run a sequence of transaction actions. Each action is atomic on
    /// its own; the first failure stops the run and is reported with the
    /// counts accumulated so far discarded by the caller.
    pub fn transaction(&self, ops: Vec<TransactionOp>) -> Result<TransactionSummary> {
        let mut summary = TransactionSummary::default();
        for op in ops {
            match op {
                TransactionOp::Insert(rec) => {
                    self.repo.insert(&rec)?;
                    summary.inserted += 1;
                }
                TransactionOp::Update(rec) => {
                    self.repo.update(&rec)?;
                    summary.updated += 1;
                }
                TransactionOp::UpdateProperties {
                    constraint,
                    updates,
                    typename,
                } => {
                    summary.updated +=
                        self.repo
                            .update_properties(constraint.as_ref(), &updates, &typename)?;
                }
                TransactionOp::Delete {
                    constraint,
                    typename,
                } => {
                    summary.deleted += self.repo.delete(constraint.as_ref(), &typename)?;
                }
            }
        }
        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            deleted = summary.deleted,
            "transaction complete"
        );
        Ok(summary)
    }
}

/// Project a record onto an element set tier. Full is the identity.
fn mask_record(rec: Record, elementset: ElementSetName) -> Record {
    if elementset == ElementSetName::Full {
        return rec;
    }
    let mut masked = Record::default();
    for col in elementset.columns() {
        masked.set(col, rec.get(col).map(str::to_string));
    }
    masked
}
