//! The repository engine: search, ranking, pagination, and transactional
//! CRUD over the record store.
//!
//! All reads and constraint-driven writes apply the operator-configured
//! [`RepositoryFilter`] transparently. Every write runs in one transaction;
//! transient backend failures (busy/locked) are retried a bounded number of
//! times, validation errors never are.

mod schema;

pub use schema::{open_in_memory, TABLE};

use crate::error::{Error, Result};
use crate::mappings::QueryableRegistry;
use crate::translate::{ConstraintTranslator, SortKey, TranslatedQuery};
use cswd_proto::{Constraint, Literal, Pagination, Record, SortOrder, SortSpec};
use cswd_proto::record;
use parking_lot::Mutex;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Typename used to resolve constraints when the client names none.
pub const DEFAULT_TYPENAME: &str = "csw:Record";

/// Transient failures get this many attempts before surfacing.
const MAX_ATTEMPTS: u32 = 3;

/// Which end of the `insert_date` ordering to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertBound {
    Earliest,
    Latest,
}

/// An operator-supplied SQL predicate ANDed onto every query.
#[derive(Debug, Clone)]
pub struct RepositoryFilter(String);

impl RepositoryFilter {
    /// A literal predicate over physical columns, e.g.
    /// `type = 'dataset'`. Must not be empty.
    pub fn new(predicate: impl Into<String>) -> Result<Self> {
        let predicate = predicate.into();
        if predicate.trim().is_empty() {
            return Err(Error::Configuration(
                "repository filter predicate is empty".to_string(),
            ));
        }
        Ok(Self(predicate))
    }

    fn sql(&self) -> &str {
        &self.0
    }
}

/// One property update for `update_properties`: logical name and new value.
#[derive(Debug, Clone)]
pub struct PropertyUpdate {
    pub name: String,
    pub value: String,
}

impl PropertyUpdate {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The record store plus the translator that compiles constraints for it.
pub struct Repository {
    conn: Mutex<Connection>,
    translator: ConstraintTranslator,
    filter: Option<RepositoryFilter>,
}

impl Repository {
    /// Open a store at `path` with the given registry.
    pub fn open(path: impl AsRef<Path>, registry: Arc<QueryableRegistry>) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(schema::open(path)?),
            translator: ConstraintTranslator::new(registry),
            filter: None,
        })
    }

    /// In-memory store, mainly for tests.
    pub fn in_memory(registry: Arc<QueryableRegistry>) -> Result<Self> {
        Ok(Self {
            conn: Mutex::new(schema::open_in_memory()?),
            translator: ConstraintTranslator::new(registry),
            filter: None,
        })
    }

    /// Attach an operator filter applied to every query from here on.
    pub fn with_filter(mut self, filter: RepositoryFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Search: count all matches, then return the requested page in the
    /// active sort order.
    ///
    /// `total` counts matches after the operator filter but before
    /// pagination. An explicit `sortby` overrides spatial ranking; with
    /// neither, results order by identifier. Identifier is always the
    /// final tiebreak, so paging at consecutive start positions walks the
    /// full match set without duplicates or omissions.
    pub fn query(
        &self,
        constraint: Option<&Constraint>,
        sortby: &[SortSpec],
        typenames: &[String],
        page: Pagination,
    ) -> Result<(u64, Vec<Record>)> {
        let resolve_typename = typenames
            .first()
            .map(String::as_str)
            .unwrap_or(DEFAULT_TYPENAME);
        let translated = self.translator.translate(constraint, resolve_typename)?;
        let sort_keys = self.translator.sort_keys(sortby, resolve_typename)?;

        let (where_sql, where_params) = self.build_where(&translated, typenames);
        let (order_sql, order_params) = build_order(&translated, &sort_keys);

        let conn = self.conn.lock();
        let total = self.with_retry(|| {
            conn.query_row(
                &format!("SELECT COUNT(*) FROM {TABLE} WHERE {where_sql}"),
                params_from_iter(where_params.iter()),
                |row| row.get::<_, i64>(0),
            )
        })? as u64;

        let mut params = where_params;
        params.extend(order_params);
        params.push(Value::Integer(i64::from(page.max_records)));
        params.push(Value::Integer(page.offset() as i64));

        let sql = format!(
            "SELECT {} FROM {TABLE} WHERE {where_sql} ORDER BY {order_sql} LIMIT ? OFFSET ?",
            select_list()
        );
        let records = self.with_retry(|| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(params.iter()), row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<Record>>>()
        })?;

        debug!(total, returned = records.len(), "query executed");
        Ok((total, records))
    }

    /// Fetch records by identifier. Missing identifiers are simply absent
    /// from the result; order follows the identifier ordering, not the
    /// request order.
    pub fn query_by_ids(&self, ids: &[String]) -> Result<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let mut where_sql = format!("identifier IN ({placeholders})");
        if let Some(filter) = &self.filter {
            where_sql.push_str(&format!(" AND ({})", filter.sql()));
        }
        let sql = format!(
            "SELECT {} FROM {TABLE} WHERE {where_sql} ORDER BY identifier",
            select_list()
        );
        let conn = self.conn.lock();
        self.with_retry(|| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), row_to_record)?;
            rows.collect()
        })
    }

    /// All records harvested from one source endpoint.
    pub fn query_by_source(&self, source: &str) -> Result<Vec<Record>> {
        let mut where_sql = "mdsource = ?".to_string();
        if let Some(filter) = &self.filter {
            where_sql.push_str(&format!(" AND ({})", filter.sql()));
        }
        let sql = format!(
            "SELECT {} FROM {TABLE} WHERE {where_sql} ORDER BY identifier",
            select_list()
        );
        let conn = self.conn.lock();
        self.with_retry(|| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([source], row_to_record)?;
            rows.collect()
        })
    }

    /// The record at one end of the `insert_date` ordering, or `None` on
    /// an empty store. The latest bound feeds the capabilities
    /// `updateSequence`.
    pub fn query_insert_bound(&self, bound: InsertBound) -> Result<Option<Record>> {
        let direction = match bound {
            InsertBound::Earliest => "ASC",
            InsertBound::Latest => "DESC",
        };
        let mut where_sql = "1 = 1".to_string();
        if let Some(filter) = &self.filter {
            where_sql.push_str(&format!(" AND ({})", filter.sql()));
        }
        let sql = format!(
            "SELECT {} FROM {TABLE} WHERE {where_sql} \
             ORDER BY insert_date {direction}, identifier LIMIT 1",
            select_list()
        );
        let conn = self.conn.lock();
        let mut rows = self.with_retry(|| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], row_to_record)?;
            rows.collect::<rusqlite::Result<Vec<Record>>>()
        })?;
        Ok(rows.pop())
    }

    /// Distinct non-null values of one queryable, sorted.
    pub fn domain_values(&self, property: &str, typename: &str) -> Result<Vec<String>> {
        let column = self.translator.resolve_column(property, typename)?;
        let mut where_sql = format!("{column} IS NOT NULL AND {column} <> ''");
        if let Some(filter) = &self.filter {
            where_sql.push_str(&format!(" AND ({})", filter.sql()));
        }
        let sql = format!(
            "SELECT DISTINCT {column} FROM {TABLE} WHERE {where_sql} ORDER BY {column}"
        );
        let conn = self.conn.lock();
        self.with_retry(|| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
    }

    /// Insert one record. Fails with `DuplicateIdentifier` when the
    /// identifier already exists; commits atomically otherwise.
    pub fn insert(&self, rec: &Record) -> Result<()> {
        let mut conn = self.conn.lock();
        let result = self.write_txn(&mut conn, |tx| {
            let exists: i64 = tx.query_row(
                &format!("SELECT COUNT(*) FROM {TABLE} WHERE identifier = ?"),
                [&rec.identifier],
                |row| row.get(0),
            )?;
            if exists > 0 {
                return Err(Error::DuplicateIdentifier {
                    identifier: rec.identifier.clone(),
                });
            }
            let placeholders = vec!["?"; record::COLUMNS.len()].join(", ");
            tx.execute(
                &format!(
                    "INSERT INTO {TABLE} ({}) VALUES ({placeholders})",
                    select_list()
                ),
                params_from_iter(record::COLUMNS.iter().map(|col| rec.get(col))),
            )?;
            Ok(())
        });
        if result.is_ok() {
            info!(identifier = %rec.identifier, "inserted record");
        }
        result
    }

    /// Replace a record wholesale by identifier, keeping the stored
    /// `insert_date`. Fails with `NotFound` when absent; a record masked
    /// by the operator filter counts as absent.
    pub fn update(&self, rec: &Record) -> Result<()> {
        let mut target = "identifier = ?".to_string();
        if let Some(filter) = &self.filter {
            target.push_str(&format!(" AND ({})", filter.sql()));
        }
        let mut conn = self.conn.lock();
        self.write_txn(&mut conn, |tx| {
            let insert_date: Option<String> = tx
                .query_row(
                    &format!("SELECT insert_date FROM {TABLE} WHERE {target}"),
                    [&rec.identifier],
                    |row| row.get(0),
                )
                .map_err(|e| match e {
                    rusqlite::Error::QueryReturnedNoRows => Error::NotFound {
                        identifier: rec.identifier.clone(),
                    },
                    other => Error::Backend(other),
                })?;

            let mut replacement = rec.clone();
            if let Some(date) = insert_date {
                replacement.insert_date = date;
            }

            let assignments: Vec<String> = record::COLUMNS
                .iter()
                .filter(|col| **col != "identifier")
                .map(|col| format!("{col} = ?"))
                .collect();
            let params = record::COLUMNS
                .iter()
                .filter(|col| **col != "identifier")
                .map(|col| replacement.get(col).map(str::to_string))
                .chain(std::iter::once(Some(rec.identifier.clone())));
            tx.execute(
                &format!(
                    "UPDATE {TABLE} SET {} WHERE {target}",
                    assignments.join(", ")
                ),
                params_from_iter(params),
            )?;
            Ok(())
        })
    }

    /// Apply named property updates to every record matching the
    /// constraint. Every logical name is resolved before any row is
    /// touched, and the whole batch runs in one transaction, so an unknown
    /// name leaves zero records modified.
    pub fn update_properties(
        &self,
        constraint: Option<&Constraint>,
        updates: &[PropertyUpdate],
        typename: &str,
    ) -> Result<u64> {
        if updates.is_empty() {
            return Ok(0);
        }
        let translated = self.translator.translate(constraint, typename)?;
        let mut assignments = Vec::with_capacity(updates.len());
        let mut assign_params: Vec<Value> = Vec::with_capacity(updates.len());
        for update in updates {
            let column = self.translator.resolve_column(&update.name, typename)?;
            if column == "identifier" {
                return Err(Error::invalid_parameter(
                    update.name.clone(),
                    "record identifiers cannot be rewritten in place",
                ));
            }
            assignments.push(format!("{column} = ?"));
            assign_params.push(Value::Text(update.value.clone()));
        }

        let (where_sql, where_params) = self.build_where(&translated, &[]);
        let mut params = assign_params;
        params.extend(where_params);

        let mut conn = self.conn.lock();
        let changed = self.write_txn(&mut conn, |tx| {
            let changed = tx.execute(
                &format!(
                    "UPDATE {TABLE} SET {} WHERE {where_sql}",
                    assignments.join(", ")
                ),
                params_from_iter(params.iter()),
            )?;
            Ok(changed as u64)
        })?;
        info!(changed, "updated record properties");
        Ok(changed)
    }

    /// Delete every record matching the constraint, plus (in the same
    /// transaction) records whose `parentidentifier` names a record just
    /// deleted. One level only; reaching grandchildren takes another call.
    /// Returns the number of records removed, children included.
    pub fn delete(&self, constraint: Option<&Constraint>, typename: &str) -> Result<u64> {
        let translated = self.translator.translate(constraint, typename)?;
        let (where_sql, where_params) = self.build_where(&translated, &[]);

        let mut conn = self.conn.lock();
        let deleted = self.write_txn(&mut conn, |tx| {
            let ids: Vec<String> = {
                let mut stmt = tx.prepare(&format!(
                    "SELECT identifier FROM {TABLE} WHERE {where_sql}"
                ))?;
                let rows = stmt.query_map(params_from_iter(where_params.iter()), |row| {
                    row.get(0)
                })?;
                rows.collect::<rusqlite::Result<_>>()?
            };
            if ids.is_empty() {
                return Ok(0);
            }

            let placeholders = vec!["?"; ids.len()].join(", ");
            let direct = tx.execute(
                &format!("DELETE FROM {TABLE} WHERE identifier IN ({placeholders})"),
                params_from_iter(ids.iter()),
            )?;
            let mut cascade = format!("parentidentifier IN ({placeholders})");
            if let Some(filter) = &self.filter {
                cascade.push_str(&format!(" AND ({})", filter.sql()));
            }
            let children = tx.execute(
                &format!("DELETE FROM {TABLE} WHERE {cascade}"),
                params_from_iter(ids.iter()),
            )?;
            Ok((direct + children) as u64)
        })?;
        info!(deleted, "deleted records");
        Ok(deleted)
    }

    /// WHERE clause for a translated constraint: constraint fragment,
    /// optional typename restriction, operator filter.
    fn build_where(
        &self,
        translated: &TranslatedQuery,
        typenames: &[String],
    ) -> (String, Vec<Value>) {
        let mut where_sql = format!("({})", translated.where_sql);
        let mut params: Vec<Value> = translated.params.iter().map(literal_to_value).collect();

        if !typenames.is_empty() {
            let placeholders = vec!["?"; typenames.len()].join(", ");
            where_sql.push_str(&format!(" AND typename IN ({placeholders})"));
            params.extend(typenames.iter().map(|t| Value::Text(t.clone())));
        }
        if let Some(filter) = &self.filter {
            where_sql.push_str(&format!(" AND ({})", filter.sql()));
        }
        (where_sql, params)
    }

    /// Run a read closure, retrying transient busy/locked failures.
    fn with_retry<T>(&self, mut op: impl FnMut() -> rusqlite::Result<T>) -> Result<T> {
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if is_transient(&e) && attempt < MAX_ATTEMPTS => {
                    warn!(attempt, error = %e, "transient backend error, retrying");
                    std::thread::sleep(std::time::Duration::from_millis(25 * u64::from(attempt)));
                    attempt += 1;
                }
                Err(e) if is_transient(&e) => {
                    return Err(Error::Repository(format!(
                        "backend still busy after {MAX_ATTEMPTS} attempts: {e}"
                    )))
                }
                Err(e) => return Err(Error::Backend(e)),
            }
        }
    }

    /// Run a write closure inside one transaction, retrying transient
    /// failures. Any error rolls the whole transaction back.
    fn write_txn<T>(
        &self,
        conn: &mut Connection,
        op: impl Fn(&rusqlite::Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let mut attempt = 1;
        loop {
            let result = (|| {
                let tx = conn.transaction()?;
                let value = op(&tx)?;
                tx.commit()?;
                Ok(value)
            })();
            match result {
                Ok(value) => return Ok(value),
                Err(Error::Backend(e)) if is_transient(&e) && attempt < MAX_ATTEMPTS => {
                    warn!(attempt, error = %e, "transient backend error, retrying write");
                    std::thread::sleep(std::time::Duration::from_millis(25 * u64::from(attempt)));
                    attempt += 1;
                }
                Err(Error::Backend(e)) if is_transient(&e) => {
                    return Err(Error::Repository(format!(
                        "backend still busy after {MAX_ATTEMPTS} attempts: {e}"
                    )))
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(failure, _)
            if matches!(
                failure.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            )
    )
}

fn select_list() -> String {
    record::COLUMNS.join(", ")
}

/// ORDER BY clause: explicit sort keys win, then spatial rank, then the
/// identifier tiebreak. Rank binds the query geometry as a parameter.
fn build_order(translated: &TranslatedQuery, sort_keys: &[SortKey]) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if !sort_keys.is_empty() {
        for key in sort_keys {
            let direction = match key.order {
                SortOrder::Asc => "ASC",
                SortOrder::Desc => "DESC",
            };
            clauses.push(format!("{} {direction}", key.column));
        }
    } else if let Some(rank) = &translated.rank {
        clauses.push(format!("bbox_ratio({}, ?) DESC", rank.column));
        params.push(Value::Text(rank.wkt.clone()));
    }

    clauses.push("identifier ASC".to_string());
    (clauses.join(", "), params)
}

/// The store is all TEXT, so numeric literals bind as their text rendering;
/// a REAL binding would never equal a stored digit string under SQLite's
/// type ordering.
fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::String(s) => Value::Text(s.clone()),
        Literal::Number(n) => Value::Text(n.to_string()),
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let mut rec = Record::default();
    for (i, col) in record::COLUMNS.iter().enumerate() {
        rec.set(col, row.get::<_, Option<String>>(i)?);
    }
    Ok(rec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> Repository {
        let registry = Arc::new(QueryableRegistry::with_core_profiles().unwrap());
        Repository::in_memory(registry).unwrap()
    }

    fn sample(id: &str) -> Record {
        Record::new(id, "csw:Record", "http://www.opengis.net/cat/csw/2.0.2")
            .with_title(format!("Record {id}"))
    }

    #[test]
    fn test_insert_then_query_by_ids_roundtrip() {
        let repo = repo();
        let mut rec = sample("r1")
            .with_abstract("Hydrography of Lake Ontario")
            .with_keywords("lakes,hydrography")
            .with_geometry("POLYGON((-79.8 43.2, -79.8 44.2, -76.0 44.2, -76.0 43.2, -79.8 43.2))");
        rec.rebuild_anytext();

        repo.insert(&rec).unwrap();
        let got = repo.query_by_ids(&["r1".to_string()]).unwrap();
        assert_eq!(got, vec![rec]);
    }

    #[test]
    fn test_insert_duplicate_identifier() {
        let repo = repo();
        repo.insert(&sample("r1")).unwrap();
        let err = repo.insert(&sample("r1")).unwrap_err();
        assert!(matches!(err, Error::DuplicateIdentifier { .. }));
    }

    #[test]
    fn test_empty_repository_query() {
        let repo = repo();
        let (total, page) = repo
            .query(None, &[], &[], Pagination::default())
            .unwrap();
        assert_eq!(total, 0);
        assert!(page.is_empty());
    }

    #[test]
    fn test_pagination_covers_all_matches_exactly_once() {
        let repo = repo();
        for i in 0..23 {
            repo.insert(&sample(&format!("r{i:02}"))).unwrap();
        }

        let mut seen = Vec::new();
        let mut start = 1;
        loop {
            let (total, page) = repo
                .query(None, &[], &[], Pagination::new(10, start))
                .unwrap();
            assert_eq!(total, 23);
            if page.is_empty() {
                break;
            }
            start += page.len() as u32;
            seen.extend(page.into_iter().map(|r| r.identifier));
        }

        assert_eq!(seen.len(), 23);
        let mut dedup = seen.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(dedup.len(), 23);
    }

    #[test]
    fn test_query_with_constraint_and_sort() {
        let repo = repo();
        repo.insert(&sample("a").with_field("date_modified", "2021-05-01"))
            .unwrap();
        repo.insert(&sample("b").with_field("date_modified", "2023-01-15"))
            .unwrap();
        repo.insert(&sample("c").with_field("date_modified", "2022-07-30"))
            .unwrap();

        let constraint = Constraint::CqlText("dct:modified >= '2022-01-01'".to_string());
        let (total, page) = repo
            .query(
                Some(&constraint),
                &[SortSpec::desc("dct:modified")],
                &[],
                Pagination::default(),
            )
            .unwrap();
        assert_eq!(total, 2);
        let ids: Vec<&str> = page.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["b", "c"]);
    }

    #[test]
    fn test_spatial_ranking_orders_by_overlap() {
        let repo = repo();
        repo.insert(
            &sample("far").with_geometry("POLYGON((50 50, 50 51, 51 51, 51 50, 50 50))"),
        )
        .unwrap();
        repo.insert(&sample("best").with_geometry("POLYGON((0 0, 0 10, 10 10, 10 0, 0 0))"))
            .unwrap();
        repo.insert(
            &sample("partial").with_geometry("POLYGON((5 0, 5 10, 15 10, 15 0, 5 0))"),
        )
        .unwrap();

        let constraint =
            Constraint::CqlText("BBOX(ows:BoundingBox, 0, 0, 10, 10)".to_string());
        let (total, page) = repo
            .query(Some(&constraint), &[], &[], Pagination::default())
            .unwrap();
        assert_eq!(total, 2);
        let ids: Vec<&str> = page.iter().map(|r| r.identifier.as_str()).collect();
        assert_eq!(ids, vec!["best", "partial"]);
    }

    #[test]
    fn test_like_default_is_case_sensitive() {
        let repo = repo();
        repo.insert(&sample("r1").with_field("type", "dataset"))
            .unwrap();

        let upper = Constraint::CqlText("dc:type LIKE 'DATA%'".to_string());
        let (total, _) = repo
            .query(Some(&upper), &[], &[], Pagination::default())
            .unwrap();
        assert_eq!(total, 0);

        let exact = Constraint::CqlText("dc:type LIKE 'data%'".to_string());
        let (total, _) = repo
            .query(Some(&exact), &[], &[], Pagination::default())
            .unwrap();
        assert_eq!(total, 1);

        // Case-insensitive queryables still fold both sides.
        let title = Constraint::CqlText("dc:title LIKE 'RECORD%'".to_string());
        let (total, _) = repo
            .query(Some(&title), &[], &[], Pagination::default())
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_numeric_literal_matches_stored_digits() {
        let repo = repo();
        repo.insert(&sample("r1").with_field("date", "2020")).unwrap();

        let constraint = Constraint::CqlText("dc:date = 2020".to_string());
        let (total, _) = repo
            .query(Some(&constraint), &[], &[], Pagination::default())
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_typename_restriction() {
        let repo = repo();
        repo.insert(&sample("dc-1")).unwrap();
        repo.insert(&Record::new(
            "iso-1",
            "gmd:MD_Metadata",
            "http://www.isotc211.org/2005/gmd",
        ))
        .unwrap();

        let (total, page) = repo
            .query(
                None,
                &[],
                &["gmd:MD_Metadata".to_string()],
                Pagination::default(),
            )
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].identifier, "iso-1");
    }

    #[test]
    fn test_update_replaces_but_keeps_insert_date() {
        let repo = repo();
        let mut rec = sample("r1");
        rec.insert_date = "2020-01-01T00:00:00Z".to_string();
        repo.insert(&rec).unwrap();

        let mut replacement = sample("r1").with_title("Renamed");
        replacement.insert_date = "2099-01-01T00:00:00Z".to_string();
        repo.update(&replacement).unwrap();

        let got = repo.query_by_ids(&["r1".to_string()]).unwrap();
        assert_eq!(got[0].title.as_deref(), Some("Renamed"));
        assert_eq!(got[0].insert_date, "2020-01-01T00:00:00Z");
    }

    #[test]
    fn test_update_missing_record() {
        let repo = repo();
        let err = repo.update(&sample("ghost")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_update_properties_all_or_nothing() {
        let repo = repo();
        repo.insert(&sample("r1")).unwrap();
        repo.insert(&sample("r2")).unwrap();

        let updates = [
            PropertyUpdate::new("dc:creator", "NOAA"),
            PropertyUpdate::new("dc:nonsense", "x"),
        ];
        let err = repo
            .update_properties(None, &updates, DEFAULT_TYPENAME)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameterValue { .. }));

        // Nothing was applied.
        let got = repo.query_by_ids(&["r1".to_string()]).unwrap();
        assert_eq!(got[0].creator, None);
    }

    #[test]
    fn test_update_properties_applies_to_matches() {
        let repo = repo();
        repo.insert(&sample("r1")).unwrap();
        repo.insert(&sample("r2")).unwrap();

        let constraint = Constraint::CqlText("dc:identifier = 'r1'".to_string());
        let changed = repo
            .update_properties(
                Some(&constraint),
                &[PropertyUpdate::new("dc:creator", "NOAA")],
                DEFAULT_TYPENAME,
            )
            .unwrap();
        assert_eq!(changed, 1);
        let got = repo.query_by_ids(&["r1".to_string()]).unwrap();
        assert_eq!(got[0].creator.as_deref(), Some("NOAA"));
    }

    #[test]
    fn test_delete_cascades_one_level() {
        let repo = repo();
        repo.insert(&sample("parent")).unwrap();
        repo.insert(&sample("child").with_parent("parent")).unwrap();
        repo.insert(&sample("grandchild").with_parent("child"))
            .unwrap();

        let constraint = Constraint::CqlText("dc:identifier = 'parent'".to_string());
        let deleted = repo.delete(Some(&constraint), DEFAULT_TYPENAME).unwrap();
        assert_eq!(deleted, 2);

        // Grandchild survives until another delete names its parent.
        let (total, _) = repo.query(None, &[], &[], Pagination::default()).unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_delete_no_matches() {
        let repo = repo();
        repo.insert(&sample("r1")).unwrap();
        let constraint = Constraint::CqlText("dc:identifier = 'ghost'".to_string());
        assert_eq!(repo.delete(Some(&constraint), DEFAULT_TYPENAME).unwrap(), 0);
    }

    #[test]
    fn test_repository_filter_masks_everything() {
        let registry = Arc::new(QueryableRegistry::with_core_profiles().unwrap());
        let repo = Repository::in_memory(registry)
            .unwrap()
            .with_filter(RepositoryFilter::new("type = 'dataset'").unwrap());

        repo.insert(&sample("d1").with_field("type", "dataset"))
            .unwrap();
        repo.insert(&sample("s1").with_field("type", "service"))
            .unwrap();

        let (total, page) = repo.query(None, &[], &[], Pagination::default()).unwrap();
        assert_eq!(total, 1);
        assert_eq!(page[0].identifier, "d1");

        assert!(repo.query_by_ids(&["s1".to_string()]).unwrap().is_empty());
        let deleted = repo.delete(None, DEFAULT_TYPENAME).unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_repository_filter_gates_update() {
        let registry = Arc::new(QueryableRegistry::with_core_profiles().unwrap());
        let repo = Repository::in_memory(registry)
            .unwrap()
            .with_filter(RepositoryFilter::new("type = 'dataset'").unwrap());

        repo.insert(&sample("s1").with_field("type", "service"))
            .unwrap();

        let mut replacement = sample("s1").with_title("Renamed");
        replacement.type_ = Some("service".to_string());
        let err = repo.update(&replacement).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_repository_filter_gates_delete_cascade() {
        let registry = Arc::new(QueryableRegistry::with_core_profiles().unwrap());
        let repo = Repository::in_memory(registry)
            .unwrap()
            .with_filter(RepositoryFilter::new("type = 'dataset'").unwrap());

        repo.insert(&sample("parent").with_field("type", "dataset"))
            .unwrap();
        repo.insert(
            &sample("masked-child")
                .with_parent("parent")
                .with_field("type", "service"),
        )
        .unwrap();

        let constraint = Constraint::CqlText("dc:identifier = 'parent'".to_string());
        let deleted = repo.delete(Some(&constraint), DEFAULT_TYPENAME).unwrap();
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_query_by_source() {
        let repo = repo();
        let mut harvested = sample("h1");
        harvested.mdsource = "https://example.org/csw".to_string();
        repo.insert(&harvested).unwrap();
        repo.insert(&sample("local-1")).unwrap();

        let got = repo.query_by_source("https://example.org/csw").unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].identifier, "h1");
    }

    #[test]
    fn test_insert_bounds() {
        let repo = repo();
        assert!(repo
            .query_insert_bound(InsertBound::Latest)
            .unwrap()
            .is_none());

        let mut old = sample("old");
        old.insert_date = "2020-01-01T00:00:00Z".to_string();
        let mut new = sample("new");
        new.insert_date = "2024-06-01T00:00:00Z".to_string();
        repo.insert(&old).unwrap();
        repo.insert(&new).unwrap();

        let latest = repo.query_insert_bound(InsertBound::Latest).unwrap();
        assert_eq!(latest.map(|r| r.identifier).as_deref(), Some("new"));
        let earliest = repo.query_insert_bound(InsertBound::Earliest).unwrap();
        assert_eq!(earliest.map(|r| r.identifier).as_deref(), Some("old"));
    }

    #[test]
    fn test_domain_values() {
        let repo = repo();
        repo.insert(&sample("a").with_field("type", "dataset")).unwrap();
        repo.insert(&sample("b").with_field("type", "service")).unwrap();
        repo.insert(&sample("c").with_field("type", "dataset")).unwrap();
        repo.insert(&sample("d")).unwrap();

        let values = repo.domain_values("dc:type", DEFAULT_TYPENAME).unwrap();
        assert_eq!(values, vec!["dataset".to_string(), "service".to_string()]);
    }
}
