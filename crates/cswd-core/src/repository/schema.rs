//! Record store schema and connection setup.

use crate::error::Result;
use crate::geometry;
use cswd_proto::record;
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use tracing::debug;

/// The one table records live in.
pub const TABLE: &str = "records";

/// Open (or create) a record store at `path`.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path.as_ref())?;
    configure(&conn)?;
    debug!(path = %path.as_ref().display(), "opened record store");
    Ok(conn)
}

/// In-memory store for tests and scratch work.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // SQLite's LIKE ignores ASCII case by default; comparisons here are
    // case-sensitive unless the queryable opts in via lower() folding.
    conn.pragma_update(None, "case_sensitive_like", true)?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    register_functions(conn)?;
    create_tables(conn)?;
    Ok(())
}

fn create_tables(conn: &Connection) -> Result<()> {
    let mut columns = Vec::with_capacity(record::COLUMNS.len());
    for col in record::COLUMNS {
        if *col == "identifier" {
            columns.push(format!("{col} TEXT PRIMARY KEY"));
        } else {
            columns.push(format!("{col} TEXT"));
        }
    }
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} ({});
         CREATE INDEX IF NOT EXISTS idx_{TABLE}_typename ON {TABLE} (typename);
         CREATE INDEX IF NOT EXISTS idx_{TABLE}_parent ON {TABLE} (parentidentifier);
         CREATE INDEX IF NOT EXISTS idx_{TABLE}_insert_date ON {TABLE} (insert_date);
         CREATE INDEX IF NOT EXISTS idx_{TABLE}_mdsource ON {TABLE} (mdsource);",
        columns.join(", ")
    ))?;
    Ok(())
}

/// Register the spatial scalar functions every query may call.
///
/// A stored geometry that is NULL or unparsable never matches and ranks
/// zero; only the caller-supplied query geometry is validated upstream.
fn register_functions(conn: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;

    conn.create_scalar_function("bbox_overlaps", 2, flags, |ctx| {
        Ok(match envelopes(ctx)? {
            Some((geom, query)) => i64::from(geom.overlaps(&query)),
            None => 0,
        })
    })?;

    conn.create_scalar_function("bbox_ratio", 2, flags, |ctx| {
        Ok(match envelopes(ctx)? {
            Some((geom, query)) => geometry::overlap_ratio(&geom, &query),
            None => 0.0,
        })
    })?;

    Ok(())
}

fn envelopes(
    ctx: &rusqlite::functions::Context<'_>,
) -> rusqlite::Result<Option<(geometry::Envelope, geometry::Envelope)>> {
    let stored: Option<String> = ctx.get(0)?;
    let query: Option<String> = ctx.get(1)?;
    let (Some(stored), Some(query)) = (stored, query) else {
        return Ok(None);
    };
    let Ok(geom) = geometry::parse_envelope(&stored) else {
        return Ok(None);
    };
    let Ok(query) = geometry::parse_envelope(&query) else {
        return Ok(None);
    };
    Ok(Some((geom, query)))
}
