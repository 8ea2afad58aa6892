//! Connection bootstrap utilities for SQLite.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections for one app schema.
//! - Configure pragmas and SQL functions required by store queries.
//! - Apply core migrations and the app schema before returning.
//!
//! # Invariants
//! - Returned connections have `foreign_keys=ON`.
//! - Returned connections have `contains_ci(haystack, needle)` registered.

use super::apply::apply_schema;
use super::migrations::apply_migrations;
use super::DbResult;
use crate::schema::Schema;
use log::{error, info};
use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::path::Path;
use std::time::{Duration, Instant};

/// Opens a SQLite database file and prepares it for `schema`.
///
/// # Side effects
/// - Creates the file when missing.
/// - Emits `db_open` logging events with duration and status.
pub fn open_db(
    path: impl AsRef<Path>,
    schema: &Schema,
    busy_timeout: Duration,
) -> DbResult<Connection> {
    let path = path.as_ref();
    open_with("file", schema, busy_timeout, || Connection::open(path))
}

/// Opens an in-memory SQLite database prepared for `schema`.
pub fn open_db_in_memory(schema: &Schema, busy_timeout: Duration) -> DbResult<Connection> {
    open_with("memory", schema, busy_timeout, Connection::open_in_memory)
}

fn open_with(
    mode: &'static str,
    schema: &Schema,
    busy_timeout: Duration,
    connect: impl FnOnce() -> rusqlite::Result<Connection>,
) -> DbResult<Connection> {
    let started_at = Instant::now();
    info!(
        "event=db_open module=db status=start mode={} schema={}",
        mode, schema.name
    );

    let mut conn = match connect() {
        Ok(conn) => conn,
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_open_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            return Err(err.into());
        }
    };

    match bootstrap_connection(&mut conn, schema, busy_timeout) {
        Ok(()) => {
            info!(
                "event=db_open module=db status=ok mode={} schema={} version={} duration_ms={}",
                mode,
                schema.name,
                schema.version,
                started_at.elapsed().as_millis()
            );
            Ok(conn)
        }
        Err(err) => {
            error!(
                "event=db_open module=db status=error mode={} duration_ms={} error_code=db_bootstrap_failed error={}",
                mode,
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn bootstrap_connection(
    conn: &mut Connection,
    schema: &Schema,
    busy_timeout: Duration,
) -> DbResult<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(busy_timeout)?;
    register_functions(conn)?;
    apply_migrations(conn)?;
    apply_schema(conn, schema)?;
    Ok(())
}

/// Unicode-aware case-insensitive substring test; NULL operands never match.
fn register_functions(conn: &Connection) -> DbResult<()> {
    conn.create_scalar_function(
        "contains_ci",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let haystack = ctx.get::<Option<String>>(0)?;
            let needle = ctx.get::<Option<String>>(1)?;
            Ok(match (haystack, needle) {
                (Some(haystack), Some(needle)) => haystack
                    .to_lowercase()
                    .contains(needle.to_lowercase().as_str()),
                _ => false,
            })
        },
    )?;
    Ok(())
}
