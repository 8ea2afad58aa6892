//! Materializes an app `Schema` as SQLite tables.
//!
//! # Invariants
//! - Runs after core migrations, inside one transaction.
//! - Existing tables only ever gain columns; nothing is dropped or retyped.

use super::{DbError, DbResult};
use crate::schema::{EntitySchema, Schema};
use log::info;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;

const META_SCHEMA_NAME: &str = "schema_name";
const META_SCHEMA_VERSION: &str = "schema_version";

/// Returns `(schema_name, schema_version)` recorded in `store_meta`, if any.
pub fn stored_schema(conn: &Connection) -> DbResult<Option<(String, u32)>> {
    let name = read_meta(conn, META_SCHEMA_NAME)?;
    let version = read_meta(conn, META_SCHEMA_VERSION)?;
    match (name, version) {
        (Some(name), Some(version)) => {
            let version = version.parse::<u32>().map_err(|_| {
                DbError::InvalidSchema(format!("invalid stored schema version `{version}`"))
            })?;
            Ok(Some((name, version)))
        }
        _ => Ok(None),
    }
}

/// Creates missing entity tables/columns and records the schema identity.
///
/// # Errors
/// - `InvalidSchema` when the schema definition itself is inconsistent.
/// - `SchemaMismatch` when the file was created for another schema.
/// - `UnsupportedSchemaVersion` when the file is newer than `schema`.
pub fn apply_schema(conn: &mut Connection, schema: &Schema) -> DbResult<()> {
    schema.validate().map_err(DbError::InvalidSchema)?;

    let stored = stored_schema(conn)?;
    let from_version = match &stored {
        Some((name, _)) if name != schema.name => {
            return Err(DbError::SchemaMismatch {
                expected: schema.name,
                found: name.clone(),
            });
        }
        Some((_, version)) if *version > schema.version => {
            return Err(DbError::UnsupportedSchemaVersion {
                db_version: *version,
                latest_supported: schema.version,
            });
        }
        Some((_, version)) if *version == schema.version => return Ok(()),
        Some((_, version)) => *version,
        None => 0,
    };

    let tx = conn.transaction()?;
    let mut added_columns = 0usize;
    for entity in schema.entities {
        if table_exists(&tx, entity.name)? {
            added_columns += add_missing_columns(&tx, entity)?;
        } else {
            tx.execute_batch(&entity.create_table_sql())?;
        }
        for sql in entity.index_sql() {
            tx.execute_batch(&sql)?;
        }
    }
    write_meta(&tx, META_SCHEMA_NAME, schema.name)?;
    write_meta(&tx, META_SCHEMA_VERSION, &schema.version.to_string())?;
    tx.commit()?;

    info!(
        "event=schema_apply module=db status=ok schema={} from_version={} to_version={} entities={} added_columns={}",
        schema.name,
        from_version,
        schema.version,
        schema.entities.len(),
        added_columns
    );
    Ok(())
}

fn add_missing_columns(conn: &Connection, entity: &EntitySchema) -> DbResult<usize> {
    let existing = table_columns(conn, entity.name)?;
    let mut added = 0;
    for field in entity.fields {
        if existing.contains(field.name) {
            continue;
        }
        conn.execute_batch(&format!(
            "ALTER TABLE \"{}\" ADD COLUMN {};",
            entity.name,
            field.column_sql()
        ))?;
        added += 1;
    }
    Ok(added)
}

fn table_exists(conn: &Connection, table: &str) -> DbResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_columns(conn: &Connection, table: &str) -> DbResult<HashSet<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\");"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>("name"))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(columns)
}

fn read_meta(conn: &Connection, key: &str) -> DbResult<Option<String>> {
    let value = conn
        .query_row(
            "SELECT value FROM store_meta WHERE key = ?1;",
            [key],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

fn write_meta(conn: &Connection, key: &str, value: &str) -> DbResult<()> {
    conn.execute(
        "INSERT INTO store_meta (key, value)
         VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![key, value],
    )?;
    Ok(())
}
