//! SQLite storage bootstrap and schema application entry points.
//!
//! # Responsibility
//! - Open and configure SQLite connections for one app store.
//! - Apply core migrations, then materialize the app's entity schema.
//!
//! # Invariants
//! - Core migration version is tracked via `PRAGMA user_version`.
//! - App schema name/version are tracked in `store_meta`.
//! - Store code must not read/write records before both steps succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod apply;
pub mod migrations;
mod open;

pub use apply::{apply_schema, stored_schema};
pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The file was created for a different app schema.
    SchemaMismatch {
        expected: &'static str,
        found: String,
    },
    InvalidSchema(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "database schema version {db_version} is newer than supported {latest_supported}"
            ),
            Self::SchemaMismatch { expected, found } => write!(
                f,
                "database belongs to schema `{found}`, expected `{expected}`"
            ),
            Self::InvalidSchema(message) => write!(f, "invalid schema: {message}"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. }
            | Self::SchemaMismatch { .. }
            | Self::InvalidSchema(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
