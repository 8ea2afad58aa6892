//! Persistent record store for one app.
//!
//! # Responsibility
//! - Evaluate typed queries against committed records.
//! - Stage inserts/updates/deletes per owner and commit them atomically.
//! - Signal the change notifier after every successful non-empty commit.
//!
//! # Invariants
//! - Queries observe committed state only.
//! - A failed commit rolls back completely and keeps its changes staged.
//! - Updates write only fields modified since load (per-field merge).
//! - Parent deletion nullifies or cascades children per schema.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod handle;
pub mod query;
mod staging;

pub use handle::Store;
pub use query::{Comparison, Condition, Direction, Query, SortKey};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug)]
pub enum StoreError {
    /// Backing database could not be created, opened or migrated.
    StorageUnavailable(DbError),
    /// Change notifier worker could not be started.
    NotifierUnavailable(std::io::Error),
    /// Commit failed; staged changes are still pending.
    Persistence(DbError),
    /// Read failed.
    Query(DbError),
    UnknownEntity(String),
    UnknownField {
        entity: String,
        field: String,
    },
    TypeMismatch {
        entity: String,
        field: String,
        expected: &'static str,
    },
    MissingIdentity(&'static str),
    InvalidData(String),
}

impl StoreError {
    /// Returns whether the failure happened while writing staged changes.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::NotifierUnavailable(err) => write!(f, "change notifier unavailable: {err}"),
            Self::Persistence(err) => write!(f, "commit failed: {err}"),
            Self::Query(err) => write!(f, "query failed: {err}"),
            Self::UnknownEntity(entity) => write!(f, "unknown entity `{entity}`"),
            Self::UnknownField { entity, field } => {
                write!(f, "unknown field `{field}` on entity `{entity}`")
            }
            Self::TypeMismatch {
                entity,
                field,
                expected,
            } => write!(f, "field `{entity}.{field}` expects a {expected} value"),
            Self::MissingIdentity(entity) => {
                write!(f, "record of `{entity}` has no identity; insert it first")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StorageUnavailable(err) | Self::Persistence(err) | Self::Query(err) => Some(err),
            Self::NotifierUnavailable(err) => Some(err),
            Self::UnknownEntity(_)
            | Self::UnknownField { .. }
            | Self::TypeMismatch { .. }
            | Self::MissingIdentity(_)
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Query(DbError::Sqlite(value))
    }
}
