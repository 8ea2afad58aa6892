//! Domain services over the record store.
//!
//! # Responsibility
//! - Enforce per-entity business rules (required fields, ordering index,
//!   parent existence, vanished-record tolerance).
//! - Map records into read-only models for view-models.
//!
//! # Invariants
//! - Reads are best-effort: store failures are logged and yield empty results.
//! - Writes report `Validation` before anything is staged.
//! - A write failing before its commit leaves none of its changes staged.
//! - Update/delete/toggle of a vanished record is a logged no-op.

use crate::model::RecordId;
use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod entity;
pub mod progress;
mod singleton;

pub use entity::{Entity, EntityService, OrderScope};
pub use progress::{advance_streak, level_for_points, Progress, ProgressService};
pub(crate) use singleton::{first_or_create, staged_unit};

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Caller-supplied input rejected before staging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyRequiredField {
        entity: &'static str,
        field: &'static str,
    },
    MissingParent {
        entity: &'static str,
        field: &'static str,
        parent_id: RecordId,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRequiredField { entity, field } => {
                write!(f, "{entity}.{field} must not be empty")
            }
            Self::MissingParent {
                entity,
                field,
                parent_id,
            } => write!(f, "{entity}.{field} references missing record {parent_id}"),
            Self::InvalidValue { field, message } => write!(f, "invalid {field}: {message}"),
        }
    }
}

impl Error for ValidationError {}

#[derive(Debug)]
pub enum ServiceError {
    Validation(ValidationError),
    /// Store-level failure on a write path; staged changes may be pending.
    Persistence(StoreError),
}

impl ServiceError {
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for ServiceError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

/// Result of a write addressed to an existing record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// Target record no longer exists; nothing was written.
    Missing,
}

impl WriteOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}
