//! Local persistence and data-flow core shared by the pocket apps.
//! Each app declares a schema; this crate owns storage, change
//! notification, domain rules and view-model projections.

pub mod apps;
pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod projection;
pub mod schema;
pub mod service;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, StoreConfig};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{Record, RecordId, Value};
pub use notify::{ChangeNotifier, Subscription};
pub use schema::{EntitySchema, FieldDef, FieldKind, OnDelete, Schema};
pub use service::{
    Entity, EntityService, ServiceError, ServiceResult, ValidationError, WriteOutcome,
};
pub use store::{Condition, Query, SortKey, Store, StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
