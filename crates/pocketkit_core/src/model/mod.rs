//! Generic record model shared by every app store.
//!
//! # Responsibility
//! - Define the identity-bearing `Record` staged into and read from the store.
//! - Define the typed scalar `Value` carried by record fields.
//!
//! # Invariants
//! - Record identity is a UUID assigned once and never reused.
//! - Records track which fields changed since they were loaded; only those
//!   fields are written back on update.

pub mod record;

pub use record::{Record, RecordId, Value};
