//! The six app instantiations of the store.
//!
//! Every app follows the same shape: one `Schema` constant, typed models
//! implementing [`crate::service::Entity`], app services composed from
//! [`crate::service::EntityService`], view-models built on
//! [`crate::projection`], and an app handle that opens the store and seeds
//! default data once.

pub mod animals;
pub mod ball;
pub mod formulas;
pub mod plane;
pub mod todos;
pub mod tracker;

use crate::config::StoreConfig;
use crate::schema::Schema;
use crate::service::{ServiceResult, ValidationError};
use crate::store::{Store, StoreResult};
use log::{error, info};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::thread;
use std::time::Instant;

static COLOR_HEX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?[0-9A-Fa-f]{6}$").expect("valid color regex"));

/// Where an app keeps its store.
#[derive(Debug, Clone, Copy)]
pub enum StoreLocation<'a> {
    File(&'a Path),
    Memory,
}

pub(crate) fn open_store(
    schema: &'static Schema,
    location: StoreLocation<'_>,
    config: StoreConfig,
) -> StoreResult<Store> {
    match location {
        StoreLocation::File(path) => Store::open_with_config(schema, path, config),
        StoreLocation::Memory => Store::open_in_memory_with_config(schema, config),
    }
}

/// Runs `seed` on a worker thread with a detached store handle.
///
/// Seeding is best-effort: failures are logged and the app starts with
/// whatever data is present. Returns the number of seeded records.
pub(crate) fn seed_detached<F>(store: &Store, app: &'static str, seed: F) -> usize
where
    F: FnOnce(&Store) -> ServiceResult<usize> + Send,
{
    let worker = store.detached();
    let started_at = Instant::now();
    let outcome = thread::scope(|scope| scope.spawn(move || seed(&worker)).join());

    match outcome {
        Ok(Ok(seeded)) => {
            info!(
                "event=app_seed module=apps status=ok app={} seeded={} duration_ms={}",
                app,
                seeded,
                started_at.elapsed().as_millis()
            );
            seeded
        }
        Ok(Err(err)) => {
            error!(
                "event=app_seed module=apps status=error app={} error={}",
                app, err
            );
            0
        }
        Err(_) => {
            error!(
                "event=app_seed module=apps status=error app={} error_code=seed_panicked",
                app
            );
            0
        }
    }
}

/// Accepts `RRGGBB` with an optional leading `#`.
pub(crate) fn check_color_hex(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if COLOR_HEX_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidValue {
            field,
            message: "expected a #RRGGBB color".to_string(),
        })
    }
}
