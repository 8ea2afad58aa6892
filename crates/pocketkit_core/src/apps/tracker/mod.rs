//! Time tracker: projects, timed entries and per-project statistics.
//!
//! # Invariants
//! - At most one entry is active (no `end_date`); starting a timer stops
//!   the active one in the same commit.
//! - Deleting a project deletes its entries.
//! - Stopping a timer awards one progress point per tracked minute.

mod model;
mod service;
mod view_model;

pub use model::{DaySummary, Project, ProjectStatistics, TimeEntry, DEFAULT_PROJECT_COLOR};
pub use service::{ProjectService, TimeEntryService};
pub use view_model::{
    EntriesSnapshot, EntriesViewModel, ProjectsViewModel, TimerViewModel, TICK_INTERVAL,
};

use super::{open_store, StoreLocation};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::schema::{EntitySchema, FieldDef, OnDelete, Schema};
use crate::service::progress::PROGRESS_FIELDS;
use crate::store::{Store, StoreResult};
use std::path::Path;
use std::sync::Arc;

pub const PROJECT: &str = "project";
pub const TIME_ENTRY: &str = "time_entry";
pub const TRACKER_PROGRESS: &str = "tracker_progress";

pub static SCHEMA: Schema = Schema {
    name: "tracker",
    version: 1,
    entities: &[
        EntitySchema {
            name: PROJECT,
            fields: &[
                FieldDef::text("name").required(),
                FieldDef::text("color_hex"),
                FieldDef::timestamp("created_at"),
            ],
        },
        EntitySchema {
            name: TIME_ENTRY,
            fields: &[
                FieldDef::timestamp("start_date"),
                FieldDef::timestamp("end_date"),
                FieldDef::text("notes"),
                FieldDef::reference("project_id", PROJECT, OnDelete::Cascade),
            ],
        },
        EntitySchema {
            name: TRACKER_PROGRESS,
            fields: PROGRESS_FIELDS,
        },
    ],
};

pub struct TrackerApp {
    store: Store,
    projects: ProjectService,
    entries: TimeEntryService,
}

impl TrackerApp {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(
            StoreLocation::File(path.as_ref()),
            StoreConfig::default(),
            Arc::new(SystemClock),
        )
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_with(StoreLocation::Memory, StoreConfig::default(), Arc::new(SystemClock))
    }

    pub fn open_with(
        location: StoreLocation<'_>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let store = open_store(&SCHEMA, location, config)?;
        Ok(Self {
            projects: ProjectService::new(store.clone(), Arc::clone(&clock)),
            entries: TimeEntryService::new(store.clone(), clock),
            store,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn projects(&self) -> &ProjectService {
        &self.projects
    }

    pub fn entries(&self) -> &TimeEntryService {
        &self.entries
    }

    pub fn timer(&self) -> TimerViewModel {
        TimerViewModel::new(self.entries.clone())
    }

    pub fn entries_view(&self) -> EntriesViewModel {
        EntriesViewModel::new(self.entries.clone())
    }

    pub fn projects_view(&self) -> ProjectsViewModel {
        ProjectsViewModel::new(self.projects.clone())
    }
}
