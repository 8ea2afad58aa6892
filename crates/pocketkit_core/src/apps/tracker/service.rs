use super::model::{DaySummary, Project, ProjectStatistics, TimeEntry, DEFAULT_PROJECT_COLOR};
use super::TRACKER_PROGRESS;
use crate::apps::check_color_hex;
use crate::clock::Clock;
use crate::model::{Record, RecordId, Value};
use crate::service::{
    staged_unit, Entity, EntityService, Progress, ProgressService, ServiceResult,
    ValidationError, WriteOutcome,
};
use crate::store::{Condition, Query, SortKey, Store};
use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProjectService {
    projects: EntityService<Project>,
    clock: Arc<dyn Clock>,
}

impl ProjectService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            projects: EntityService::new(store),
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        self.projects.store()
    }

    /// Projects in creation order.
    pub fn fetch_all(&self) -> Vec<Project> {
        self.projects.fetch_all()
    }

    pub fn get(&self, id: RecordId) -> Option<Project> {
        self.projects.get(id)
    }

    /// Creates a project; `color_hex` defaults to [`DEFAULT_PROJECT_COLOR`].
    pub fn create(&self, name: &str, color_hex: Option<&str>) -> ServiceResult<Project> {
        let color_hex = color_hex.unwrap_or(DEFAULT_PROJECT_COLOR);
        check_color_hex("color_hex", color_hex)?;
        let record = Record::new(Project::NAME)
            .with("name", name)
            .with("color_hex", color_hex)
            .with("created_at", self.clock.now());
        self.projects.create(record)
    }

    pub fn update(&self, project: &Project) -> ServiceResult<WriteOutcome> {
        check_color_hex("color_hex", &project.color_hex)?;
        self.projects.update(project)
    }

    /// Deletes the project together with its time entries.
    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        self.projects.delete(id)
    }
}

#[derive(Clone)]
pub struct TimeEntryService {
    entries: EntityService<TimeEntry>,
    projects: EntityService<Project>,
    progress: ProgressService,
    clock: Arc<dyn Clock>,
}

impl TimeEntryService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: EntityService::new(store.clone()),
            projects: EntityService::new(store.clone()),
            progress: ProgressService::new(store, TRACKER_PROGRESS, Arc::clone(&clock)),
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        self.entries.store()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The running entry, if any.
    pub fn active_entry(&self) -> Option<TimeEntry> {
        let query = Query::new()
            .filter(Condition::eq("end_date", Value::Null))
            .sort(SortKey::desc("start_date"))
            .limit(1);
        self.entries.fetch(&query).into_iter().next()
    }

    /// Starts a timer for `project_id`, stopping the running one first.
    ///
    /// # Errors
    /// - `Validation` when the project does not exist; nothing is staged.
    pub fn start_timer(&self, project_id: RecordId, notes: Option<String>) -> ServiceResult<TimeEntry> {
        if !self.store().exists(Project::NAME, project_id)? {
            return Err(ValidationError::MissingParent {
                entity: TimeEntry::NAME,
                field: "project_id",
                parent_id: project_id,
            }
            .into());
        }

        let (stopped, record) = staged_unit(self.store(), || {
            let stopped = self.stage_stop_active()?;
            let record = Record::new(TimeEntry::NAME)
                .with("start_date", self.clock.now())
                .with("notes", notes)
                .with("project_id", project_id);
            Ok((stopped, self.entries.stage_create(record)?))
        })?;
        self.store().commit()?;

        info!(
            "event=timer_start module=apps status=ok entry_id={} stopped_previous={}",
            record.id(),
            stopped.is_some()
        );
        Ok(TimeEntry::from_record(&record))
    }

    /// Stops the running entry; `None` when no timer runs.
    pub fn stop_active(&self) -> ServiceResult<Option<TimeEntry>> {
        let Some(stopped) = staged_unit(self.store(), || self.stage_stop_active())? else {
            info!("event=timer_stop module=apps status=skip reason=no_active_entry");
            return Ok(None);
        };
        self.store().commit()?;
        info!(
            "event=timer_stop module=apps status=ok entry_id={} duration_s={}",
            stopped.id,
            stopped.duration(self.clock.now()).num_seconds()
        );
        Ok(Some(stopped))
    }

    fn stage_stop_active(&self) -> ServiceResult<Option<TimeEntry>> {
        let Some(mut active) = self.active_entry() else {
            return Ok(None);
        };
        let now = self.clock.now();
        let outcome = self.entries.stage_modify(active.id, |record| {
            record.set("end_date", now);
        })?;
        if !outcome.is_applied() {
            return Ok(None);
        }

        active.end_date = Some(now);
        let minutes = active.duration(now).num_minutes();
        self.progress.stage_completion(minutes)?;
        Ok(Some(active))
    }

    /// Entries started on `day`, latest first.
    pub fn entries_for_day(&self, day: NaiveDate) -> Vec<TimeEntry> {
        let (start, end) = self.clock.day_bounds(day);
        self.entries.fetch_where([
            Condition::ge("start_date", start),
            Condition::lt("start_date", end),
        ])
    }

    pub fn fetch_all(&self) -> Vec<TimeEntry> {
        self.entries.fetch_all()
    }

    pub fn update_entry(
        &self,
        id: RecordId,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> ServiceResult<WriteOutcome> {
        if end_date.is_some_and(|end| end < start_date) {
            return Err(ValidationError::InvalidValue {
                field: "end_date",
                message: "must not precede start_date".to_string(),
            }
            .into());
        }
        self.entries.modify(id, |record| {
            record
                .set("start_date", start_date)
                .set("end_date", end_date)
                .set("notes", notes);
        })
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        self.entries.delete(id)
    }

    /// Per-project totals over every entry, longest first.
    pub fn statistics(&self) -> Vec<ProjectStatistics> {
        ProjectStatistics::collect(
            &self.projects.fetch_all(),
            &self.entries.fetch_all(),
            self.clock.now(),
        )
    }

    pub fn day_summary(&self, day: NaiveDate) -> DaySummary {
        DaySummary::of(&self.entries_for_day(day), self.clock.now())
    }

    pub fn progress(&self) -> Progress {
        self.progress.fetch()
    }
}
