use super::model::{DaySummary, Project, ProjectStatistics, TimeEntry};
use super::service::{ProjectService, TimeEntryService};
use crate::clock::Clock;
use crate::model::RecordId;
use crate::projection::{LiveProjection, Ticker};
use crate::service::{ServiceResult, WriteOutcome};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::warn;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

pub const TICK_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

struct TimerState {
    active: RwLock<Option<TimeEntry>>,
    elapsed: RwLock<Duration>,
}

impl TimerState {
    fn refresh(&self, now: DateTime<Utc>) {
        let elapsed = self
            .active
            .read()
            .as_ref()
            .map_or_else(Duration::zero, |entry| entry.duration(now));
        *self.elapsed.write() = elapsed;
    }
}

/// Running timer with an elapsed-time display.
///
/// The ticker only runs while an entry is active and stops with the
/// view-model.
pub struct TimerViewModel {
    service: TimeEntryService,
    state: Arc<TimerState>,
    ticker: Option<Ticker>,
    interval: std::time::Duration,
}

impl TimerViewModel {
    pub fn new(service: TimeEntryService) -> Self {
        Self::with_interval(service, TICK_INTERVAL)
    }

    pub fn with_interval(service: TimeEntryService, interval: std::time::Duration) -> Self {
        let state = Arc::new(TimerState {
            active: RwLock::new(service.active_entry()),
            elapsed: RwLock::new(Duration::zero()),
        });
        let mut view_model = Self {
            service,
            state,
            ticker: None,
            interval,
        };
        view_model.state.refresh(view_model.service.clock().now());
        view_model.restart_ticker();
        view_model
    }

    pub fn active_entry(&self) -> Option<TimeEntry> {
        self.state.active.read().clone()
    }

    pub fn elapsed(&self) -> Duration {
        *self.state.elapsed.read()
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_running)
    }

    pub fn start(&mut self, project_id: RecordId, notes: Option<String>) -> ServiceResult<TimeEntry> {
        let entry = self.service.start_timer(project_id, notes)?;
        *self.state.active.write() = Some(entry.clone());
        self.state.refresh(self.service.clock().now());
        self.restart_ticker();
        Ok(entry)
    }

    pub fn stop(&mut self) -> ServiceResult<Option<TimeEntry>> {
        self.stop_ticker();
        let stopped = self.service.stop_active()?;
        *self.state.active.write() = None;
        *self.state.elapsed.write() = Duration::zero();
        Ok(stopped)
    }

    /// Re-reads the active entry, e.g. after another screen changed it.
    pub fn reload(&mut self) {
        *self.state.active.write() = self.service.active_entry();
        self.state.refresh(self.service.clock().now());
        self.restart_ticker();
    }

    fn restart_ticker(&mut self) {
        self.stop_ticker();
        if self.state.active.read().is_none() {
            return;
        }

        let state = Arc::clone(&self.state);
        let clock: Arc<dyn Clock> = Arc::clone(self.service.clock());
        match Ticker::start(self.interval, move || state.refresh(clock.now())) {
            Ok(ticker) => self.ticker = Some(ticker),
            Err(err) => {
                warn!("event=timer_ticker_start module=apps status=error error={err}")
            }
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntriesSnapshot {
    pub day: NaiveDate,
    pub entries: Vec<TimeEntry>,
    pub summary: DaySummary,
    pub statistics: Vec<ProjectStatistics>,
}

/// Entries of the selected day plus all-time project statistics.
pub struct EntriesViewModel {
    service: TimeEntryService,
    selected_day: Arc<Mutex<NaiveDate>>,
    snapshot: LiveProjection<EntriesSnapshot>,
}

impl EntriesViewModel {
    pub fn new(service: TimeEntryService) -> Self {
        let selected_day = Arc::new(Mutex::new(service.clock().today()));
        let loader = service.clone();
        let day = Arc::clone(&selected_day);
        let snapshot = LiveProjection::new(service.store(), move || {
            let day = *day.lock();
            let entries = loader.entries_for_day(day);
            EntriesSnapshot {
                day,
                summary: DaySummary::of(&entries, loader.clock().now()),
                entries,
                statistics: loader.statistics(),
            }
        });
        Self {
            service,
            selected_day,
            snapshot,
        }
    }

    pub fn snapshot(&self) -> Arc<EntriesSnapshot> {
        self.snapshot.snapshot()
    }

    pub fn selected_day(&self) -> NaiveDate {
        *self.selected_day.lock()
    }

    pub fn select_day(&self, day: NaiveDate) {
        *self.selected_day.lock() = day;
        self.snapshot.reload();
    }

    pub fn update_entry(
        &self,
        id: RecordId,
        start_date: DateTime<Utc>,
        end_date: Option<DateTime<Utc>>,
        notes: Option<String>,
    ) -> ServiceResult<WriteOutcome> {
        let outcome = self.service.update_entry(id, start_date, end_date, notes)?;
        self.snapshot.reload();
        Ok(outcome)
    }

    pub fn delete_entry(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.service.delete(id)?;
        self.snapshot.reload();
        Ok(outcome)
    }
}

pub struct ProjectsViewModel {
    service: ProjectService,
    projects: LiveProjection<Vec<Project>>,
}

impl ProjectsViewModel {
    pub fn new(service: ProjectService) -> Self {
        let loader = service.clone();
        let projects = LiveProjection::new(service.store(), move || loader.fetch_all());
        Self { service, projects }
    }

    pub fn projects(&self) -> Arc<Vec<Project>> {
        self.projects.snapshot()
    }

    pub fn create(&self, name: &str, color_hex: Option<&str>) -> ServiceResult<Project> {
        let project = self.service.create(name, color_hex)?;
        self.projects.reload();
        Ok(project)
    }

    pub fn update(&self, project: &Project) -> ServiceResult<WriteOutcome> {
        let outcome = self.service.update(project)?;
        self.projects.reload();
        Ok(outcome)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.service.delete(id)?;
        self.projects.reload();
        Ok(outcome)
    }
}
