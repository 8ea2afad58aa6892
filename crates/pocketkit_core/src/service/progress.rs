//! Gamification progress: points, level and day streaks.
//!
//! # Responsibility
//! - Keep one singleton progress record per app (todo stats, tracker stats).
//! - Apply completion rules: points/level accumulation and calendar-day streaks.
//!
//! # Invariants
//! - `level == max(previous level, total_points / 100 + 1)`; it never decreases.
//! - Same-day completions leave the streak untouched; the next calendar day
//!   extends it; any longer gap resets it to 1.
//! - `best_streak` is the running maximum of `current_streak`.

use super::singleton::{first_or_create, staged_unit};
use super::ServiceResult;
use crate::clock::Clock;
use crate::model::{Record, RecordId};
use crate::schema::FieldDef;
use crate::store::{Query, Store, StoreResult};
use chrono::{DateTime, NaiveDate, Utc};
use log::{error, info};
use std::sync::Arc;

pub const POINTS_PER_LEVEL: i64 = 100;

/// Fields of a progress entity; app schemas embed these verbatim.
pub const PROGRESS_FIELDS: &[FieldDef] = &[
    FieldDef::integer("total_points"),
    FieldDef::integer("completed_count"),
    FieldDef::integer("current_streak"),
    FieldDef::integer("best_streak"),
    FieldDef::timestamp("last_completion_at"),
    FieldDef::integer("level"),
];

/// Level reached with `total_points`, never below `current_level`.
pub fn level_for_points(total_points: i64, current_level: i64) -> i64 {
    (total_points.max(0) / POINTS_PER_LEVEL + 1).max(current_level)
}

/// Streak after a completion on `today`, given the previous completion day.
pub fn advance_streak(last: Option<NaiveDate>, today: NaiveDate, current: i64) -> i64 {
    match last.map(|last| today.signed_duration_since(last).num_days()) {
        None => 1,
        Some(0) => current,
        Some(1) => current + 1,
        Some(_) => 1,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub id: RecordId,
    pub total_points: i64,
    pub completed_count: i64,
    pub current_streak: i64,
    pub best_streak: i64,
    pub last_completion_at: Option<DateTime<Utc>>,
    pub level: i64,
}

impl Default for Progress {
    fn default() -> Self {
        Self {
            id: RecordId::nil(),
            total_points: 0,
            completed_count: 0,
            current_streak: 0,
            best_streak: 0,
            last_completion_at: None,
            level: 1,
        }
    }
}

impl Progress {
    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            total_points: record.integer("total_points").unwrap_or(0),
            completed_count: record.integer("completed_count").unwrap_or(0),
            current_streak: record.integer("current_streak").unwrap_or(0),
            best_streak: record.integer("best_streak").unwrap_or(0),
            last_completion_at: record.timestamp("last_completion_at"),
            level: record.integer("level").unwrap_or(1).max(1),
        }
    }

    fn write_to(&self, record: &mut Record) {
        record
            .set("total_points", self.total_points)
            .set("completed_count", self.completed_count)
            .set("current_streak", self.current_streak)
            .set("best_streak", self.best_streak)
            .set("last_completion_at", self.last_completion_at)
            .set("level", self.level);
    }

    /// Points spanned by the current level.
    pub fn points_to_next_level(&self) -> i64 {
        self.level * POINTS_PER_LEVEL
    }

    /// Fraction in `[0, 1)` of progress through the current level.
    pub fn progress_to_next_level(&self) -> f64 {
        let span = self.points_to_next_level();
        if span <= 0 {
            return 0.0;
        }
        (self.total_points.rem_euclid(span)) as f64 / span as f64
    }

    /// Applies one completion worth `points` happening at `at`.
    pub fn apply_completion(&mut self, points: i64, at: DateTime<Utc>, clock: &dyn Clock) {
        self.total_points += points;
        self.completed_count += 1;

        let today = clock.day_of(at);
        let last_day = self.last_completion_at.map(|last| clock.day_of(last));
        if last_day != Some(today) {
            self.current_streak = advance_streak(last_day, today, self.current_streak);
            self.best_streak = self.best_streak.max(self.current_streak);
            self.last_completion_at = Some(at);
        }

        self.level = level_for_points(self.total_points, self.level);
    }
}

/// Maintains the singleton progress record stored in `entity`.
#[derive(Clone)]
pub struct ProgressService {
    store: Store,
    entity: &'static str,
    clock: Arc<dyn Clock>,
}

impl ProgressService {
    pub fn new(store: Store, entity: &'static str, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            entity,
            clock,
        }
    }

    /// Current progress; defaults when absent or unreadable.
    pub fn fetch(&self) -> Progress {
        match self.store.query(self.entity, &Query::new().limit(1)) {
            Ok(records) => records
                .first()
                .map(Progress::from_record)
                .unwrap_or_default(),
            Err(err) => {
                error!(
                    "event=progress_fetch module=service status=error entity={} error={}",
                    self.entity, err
                );
                Progress::default()
            }
        }
    }

    /// Records one completion worth `points` and commits.
    pub fn record_completion(&self, points: i64) -> ServiceResult<Progress> {
        let progress = staged_unit(&self.store, || self.stage_completion(points))?;
        self.store.commit()?;
        info!(
            "event=progress_completion module=service status=ok entity={} points={} level={} streak={}",
            self.entity, points, progress.level, progress.current_streak
        );
        Ok(progress)
    }

    /// Stages one completion without committing.
    pub fn stage_completion(&self, points: i64) -> ServiceResult<Progress> {
        let mut record = self.load()?;
        let mut progress = Progress::from_record(&record);
        progress.apply_completion(points, self.clock.now(), self.clock.as_ref());
        progress.write_to(&mut record);
        self.store.update(&mut record)?;
        Ok(progress)
    }

    fn load(&self) -> StoreResult<Record> {
        first_or_create(&self.store, self.entity, |record| {
            Progress::default().write_to(record);
        })
    }
}
