use super::{PROJECT, TIME_ENTRY};
use crate::model::{Record, RecordId};
use crate::service::Entity;
use crate::store::SortKey;
use chrono::{DateTime, Duration, Utc};

pub const DEFAULT_PROJECT_COLOR: &str = "#007AFF";

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: RecordId,
    pub name: String,
    pub color_hex: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for Project {
    const NAME: &'static str = PROJECT;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::asc("created_at")];

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            name: record.string("name"),
            color_hex: record
                .text("color_hex")
                .unwrap_or(DEFAULT_PROJECT_COLOR)
                .to_string(),
            created_at: record.timestamp("created_at"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("name", self.name.as_str())
            .set("color_hex", self.color_hex.as_str());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    pub id: RecordId,
    pub start_date: DateTime<Utc>,
    /// `None` while the timer runs.
    pub end_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub project_id: Option<RecordId>,
}

impl TimeEntry {
    pub fn is_active(&self) -> bool {
        self.end_date.is_none()
    }

    /// Tracked time; an active entry counts up to `now`.
    pub fn duration(&self, now: DateTime<Utc>) -> Duration {
        let end = self.end_date.unwrap_or(now);
        (end - self.start_date).max(Duration::zero())
    }
}

impl Entity for TimeEntry {
    const NAME: &'static str = TIME_ENTRY;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::desc("start_date")];

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            start_date: record.timestamp("start_date").unwrap_or_default(),
            end_date: record.timestamp("end_date"),
            notes: record.text("notes").map(str::to_string),
            project_id: record.reference("project_id"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("start_date", self.start_date)
            .set("end_date", self.end_date)
            .set("notes", self.notes.clone());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectStatistics {
    pub project: Project,
    pub total_duration: Duration,
    pub entries_count: usize,
}

impl ProjectStatistics {
    /// Statistics per project that has entries, longest total first.
    pub fn collect(projects: &[Project], entries: &[TimeEntry], now: DateTime<Utc>) -> Vec<Self> {
        let mut statistics: Vec<Self> = projects
            .iter()
            .filter_map(|project| {
                let owned: Vec<&TimeEntry> = entries
                    .iter()
                    .filter(|entry| entry.project_id == Some(project.id))
                    .collect();
                if owned.is_empty() {
                    return None;
                }
                Some(Self {
                    project: project.clone(),
                    total_duration: owned
                        .iter()
                        .fold(Duration::zero(), |total, entry| total + entry.duration(now)),
                    entries_count: owned.len(),
                })
            })
            .collect();
        statistics.sort_by(|a, b| b.total_duration.cmp(&a.total_duration));
        statistics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySummary {
    pub total_duration: Duration,
    pub entries_count: usize,
}

impl Default for DaySummary {
    fn default() -> Self {
        Self {
            total_duration: Duration::zero(),
            entries_count: 0,
        }
    }
}

impl DaySummary {
    pub fn of(entries: &[TimeEntry], now: DateTime<Utc>) -> Self {
        Self {
            total_duration: entries
                .iter()
                .fold(Duration::zero(), |total, entry| total + entry.duration(now)),
            entries_count: entries.len(),
        }
    }
}
