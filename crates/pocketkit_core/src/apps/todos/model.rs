use super::{CATEGORY, TODO_ITEM};
use crate::model::{Record, RecordId};
use crate::projection::Filterable;
use crate::service::Entity;
use crate::store::SortKey;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TodoPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TodoPriority {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    /// Stored value, `1..=3`.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
        }
    }

    /// Unknown stored values read as `Medium`.
    pub fn from_i64(value: i64) -> Self {
        match value {
            1 => Self::Low,
            3 => Self::High,
            _ => Self::Medium,
        }
    }

    /// Points awarded for completing a task of this priority.
    pub fn points(self) -> i64 {
        self.as_i64() * 10
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodoCategory {
    pub id: RecordId,
    pub name: String,
    pub color_hex: String,
    pub icon: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Entity for TodoCategory {
    const NAME: &'static str = CATEGORY;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::asc("created_at")];

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            name: record.string("name"),
            color_hex: record.string("color_hex"),
            icon: record.string("icon"),
            created_at: record.timestamp("created_at"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("name", self.name.as_str())
            .set("color_hex", self.color_hex.as_str())
            .set("icon", self.icon.as_str());
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub id: RecordId,
    pub title: String,
    pub notes: Option<String>,
    pub is_completed: bool,
    pub priority: TodoPriority,
    pub created_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<RecordId>,
}

impl TodoItem {
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_completed && self.due_date.is_some_and(|due| due < now)
    }
}

impl Entity for TodoItem {
    const NAME: &'static str = TODO_ITEM;
    /// Open tasks first, newest first within each group.
    const NATURAL_SORT: &'static [SortKey] =
        &[SortKey::asc("is_completed"), SortKey::desc("created_at")];
    const SEARCH_FIELDS: &'static [&'static str] = &["title", "notes"];

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            title: record.string("title"),
            notes: record.text("notes").map(str::to_string),
            is_completed: record.flag("is_completed"),
            priority: TodoPriority::from_i64(record.integer("priority").unwrap_or(2)),
            created_at: record.timestamp("created_at"),
            completed_at: record.timestamp("completed_at"),
            due_date: record.timestamp("due_date"),
            category_id: record.reference("category_id"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("title", self.title.as_str())
            .set("notes", self.notes.clone())
            .set("is_completed", self.is_completed)
            .set("priority", self.priority.as_i64())
            .set("completed_at", self.completed_at)
            .set("due_date", self.due_date)
            .set("category_id", self.category_id);
    }
}

impl Filterable for TodoItem {
    type Category = RecordId;

    fn flag(&self) -> bool {
        self.is_completed
    }

    fn category(&self) -> Option<&RecordId> {
        self.category_id.as_ref()
    }

    fn text_fields(&self) -> Vec<&str> {
        let mut fields = vec![self.title.as_str()];
        if let Some(notes) = &self.notes {
            fields.push(notes.as_str());
        }
        fields
    }
}

/// Input for [`super::TodoService::create`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewTodo {
    pub title: String,
    pub notes: Option<String>,
    pub priority: TodoPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub category_id: Option<RecordId>,
}

impl NewTodo {
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub(super) fn into_record(self, created_at: DateTime<Utc>) -> Record {
        Record::new(TODO_ITEM)
            .with("title", self.title)
            .with("notes", self.notes)
            .with("is_completed", false)
            .with("priority", self.priority.as_i64())
            .with("created_at", created_at)
            .with("due_date", self.due_date)
            .with("category_id", self.category_id)
    }
}
