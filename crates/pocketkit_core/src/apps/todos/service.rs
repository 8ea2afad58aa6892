use super::model::{NewTodo, TodoCategory, TodoItem, TodoPriority};
use super::GAME_STATS;
use crate::apps::check_color_hex;
use crate::clock::Clock;
use crate::model::{Record, RecordId};
use crate::service::{
    staged_unit, Entity, EntityService, Progress, ProgressService, ServiceResult, WriteOutcome,
};
use crate::store::{Query, Store};
use log::info;
use std::sync::Arc;

const DEFAULT_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Work", "3B82F6", "briefcase.fill"),
    ("Personal", "10B981", "person.fill"),
    ("Shopping", "F59E0B", "cart.fill"),
    ("Health", "EF4444", "heart.fill"),
];

#[derive(Clone)]
pub struct CategoryService {
    categories: EntityService<TodoCategory>,
    clock: Arc<dyn Clock>,
}

impl CategoryService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            categories: EntityService::new(store),
            clock,
        }
    }

    /// Categories in creation order.
    pub fn fetch_all(&self) -> Vec<TodoCategory> {
        self.categories.fetch_all()
    }

    pub fn create(&self, name: &str, color_hex: &str, icon: &str) -> ServiceResult<TodoCategory> {
        check_color_hex("color_hex", color_hex)?;
        let record = Record::new(TodoCategory::NAME)
            .with("name", name)
            .with("color_hex", color_hex)
            .with("icon", icon)
            .with("created_at", self.clock.now());
        self.categories.create(record)
    }

    /// Deletes the category; its tasks stay, uncategorized.
    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        self.categories.delete(id)
    }

    /// Inserts Work, Personal, Shopping and Health when no category exists.
    pub fn seed_defaults_if_empty(&self) -> ServiceResult<usize> {
        let store = self.categories.store();
        if store.count(TodoCategory::NAME, &Query::new())? > 0 {
            return Ok(0);
        }

        let created_at = self.clock.now();
        for (offset, (name, color_hex, icon)) in DEFAULT_CATEGORIES.iter().enumerate() {
            // Distinct timestamps keep the creation order stable.
            let record = Record::new(TodoCategory::NAME)
                .with("name", *name)
                .with("color_hex", *color_hex)
                .with("icon", *icon)
                .with(
                    "created_at",
                    created_at + chrono::Duration::milliseconds(offset as i64),
                );
            self.categories.stage_create(record)?;
        }
        store.commit()?;
        Ok(DEFAULT_CATEGORIES.len())
    }
}

/// Points, level and streak of the todo list.
#[derive(Clone)]
pub struct GameStatsService {
    progress: ProgressService,
}

impl GameStatsService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            progress: ProgressService::new(store, GAME_STATS, clock),
        }
    }

    pub fn fetch_stats(&self) -> Progress {
        self.progress.fetch()
    }

    /// Awards `points` for one completed task and commits.
    pub fn add_points(&self, points: i64) -> ServiceResult<Progress> {
        self.progress.record_completion(points)
    }

    fn stage_points(&self, points: i64) -> ServiceResult<Progress> {
        self.progress.stage_completion(points)
    }
}

#[derive(Clone)]
pub struct TodoService {
    todos: EntityService<TodoItem>,
    stats: GameStatsService,
    clock: Arc<dyn Clock>,
}

impl TodoService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            stats: GameStatsService::new(store.clone(), Arc::clone(&clock)),
            todos: EntityService::new(store),
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        self.todos.store()
    }

    /// Open tasks first, then completed ones; newest first within each.
    pub fn fetch_all(&self) -> Vec<TodoItem> {
        self.todos.fetch_all()
    }

    pub fn get(&self, id: RecordId) -> Option<TodoItem> {
        self.todos.get(id)
    }

    pub fn search(&self, text: &str) -> Vec<TodoItem> {
        self.todos.search(text)
    }

    pub fn create(&self, todo: NewTodo) -> ServiceResult<TodoItem> {
        let created = self.todos.create(todo.into_record(self.clock.now()))?;
        info!(
            "event=todo_create module=apps status=ok id={} priority={}",
            created.id,
            created.priority.as_i64()
        );
        Ok(created)
    }

    pub fn update(&self, todo: &TodoItem) -> ServiceResult<WriteOutcome> {
        self.todos.update(todo)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        self.todos.delete(id)
    }

    /// Flips completion; completing awards the priority's points in the
    /// same commit.
    pub fn toggle_completion(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let now = self.clock.now();
        let mut completed = None;
        let staged = staged_unit(self.store(), || {
            let outcome = self.todos.stage_modify(id, |record| {
                let done = !record.flag("is_completed");
                record
                    .set("is_completed", done)
                    .set("completed_at", done.then_some(now));
                if done {
                    completed = Some(TodoPriority::from_i64(
                        record.integer("priority").unwrap_or(2),
                    ));
                }
            })?;
            if !outcome.is_applied() {
                return Ok(None);
            }
            let total_points = match completed {
                Some(priority) => self.stats.stage_points(priority.points())?.total_points,
                None => 0,
            };
            Ok(Some(total_points))
        })?;
        let Some(total_points) = staged else {
            return Ok(WriteOutcome::Missing);
        };
        self.store().commit()?;
        info!(
            "event=todo_toggle module=apps status=ok id={} completed={} total_points={}",
            id,
            completed.is_some(),
            total_points
        );
        Ok(WriteOutcome::Applied)
    }
}
