//! Gamified todo list: categories, prioritized tasks and points.
//!
//! # Invariants
//! - `game_stats` holds at most one record, created by the first completion.
//! - Completing a task and awarding its points land in one commit.
//! - Reopening a completed task clears `completed_at` and keeps the points.

mod model;
mod service;
mod view_model;

pub use model::{NewTodo, TodoCategory, TodoItem, TodoPriority};
pub use service::{CategoryService, GameStatsService, TodoService};
pub use view_model::{StatusFilter, TodoBoard, TodoListViewModel};

use super::{open_store, seed_detached, StoreLocation};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::schema::{EntitySchema, FieldDef, OnDelete, Schema};
use crate::service::progress::PROGRESS_FIELDS;
use crate::store::{Store, StoreResult};
use std::path::Path;
use std::sync::Arc;

pub const CATEGORY: &str = "category";
pub const TODO_ITEM: &str = "todo_item";
pub const GAME_STATS: &str = "game_stats";

pub static SCHEMA: Schema = Schema {
    name: "todos",
    version: 1,
    entities: &[
        EntitySchema {
            name: CATEGORY,
            fields: &[
                FieldDef::text("name").required(),
                FieldDef::text("color_hex"),
                FieldDef::text("icon"),
                FieldDef::timestamp("created_at"),
            ],
        },
        EntitySchema {
            name: TODO_ITEM,
            fields: &[
                FieldDef::text("title").required(),
                FieldDef::text("notes"),
                FieldDef::boolean("is_completed"),
                FieldDef::integer("priority"),
                FieldDef::timestamp("created_at"),
                FieldDef::timestamp("completed_at"),
                FieldDef::timestamp("due_date"),
                FieldDef::reference("category_id", CATEGORY, OnDelete::Nullify),
            ],
        },
        EntitySchema {
            name: GAME_STATS,
            fields: PROGRESS_FIELDS,
        },
    ],
};

pub struct TodosApp {
    store: Store,
    todos: TodoService,
    categories: CategoryService,
    stats: GameStatsService,
}

impl TodosApp {
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

    /// Opens the store and seeds the default categories when it is empty.
    pub fn open_with(
        location: StoreLocation<'_>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let store = open_store(&SCHEMA, location, config)?;
        let seed_clock = Arc::clone(&clock);
        seed_detached(&store, SCHEMA.name, move |worker| {
            CategoryService::new(worker.clone(), seed_clock).seed_defaults_if_empty()
        });

        Ok(Self {
            todos: TodoService::new(store.clone(), Arc::clone(&clock)),
            categories: CategoryService::new(store.clone(), Arc::clone(&clock)),
            stats: GameStatsService::new(store.clone(), clock),
            store,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn todos(&self) -> &TodoService {
        &self.todos
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn stats(&self) -> &GameStatsService {
        &self.stats
    }

    pub fn todo_list(&self) -> TodoListViewModel {
        TodoListViewModel::new(
            self.todos.clone(),
            self.categories.clone(),
            self.stats.clone(),
        )
    }
}
