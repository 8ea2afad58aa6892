use super::model::{NewTodo, TodoCategory, TodoItem};
use super::service::{CategoryService, GameStatsService, TodoService};
use crate::model::RecordId;
use crate::projection::{FlagFilter, LiveProjection, ProjectionFilter};
use crate::service::{Progress, ServiceResult, WriteOutcome};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Completed,
}

impl StatusFilter {
    fn as_flag_filter(self) -> FlagFilter {
        match self {
            Self::All => FlagFilter::All,
            Self::Active => FlagFilter::Exclude,
            Self::Completed => FlagFilter::Only,
        }
    }
}

/// Everything the list screen shows, loaded together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TodoBoard {
    pub todos: Vec<TodoItem>,
    pub categories: Vec<TodoCategory>,
    pub stats: Progress,
}

pub struct TodoListViewModel {
    todos: TodoService,
    board: LiveProjection<TodoBoard>,
    filter: ProjectionFilter<RecordId>,
    status: StatusFilter,
}

impl TodoListViewModel {
    pub fn new(todos: TodoService, categories: CategoryService, stats: GameStatsService) -> Self {
        let loader = todos.clone();
        let board = LiveProjection::new(todos.store(), move || TodoBoard {
            todos: loader.fetch_all(),
            categories: categories.fetch_all(),
            stats: stats.fetch_stats(),
        });
        Self {
            todos,
            board,
            filter: ProjectionFilter::default(),
            status: StatusFilter::All,
        }
    }

    pub fn board(&self) -> Arc<TodoBoard> {
        self.board.snapshot()
    }

    pub fn stats(&self) -> Progress {
        self.board.snapshot().stats.clone()
    }

    pub fn filtered(&self) -> Vec<TodoItem> {
        self.filter.apply(self.board.snapshot().todos.as_slice())
    }

    pub fn status(&self) -> StatusFilter {
        self.status
    }

    pub fn set_status(&mut self, status: StatusFilter) {
        self.status = status;
        self.filter.flag = status.as_flag_filter();
    }

    pub fn select_category(&mut self, category: Option<RecordId>) {
        self.filter.category = category;
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.filter.text = text.into();
    }

    pub fn add(&self, todo: NewTodo) -> ServiceResult<TodoItem> {
        let created = self.todos.create(todo)?;
        self.board.reload();
        Ok(created)
    }

    pub fn update(&self, todo: &TodoItem) -> ServiceResult<WriteOutcome> {
        let outcome = self.todos.update(todo)?;
        self.board.reload();
        Ok(outcome)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.todos.delete(id)?;
        self.board.reload();
        Ok(outcome)
    }

    pub fn toggle_completion(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.todos.toggle_completion(id)?;
        self.board.reload();
        Ok(outcome)
    }

    pub fn reload(&self) {
        self.board.reload();
    }
}

#[cfg(test)]
mod tests {
    use super::StatusFilter;
    use crate::projection::FlagFilter;

    #[test]
    fn status_maps_onto_completion_flag() {
        assert_eq!(StatusFilter::All.as_flag_filter(), FlagFilter::All);
        assert_eq!(StatusFilter::Active.as_flag_filter(), FlagFilter::Exclude);
        assert_eq!(StatusFilter::Completed.as_flag_filter(), FlagFilter::Only);
    }
}
