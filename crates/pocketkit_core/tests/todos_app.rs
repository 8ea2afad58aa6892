use chrono::{DateTime, Duration, TimeZone, Utc};
use pocketkit_core::apps::todos::{NewTodo, StatusFilter, TodoPriority, TodosApp};
use pocketkit_core::apps::StoreLocation;
use pocketkit_core::{Clock, ManualClock, ServiceError, StoreConfig, ValidationError, WriteOutcome};
use std::sync::Arc;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

fn open() -> (TodosApp, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let app = TodosApp::open_with(StoreLocation::Memory, StoreConfig::default(), clock.clone())
        .unwrap();
    (app, clock)
}

fn todo(title: &str, priority: TodoPriority) -> NewTodo {
    NewTodo {
        priority,
        ..NewTodo::titled(title)
    }
}

#[test]
fn default_categories_are_seeded_in_order() {
    let (app, _clock) = open();
    let names: Vec<_> = app
        .categories()
        .fetch_all()
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["Work", "Personal", "Shopping", "Health"]);
}

#[test]
fn stats_default_without_creating_a_record() {
    let (app, _clock) = open();
    let stats = app.stats().fetch_stats();
    assert_eq!(stats.total_points, 0);
    assert_eq!(stats.level, 1);
    assert_eq!(stats.current_streak, 0);
    assert!(!app.store().has_pending());
}

#[test]
fn completing_a_high_priority_task_awards_thirty_points() {
    let (app, _clock) = open();
    let task = app
        .todos()
        .create(todo("Ship release", TodoPriority::High))
        .unwrap();

    app.todos().toggle_completion(task.id).unwrap();

    let done = app.todos().get(task.id).unwrap();
    assert!(done.is_completed);
    assert_eq!(done.completed_at, Some(start()));

    let stats = app.stats().fetch_stats();
    assert_eq!(stats.total_points, 30);
    assert_eq!(stats.completed_count, 1);
    assert_eq!(stats.current_streak, 1);
    assert_eq!(stats.best_streak, 1);
    assert_eq!(stats.level, 1);
}

#[test]
fn reopening_a_task_keeps_points_and_clears_completion_time() {
    let (app, _clock) = open();
    let task = app
        .todos()
        .create(todo("Water plants", TodoPriority::Medium))
        .unwrap();

    app.todos().toggle_completion(task.id).unwrap();
    app.todos().toggle_completion(task.id).unwrap();

    let reopened = app.todos().get(task.id).unwrap();
    assert!(!reopened.is_completed);
    assert_eq!(reopened.completed_at, None);
    assert_eq!(app.stats().fetch_stats().total_points, 20);
}

#[test]
fn streak_follows_calendar_days_and_level_grows() {
    let (app, clock) = open();
    let mut streaks = Vec::new();
    for day in 0..4 {
        if day == 2 {
            clock.advance(Duration::days(2));
        } else if day > 0 {
            clock.advance(Duration::days(1));
        }
        for n in 0..2 {
            let task = app
                .todos()
                .create(todo(&format!("Task {day}-{n}"), TodoPriority::High))
                .unwrap();
            app.todos().toggle_completion(task.id).unwrap();
        }
        streaks.push(app.stats().fetch_stats().current_streak);
    }

    assert_eq!(streaks, vec![1, 2, 1, 2]);
    let stats = app.stats().fetch_stats();
    assert_eq!(stats.best_streak, 2);
    assert_eq!(stats.total_points, 240);
    assert_eq!(stats.level, 3);
}

#[test]
fn toggling_a_vanished_task_is_a_no_op() {
    let (app, _clock) = open();
    let task = app.todos().create(NewTodo::titled("Ephemeral")).unwrap();
    app.todos().delete(task.id).unwrap();

    assert_eq!(
        app.todos().toggle_completion(task.id).unwrap(),
        WriteOutcome::Missing
    );
    assert_eq!(app.stats().fetch_stats().total_points, 0);
    assert!(!app.store().has_pending());
}

#[test]
fn blank_titles_are_rejected() {
    let (app, _clock) = open();
    let err = app.todos().create(NewTodo::titled(" \t ")).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::EmptyRequiredField { field: "title", .. })
    ));
    assert!(app.todos().fetch_all().is_empty());
}

#[test]
fn open_tasks_come_first_newest_first() {
    let (app, clock) = open();
    let mut ids = Vec::new();
    for title in ["oldest", "middle", "newest"] {
        ids.push(app.todos().create(NewTodo::titled(title)).unwrap().id);
        clock.advance(Duration::minutes(1));
    }
    app.todos().toggle_completion(ids[2]).unwrap();

    let titles: Vec<_> = app
        .todos()
        .fetch_all()
        .into_iter()
        .map(|todo| todo.title)
        .collect();
    assert_eq!(titles, vec!["middle", "oldest", "newest"]);
}

#[test]
fn deleting_a_category_uncategorizes_its_tasks() {
    let (app, _clock) = open();
    let work = app.categories().fetch_all().remove(0);
    let task = app
        .todos()
        .create(NewTodo {
            category_id: Some(work.id),
            ..NewTodo::titled("Report")
        })
        .unwrap();

    app.categories().delete(work.id).unwrap();
    assert_eq!(app.todos().get(task.id).unwrap().category_id, None);
}

#[test]
fn list_view_model_filters_by_status_category_and_text() {
    let (app, clock) = open();
    let categories = app.categories().fetch_all();
    let (work, shopping) = (categories[0].id, categories[2].id);

    let mut list = app.todo_list();
    list.add(NewTodo {
        category_id: Some(work),
        notes: Some("quarterly numbers".to_string()),
        ..NewTodo::titled("Report")
    })
    .unwrap();
    clock.advance(Duration::minutes(1));
    let milk = list
        .add(NewTodo {
            category_id: Some(shopping),
            ..NewTodo::titled("Buy milk")
        })
        .unwrap();
    clock.advance(Duration::minutes(1));
    list.add(NewTodo {
        category_id: Some(shopping),
        ..NewTodo::titled("Buy bread")
    })
    .unwrap();
    list.toggle_completion(milk.id).unwrap();

    assert_eq!(list.stats().total_points, 20);
    assert_eq!(list.board().categories.len(), 4);

    list.set_status(StatusFilter::Active);
    let titles: Vec<_> = list.filtered().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Buy bread", "Report"]);

    list.select_category(Some(shopping));
    let titles: Vec<_> = list.filtered().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Buy bread"]);

    list.set_status(StatusFilter::Completed);
    let titles: Vec<_> = list.filtered().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Buy milk"]);

    list.set_status(StatusFilter::All);
    list.select_category(None);
    list.set_search_text("QUARTERLY");
    let titles: Vec<_> = list.filtered().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["Report"]);
}

#[test]
fn search_matches_title_or_notes() {
    let (app, _clock) = open();
    app.todos()
        .create(NewTodo {
            notes: Some("call the dentist".to_string()),
            ..NewTodo::titled("Appointments")
        })
        .unwrap();
    app.todos().create(NewTodo::titled("Dentist invoice")).unwrap();
    app.todos().create(NewTodo::titled("Groceries")).unwrap();

    assert_eq!(app.todos().search("dentist").len(), 2);
    assert!(app.todos().search("").is_empty());
}

#[test]
fn overdue_only_applies_to_open_tasks() {
    let (app, clock) = open();
    let task = app
        .todos()
        .create(NewTodo {
            due_date: Some(start() + Duration::hours(1)),
            ..NewTodo::titled("Pay rent")
        })
        .unwrap();

    clock.advance(Duration::hours(2));
    assert!(task.is_overdue(clock.now()));
    app.todos().toggle_completion(task.id).unwrap();
    assert!(!app.todos().get(task.id).unwrap().is_overdue(clock.now()));
}
