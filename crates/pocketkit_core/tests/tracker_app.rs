use chrono::{DateTime, Duration, TimeZone, Utc};
use pocketkit_core::apps::tracker::{TrackerApp, DEFAULT_PROJECT_COLOR};
use pocketkit_core::apps::StoreLocation;
use pocketkit_core::{Clock, ManualClock, ServiceError, StoreConfig, ValidationError};
use std::sync::Arc;
use std::thread::sleep;

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 15, 8, 0, 0).unwrap()
}

fn open() -> (TrackerApp, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(start()));
    let app = TrackerApp::open_with(StoreLocation::Memory, StoreConfig::default(), clock.clone())
        .unwrap();
    (app, clock)
}

#[test]
fn projects_default_to_blue_and_reject_bad_colors() {
    let (app, _clock) = open();
    let plain = app.projects().create("Reading", None).unwrap();
    assert_eq!(plain.color_hex, DEFAULT_PROJECT_COLOR);

    let custom = app.projects().create("Coding", Some("#FF9500")).unwrap();
    assert_eq!(custom.color_hex, "#FF9500");

    let err = app.projects().create("Music", Some("orange")).unwrap_err();
    assert!(err.is_validation());
    assert_eq!(app.projects().fetch_all().len(), 2);
}

#[test]
fn ninety_second_timer_records_duration_and_one_point() {
    let (app, clock) = open();
    let project = app.projects().create("Writing", None).unwrap();

    let running = app.entries().start_timer(project.id, None).unwrap();
    assert!(running.is_active());
    assert_eq!(app.entries().active_entry().unwrap().id, running.id);

    clock.advance(Duration::seconds(90));
    let stopped = app.entries().stop_active().unwrap().unwrap();

    assert_eq!(stopped.end_date, Some(start() + Duration::seconds(90)));
    assert_eq!(stopped.duration(clock.now()), Duration::seconds(90));
    assert!(app.entries().active_entry().is_none());

    let progress = app.entries().progress();
    assert_eq!(progress.total_points, 1);
    assert_eq!(progress.completed_count, 1);
    assert_eq!(progress.current_streak, 1);
}

#[test]
fn stopping_without_a_running_timer_is_a_no_op() {
    let (app, _clock) = open();
    assert!(app.entries().stop_active().unwrap().is_none());
    assert_eq!(app.entries().progress().completed_count, 0);
}

#[test]
fn starting_a_timer_stops_the_running_one() {
    let (app, clock) = open();
    let first = app.projects().create("First", None).unwrap();
    let second = app.projects().create("Second", None).unwrap();

    let a = app.entries().start_timer(first.id, None).unwrap();
    clock.advance(Duration::minutes(10));
    let b = app
        .entries()
        .start_timer(second.id, Some("deep work".to_string()))
        .unwrap();

    let entries = app.entries().fetch_all();
    let active: Vec<_> = entries.iter().filter(|e| e.is_active()).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b.id);
    assert_eq!(active[0].notes.as_deref(), Some("deep work"));

    let stopped = entries.iter().find(|e| e.id == a.id).unwrap();
    assert_eq!(stopped.end_date, Some(start() + Duration::minutes(10)));
    assert_eq!(app.entries().progress().total_points, 10);
}

#[test]
fn timer_for_unknown_project_is_rejected_without_side_effects() {
    let (app, _clock) = open();
    let project = app.projects().create("Real", None).unwrap();
    app.entries().start_timer(project.id, None).unwrap();

    let err = app
        .entries()
        .start_timer(uuid::Uuid::new_v4(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MissingParent { .. })
    ));
    assert!(app.entries().active_entry().is_some());
    assert!(!app.store().has_pending());
}

#[test]
fn deleting_a_project_deletes_its_entries() {
    let (app, clock) = open();
    let doomed = app.projects().create("Doomed", None).unwrap();
    let kept = app.projects().create("Kept", None).unwrap();

    app.entries().start_timer(doomed.id, None).unwrap();
    clock.advance(Duration::minutes(5));
    app.entries().start_timer(kept.id, None).unwrap();
    clock.advance(Duration::minutes(5));
    app.entries().stop_active().unwrap();

    app.projects().delete(doomed.id).unwrap();
    let remaining = app.entries().fetch_all();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].project_id, Some(kept.id));
}

#[test]
fn day_summary_and_statistics() {
    let (app, clock) = open();
    let short = app.projects().create("Short", None).unwrap();
    let long = app.projects().create("Long", None).unwrap();
    app.projects().create("Idle", None).unwrap();

    app.entries().start_timer(short.id, None).unwrap();
    clock.advance(Duration::minutes(15));
    app.entries().start_timer(long.id, None).unwrap();
    clock.advance(Duration::minutes(45));
    app.entries().stop_active().unwrap();

    clock.advance(Duration::days(1));
    app.entries().start_timer(long.id, None).unwrap();
    clock.advance(Duration::minutes(30));
    app.entries().stop_active().unwrap();

    let first_day = start().date_naive();
    let summary = app.entries().day_summary(first_day);
    assert_eq!(summary.entries_count, 2);
    assert_eq!(summary.total_duration, Duration::minutes(60));
    assert_eq!(app.entries().entries_for_day(first_day).len(), 2);
    assert_eq!(
        app.entries()
            .entries_for_day(first_day + Duration::days(1))
            .len(),
        1
    );

    let stats = app.entries().statistics();
    let names: Vec<_> = stats.iter().map(|s| s.project.name.as_str()).collect();
    assert_eq!(names, vec!["Long", "Short"]);
    assert_eq!(stats[0].total_duration, Duration::minutes(75));
    assert_eq!(stats[0].entries_count, 2);
}

#[test]
fn entry_end_must_not_precede_start() {
    let (app, clock) = open();
    let project = app.projects().create("Edits", None).unwrap();
    let entry = app.entries().start_timer(project.id, None).unwrap();
    clock.advance(Duration::minutes(20));
    app.entries().stop_active().unwrap();

    let err = app
        .entries()
        .update_entry(entry.id, start(), Some(start() - Duration::minutes(1)), None)
        .unwrap_err();
    assert!(err.is_validation());

    app.entries()
        .update_entry(
            entry.id,
            start(),
            Some(start() + Duration::minutes(40)),
            Some("corrected".to_string()),
        )
        .unwrap();
    let edited = app.entries().fetch_all().remove(0);
    assert_eq!(edited.duration(clock.now()), Duration::minutes(40));
    assert_eq!(edited.notes.as_deref(), Some("corrected"));
}

#[test]
fn timer_view_model_ticks_while_running() {
    let (app, clock) = open();
    let project = app.projects().create("Focus", None).unwrap();
    let mut timer = pocketkit_core::apps::tracker::TimerViewModel::with_interval(
        app.entries().clone(),
        std::time::Duration::from_millis(20),
    );
    assert!(!timer.is_ticking());

    timer.start(project.id, None).unwrap();
    assert!(timer.is_ticking());
    clock.advance(Duration::seconds(5));
    sleep(std::time::Duration::from_millis(200));
    assert_eq!(timer.elapsed(), Duration::seconds(5));

    let stopped = timer.stop().unwrap().unwrap();
    assert_eq!(stopped.duration(clock.now()), Duration::seconds(5));
    assert!(!timer.is_ticking());
    assert_eq!(timer.elapsed(), Duration::zero());
    assert!(timer.active_entry().is_none());
}

#[test]
fn entries_view_follows_the_selected_day() {
    let (app, clock) = open();
    let project = app.projects().create("Daily", None).unwrap();
    let view = app.entries_view();
    assert_eq!(view.selected_day(), start().date_naive());

    let entry = app.entries().start_timer(project.id, None).unwrap();
    clock.advance(Duration::minutes(30));
    app.entries().stop_active().unwrap();

    view.select_day(start().date_naive());
    let snapshot = view.snapshot();
    assert_eq!(snapshot.entries.len(), 1);
    assert_eq!(snapshot.summary.total_duration, Duration::minutes(30));
    assert_eq!(snapshot.statistics.len(), 1);

    view.select_day(start().date_naive() - Duration::days(1));
    assert!(view.snapshot().entries.is_empty());

    view.delete_entry(entry.id).unwrap();
    assert!(view.snapshot().statistics.is_empty());
}
