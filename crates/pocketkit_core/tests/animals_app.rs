use chrono::{Duration, TimeZone, Utc};
use pocketkit_core::apps::animals::{AnimalCategory, AnimalsApp, QUIZ_LENGTH};
use pocketkit_core::apps::StoreLocation;
use pocketkit_core::{ManualClock, Query, StoreConfig, WriteOutcome};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::BTreeSet;
use std::sync::Arc;

fn open() -> (AnimalsApp, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap(),
    ));
    let app = AnimalsApp::open_with(StoreLocation::Memory, StoreConfig::default(), clock.clone())
        .unwrap();
    (app, clock)
}

#[test]
fn twelve_animals_are_seeded_sorted_by_name() {
    let (app, _clock) = open();
    let animals = app.animals().fetch_all();
    assert_eq!(animals.len(), 12);

    let names: Vec<_> = animals.iter().map(|a| a.name.clone()).collect();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);

    for category in AnimalCategory::ALL {
        assert_eq!(app.animals().fetch_by_category(category).len(), 3);
    }
}

#[test]
fn favorites_toggle_and_filter() {
    let (app, _clock) = open();
    let whale = app.animals().search("whale").remove(0);
    assert!(!whale.is_favorite);

    app.animals().toggle_favorite(whale.id).unwrap();
    let favorites = app.animals().fetch_favorites();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].name, "Blue whale");

    app.animals().toggle_favorite(whale.id).unwrap();
    assert!(app.animals().fetch_favorites().is_empty());
}

#[test]
fn search_covers_scientific_names() {
    let (app, _clock) = open();
    let names: Vec<_> = app
        .animals()
        .search("LOXODONTA")
        .into_iter()
        .map(|a| a.name)
        .collect();
    assert_eq!(names, vec!["African elephant"]);
    assert!(app.animals().search("").is_empty());
}

#[test]
fn quiz_round_has_ten_distinct_animals() {
    let (app, _clock) = open();
    let mut rng = StdRng::seed_from_u64(2024);
    let round = app.quiz().start_round(&mut rng).unwrap();

    assert_eq!(round.len(), QUIZ_LENGTH);
    let ids: BTreeSet<_> = round.questions().iter().map(|q| q.animal_id).collect();
    assert_eq!(ids.len(), QUIZ_LENGTH);
    for question in round.questions() {
        assert!(question.answers.contains(&question.correct_answer));
        assert!(question.answers.len() >= 2);
    }
}

#[test]
fn finished_round_updates_scores_and_progress() {
    let (app, clock) = open();
    let mut rng = StdRng::seed_from_u64(7);
    let mut round = app.quiz().start_round(&mut rng).unwrap();

    assert!(app.quiz().finish_round(&round).unwrap_err().is_validation());

    let mut index = 0;
    loop {
        let question = round.current().unwrap().clone();
        let answer = if index % 2 == 0 {
            question.correct_answer.clone()
        } else {
            "not an answer".to_string()
        };
        round.select_answer(&answer).unwrap();
        index += 1;
        if !round.advance() {
            break;
        }
    }
    assert_eq!(round.correct_count(), 5);

    let score = app.quiz().finish_round(&round).unwrap();
    assert_eq!(score.correct_answers, 5);
    assert_eq!(score.total_questions, 10);
    assert!((score.percentage() - 50.0).abs() < 1e-9);

    clock.advance(Duration::hours(1));
    app.quiz().save_score(9, 10).unwrap();

    let progress = app.quiz().user_progress();
    assert_eq!(progress.games_played, 2);
    assert_eq!(progress.total_correct_answers, 14);
    assert_eq!(progress.total_questions, 20);
    assert!((progress.average_score() - 70.0).abs() < 1e-9);

    let recent: Vec<_> = app
        .quiz()
        .recent_scores()
        .into_iter()
        .map(|s| s.correct_answers)
        .collect();
    assert_eq!(recent, vec![9, 5]);
}

#[test]
fn impossible_scores_are_rejected() {
    let (app, _clock) = open();
    assert!(app.quiz().save_score(11, 10).unwrap_err().is_validation());
    assert!(app.quiz().save_score(-1, 10).unwrap_err().is_validation());
    assert_eq!(app.quiz().user_progress().games_played, 0);
    assert!(app.quiz().recent_scores().is_empty());
}

#[test]
fn encyclopedia_combines_filters() {
    let (app, _clock) = open();
    let mut encyclopedia = app.encyclopedia();
    assert_eq!(encyclopedia.filtered().len(), 12);

    encyclopedia.select_category(Some(AnimalCategory::Bird));
    assert_eq!(encyclopedia.filtered().len(), 3);

    let penguin = encyclopedia
        .filtered()
        .into_iter()
        .find(|a| a.name == "Emperor penguin")
        .unwrap();
    assert_eq!(
        encyclopedia.toggle_favorite(penguin.id).unwrap(),
        WriteOutcome::Applied
    );

    encyclopedia.toggle_favorites_only();
    assert!(encyclopedia.favorites_only());
    let names: Vec<_> = encyclopedia.filtered().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Emperor penguin"]);

    encyclopedia.toggle_favorites_only();
    encyclopedia.select_category(None);
    encyclopedia.set_search_text("chelonia");
    let names: Vec<_> = encyclopedia.filtered().into_iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["Green sea turtle"]);
}

#[test]
fn score_retried_after_a_failed_commit_keeps_one_progress_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("animals.sqlite3");
    let config = StoreConfig {
        busy_timeout_ms: 50,
        ..StoreConfig::default()
    };
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 8, 1, 10, 0, 0).unwrap(),
    ));
    let app = AnimalsApp::open_with(StoreLocation::File(path.as_path()), config, clock).unwrap();

    let writer = rusqlite::Connection::open(&path).unwrap();
    writer.execute_batch("BEGIN IMMEDIATE;").unwrap();
    let err = app.quiz().save_score(3, 10).unwrap_err();
    assert!(!err.is_validation());
    assert!(app.store().has_pending());
    writer.execute_batch("COMMIT;").unwrap();

    app.quiz().save_score(5, 10).unwrap();
    assert!(!app.store().has_pending());
    assert_eq!(
        app.store().count("user_progress", &Query::new()).unwrap(),
        1
    );
    let progress = app.quiz().user_progress();
    assert_eq!(progress.games_played, 2);
    assert_eq!(progress.total_correct_answers, 8);
    assert_eq!(progress.total_questions, 20);
    assert_eq!(app.quiz().recent_scores().len(), 2);
}
