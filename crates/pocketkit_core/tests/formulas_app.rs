use chrono::{TimeZone, Utc};
use pocketkit_core::apps::formulas::{Category, FormulasApp, NewFormula};
use pocketkit_core::apps::StoreLocation;
use pocketkit_core::{ManualClock, ServiceError, StoreConfig, ValidationError, WriteOutcome};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

fn open() -> FormulasApp {
    FormulasApp::open_in_memory().unwrap()
}

fn category(app: &FormulasApp, name: &str) -> Category {
    app.categories()
        .fetch_categories()
        .into_iter()
        .find(|category| category.name == name)
        .unwrap()
}

fn new_formula(name: &str, category: &Category) -> NewFormula {
    NewFormula {
        name: name.to_string(),
        formula_text: "p = mv".to_string(),
        description_text: "Momentum of a moving body.".to_string(),
        variables: vec!["p".to_string(), "m".to_string(), "v".to_string()],
        category_id: category.id,
    }
}

#[test]
fn first_launch_seeds_three_categories_with_five_formulas() {
    let app = open();
    let categories = app.categories().fetch_categories();

    let names: Vec<_> = categories.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["Math", "Physics", "Chemistry"]);
    assert!(categories.iter().all(|c| c.formulas_count == 5));
    assert_eq!(
        categories.iter().map(|c| c.order_index).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );

    let physics = category(&app, "Physics");
    let indexes: Vec<_> = app
        .formulas()
        .fetch_formulas(physics.id)
        .iter()
        .map(|f| f.order_index)
        .collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
}

#[test]
fn reopening_a_seeded_store_does_not_seed_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("formulas.sqlite3");

    drop(FormulasApp::open(&path).unwrap());
    let app = FormulasApp::open(&path).unwrap();

    assert_eq!(app.categories().fetch_categories().len(), 3);
    assert_eq!(app.formulas().fetch_all().len(), 15);
}

#[test]
fn learning_progress_is_derived_per_category() {
    let app = open();
    let physics = category(&app, "Physics");
    let formulas = app.formulas().fetch_formulas(physics.id);

    app.formulas().toggle_learned(formulas[0].id).unwrap();
    app.formulas().toggle_learned(formulas[1].id).unwrap();

    let physics = category(&app, "Physics");
    assert_eq!(physics.learned_count, 2);
    assert!((physics.progress() - 0.4).abs() < 1e-9);

    let main = app.main();
    assert_eq!(main.totals().formulas, 15);
    assert!((main.overall_progress() - 2.0 / 15.0).abs() < 1e-9);
}

#[test]
fn toggling_learned_twice_restores_the_flag() {
    let app = open();
    let formula = app.formulas().fetch_all().remove(0);

    app.formulas().toggle_learned(formula.id).unwrap();
    assert!(app.formulas().get(formula.id).unwrap().is_learned);
    app.formulas().toggle_learned(formula.id).unwrap();
    assert!(!app.formulas().get(formula.id).unwrap().is_learned);
}

#[test]
fn new_formula_is_appended_and_trimmed() {
    let app = open();
    let math = category(&app, "Math");
    let mut input = new_formula("  Momentum  ", &math);
    input.formula_text = " p = mv ".to_string();

    let created = app.formulas().create(input).unwrap();
    assert_eq!(created.name, "Momentum");
    assert_eq!(created.formula_text, "p = mv");
    assert_eq!(created.order_index, 5);
    assert_eq!(created.variables, vec!["p", "m", "v"]);
    assert!(!created.is_learned);
}

#[test]
fn create_rejects_blank_fields_and_unknown_categories() {
    let app = open();
    let math = category(&app, "Math");

    let err = app.formulas().create(new_formula("   ", &math)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::EmptyRequiredField { field: "name", .. })
    ));

    let mut ghost = math.clone();
    ghost.id = uuid::Uuid::new_v4();
    let err = app.formulas().create(new_formula("Momentum", &ghost)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::MissingParent { .. })
    ));
    assert!(!app.store().has_pending());
}

#[test]
fn deleting_a_category_keeps_its_formulas_uncategorized() {
    let app = open();
    let chemistry = category(&app, "Chemistry");
    let formula_ids: Vec<_> = app
        .formulas()
        .fetch_formulas(chemistry.id)
        .iter()
        .map(|f| f.id)
        .collect();

    let main = app.main();
    assert_eq!(main.delete_category(chemistry.id).unwrap(), WriteOutcome::Applied);
    assert_eq!(main.categories().len(), 2);

    for id in formula_ids {
        assert_eq!(app.formulas().get(id).unwrap().category_id, None);
    }
    assert_eq!(app.formulas().fetch_all().len(), 15);
}

#[test]
fn deleted_categories_append_their_formulas_after_the_uncategorized_ones() {
    let app = open();
    let chemistry = category(&app, "Chemistry");
    let physics = category(&app, "Physics");
    let names_of = |category: &Category| -> Vec<String> {
        app.formulas()
            .fetch_formulas(category.id)
            .into_iter()
            .map(|f| f.name)
            .collect()
    };
    let mut expected = names_of(&chemistry);
    expected.extend(names_of(&physics));

    app.categories().delete(chemistry.id).unwrap();
    app.categories().delete(physics.id).unwrap();

    let uncategorized: Vec<_> = app
        .formulas()
        .fetch_all()
        .into_iter()
        .filter(|f| f.category_id.is_none())
        .collect();
    assert_eq!(
        uncategorized.iter().map(|f| f.order_index).collect::<Vec<_>>(),
        (0..10).collect::<Vec<i64>>()
    );
    assert_eq!(
        uncategorized.into_iter().map(|f| f.name).collect::<Vec<_>>(),
        expected
    );
    assert!(!app.store().has_pending());
}

#[test]
fn category_update_rejects_an_index_held_by_a_sibling() {
    let app = open();
    let physics = category(&app, "Physics");
    let mut chemistry = category(&app, "Chemistry");
    chemistry.order_index = physics.order_index;

    let err = app.categories().update(&chemistry).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(ValidationError::InvalidValue {
            field: "order_index",
            ..
        })
    ));
    assert!(!app.store().has_pending());
    let indexes: Vec<_> = app
        .categories()
        .fetch_categories()
        .iter()
        .map(|c| c.order_index)
        .collect();
    assert_eq!(indexes, vec![0, 1, 2]);

    chemistry.order_index = 7;
    assert_eq!(
        app.categories().update(&chemistry).unwrap(),
        WriteOutcome::Applied
    );
    assert_eq!(category(&app, "Chemistry").order_index, 7);
}

#[test]
fn formula_update_rejects_an_index_held_in_the_same_category() {
    let app = open();
    let math = category(&app, "Math");
    let physics = category(&app, "Physics");
    let formulas = app.formulas().fetch_formulas(math.id);
    let mut second = formulas[1].clone();
    second.order_index = formulas[0].order_index;

    let err = app.formulas().update(&second).unwrap_err();
    assert!(err.is_validation());

    // The same index in another category is free.
    let mut other = app.formulas().fetch_formulas(physics.id).remove(4);
    other.order_index = formulas[0].order_index + 20;
    app.formulas().update(&other).unwrap();
    second.order_index = formulas[0].order_index + 20;
    assert_eq!(app.formulas().update(&second).unwrap(), WriteOutcome::Applied);
}

#[test]
fn writes_to_vanished_records_are_no_ops() {
    let app = open();
    let formula = app.formulas().fetch_all().remove(0);
    app.formulas().delete(formula.id).unwrap();

    assert_eq!(
        app.formulas().toggle_learned(formula.id).unwrap(),
        WriteOutcome::Missing
    );
    assert_eq!(app.formulas().update(&formula).unwrap(), WriteOutcome::Missing);
    assert_eq!(app.formulas().delete(formula.id).unwrap(), WriteOutcome::Missing);
}

#[test]
fn category_color_must_be_hex() {
    let app = open();
    assert!(app.categories().create("Biology", "leaf", "#2E8B57").is_ok());
    let err = app.categories().create("Geology", "mountain", "brown").unwrap_err();
    assert!(err.is_validation());

    let biology = category(&app, "Biology");
    assert_eq!(biology.order_index, 3);
}

#[test]
fn mark_viewed_stamps_the_clock_time() {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let app = FormulasApp::open_with(
        StoreLocation::Memory,
        StoreConfig::default(),
        Arc::new(ManualClock::new(now)),
    )
    .unwrap();
    let formula = app.formulas().fetch_all().remove(0);
    assert_eq!(formula.created_at, Some(now));
    assert_eq!(formula.last_viewed_at, None);

    app.formulas().mark_viewed(formula.id).unwrap();
    assert_eq!(app.formulas().get(formula.id).unwrap().last_viewed_at, Some(now));
}

#[test]
fn search_matches_any_text_field_sorted_by_name() {
    let app = open();
    assert!(app.formulas().search("").is_empty());

    let names: Vec<_> = app
        .formulas()
        .search("ENERGY")
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["Kinetic energy", "Mass-energy equivalence"]);

    let by_text: Vec<_> = app
        .formulas()
        .search("f = ma")
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(by_text, vec!["Newton's second law"]);
}

#[test]
fn category_detail_filters_and_tracks_progress() {
    let app = open();
    let physics = category(&app, "Physics");
    let mut detail = app.category_detail(physics);
    assert_eq!(detail.formulas().len(), 5);

    let first = detail.formulas()[0].id;
    detail.toggle_learned(first).unwrap();
    assert_eq!(detail.learned_count(), 1);
    assert!((detail.progress() - 0.2).abs() < 1e-9);

    detail.set_search_text("law");
    let names: Vec<_> = detail.filtered().into_iter().map(|f| f.name).collect();
    assert_eq!(names, vec!["Newton's second law", "Ohm's law"]);
}

#[test]
fn search_view_model_runs_once_per_typing_burst() {
    let config = StoreConfig {
        change_debounce_ms: 10,
        max_notify_delay_ms: 50,
        search_delay_ms: 60,
        ..StoreConfig::default()
    };
    let app = FormulasApp::open_with(
        StoreLocation::Memory,
        config,
        Arc::new(ManualClock::new(Utc::now())),
    )
    .unwrap();
    // Let the seeding signal settle so it cannot rerun the query.
    sleep(Duration::from_millis(200));
    let search = app.search().unwrap();

    for prefix in ["o", "oh", "ohm"] {
        search.set_query(prefix);
    }
    sleep(Duration::from_millis(400));

    assert_eq!(search.executed_searches(), 1);
    assert_eq!(search.query(), "ohm");
    let names: Vec<_> = search.results().iter().map(|f| f.name.clone()).collect();
    assert_eq!(names, vec!["Ohm's law"]);

    search.clear();
    assert!(search.results().is_empty());
}
