use pocketkit_core::model::Record;
use pocketkit_core::projection::LiveProjection;
use pocketkit_core::schema::{EntitySchema, FieldDef, Schema};
use pocketkit_core::store::{Query, Store};
use pocketkit_core::StoreConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

static JOURNAL: Schema = Schema {
    name: "journal",
    version: 1,
    entities: &[EntitySchema {
        name: "entry",
        fields: &[FieldDef::text("body").required()],
    }],
};

const SETTLE: Duration = Duration::from_millis(400);

fn open() -> Store {
    let config = StoreConfig {
        change_debounce_ms: 30,
        max_notify_delay_ms: 200,
        ..StoreConfig::default()
    };
    Store::open_in_memory_with_config(&JOURNAL, config).unwrap()
}

fn write_entry(store: &Store, body: &str) {
    store
        .insert(Record::new("entry").with("body", body))
        .unwrap();
    store.commit().unwrap();
}

fn counter(store: &Store) -> (Arc<AtomicUsize>, pocketkit_core::Subscription) {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler_calls = Arc::clone(&calls);
    let subscription = store.subscribe(move || {
        handler_calls.fetch_add(1, Ordering::SeqCst);
    });
    (calls, subscription)
}

#[test]
fn burst_of_commits_produces_one_signal() {
    let store = open();
    let (calls, _subscription) = counter(&store);

    for body in ["one", "two", "three"] {
        write_entry(&store, body);
    }
    sleep(SETTLE);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.notifier().deliveries(), 1);
}

#[test]
fn empty_commit_and_rollback_do_not_signal() {
    let store = open();
    let (calls, _subscription) = counter(&store);

    store.commit().unwrap();
    store
        .insert(Record::new("entry").with("body", "discarded"))
        .unwrap();
    store.rollback();
    sleep(SETTLE);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn detached_owner_commits_reach_subscribers_of_the_main_handle() {
    let store = open();
    let (calls, _subscription) = counter(&store);

    write_entry(&store.detached(), "from worker");
    sleep(SETTLE);

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn dropped_subscription_stops_receiving() {
    let store = open();
    let (calls, subscription) = counter(&store);
    subscription.unsubscribe();

    write_entry(&store, "unseen");
    sleep(SETTLE);

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.notifier().subscriber_count(), 0);
}

#[test]
fn live_projection_reloads_after_commit() {
    let store = open();
    let reader = store.clone();
    let projection = LiveProjection::new(&store, move || {
        reader.count("entry", &Query::new()).unwrap_or(0)
    });
    assert_eq!(*projection.snapshot(), 0);

    write_entry(&store, "first");
    write_entry(&store, "second");
    sleep(SETTLE);

    assert_eq!(*projection.snapshot(), 2);
    assert!(projection.reload_count() >= 1);
}

#[test]
fn dropping_projection_unsubscribes_it() {
    let store = open();
    let reader = store.clone();
    let projection = LiveProjection::new(&store, move || {
        reader.count("entry", &Query::new()).unwrap_or(0)
    });
    assert_eq!(store.notifier().subscriber_count(), 1);

    drop(projection);
    assert_eq!(store.notifier().subscriber_count(), 0);
}
