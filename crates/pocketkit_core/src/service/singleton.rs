use super::ServiceResult;
use crate::model::Record;
use crate::store::{Query, Store, StoreResult};
use log::warn;

/// Returns the single record of `entity` as this owner currently sees it,
/// staging a default one when none exists.
///
/// Staged but uncommitted work of the same owner is included: a default
/// left pending by a failed commit is reused rather than staged twice, and
/// pending updates are applied on top of the committed row. The caller may
/// modify the result with `Store::update` before committing.
pub(crate) fn first_or_create(
    store: &Store,
    entity: &'static str,
    defaults: impl FnOnce(&mut Record),
) -> StoreResult<Record> {
    let mut existing = store.query(entity, &Query::new().limit(1))?;
    if let Some(record) = existing.pop() {
        return Ok(store.with_staged_changes(record));
    }
    if let Some(record) = store.staged_first(entity) {
        return Ok(record);
    }

    let mut record = Record::new(entity);
    defaults(&mut record);
    store.insert(record)
}

/// Runs `stage` as one unit of staged work.
///
/// When `stage` fails, whatever it staged is discarded; changes the owner
/// staged before the call stay pending.
pub(crate) fn staged_unit<T>(
    store: &Store,
    stage: impl FnOnce() -> ServiceResult<T>,
) -> ServiceResult<T> {
    let mark = store.pending_count();
    let result = stage();
    if let Err(err) = &result {
        let discarded = store.pending_count().saturating_sub(mark);
        if discarded > 0 {
            store.discard_since(mark);
            warn!(
                "event=staged_unit module=service status=error discarded={} error={}",
                discarded, err
            );
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{first_or_create, staged_unit};
    use crate::model::Record;
    use crate::schema::{EntitySchema, FieldDef, Schema};
    use crate::service::{ServiceResult, ValidationError};
    use crate::store::{Query, Store};

    const COUNTER_FIELDS: &[FieldDef] = &[FieldDef::integer("value")];
    const NOTE_FIELDS: &[FieldDef] = &[FieldDef::text("body").required()];
    static SCHEMA: Schema = Schema {
        name: "singleton_checks",
        version: 1,
        entities: &[
            EntitySchema {
                name: "counter",
                fields: COUNTER_FIELDS,
            },
            EntitySchema {
                name: "note",
                fields: NOTE_FIELDS,
            },
        ],
    };

    fn zero(record: &mut Record) {
        record.set("value", 0_i64);
    }

    #[test]
    fn pending_default_is_reused_with_its_staged_updates() {
        let store = Store::open_in_memory(&SCHEMA).unwrap();
        let mut first = first_or_create(&store, "counter", zero).unwrap();
        first.set("value", 1_i64);
        store.update(&mut first).unwrap();

        let mut again = first_or_create(&store, "counter", zero).unwrap();
        assert_eq!(again.id(), first.id());
        assert_eq!(again.integer("value"), Some(1));
        assert!(!again.has_changes());

        again.set("value", 2_i64);
        store.update(&mut again).unwrap();
        store.commit().unwrap();

        let rows = store.query("counter", &Query::new()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].integer("value"), Some(2));
    }

    #[test]
    fn committed_record_reflects_pending_updates() {
        let store = Store::open_in_memory(&SCHEMA).unwrap();
        first_or_create(&store, "counter", zero).unwrap();
        store.commit().unwrap();

        let mut record = first_or_create(&store, "counter", zero).unwrap();
        record.set("value", 5_i64);
        store.update(&mut record).unwrap();

        let seen = first_or_create(&store, "counter", zero).unwrap();
        assert_eq!(seen.integer("value"), Some(5));
        assert_eq!(store.pending_count(), 1);
    }

    #[test]
    fn failed_unit_discards_only_its_own_changes() {
        let store = Store::open_in_memory(&SCHEMA).unwrap();
        store
            .insert(Record::new("note").with("body", "kept"))
            .unwrap();

        let result: ServiceResult<()> = staged_unit(&store, || {
            store.insert(Record::new("note").with("body", "dropped"))?;
            Err(ValidationError::InvalidValue {
                field: "body",
                message: "rejected".to_string(),
            }
            .into())
        });
        assert!(result.unwrap_err().is_validation());
        assert_eq!(store.pending_count(), 1);

        store.commit().unwrap();
        let notes = store.query("note", &Query::new()).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].text("body"), Some("kept"));
    }

    #[test]
    fn successful_unit_keeps_its_changes_staged() {
        let store = Store::open_in_memory(&SCHEMA).unwrap();
        let staged = staged_unit(&store, || {
            Ok(store.insert(Record::new("note").with("body", "draft"))?)
        })
        .unwrap();
        assert_eq!(store.pending_count(), 1);
        assert_eq!(staged.text("body"), Some("draft"));
    }
}
