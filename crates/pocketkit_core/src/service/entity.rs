//! Generic per-entity domain service.
//!
//! # Responsibility
//! - Offer fetch/create/update/delete/toggle/search for one model type.
//! - Apply required-field, parent-existence and ordering-index rules.
//!
//! # Invariants
//! - `create` assigns `max(sibling index) + 1` within the scope, `0` first.
//! - Required text fields are stored trimmed and must not be blank.
//! - A vanished target turns update/delete/toggle into `WriteOutcome::Missing`.
//! - Ordering indexes stay unique within their scope on update.

use super::{ServiceResult, ValidationError, WriteOutcome};
use crate::model::{Record, RecordId, Value};
use crate::schema::{EntitySchema, FieldKind};
use crate::store::{Condition, Query, SortKey, Store, StoreResult};
use log::{error, info};
use std::marker::PhantomData;

/// Ordering-index field and the reference field that scopes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderScope {
    pub field: &'static str,
    /// Siblings share this field's value; `None` means one global scope.
    pub scope: Option<&'static str>,
}

/// Read-only model projected from one record type.
pub trait Entity: Sized + Send + Sync + 'static {
    const NAME: &'static str;
    const NATURAL_SORT: &'static [SortKey];
    /// Text fields matched by `search`, OR-combined.
    const SEARCH_FIELDS: &'static [&'static str] = &[];
    const SEARCH_SORT: &'static [SortKey] = Self::NATURAL_SORT;
    const ORDER: Option<OrderScope> = None;

    fn from_record(record: &Record) -> Self;

    fn id(&self) -> RecordId;

    /// Copies this model's mutable fields onto `record`.
    fn apply_to(&self, record: &mut Record);
}

pub struct EntityService<E: Entity> {
    store: Store,
    _model: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for EntityService<E> {
    fn clone(&self) -> Self {
        Self::new(self.store.clone())
    }
}

impl<E: Entity> EntityService<E> {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            _model: PhantomData,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// All models in natural order; empty on store failure.
    pub fn fetch_all(&self) -> Vec<E> {
        self.fetch(&Query::new().sorted_by(E::NATURAL_SORT))
    }

    pub fn fetch_sorted(&self, sort: &[SortKey]) -> Vec<E> {
        self.fetch(&Query::new().sorted_by(sort))
    }

    /// Models matching every condition, in natural order.
    pub fn fetch_where(&self, conditions: impl IntoIterator<Item = Condition>) -> Vec<E> {
        let query = conditions
            .into_iter()
            .fold(Query::new(), Query::filter)
            .sorted_by(E::NATURAL_SORT);
        self.fetch(&query)
    }

    /// Models matching `query`; empty on store failure.
    pub fn fetch(&self, query: &Query) -> Vec<E> {
        match self.try_fetch(query) {
            Ok(models) => models,
            Err(err) => {
                error!(
                    "event=entity_fetch module=service status=error entity={} error={}",
                    E::NAME,
                    err
                );
                Vec::new()
            }
        }
    }

    /// Like [`EntityService::fetch`] but surfaces the failure.
    pub fn try_fetch(&self, query: &Query) -> StoreResult<Vec<E>> {
        let records = self.store.query(E::NAME, query)?;
        Ok(records.iter().map(E::from_record).collect())
    }

    pub fn get(&self, id: RecordId) -> Option<E> {
        match self.store.get(E::NAME, id) {
            Ok(record) => record.as_ref().map(E::from_record),
            Err(err) => {
                error!(
                    "event=entity_get module=service status=error entity={} error={}",
                    E::NAME,
                    err
                );
                None
            }
        }
    }

    pub fn count(&self, query: &Query) -> usize {
        match self.store.count(E::NAME, query) {
            Ok(count) => count,
            Err(err) => {
                error!(
                    "event=entity_count module=service status=error entity={} error={}",
                    E::NAME,
                    err
                );
                0
            }
        }
    }

    /// Case-insensitive substring search over `E::SEARCH_FIELDS`.
    ///
    /// An empty query returns no results rather than everything.
    pub fn search(&self, text: &str) -> Vec<E> {
        if text.is_empty() || E::SEARCH_FIELDS.is_empty() {
            return Vec::new();
        }
        let query = E::SEARCH_FIELDS
            .iter()
            .fold(Query::new(), |query, field| {
                query.or_filter(Condition::contains_ci(*field, text))
            })
            .sorted_by(E::SEARCH_SORT);
        self.fetch(&query)
    }

    /// Next ordering index in the scope selected by `scope_value`.
    pub fn next_order_index(&self, scope_value: Option<RecordId>) -> StoreResult<i64> {
        let Some(order) = E::ORDER else {
            return Ok(0);
        };
        let scope = order
            .scope
            .map(|field| (field, Value::from(scope_value)));
        self.store.next_index(E::NAME, order.field, scope)
    }

    /// Validates and commits a new record, returning its model.
    ///
    /// # Errors
    /// - `Validation` when a required field is blank or a parent is missing.
    /// - `Persistence` when the commit fails; the insert stays staged.
    pub fn create(&self, record: Record) -> ServiceResult<E> {
        let record = self.stage_create(record)?;
        self.store.commit()?;
        info!(
            "event=entity_create module=service status=ok entity={} id={}",
            E::NAME,
            record.id()
        );
        Ok(E::from_record(&record))
    }

    /// Validates and stages a new record without committing.
    pub fn stage_create(&self, mut record: Record) -> ServiceResult<Record> {
        let schema = self.store.entity(E::NAME)?;
        normalize_required(schema, &mut record)?;
        check_parents(&self.store, schema, &record)?;

        if let Some(order) = E::ORDER {
            let scope = order
                .scope
                .map(|field| (field, record.get(field).clone()));
            let next = self.store.next_index(E::NAME, order.field, scope)?;
            record.set(order.field, next);
        }

        Ok(self.store.insert(record)?)
    }

    /// Overwrites the stored mutable fields with `model`'s values.
    pub fn update(&self, model: &E) -> ServiceResult<WriteOutcome> {
        self.modify(model.id(), |record| model.apply_to(record))
    }

    /// Read-modify-write of one record, committed immediately.
    pub fn modify(
        &self,
        id: RecordId,
        apply: impl FnOnce(&mut Record),
    ) -> ServiceResult<WriteOutcome> {
        let outcome = self.stage_modify(id, apply)?;
        if outcome.is_applied() {
            self.store.commit()?;
        }
        Ok(outcome)
    }

    /// Read-modify-write of one record, staged only.
    pub fn stage_modify(
        &self,
        id: RecordId,
        apply: impl FnOnce(&mut Record),
    ) -> ServiceResult<WriteOutcome> {
        let Some(mut record) = self.store.get(E::NAME, id)? else {
            log_missing("update", E::NAME, id);
            return Ok(WriteOutcome::Missing);
        };

        apply(&mut record);
        let schema = self.store.entity(E::NAME)?;
        normalize_required(schema, &mut record)?;
        check_parents(&self.store, schema, &record)?;
        self.place_in_order(&mut record)?;
        self.store.update(&mut record)?;
        Ok(WriteOutcome::Applied)
    }

    /// Deletes the record; children follow their relationship rule.
    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.stage_delete(id)?;
        if outcome.is_applied() {
            self.store.commit()?;
            info!(
                "event=entity_delete module=service status=ok entity={} id={}",
                E::NAME,
                id
            );
        }
        Ok(outcome)
    }

    /// Stages removal of the record without committing.
    pub fn stage_delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let Some(record) = self.store.get(E::NAME, id)? else {
            log_missing("delete", E::NAME, id);
            return Ok(WriteOutcome::Missing);
        };
        self.store.delete(&record)?;
        Ok(WriteOutcome::Applied)
    }

    /// Stages moving every record of the scope `scope_value` into the
    /// unscoped group, appended after its members in their current order.
    ///
    /// Call before deleting a parent whose children survive with a cleared
    /// reference, so their indexes do not collide with the unscoped ones.
    pub fn stage_release_scope(&self, scope_value: RecordId) -> ServiceResult<usize> {
        let Some(OrderScope {
            field,
            scope: Some(scope),
        }) = E::ORDER
        else {
            return Ok(0);
        };

        let query = Query::new()
            .filter(Condition::eq(scope, scope_value))
            .sort(SortKey::asc(field));
        let children = self.store.query(E::NAME, &query)?;
        let mut next = self.next_order_index(None)?;
        for mut record in children.iter().cloned() {
            record.set(scope, Value::Null).set(field, next);
            self.store.update(&mut record)?;
            next += 1;
        }
        Ok(children.len())
    }

    /// Keeps the ordering index unique within its scope.
    ///
    /// An explicitly changed index must be free among the record's
    /// siblings; a record moved to another scope without a new index is
    /// appended to that scope.
    fn place_in_order(&self, record: &mut Record) -> ServiceResult<()> {
        let Some(order) = E::ORDER else {
            return Ok(());
        };
        let scope = order
            .scope
            .map(|field| (field, record.get(field).clone()));
        let moved = order.scope.is_some_and(|field| record.is_dirty(field));

        if !record.is_dirty(order.field) {
            if moved {
                let next = self.store.next_index(E::NAME, order.field, scope)?;
                record.set(order.field, next);
            }
            return Ok(());
        }

        let Some(index) = record.integer(order.field) else {
            return Ok(());
        };
        let mut query = Query::new().filter(Condition::eq(order.field, index));
        if let Some((field, value)) = scope {
            query = query.filter(Condition::eq(field, value));
        }
        let taken = self
            .store
            .query(E::NAME, &query)?
            .iter()
            .any(|sibling| sibling.id() != record.id());
        if taken {
            return Err(ValidationError::InvalidValue {
                field: order.field,
                message: format!("index {index} is already used in its scope"),
            }
            .into());
        }
        Ok(())
    }

    /// Flips one boolean field; applying it twice restores the value.
    pub fn toggle(&self, id: RecordId, field: &'static str) -> ServiceResult<WriteOutcome> {
        self.modify(id, |record| {
            let current = record.flag(field);
            record.set(field, !current);
        })
    }
}

fn log_missing(op: &str, entity: &str, id: RecordId) {
    info!(
        "event=entity_{} module=service status=skip reason=not_found entity={} id={}",
        op, entity, id
    );
}

fn normalize_required(schema: &EntitySchema, record: &mut Record) -> ServiceResult<()> {
    for field in schema.fields.iter().filter(|field| field.required) {
        let blank = ValidationError::EmptyRequiredField {
            entity: schema.name,
            field: field.name,
        };
        match record.get(field.name) {
            Value::Null => return Err(blank.into()),
            Value::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(blank.into());
                }
                if trimmed.len() != text.len() {
                    let trimmed = trimmed.to_string();
                    record.set(field.name, trimmed);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_parents(store: &Store, schema: &EntitySchema, record: &Record) -> ServiceResult<()> {
    for field in schema.references() {
        let FieldKind::Reference { parent, .. } = field.kind else {
            continue;
        };
        if !record.is_dirty(field.name) {
            continue;
        }
        if let Some(parent_id) = record.reference(field.name) {
            if !store.exists(parent, parent_id)? {
                return Err(ValidationError::MissingParent {
                    entity: schema.name,
                    field: field.name,
                    parent_id,
                }
                .into());
            }
        }
    }
    Ok(())
}
