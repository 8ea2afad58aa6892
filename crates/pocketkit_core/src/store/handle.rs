//! Shared store handle with per-owner staging.

use super::query::{build_count, build_next_index, build_select, Condition, Query};
use super::staging::{apply_staged, StagedChange};
use super::{StoreError, StoreResult};
use crate::config::StoreConfig;
use crate::db::{open_db, open_db_in_memory};
use crate::model::{Record, RecordId, Value};
use crate::notify::{ChangeNotifier, Subscription};
use crate::schema::{EntitySchema, FieldKind, Schema};
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, Row};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

struct Shared {
    conn: Mutex<Connection>,
    schema: &'static Schema,
    notifier: ChangeNotifier,
    config: StoreConfig,
}

/// Handle to one app store.
///
/// Clones share the database and the staging area (one logical owner).
/// [`Store::detached`] creates a handle with its own staging area, used by
/// worker contexts such as default-data seeding.
#[derive(Clone)]
pub struct Store {
    shared: Arc<Shared>,
    staged: Arc<Mutex<Vec<StagedChange>>>,
}

impl Store {
    /// Opens or creates the store file at `path` for `schema`.
    ///
    /// # Errors
    /// - `StorageUnavailable` when the file cannot be opened or migrated.
    pub fn open(schema: &'static Schema, path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with_config(schema, path, StoreConfig::default())
    }

    pub fn open_with_config(
        schema: &'static Schema,
        path: impl AsRef<Path>,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let conn = open_db(path, schema, config.busy_timeout())
            .map_err(StoreError::StorageUnavailable)?;
        Self::from_connection(schema, conn, config)
    }

    pub fn open_in_memory(schema: &'static Schema) -> StoreResult<Self> {
        Self::open_in_memory_with_config(schema, StoreConfig::default())
    }

    pub fn open_in_memory_with_config(
        schema: &'static Schema,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let conn = open_db_in_memory(schema, config.busy_timeout())
            .map_err(StoreError::StorageUnavailable)?;
        Self::from_connection(schema, conn, config)
    }

    fn from_connection(
        schema: &'static Schema,
        conn: Connection,
        config: StoreConfig,
    ) -> StoreResult<Self> {
        let notifier = ChangeNotifier::new(config.change_debounce(), config.max_notify_delay())
            .map_err(StoreError::NotifierUnavailable)?;
        Ok(Self {
            shared: Arc::new(Shared {
                conn: Mutex::new(conn),
                schema,
                notifier,
                config,
            }),
            staged: Arc::new(Mutex::new(Vec::new())),
        })
    }

    /// Returns a handle over the same database with an empty, private
    /// staging area.
    pub fn detached(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            staged: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.shared.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.shared.config
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.shared.notifier
    }

    /// Registers `handler` for debounced post-commit change signals.
    pub fn subscribe(&self, handler: impl Fn() + Send + Sync + 'static) -> Subscription {
        self.shared.notifier.subscribe(handler)
    }

    pub fn entity(&self, name: &str) -> StoreResult<&'static EntitySchema> {
        self.shared
            .schema
            .entity(name)
            .ok_or_else(|| StoreError::UnknownEntity(name.to_string()))
    }

    /// Returns committed records of `entity` matching `query`.
    ///
    /// An empty result is not an error.
    pub fn query(&self, entity: &str, query: &Query) -> StoreResult<Vec<Record>> {
        let schema = self.entity(entity)?;
        let (sql, binds) = build_select(schema, query)?;
        let conn = self.shared.conn.lock();
        let result = read_records(&conn, schema, &sql, binds);
        if let Err(err) = &result {
            warn!(
                "event=store_query module=store status=error entity={} error={}",
                schema.name, err
            );
        }
        result
    }

    pub fn get(&self, entity: &str, id: RecordId) -> StoreResult<Option<Record>> {
        let query = Query::new().filter(Condition::eq("id", id)).limit(1);
        let mut records = self.query(entity, &query)?;
        Ok(records.pop())
    }

    /// Returns whether `id` is committed or staged for insertion by this
    /// owner.
    pub fn exists(&self, entity: &str, id: RecordId) -> StoreResult<bool> {
        let staged = self.staged.lock().iter().any(|change| {
            matches!(change, StagedChange::Insert(record) if record.entity() == entity && record.id() == id)
        });
        if staged {
            return Ok(true);
        }
        Ok(self.get(entity, id)?.is_some())
    }

    /// First record of `entity` this owner staged for insertion, with its
    /// later staged updates applied. `None` when none is staged or the
    /// staged record is also staged for deletion.
    pub fn staged_first(&self, entity: &str) -> Option<Record> {
        let staged = self.staged.lock();
        let mut found: Option<Record> = None;
        for change in staged.iter() {
            match change {
                StagedChange::Insert(record) if found.is_none() && record.entity() == entity => {
                    found = Some(record.clone());
                }
                StagedChange::Update {
                    entity: target,
                    id,
                    changes,
                } => {
                    if let Some(record) = found
                        .as_mut()
                        .filter(|record| record.entity() == *target && record.id() == *id)
                    {
                        for (name, value) in changes {
                            record.load_field(*name, value.clone());
                        }
                    }
                }
                StagedChange::Delete { entity: target, id } => {
                    if found
                        .as_ref()
                        .is_some_and(|record| record.entity() == *target && record.id() == *id)
                    {
                        found = None;
                    }
                }
                StagedChange::Insert(_) => {}
            }
        }
        found
    }

    /// Applies this owner's staged, uncommitted updates of `record` on top
    /// of its loaded values.
    pub fn with_staged_changes(&self, mut record: Record) -> Record {
        for change in self.staged.lock().iter() {
            if let StagedChange::Update {
                entity,
                id,
                changes,
            } = change
            {
                if *entity == record.entity() && *id == record.id() {
                    for (name, value) in changes {
                        record.load_field(*name, value.clone());
                    }
                }
            }
        }
        record
    }

    pub fn count(&self, entity: &str, query: &Query) -> StoreResult<usize> {
        let schema = self.entity(entity)?;
        let (sql, binds) = build_count(schema, query)?;
        let conn = self.shared.conn.lock();
        let count: i64 = conn.query_row(&sql, params_from_iter(binds), |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Returns `max(field) + 1` among records sharing `scope`, or `0` when
    /// the scope is empty.
    ///
    /// Inserts staged by this owner but not yet committed are included, so
    /// a batch of staged siblings receives distinct indexes.
    pub fn next_index(
        &self,
        entity: &str,
        field: &'static str,
        scope: Option<(&'static str, Value)>,
    ) -> StoreResult<i64> {
        let schema = self.entity(entity)?;
        let mut query = Query::new();
        if let Some((scope_field, scope_value)) = &scope {
            query = query.filter(Condition::eq(*scope_field, scope_value.clone()));
        }
        let (sql, binds) = build_next_index(schema, field, &query)?;
        let committed: i64 = {
            let conn = self.shared.conn.lock();
            conn.query_row(&sql, params_from_iter(binds), |row| row.get(0))?
        };

        let staged_next = self
            .staged
            .lock()
            .iter()
            .filter_map(|change| match change {
                StagedChange::Insert(record) if record.entity() == schema.name => Some(record),
                _ => None,
            })
            .filter(|record| match &scope {
                Some((scope_field, scope_value)) => record.get(scope_field) == scope_value,
                None => true,
            })
            .filter_map(|record| record.integer(field))
            .max()
            .map_or(0, |max| max + 1);

        Ok(committed.max(staged_next))
    }

    /// Stages `record` for insertion, assigning an identity when absent.
    pub fn insert(&self, mut record: Record) -> StoreResult<Record> {
        let schema = self.entity(record.entity())?;
        for (name, value) in record.fields() {
            check_field(schema, name, value)?;
        }
        if !record.has_identity() {
            record.assign_id(Uuid::new_v4());
        }
        record.mark_clean();
        self.staged.lock().push(StagedChange::Insert(record.clone()));
        Ok(record)
    }

    /// Stages the fields modified on `record` since it was loaded.
    ///
    /// Unmodified fields are left untouched in storage, so two owners
    /// editing different fields of the same record both keep their edits.
    pub fn update(&self, record: &mut Record) -> StoreResult<()> {
        if !record.has_identity() {
            return Err(StoreError::MissingIdentity(record.entity()));
        }
        let schema = self.entity(record.entity())?;
        let mut changes = Vec::new();
        for (name, value) in record.changes() {
            check_field(schema, name, value)?;
            changes.push((name, value.clone()));
        }
        if changes.is_empty() {
            return Ok(());
        }

        self.staged.lock().push(StagedChange::Update {
            entity: schema.name,
            id: record.id(),
            changes,
        });
        record.mark_clean();
        Ok(())
    }

    /// Stages removal of `record`; children follow their relationship rule.
    pub fn delete(&self, record: &Record) -> StoreResult<()> {
        self.delete_by_id(record.entity(), record.id())
    }

    pub fn delete_by_id(&self, entity: &str, id: RecordId) -> StoreResult<()> {
        let schema = self.entity(entity)?;
        if id.is_nil() {
            return Err(StoreError::MissingIdentity(schema.name));
        }
        self.staged.lock().push(StagedChange::Delete {
            entity: schema.name,
            id,
        });
        Ok(())
    }

    pub fn has_pending(&self) -> bool {
        !self.staged.lock().is_empty()
    }

    pub fn pending_count(&self) -> usize {
        self.staged.lock().len()
    }

    /// Discards changes staged after `mark`, a prior [`Store::pending_count`];
    /// earlier changes stay pending.
    pub fn discard_since(&self, mark: usize) {
        let mut staged = self.staged.lock();
        if staged.len() <= mark {
            return;
        }
        let discarded = staged.len() - mark;
        staged.truncate(mark);
        info!(
            "event=store_discard module=store status=ok schema={} discarded={} kept={}",
            self.shared.schema.name, discarded, mark
        );
    }

    /// Atomically persists everything staged by this owner.
    ///
    /// No-op when nothing is staged. On failure the transaction is rolled
    /// back and the staged changes stay pending for a retry.
    pub fn commit(&self) -> StoreResult<()> {
        let mut staged = self.staged.lock();
        if staged.is_empty() {
            return Ok(());
        }

        let started_at = Instant::now();
        let result = {
            let mut conn = self.shared.conn.lock();
            apply_staged(&mut conn, &staged)
        };

        match result {
            Ok(report) => {
                let staged_count = staged.len();
                staged.clear();
                drop(staged);
                info!(
                    "event=store_commit module=store status=ok schema={} changes={} applied={} skipped={} duration_ms={}",
                    self.shared.schema.name,
                    staged_count,
                    report.applied,
                    report.skipped,
                    started_at.elapsed().as_millis()
                );
                self.shared.notifier.notify();
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_commit module=store status=error schema={} changes={} duration_ms={} error={}",
                    self.shared.schema.name,
                    staged.len(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(StoreError::Persistence(err))
            }
        }
    }

    /// Discards everything staged by this owner.
    pub fn rollback(&self) {
        let discarded = std::mem::take(&mut *self.staged.lock()).len();
        if discarded > 0 {
            info!(
                "event=store_rollback module=store status=ok schema={} discarded={}",
                self.shared.schema.name, discarded
            );
        }
    }
}

fn check_field(schema: &EntitySchema, name: &str, value: &Value) -> StoreResult<()> {
    let field = schema.field(name).ok_or_else(|| StoreError::UnknownField {
        entity: schema.name.to_string(),
        field: name.to_string(),
    })?;
    if value.fits(field.kind) {
        Ok(())
    } else {
        Err(StoreError::TypeMismatch {
            entity: schema.name.to_string(),
            field: name.to_string(),
            expected: field.kind.name(),
        })
    }
}

fn read_records(
    conn: &Connection,
    schema: &'static EntitySchema,
    sql: &str,
    binds: Vec<SqlValue>,
) -> StoreResult<Vec<Record>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        records.push(read_record(schema, row)?);
    }
    Ok(records)
}

fn read_record(schema: &'static EntitySchema, row: &Row<'_>) -> StoreResult<Record> {
    let id_text: String = row.get(0)?;
    let id = parse_uuid(&id_text, schema.name, "id")?;

    let mut fields = BTreeMap::new();
    for (index, field) in schema.fields.iter().enumerate() {
        let column = index + 1;
        let value = match field.kind {
            FieldKind::Text => row
                .get::<_, Option<String>>(column)?
                .map_or(Value::Null, Value::Text),
            FieldKind::Integer => row
                .get::<_, Option<i64>>(column)?
                .map_or(Value::Null, Value::Integer),
            FieldKind::Real => row
                .get::<_, Option<f64>>(column)?
                .map_or(Value::Null, Value::Real),
            FieldKind::Bool => match row.get::<_, Option<i64>>(column)? {
                None => Value::Null,
                Some(0) => Value::Bool(false),
                Some(1) => Value::Bool(true),
                Some(other) => {
                    return Err(StoreError::InvalidData(format!(
                        "invalid bool value `{other}` in {}.{}",
                        schema.name, field.name
                    )));
                }
            },
            FieldKind::Timestamp => match row.get::<_, Option<i64>>(column)? {
                None => Value::Null,
                Some(millis) => DateTime::<Utc>::from_timestamp_millis(millis)
                    .map(Value::Timestamp)
                    .ok_or_else(|| {
                        StoreError::InvalidData(format!(
                            "timestamp `{millis}` out of range in {}.{}",
                            schema.name, field.name
                        ))
                    })?,
            },
            FieldKind::Reference { .. } => match row.get::<_, Option<String>>(column)? {
                None => Value::Null,
                Some(text) => Value::Id(parse_uuid(&text, schema.name, field.name)?),
            },
        };
        fields.insert(field.name, value);
    }

    Ok(Record::from_stored(id, schema.name, fields))
}

fn parse_uuid(value: &str, entity: &str, column: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid `{value}` in {entity}.{column}"))
    })
}
