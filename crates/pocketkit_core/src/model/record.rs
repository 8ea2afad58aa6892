//! Record and field value types.
//!
//! # Responsibility
//! - Carry one entity instance between services and the store.
//! - Track modified fields so updates merge per field.
//!
//! # Invariants
//! - A nil `id` means "not yet persisted"; `Store::insert` assigns one.
//! - Loading a record from the store yields an empty dirty set.

use crate::schema::FieldKind;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use uuid::Uuid;

/// Stable identifier for every stored record.
pub type RecordId = Uuid;

static NULL: Value = Value::Null;

/// Typed scalar stored in one record field.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// Identity of a parent record.
    Id(RecordId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns whether this value may be stored in a field of `kind`.
    ///
    /// `Null` fits every kind; `Integer` is accepted for `Real` fields.
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (Self::Null, _)
                | (Self::Text(_), FieldKind::Text)
                | (Self::Integer(_), FieldKind::Integer | FieldKind::Real)
                | (Self::Real(_), FieldKind::Real)
                | (Self::Bool(_), FieldKind::Bool)
                | (Self::Timestamp(_), FieldKind::Timestamp)
                | (Self::Id(_), FieldKind::Reference { .. })
        )
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<RecordId> {
        match self {
            Self::Id(value) => Some(*value),
            _ => None,
        }
    }

    pub(crate) fn to_sql(&self) -> rusqlite::types::Value {
        use rusqlite::types::Value as Sql;
        match self {
            Self::Null => Sql::Null,
            Self::Text(value) => Sql::Text(value.clone()),
            Self::Integer(value) => Sql::Integer(*value),
            Self::Real(value) => Sql::Real(*value),
            Self::Bool(value) => Sql::Integer(i64::from(*value)),
            Self::Timestamp(value) => Sql::Integer(value.timestamp_millis()),
            Self::Id(value) => Sql::Text(value.to_string()),
        }
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<Uuid> for Value {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One entity instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    entity: &'static str,
    fields: BTreeMap<&'static str, Value>,
    dirty: BTreeSet<&'static str>,
}

impl Record {
    /// Creates an unsaved record of `entity` without identity.
    pub fn new(entity: &'static str) -> Self {
        Self::with_id(Uuid::nil(), entity)
    }

    /// Creates a record with a caller-provided identity.
    pub fn with_id(id: RecordId, entity: &'static str) -> Self {
        Self {
            id,
            entity,
            fields: BTreeMap::new(),
            dirty: BTreeSet::new(),
        }
    }

    pub(crate) fn from_stored(
        id: RecordId,
        entity: &'static str,
        fields: BTreeMap<&'static str, Value>,
    ) -> Self {
        Self {
            id,
            entity,
            fields,
            dirty: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn has_identity(&self) -> bool {
        !self.id.is_nil()
    }

    pub(crate) fn assign_id(&mut self, id: RecordId) {
        self.id = id;
    }

    /// Sets a field; it is marked modified only when the value changes.
    pub fn set(&mut self, field: &'static str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        if self.fields.get(field) != Some(&value) {
            self.fields.insert(field, value);
            self.dirty.insert(field);
        }
        self
    }

    /// Builder form of [`Record::set`].
    pub fn with(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    /// Returns the field value, `Value::Null` when absent.
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).as_text()
    }

    /// Text value or an empty string.
    pub fn string(&self, field: &str) -> String {
        self.text(field).unwrap_or_default().to_string()
    }

    pub fn integer(&self, field: &str) -> Option<i64> {
        self.get(field).as_integer()
    }

    pub fn real(&self, field: &str) -> Option<f64> {
        self.get(field).as_real()
    }

    pub fn boolean(&self, field: &str) -> Option<bool> {
        self.get(field).as_bool()
    }

    /// Boolean value, `false` when absent.
    pub fn flag(&self, field: &str) -> bool {
        self.boolean(field).unwrap_or(false)
    }

    pub fn timestamp(&self, field: &str) -> Option<DateTime<Utc>> {
        self.get(field).as_timestamp()
    }

    pub fn reference(&self, field: &str) -> Option<RecordId> {
        self.get(field).as_id()
    }

    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    pub fn is_dirty(&self, field: &str) -> bool {
        self.dirty.contains(field)
    }

    pub fn has_changes(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Modified fields with their current values.
    pub fn changes(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.dirty
            .iter()
            .map(|name| (*name, self.fields.get(name).unwrap_or(&NULL)))
    }

    /// Sets a field as if it had been loaded that way; not marked modified.
    pub(crate) fn load_field(&mut self, field: &'static str, value: Value) {
        self.fields.insert(field, value);
        self.dirty.remove(field);
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::{Record, Value};
    use crate::schema::{FieldKind, OnDelete};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn new_record_has_no_identity() {
        let record = Record::new("animal");
        assert!(!record.has_identity());
        assert_eq!(record.entity(), "animal");
    }

    #[test]
    fn set_marks_field_dirty_and_changes_lists_it() {
        let mut record = Record::with_id(Uuid::new_v4(), "animal");
        record.set("name", "Tiger").set("is_favorite", true);

        assert!(record.is_dirty("name"));
        assert!(!record.is_dirty("habitat"));
        let changed: Vec<_> = record.changes().map(|(name, _)| name).collect();
        assert_eq!(changed, vec!["is_favorite", "name"]);

        record.mark_clean();
        assert!(!record.has_changes());
        assert_eq!(record.text("name"), Some("Tiger"));
    }

    #[test]
    fn setting_same_value_keeps_field_clean() {
        let mut record = Record::with_id(Uuid::new_v4(), "formula");
        record.set("is_learned", false);
        record.mark_clean();

        record.set("is_learned", false);
        assert!(!record.has_changes());
        record.set("is_learned", true);
        assert!(record.is_dirty("is_learned"));
    }

    #[test]
    fn missing_fields_read_as_null() {
        let record = Record::new("flight");
        assert!(record.get("score").is_null());
        assert_eq!(record.string("notes"), "");
        assert!(!record.flag("sound_enabled"));
    }

    #[test]
    fn option_values_convert_to_null() {
        let none: Option<i64> = None;
        assert_eq!(Value::from(none), Value::Null);
        assert_eq!(Value::from(Some(3_i64)), Value::Integer(3));
    }

    #[test]
    fn value_fits_matching_kinds_only() {
        let reference = FieldKind::Reference {
            parent: "project",
            on_delete: OnDelete::Cascade,
        };
        assert!(Value::Id(Uuid::new_v4()).fits(reference));
        assert!(!Value::Text("x".into()).fits(reference));
        assert!(Value::Integer(3).fits(FieldKind::Real));
        assert!(!Value::Real(1.5).fits(FieldKind::Integer));
        assert!(Value::Null.fits(FieldKind::Bool));
    }

    #[test]
    fn timestamps_are_stored_as_epoch_millis() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(
            Value::Timestamp(at).to_sql(),
            rusqlite::types::Value::Integer(at.timestamp_millis())
        );
    }
}
