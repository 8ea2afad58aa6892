//! Declarative entity schema for one app store.
//!
//! # Responsibility
//! - Describe record types, typed scalar fields and parent relationships.
//! - Render the SQLite DDL that backs each entity.
//!
//! # Invariants
//! - Every entity owns an implicit `id` column; schemas must not declare one.
//! - Reference fields point at an entity of the same schema.
//! - Schema evolution is additive: later versions may add entities/fields only.
//!
//! # See also
//! - `db::apply_schema`

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").expect("identifier regex must compile"));

/// What happens to children when their parent record is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDelete {
    /// Child survives with the reference cleared.
    Nullify,
    /// Child is deleted with its parent.
    Cascade,
}

impl OnDelete {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Nullify => "SET NULL",
            Self::Cascade => "CASCADE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Real,
    Bool,
    /// Stored as epoch milliseconds.
    Timestamp,
    /// Optional ownership link to a record of `parent`.
    Reference {
        parent: &'static str,
        on_delete: OnDelete,
    },
}

impl FieldKind {
    pub(crate) fn sql_type(self) -> &'static str {
        match self {
            Self::Text | Self::Reference { .. } => "TEXT",
            Self::Integer | Self::Bool | Self::Timestamp => "INTEGER",
            Self::Real => "REAL",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Integer => "integer",
            Self::Real => "real",
            Self::Bool => "bool",
            Self::Timestamp => "timestamp",
            Self::Reference { .. } => "reference",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Required fields must be present; required text must be non-blank.
    pub required: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self::new(name, FieldKind::Text)
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub const fn real(name: &'static str) -> Self {
        Self::new(name, FieldKind::Real)
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub const fn timestamp(name: &'static str) -> Self {
        Self::new(name, FieldKind::Timestamp)
    }

    pub const fn reference(name: &'static str, parent: &'static str, on_delete: OnDelete) -> Self {
        Self::new(name, FieldKind::Reference { parent, on_delete })
    }

    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }

    pub(crate) fn column_sql(&self) -> String {
        match self.kind {
            FieldKind::Reference { parent, on_delete } => format!(
                "\"{}\" TEXT REFERENCES \"{}\"(id) ON DELETE {} DEFERRABLE INITIALLY DEFERRED",
                self.name,
                parent,
                on_delete.as_sql()
            ),
            kind => format!("\"{}\" {}", self.name, kind.sql_type()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntitySchema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn references(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.fields
            .iter()
            .filter(|field| matches!(field.kind, FieldKind::Reference { .. }))
    }

    pub(crate) fn create_table_sql(&self) -> String {
        let mut columns = vec!["id TEXT PRIMARY KEY NOT NULL".to_string()];
        columns.extend(self.fields.iter().map(FieldDef::column_sql));
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n    {}\n);",
            self.name,
            columns.join(",\n    ")
        )
    }

    pub(crate) fn index_sql(&self) -> Vec<String> {
        self.references()
            .map(|field| {
                format!(
                    "CREATE INDEX IF NOT EXISTS \"idx_{0}_{1}\" ON \"{0}\"(\"{1}\");",
                    self.name, field.name
                )
            })
            .collect()
    }
}

/// Complete schema of one app store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    /// Stable store identity; a file created for one schema cannot be opened
    /// with another.
    pub name: &'static str,
    pub version: u32,
    pub entities: &'static [EntitySchema],
}

impl Schema {
    pub fn entity(&self, name: &str) -> Option<&'static EntitySchema> {
        self.entities.iter().find(|entity| entity.name == name)
    }

    /// Checks naming and relationship rules.
    ///
    /// Returns a human-readable description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if !IDENT_RE.is_match(self.name) {
            return Err(format!("invalid schema name `{}`", self.name));
        }
        if self.version == 0 {
            return Err("schema version must be >= 1".to_string());
        }
        if self.entities.is_empty() {
            return Err(format!("schema `{}` declares no entities", self.name));
        }

        let mut entity_names = HashSet::new();
        for entity in self.entities {
            if !IDENT_RE.is_match(entity.name) || entity.name.starts_with("sqlite_") {
                return Err(format!("invalid entity name `{}`", entity.name));
            }
            if entity.name == "store_meta" {
                return Err("entity name `store_meta` is reserved".to_string());
            }
            if !entity_names.insert(entity.name) {
                return Err(format!("duplicate entity `{}`", entity.name));
            }

            let mut field_names = HashSet::new();
            for field in entity.fields {
                if !IDENT_RE.is_match(field.name) || field.name == "id" {
                    return Err(format!("invalid field `{}.{}`", entity.name, field.name));
                }
                if !field_names.insert(field.name) {
                    return Err(format!("duplicate field `{}.{}`", entity.name, field.name));
                }
                if let FieldKind::Reference { parent, .. } = field.kind {
                    if self.entity(parent).is_none() {
                        return Err(format!(
                            "field `{}.{}` references unknown entity `{parent}`",
                            entity.name, field.name
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{EntitySchema, FieldDef, OnDelete, Schema};

    const FOLDER_FIELDS: &[FieldDef] = &[FieldDef::text("title").required()];
    const ITEM_FIELDS: &[FieldDef] = &[
        FieldDef::text("label").required(),
        FieldDef::boolean("done"),
        FieldDef::reference("folder_id", "folder", OnDelete::Cascade),
    ];
    const ENTITIES: &[EntitySchema] = &[
        EntitySchema {
            name: "folder",
            fields: FOLDER_FIELDS,
        },
        EntitySchema {
            name: "item",
            fields: ITEM_FIELDS,
        },
    ];
    const SCHEMA: Schema = Schema {
        name: "sample",
        version: 1,
        entities: ENTITIES,
    };

    #[test]
    fn valid_schema_passes_validation() {
        SCHEMA.validate().unwrap();
        assert!(SCHEMA.entity("item").is_some());
        assert!(SCHEMA.entity("missing").is_none());
    }

    #[test]
    fn required_builder_marks_field() {
        assert!(FOLDER_FIELDS[0].required);
        assert!(!ITEM_FIELDS[1].required);
    }

    #[test]
    fn reference_column_renders_foreign_key() {
        let ddl = SCHEMA.entity("item").unwrap().create_table_sql();
        assert!(ddl.contains("\"folder_id\" TEXT REFERENCES \"folder\"(id) ON DELETE CASCADE"));
        assert!(ddl.contains("DEFERRABLE INITIALLY DEFERRED"));
        assert!(ddl.contains("\"done\" INTEGER"));
    }

    #[test]
    fn reference_fields_get_an_index() {
        let indexes = SCHEMA.entity("item").unwrap().index_sql();
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].contains("idx_item_folder_id"));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        const BROKEN_FIELDS: &[FieldDef] =
            &[FieldDef::reference("owner_id", "owner", OnDelete::Nullify)];
        const BROKEN: Schema = Schema {
            name: "broken",
            version: 1,
            entities: &[EntitySchema {
                name: "thing",
                fields: BROKEN_FIELDS,
            }],
        };
        let message = BROKEN.validate().unwrap_err();
        assert!(message.contains("unknown entity `owner`"));
    }

    #[test]
    fn explicit_id_field_is_rejected() {
        const ID_FIELDS: &[FieldDef] = &[FieldDef::text("id")];
        const WITH_ID: Schema = Schema {
            name: "with_id",
            version: 1,
            entities: &[EntitySchema {
                name: "thing",
                fields: ID_FIELDS,
            }],
        };
        assert!(WITH_ID.validate().is_err());
    }
}
