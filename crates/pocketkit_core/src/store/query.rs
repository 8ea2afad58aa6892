//! Predicate/sort query model and its SQL rendering.
//!
//! # Invariants
//! - Field names are checked against the entity schema before any SQL is built.
//! - Every query ends with an `id ASC` tiebreak so result order is total.
//! - `ContainsCi` only targets text fields.

use super::{StoreError, StoreResult};
use crate::model::Value;
use crate::schema::{EntitySchema, FieldKind};
use rusqlite::types::Value as SqlValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: &'static str,
    pub direction: Direction,
}

impl SortKey {
    pub const fn asc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub const fn desc(field: &'static str) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    /// `Eq(Value::Null)` matches absent values.
    Eq(Value),
    ContainsCi(String),
    Gt(Value),
    Lt(Value),
    /// Inclusive lower bound.
    Ge(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: &'static str,
    pub comparison: Comparison,
}

impl Condition {
    pub fn eq(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            comparison: Comparison::Eq(value.into()),
        }
    }

    pub fn contains_ci(field: &'static str, needle: impl Into<String>) -> Self {
        Self {
            field,
            comparison: Comparison::ContainsCi(needle.into()),
        }
    }

    pub fn gt(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            comparison: Comparison::Gt(value.into()),
        }
    }

    pub fn ge(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            comparison: Comparison::Ge(value.into()),
        }
    }

    pub fn lt(field: &'static str, value: impl Into<Value>) -> Self {
        Self {
            field,
            comparison: Comparison::Lt(value.into()),
        }
    }
}

/// Records matching every `all` condition and, when `any` is non-empty, at
/// least one `any` condition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub all: Vec<Condition>,
    pub any: Vec<Condition>,
    pub sort: Vec<SortKey>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, condition: Condition) -> Self {
        self.all.push(condition);
        self
    }

    pub fn or_filter(mut self, condition: Condition) -> Self {
        self.any.push(condition);
        self
    }

    pub fn sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn sorted_by(mut self, keys: &[SortKey]) -> Self {
        self.sort.extend_from_slice(keys);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

pub(crate) fn select_columns(entity: &EntitySchema) -> String {
    let mut columns = vec!["id".to_string()];
    columns.extend(entity.fields.iter().map(|field| format!("\"{}\"", field.name)));
    columns.join(", ")
}

pub(crate) fn build_select(
    entity: &EntitySchema,
    query: &Query,
) -> StoreResult<(String, Vec<SqlValue>)> {
    let mut binds = Vec::new();
    let mut sql = format!(
        "SELECT {} FROM \"{}\"{}",
        select_columns(entity),
        entity.name,
        where_clause(entity, query, &mut binds)?
    );

    sql.push_str(" ORDER BY ");
    for key in &query.sort {
        column_kind(entity, key.field)?;
        sql.push_str(&format!(
            "\"{}\" {}, ",
            key.field,
            match key.direction {
                Direction::Asc => "ASC",
                Direction::Desc => "DESC",
            }
        ));
    }
    sql.push_str("id ASC");

    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        binds.push(SqlValue::Integer(i64::from(limit)));
    }

    Ok((sql, binds))
}

pub(crate) fn build_count(
    entity: &EntitySchema,
    query: &Query,
) -> StoreResult<(String, Vec<SqlValue>)> {
    let mut binds = Vec::new();
    let sql = format!(
        "SELECT COUNT(*) FROM \"{}\"{}",
        entity.name,
        where_clause(entity, query, &mut binds)?
    );
    Ok((sql, binds))
}

pub(crate) fn build_next_index(
    entity: &EntitySchema,
    field: &'static str,
    query: &Query,
) -> StoreResult<(String, Vec<SqlValue>)> {
    if column_kind(entity, field)? != Some(FieldKind::Integer) {
        return Err(StoreError::TypeMismatch {
            entity: entity.name.to_string(),
            field: field.to_string(),
            expected: FieldKind::Integer.name(),
        });
    }
    let mut binds = Vec::new();
    let sql = format!(
        "SELECT COALESCE(MAX(\"{field}\"), -1) + 1 FROM \"{}\"{}",
        entity.name,
        where_clause(entity, query, &mut binds)?
    );
    Ok((sql, binds))
}

fn where_clause(
    entity: &EntitySchema,
    query: &Query,
    binds: &mut Vec<SqlValue>,
) -> StoreResult<String> {
    let mut clauses = Vec::new();
    for condition in &query.all {
        clauses.push(condition_sql(entity, condition, binds)?);
    }
    if !query.any.is_empty() {
        let mut alternatives = Vec::new();
        for condition in &query.any {
            alternatives.push(condition_sql(entity, condition, binds)?);
        }
        clauses.push(format!("({})", alternatives.join(" OR ")));
    }

    if clauses.is_empty() {
        Ok(String::new())
    } else {
        Ok(format!(" WHERE {}", clauses.join(" AND ")))
    }
}

fn condition_sql(
    entity: &EntitySchema,
    condition: &Condition,
    binds: &mut Vec<SqlValue>,
) -> StoreResult<String> {
    let kind = column_kind(entity, condition.field)?;
    let column = format!("\"{}\"", condition.field);

    let (operator, value) = match &condition.comparison {
        Comparison::Eq(Value::Null) => return Ok(format!("{column} IS NULL")),
        Comparison::ContainsCi(needle) => {
            if kind != Some(FieldKind::Text) {
                return Err(type_mismatch(entity, condition.field, "text"));
            }
            binds.push(SqlValue::Text(needle.clone()));
            return Ok(format!("contains_ci({column}, ?)"));
        }
        Comparison::Eq(value) => ("=", value),
        Comparison::Gt(value) => (">", value),
        Comparison::Ge(value) => (">=", value),
        Comparison::Lt(value) => ("<", value),
    };

    check_fits(entity, condition.field, kind, value)?;
    binds.push(value.to_sql());
    Ok(format!("{column} {operator} ?"))
}

/// Kind of `field`, `None` for the implicit `id` column.
fn column_kind(entity: &EntitySchema, field: &str) -> StoreResult<Option<FieldKind>> {
    if field == "id" {
        return Ok(None);
    }
    entity
        .field(field)
        .map(|def| Some(def.kind))
        .ok_or_else(|| StoreError::UnknownField {
            entity: entity.name.to_string(),
            field: field.to_string(),
        })
}

fn check_fits(
    entity: &EntitySchema,
    field: &str,
    kind: Option<FieldKind>,
    value: &Value,
) -> StoreResult<()> {
    let fits = match kind {
        Some(kind) => value.fits(kind),
        None => matches!(value, Value::Id(_)),
    };
    if fits {
        Ok(())
    } else {
        Err(type_mismatch(
            entity,
            field,
            kind.map_or("reference", FieldKind::name),
        ))
    }
}

fn type_mismatch(entity: &EntitySchema, field: &str, expected: &'static str) -> StoreError {
    StoreError::TypeMismatch {
        entity: entity.name.to_string(),
        field: field.to_string(),
        expected,
    }
}
