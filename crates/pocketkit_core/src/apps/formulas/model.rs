use super::{CATEGORY, FORMULA};
use crate::model::{Record, RecordId};
use crate::projection::Filterable;
use crate::service::{Entity, OrderScope};
use crate::store::SortKey;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub id: RecordId,
    pub name: String,
    pub icon_name: String,
    pub color_hex: String,
    pub order_index: i64,
    /// Derived on read from the category's formulas.
    pub formulas_count: usize,
    pub learned_count: usize,
}

impl Category {
    /// Learned share in `[0, 1]`; `0` for an empty category.
    pub fn progress(&self) -> f64 {
        ratio(self.learned_count, self.formulas_count)
    }
}

impl Entity for Category {
    const NAME: &'static str = CATEGORY;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::asc("order_index")];
    const ORDER: Option<OrderScope> = Some(OrderScope {
        field: "order_index",
        scope: None,
    });

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            name: record.string("name"),
            icon_name: record.string("icon_name"),
            color_hex: record.string("color_hex"),
            order_index: record.integer("order_index").unwrap_or(0),
            formulas_count: 0,
            learned_count: 0,
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("name", self.name.as_str())
            .set("icon_name", self.icon_name.as_str())
            .set("color_hex", self.color_hex.as_str())
            .set("order_index", self.order_index);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    pub id: RecordId,
    pub name: String,
    pub formula_text: String,
    pub description_text: String,
    pub variables: Vec<String>,
    pub is_learned: bool,
    pub order_index: i64,
    pub created_at: Option<DateTime<Utc>>,
    pub last_viewed_at: Option<DateTime<Utc>>,
    pub category_id: Option<RecordId>,
}

impl Entity for Formula {
    const NAME: &'static str = FORMULA;
    const NATURAL_SORT: &'static [SortKey] = &[SortKey::asc("order_index")];
    const SEARCH_FIELDS: &'static [&'static str] = &["name", "formula_text", "description_text"];
    const SEARCH_SORT: &'static [SortKey] = &[SortKey::asc("name")];
    const ORDER: Option<OrderScope> = Some(OrderScope {
        field: "order_index",
        scope: Some("category_id"),
    });

    fn from_record(record: &Record) -> Self {
        Self {
            id: record.id(),
            name: record.string("name"),
            formula_text: record.string("formula_text"),
            description_text: record.string("description_text"),
            variables: split_variables(record.text("variables").unwrap_or_default()),
            is_learned: record.flag("is_learned"),
            order_index: record.integer("order_index").unwrap_or(0),
            created_at: record.timestamp("created_at"),
            last_viewed_at: record.timestamp("last_viewed_at"),
            category_id: record.reference("category_id"),
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn apply_to(&self, record: &mut Record) {
        record
            .set("name", self.name.as_str())
            .set("formula_text", self.formula_text.as_str())
            .set("description_text", self.description_text.as_str())
            .set("variables", join_variables(&self.variables))
            .set("is_learned", self.is_learned)
            .set("order_index", self.order_index);
    }
}

impl Filterable for Formula {
    type Category = RecordId;

    fn flag(&self) -> bool {
        self.is_learned
    }

    fn category(&self) -> Option<&RecordId> {
        self.category_id.as_ref()
    }

    fn text_fields(&self) -> Vec<&str> {
        vec![
            self.name.as_str(),
            self.formula_text.as_str(),
            self.description_text.as_str(),
        ]
    }
}

/// Input for [`super::FormulaService::create`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewFormula {
    pub name: String,
    pub formula_text: String,
    pub description_text: String,
    pub variables: Vec<String>,
    pub category_id: RecordId,
}

impl NewFormula {
    pub(super) fn into_record(self, created_at: DateTime<Utc>) -> Record {
        Record::new(FORMULA)
            .with("name", self.name)
            .with("formula_text", self.formula_text)
            .with("description_text", self.description_text)
            .with("variables", join_variables(&self.variables))
            .with("is_learned", false)
            .with("created_at", created_at)
            .with("category_id", self.category_id)
    }
}

pub(super) fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    part as f64 / total as f64
}

fn join_variables(variables: &[String]) -> String {
    variables.join(",")
}

fn split_variables(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}
