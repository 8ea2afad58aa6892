//! Formula reference: categories of formulas with learning progress.

mod model;
mod seed;
mod service;
mod view_model;

pub use model::{Category, Formula, NewFormula};
pub use service::{CategoryService, FormulaService, FormulaTotals};
pub use view_model::{CategoryDetailViewModel, MainViewModel, SearchViewModel};

use super::{open_store, seed_detached, StoreLocation};
use crate::clock::{Clock, SystemClock};
use crate::config::StoreConfig;
use crate::schema::{EntitySchema, FieldDef, OnDelete, Schema};
use crate::store::{Store, StoreResult};
use std::path::Path;
use std::sync::Arc;

pub const CATEGORY: &str = "category";
pub const FORMULA: &str = "formula";

pub static SCHEMA: Schema = Schema {
    name: "formulas",
    version: 1,
    entities: &[
        EntitySchema {
            name: CATEGORY,
            fields: &[
                FieldDef::text("name").required(),
                FieldDef::text("icon_name"),
                FieldDef::text("color_hex"),
                FieldDef::integer("order_index"),
            ],
        },
        EntitySchema {
            name: FORMULA,
            fields: &[
                FieldDef::text("name").required(),
                FieldDef::text("formula_text").required(),
                FieldDef::text("description_text"),
                FieldDef::text("variables"),
                FieldDef::boolean("is_learned"),
                FieldDef::integer("order_index"),
                FieldDef::timestamp("created_at"),
                FieldDef::timestamp("last_viewed_at"),
                FieldDef::reference("category_id", CATEGORY, OnDelete::Nullify),
            ],
        },
    ],
};

pub struct FormulasApp {
    store: Store,
    categories: CategoryService,
    formulas: FormulaService,
}

impl FormulasApp {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Self::open_with(
            StoreLocation::File(path.as_ref()),
            StoreConfig::default(),
            Arc::new(SystemClock),
        )
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::open_with(StoreLocation::Memory, StoreConfig::default(), Arc::new(SystemClock))
    }

    /// Opens the store and seeds the default categories when it is empty.
    pub fn open_with(
        location: StoreLocation<'_>,
        config: StoreConfig,
        clock: Arc<dyn Clock>,
    ) -> StoreResult<Self> {
        let store = open_store(&SCHEMA, location, config)?;
        let seed_clock = Arc::clone(&clock);
        seed_detached(&store, SCHEMA.name, move |worker| {
            seed::seed_if_empty(worker, seed_clock)
        });

        Ok(Self {
            categories: CategoryService::new(store.clone()),
            formulas: FormulaService::new(store.clone(), clock),
            store,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn categories(&self) -> &CategoryService {
        &self.categories
    }

    pub fn formulas(&self) -> &FormulaService {
        &self.formulas
    }

    pub fn main(&self) -> MainViewModel {
        MainViewModel::new(self.categories.clone())
    }

    pub fn category_detail(&self, category: Category) -> CategoryDetailViewModel {
        CategoryDetailViewModel::new(category, self.formulas.clone())
    }

    pub fn search(&self) -> std::io::Result<SearchViewModel> {
        SearchViewModel::new(self.formulas.clone())
    }
}
