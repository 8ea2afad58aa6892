use super::model::{ratio, Category, Formula, NewFormula};
use crate::apps::check_color_hex;
use crate::clock::Clock;
use crate::model::{Record, RecordId};
use crate::service::{staged_unit, Entity, EntityService, ServiceResult, WriteOutcome};
use crate::store::{Condition, Query, Store};
use log::info;
use std::collections::HashMap;
use std::sync::Arc;

/// Categories with their derived formula counts.
#[derive(Clone)]
pub struct CategoryService {
    categories: EntityService<Category>,
    formulas: EntityService<Formula>,
}

impl CategoryService {
    pub fn new(store: Store) -> Self {
        Self {
            categories: EntityService::new(store.clone()),
            formulas: EntityService::new(store),
        }
    }

    pub fn store(&self) -> &Store {
        self.categories.store()
    }

    /// Categories by `order_index` with formula and learned counts filled in.
    pub fn fetch_categories(&self) -> Vec<Category> {
        let mut counts: HashMap<RecordId, (usize, usize)> = HashMap::new();
        for formula in self.formulas.fetch(&Query::new()) {
            if let Some(category_id) = formula.category_id {
                let entry = counts.entry(category_id).or_default();
                entry.0 += 1;
                entry.1 += usize::from(formula.is_learned);
            }
        }

        let mut categories = self.categories.fetch_all();
        for category in &mut categories {
            let (total, learned) = counts.get(&category.id).copied().unwrap_or_default();
            category.formulas_count = total;
            category.learned_count = learned;
        }
        categories
    }

    pub fn get(&self, id: RecordId) -> Option<Category> {
        self.fetch_categories()
            .into_iter()
            .find(|category| category.id == id)
    }

    /// Appends a category after the existing ones.
    pub fn create(&self, name: &str, icon_name: &str, color_hex: &str) -> ServiceResult<Category> {
        check_color_hex("color_hex", color_hex)?;
        let record = Record::new(Category::NAME)
            .with("name", name)
            .with("icon_name", icon_name)
            .with("color_hex", color_hex);
        self.categories.create(record)
    }

    pub fn update(&self, category: &Category) -> ServiceResult<WriteOutcome> {
        check_color_hex("color_hex", &category.color_hex)?;
        self.categories.update(category)
    }

    /// Deletes the category; its formulas stay, uncategorized, appended
    /// after the formulas already without a category.
    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let (outcome, released) = staged_unit(self.store(), || {
            let released = self.formulas.stage_release_scope(id)?;
            Ok((self.categories.stage_delete(id)?, released))
        })?;
        if outcome.is_applied() {
            self.store().commit()?;
            info!(
                "event=category_delete module=apps status=ok id={} released_formulas={}",
                id, released
            );
        }
        Ok(outcome)
    }
}

#[derive(Clone)]
pub struct FormulaService {
    formulas: EntityService<Formula>,
    clock: Arc<dyn Clock>,
}

impl FormulaService {
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            formulas: EntityService::new(store),
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        self.formulas.store()
    }

    /// Formulas of one category by `order_index`.
    pub fn fetch_formulas(&self, category_id: RecordId) -> Vec<Formula> {
        self.formulas
            .fetch_where([Condition::eq("category_id", category_id)])
    }

    pub fn fetch_all(&self) -> Vec<Formula> {
        self.formulas.fetch_all()
    }

    pub fn get(&self, id: RecordId) -> Option<Formula> {
        self.formulas.get(id)
    }

    /// Appends a formula to its category, unlearned.
    ///
    /// # Errors
    /// - `Validation` when name or formula text is blank or the category
    ///   does not exist.
    pub fn create(&self, formula: NewFormula) -> ServiceResult<Formula> {
        self.formulas.create(formula.into_record(self.clock.now()))
    }

    pub fn update(&self, formula: &Formula) -> ServiceResult<WriteOutcome> {
        self.formulas.update(formula)
    }

    pub fn delete(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        self.formulas.delete(id)
    }

    pub fn toggle_learned(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.formulas.toggle(id, "is_learned")?;
        info!(
            "event=formula_toggle_learned module=apps status=ok id={} outcome={:?}",
            id, outcome
        );
        Ok(outcome)
    }

    pub fn mark_viewed(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let now = self.clock.now();
        self.formulas.modify(id, |record| {
            record.set("last_viewed_at", now);
        })
    }

    /// Name, formula text or description containing `text`, sorted by name.
    pub fn search(&self, text: &str) -> Vec<Formula> {
        self.formulas.search(text)
    }
}

/// Totals across every category.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FormulaTotals {
    pub formulas: usize,
    pub learned: usize,
}

impl FormulaTotals {
    pub fn of(categories: &[Category]) -> Self {
        categories.iter().fold(Self::default(), |totals, category| Self {
            formulas: totals.formulas + category.formulas_count,
            learned: totals.learned + category.learned_count,
        })
    }

    pub fn progress(&self) -> f64 {
        ratio(self.learned, self.formulas)
    }
}
