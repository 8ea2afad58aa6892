use super::model::{ratio, Category, Formula};
use super::service::{CategoryService, FormulaService, FormulaTotals};
use crate::model::RecordId;
use crate::notify::Subscription;
use crate::projection::{DebouncedSearch, LiveProjection, ProjectionFilter};
use crate::service::{ServiceResult, WriteOutcome};
use std::sync::Arc;

/// Category list with overall learning progress.
pub struct MainViewModel {
    service: CategoryService,
    categories: LiveProjection<Vec<Category>>,
}

impl MainViewModel {
    pub fn new(service: CategoryService) -> Self {
        let loader = service.clone();
        let categories =
            LiveProjection::new(service.store(), move || loader.fetch_categories());
        Self {
            service,
            categories,
        }
    }

    pub fn categories(&self) -> Arc<Vec<Category>> {
        self.categories.snapshot()
    }

    pub fn totals(&self) -> FormulaTotals {
        FormulaTotals::of(self.categories.snapshot().as_slice())
    }

    pub fn overall_progress(&self) -> f64 {
        self.totals().progress()
    }

    pub fn delete_category(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.service.delete(id)?;
        self.categories.reload();
        Ok(outcome)
    }

    pub fn reload(&self) {
        self.categories.reload();
    }
}

/// One category's formulas with a text filter.
pub struct CategoryDetailViewModel {
    category: Category,
    service: FormulaService,
    formulas: LiveProjection<Vec<Formula>>,
    filter: ProjectionFilter<RecordId>,
}

impl CategoryDetailViewModel {
    pub fn new(category: Category, service: FormulaService) -> Self {
        let loader = service.clone();
        let category_id = category.id;
        let formulas = LiveProjection::new(service.store(), move || {
            loader.fetch_formulas(category_id)
        });
        Self {
            category,
            service,
            formulas,
            filter: ProjectionFilter::default(),
        }
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn formulas(&self) -> Arc<Vec<Formula>> {
        self.formulas.snapshot()
    }

    pub fn filtered(&self) -> Vec<Formula> {
        self.filter.apply(self.formulas.snapshot().as_slice())
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.filter.text = text.into();
    }

    pub fn learned_count(&self) -> usize {
        self.formulas
            .snapshot()
            .iter()
            .filter(|formula| formula.is_learned)
            .count()
    }

    pub fn progress(&self) -> f64 {
        ratio(self.learned_count(), self.formulas.snapshot().len())
    }

    pub fn toggle_learned(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.service.toggle_learned(id)?;
        self.formulas.reload();
        Ok(outcome)
    }

    pub fn mark_viewed(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        self.service.mark_viewed(id)
    }

    pub fn reload(&self) {
        self.formulas.reload();
    }
}

/// Search-as-you-type across all formulas.
///
/// Store changes rerun the current query so results stay current.
pub struct SearchViewModel {
    search: Arc<DebouncedSearch<Formula>>,
    _subscription: Subscription,
}

impl SearchViewModel {
    pub fn new(service: FormulaService) -> std::io::Result<Self> {
        let store = service.store().clone();
        let search = Arc::new(DebouncedSearch::new(
            store.config().search_delay(),
            move |text| service.search(text),
        )?);

        let weak = Arc::downgrade(&search);
        let subscription = store.subscribe(move || {
            if let Some(search) = weak.upgrade() {
                search.refresh();
            }
        });

        Ok(Self {
            search,
            _subscription: subscription,
        })
    }

    pub fn set_query(&self, text: impl Into<String>) {
        self.search.set_query(text);
    }

    pub fn clear(&self) {
        self.search.clear();
    }

    pub fn query(&self) -> String {
        self.search.query()
    }

    pub fn results(&self) -> Arc<Vec<Formula>> {
        self.search.results()
    }

    pub fn executed_searches(&self) -> u64 {
        self.search.executed_searches()
    }
}
