use super::model::{Animal, AnimalCategory};
use super::service::AnimalService;
use crate::model::RecordId;
use crate::projection::{FlagFilter, LiveProjection, ProjectionFilter};
use crate::service::{ServiceResult, WriteOutcome};
use std::sync::Arc;

/// Browsable animal list with favorites, category and text filters.
pub struct EncyclopediaViewModel {
    service: AnimalService,
    animals: LiveProjection<Vec<Animal>>,
    filter: ProjectionFilter<AnimalCategory>,
}

impl EncyclopediaViewModel {
    pub fn new(service: AnimalService) -> Self {
        let loader = service.clone();
        let animals = LiveProjection::new(service.store(), move || loader.fetch_all());
        Self {
            service,
            animals,
            filter: ProjectionFilter::default(),
        }
    }

    pub fn animals(&self) -> Arc<Vec<Animal>> {
        self.animals.snapshot()
    }

    pub fn filtered(&self) -> Vec<Animal> {
        self.filter.apply(self.animals.snapshot().as_slice())
    }

    pub fn filter(&self) -> &ProjectionFilter<AnimalCategory> {
        &self.filter
    }

    pub fn select_category(&mut self, category: Option<AnimalCategory>) {
        self.filter.category = category;
    }

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.filter.text = text.into();
    }

    pub fn favorites_only(&self) -> bool {
        self.filter.flag == FlagFilter::Only
    }

    pub fn toggle_favorites_only(&mut self) {
        self.filter.flag = if self.favorites_only() {
            FlagFilter::All
        } else {
            FlagFilter::Only
        };
    }

    pub fn toggle_favorite(&self, id: RecordId) -> ServiceResult<WriteOutcome> {
        let outcome = self.service.toggle_favorite(id)?;
        self.animals.reload();
        Ok(outcome)
    }

    pub fn reload(&self) {
        self.animals.reload();
    }
}
