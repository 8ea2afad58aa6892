//! Pure client-side filtering of view-model snapshots.
//!
//! Filters apply in a fixed order: flag, category, then free text. The
//! input slice is never modified.

/// Tri-state filter over one boolean flag (favorite, learned, completed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlagFilter {
    #[default]
    All,
    Only,
    Exclude,
}

impl FlagFilter {
    pub fn admits(self, flag: bool) -> bool {
        match self {
            Self::All => true,
            Self::Only => flag,
            Self::Exclude => !flag,
        }
    }
}

/// Model that can be narrowed by a [`ProjectionFilter`].
pub trait Filterable {
    type Category: PartialEq;

    fn flag(&self) -> bool;

    fn category(&self) -> Option<&Self::Category>;

    /// Fields matched by the free-text filter.
    fn text_fields(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionFilter<C> {
    pub flag: FlagFilter,
    pub category: Option<C>,
    /// Case-insensitive substring; empty disables the text filter.
    pub text: String,
}

impl<C> Default for ProjectionFilter<C> {
    fn default() -> Self {
        Self {
            flag: FlagFilter::All,
            category: None,
            text: String::new(),
        }
    }
}

impl<C: PartialEq> ProjectionFilter<C> {
    pub fn is_active(&self) -> bool {
        self.flag != FlagFilter::All || self.category.is_some() || !self.text.is_empty()
    }

    pub fn matches<T>(&self, item: &T) -> bool
    where
        T: Filterable<Category = C>,
    {
        if !self.flag.admits(item.flag()) {
            return false;
        }
        if let Some(category) = &self.category {
            if item.category() != Some(category) {
                return false;
            }
        }
        if self.text.is_empty() {
            return true;
        }
        let needle = self.text.to_lowercase();
        item.text_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&needle))
    }

    pub fn apply<T>(&self, items: &[T]) -> Vec<T>
    where
        T: Filterable<Category = C> + Clone,
    {
        items
            .iter()
            .filter(|item| self.matches(*item))
            .cloned()
            .collect()
    }
}
