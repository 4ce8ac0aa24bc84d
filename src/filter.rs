// Filter state: disabled categories, year threshold, and historic mode.
// All transitions are pure set operations and cannot fail.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::types::{Category, Record};

/// Session-scoped filter state. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterState {
    /// Every category the filter UI offers, in display order. Solo disables
    /// all of these except the target.
    #[serde(skip)]
    universe: Vec<Category>,
    disabled_categories: BTreeSet<Category>,
    current_year: i32,
    historic_mode: bool,
}

impl FilterState {
    pub fn new(universe: Vec<Category>, current_year: i32) -> Self {
        FilterState {
            universe,
            disabled_categories: BTreeSet::new(),
            current_year,
            historic_mode: false,
        }
    }

    pub fn disabled_categories(&self) -> &BTreeSet<Category> {
        &self.disabled_categories
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    pub fn historic_mode(&self) -> bool {
        self.historic_mode
    }

    pub fn is_disabled(&self, category: &str) -> bool {
        self.disabled_categories.contains(category)
    }

    /// Flip one category between shown and hidden.
    pub fn toggle_category(&mut self, category: &Category) {
        if !self.disabled_categories.remove(category) {
            self.disabled_categories.insert(category.clone());
        }
    }

    /// `category` is shown and every other category is hidden.
    pub fn is_soloed(&self, category: &str) -> bool {
        !self.is_disabled(category)
            && self
                .universe
                .iter()
                .filter(|c| c.as_str() != category)
                .all(|c| self.is_disabled(c.as_str()))
    }

    /// Show only `category`. Soloing the category that is already soloed
    /// shows everything again.
    pub fn solo_category(&mut self, category: &Category) {
        if self.is_soloed(category.as_str()) {
            self.disabled_categories.clear();
        } else {
            self.disabled_categories = self
                .universe
                .iter()
                .filter(|c| *c != category)
                .cloned()
                .collect();
        }
    }

    pub fn reset_categories(&mut self) {
        self.disabled_categories.clear();
    }

    pub fn set_year(&mut self, year: i32) {
        self.current_year = year;
    }

    pub fn set_historic_mode(&mut self, on: bool) {
        self.historic_mode = on;
    }

    /// At least one of the record's categories is enabled.
    pub fn category_visible(&self, record: &Record) -> bool {
        record
            .categories
            .iter()
            .any(|c| !self.disabled_categories.contains(c))
    }

    pub fn year_visible(&self, record: &Record) -> bool {
        record.resolved_year <= self.current_year
    }

    pub fn is_eligible(&self, record: &Record) -> bool {
        !self.historic_mode && self.category_visible(record) && self.year_visible(record)
    }
}

/// Records eligible for display under `filters`, in dataset order.
pub fn compute_eligible<'a>(records: &'a [Record], filters: &FilterState) -> Vec<&'a Record> {
    if filters.historic_mode() {
        return Vec::new();
    }
    records.iter().filter(|r| filters.is_eligible(r)).collect()
}
