// Category normalization and the category palette (color + icon per category).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::CategoryStyle;
use crate::types::{Category, Record};

pub const FALLBACK_COLOR: &str = "#333";
pub const FALLBACK_ICON: &str = "fa-location-dot";

/// Collapse the two authored shapes (`categories: [...]` or `category: "..."`)
/// into one ordered list. The list form wins when both are present.
///
/// An empty result means the record has no category at all; the store rejects
/// such records.
pub fn normalize_categories(multi: Option<Vec<String>>, single: Option<String>) -> Vec<Category> {
    match (multi, single) {
        (Some(list), _) => list
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .map(Category::new)
            .collect(),
        (None, Some(one)) if !one.trim().is_empty() => vec![Category::new(one.trim())],
        _ => Vec::new(),
    }
}

/// Marker appearance derived from a record's categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub color: String,
    pub icon: String,
    /// Ring color for multi-category sites (color of the second category).
    pub ring_color: Option<String>,
}

/// Lookup tables category -> color and category -> icon, plus display order.
#[derive(Debug, Clone)]
pub struct Palette {
    order: Vec<Category>,
    styles: HashMap<Category, CategoryStyle>,
}

impl Palette {
    pub fn new(styles: &[CategoryStyle]) -> Self {
        Palette {
            order: styles.iter().map(|s| s.name.clone()).collect(),
            styles: styles.iter().map(|s| (s.name.clone(), s.clone())).collect(),
        }
    }

    /// Every configured category, in display order.
    pub fn categories(&self) -> &[Category] {
        &self.order
    }

    pub fn color_of(&self, category: &str) -> &str {
        self.styles
            .get(category)
            .map(|s| s.color.as_str())
            .unwrap_or(FALLBACK_COLOR)
    }

    pub fn icon_of(&self, category: &str) -> &str {
        self.styles
            .get(category)
            .map(|s| s.icon.as_str())
            .unwrap_or(FALLBACK_ICON)
    }

    pub fn marker_style(&self, record: &Record) -> MarkerStyle {
        let primary = record.primary_category().as_str();
        MarkerStyle {
            color: self.color_of(primary).to_string(),
            icon: self.icon_of(primary).to_string(),
            ring_color: record
                .secondary_category()
                .map(|c| self.color_of(c.as_str()).to_string()),
        }
    }
}
