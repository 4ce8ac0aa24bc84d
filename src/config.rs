// Engine configuration passed from JS, with precinct defaults.

use serde::{Deserialize, Serialize};

use crate::error::MapError;
use crate::types::{Bounds, Category, LngLat, Theme};

/// Color and icon for one category. Order of the list is the display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryStyle {
    pub name: Category,
    pub color: String,
    pub icon: String,
}

impl CategoryStyle {
    fn new(name: &str, color: &str, icon: &str) -> Self {
        CategoryStyle {
            name: Category::new(name),
            color: color.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// Clustering source settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterSettings {
    /// Aggregation radius in screen pixels.
    #[serde(default = "default_cluster_radius")]
    pub radius: u32,
    /// Zoom above which points are no longer aggregated. Also the threshold
    /// at which individual markers replace cluster circles.
    #[serde(default = "default_cluster_max_zoom")]
    pub max_zoom: f64,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        ClusterSettings {
            radius: default_cluster_radius(),
            max_zoom: default_cluster_max_zoom(),
        }
    }
}

/// The 1883 survey map draped over the precinct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricOverlay {
    pub image_url: String,
    /// Top-left, top-right, bottom-right, bottom-left.
    pub corners: [LngLat; 4],
    pub bounds: Bounds,
}

impl Default for HistoricOverlay {
    fn default() -> Self {
        HistoricOverlay {
            image_url: "images/fort-1883.jpg".to_string(),
            corners: [
                LngLat::new(72.8228, 18.9435),
                LngLat::new(72.8492, 18.9435),
                LngLat::new(72.8492, 18.9235),
                LngLat::new(72.8228, 18.9235),
            ],
            bounds: Bounds::new(72.8228, 18.9235, 72.8492, 18.9435),
        }
    }
}

/// Trace of the demolished fort ramparts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FortWall {
    pub coordinates: Vec<LngLat>,
    pub bounds: Bounds,
}

impl Default for FortWall {
    fn default() -> Self {
        FortWall {
            coordinates: vec![
                LngLat::new(72.8312, 18.9278),
                LngLat::new(72.8318, 18.9276),
                LngLat::new(72.8325, 18.9273),
                LngLat::new(72.8335, 18.9268),
                LngLat::new(72.8342, 18.9265),
            ],
            bounds: Bounds::new(72.8312, 18.9265, 72.8342, 18.9278),
        }
    }
}

/// Map configuration. Every field has a default, so `{}` is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    #[serde(default = "default_light_style")]
    pub light_style: String,
    #[serde(default = "default_dark_style")]
    pub dark_style: String,
    #[serde(default = "default_start_center")]
    pub start_center: LngLat,
    #[serde(default = "default_initial_zoom")]
    pub initial_zoom: f64,
    #[serde(default = "default_min_zoom")]
    pub min_zoom: f64,
    #[serde(default = "default_max_bounds")]
    pub max_bounds: Bounds,
    #[serde(default = "default_pitch")]
    pub default_pitch: f64,
    #[serde(default = "default_bearing")]
    pub default_bearing: f64,
    /// Viewports at or below this width (CSS px) use the mobile layout.
    #[serde(default = "default_mobile_breakpoint")]
    pub mobile_breakpoint: u32,
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryStyle>,
    #[serde(default)]
    pub cluster: ClusterSettings,
    #[serde(default)]
    pub historic_overlay: HistoricOverlay,
    #[serde(default)]
    pub fort_wall: FortWall,
    /// Upper end of the time slider; also the year of undated records.
    #[serde(default = "default_max_year")]
    pub max_year: i32,
    /// Lower end of the time slider when the dataset has no dated records.
    #[serde(default = "default_fallback_min_year")]
    pub fallback_min_year: i32,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            light_style: default_light_style(),
            dark_style: default_dark_style(),
            start_center: default_start_center(),
            initial_zoom: default_initial_zoom(),
            min_zoom: default_min_zoom(),
            max_bounds: default_max_bounds(),
            default_pitch: default_pitch(),
            default_bearing: default_bearing(),
            mobile_breakpoint: default_mobile_breakpoint(),
            categories: default_categories(),
            cluster: ClusterSettings::default(),
            historic_overlay: HistoricOverlay::default(),
            fort_wall: FortWall::default(),
            max_year: default_max_year(),
            fallback_min_year: default_fallback_min_year(),
        }
    }
}

impl MapConfig {
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let config: MapConfig = serde_json::from_str(json)
            .map_err(|e| MapError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), MapError> {
        if self.categories.is_empty() {
            return Err(MapError::InvalidConfig(
                "at least one category is required".to_string(),
            ));
        }
        for (i, style) in self.categories.iter().enumerate() {
            if self.categories[..i].iter().any(|s| s.name == style.name) {
                return Err(MapError::InvalidConfig(format!(
                    "category '{}' is listed twice",
                    style.name
                )));
            }
        }
        if self.cluster.radius == 0 {
            return Err(MapError::InvalidConfig(
                "cluster radius must be positive".to_string(),
            ));
        }
        if self.min_zoom > self.initial_zoom {
            return Err(MapError::InvalidConfig(format!(
                "min_zoom {} exceeds initial_zoom {}",
                self.min_zoom, self.initial_zoom
            )));
        }
        if !self.max_bounds.contains(self.start_center) {
            return Err(MapError::InvalidConfig(format!(
                "start_center {:?} lies outside max_bounds",
                self.start_center
            )));
        }
        if self.fallback_min_year > self.max_year {
            return Err(MapError::InvalidConfig(format!(
                "fallback_min_year {} exceeds max_year {}",
                self.fallback_min_year, self.max_year
            )));
        }
        Ok(())
    }

    pub fn style_url(&self, theme: Theme) -> &str {
        match theme {
            Theme::Light => &self.light_style,
            Theme::Dark => &self.dark_style,
        }
    }

    pub fn is_mobile(&self, viewport_width: u32) -> bool {
        viewport_width <= self.mobile_breakpoint
    }

    /// Zoom at which individual markers replace cluster circles.
    pub fn cluster_zoom_threshold(&self) -> f64 {
        self.cluster.max_zoom
    }
}

fn default_light_style() -> String {
    "https://api.maptiler.com/maps/019b6fe6-78c4-7dcb-b6eb-fed1b18171df/style.json".to_string()
}

fn default_dark_style() -> String {
    "https://api.maptiler.com/maps/019b9cbc-2b55-70b4-b89b-4b390bcfb112/style.json".to_string()
}

fn default_start_center() -> LngLat {
    LngLat::new(72.8322, 18.9270)
}

fn default_initial_zoom() -> f64 {
    16.5
}

fn default_min_zoom() -> f64 {
    14.5
}

fn default_max_bounds() -> Bounds {
    Bounds::new(72.8100, 18.9100, 72.8500, 18.9450)
}

fn default_pitch() -> f64 {
    45.0
}

fn default_bearing() -> f64 {
    -15.0
}

fn default_mobile_breakpoint() -> u32 {
    768
}

fn default_cluster_radius() -> u32 {
    50
}

fn default_cluster_max_zoom() -> f64 {
    16.0
}

fn default_max_year() -> i32 {
    2025
}

fn default_fallback_min_year() -> i32 {
    1850
}

fn default_categories() -> Vec<CategoryStyle> {
    vec![
        CategoryStyle::new("Art Deco", "#2a9d8f", "fa-building"),
        CategoryStyle::new("Victorian", "#e76f51", "fa-landmark"),
        CategoryStyle::new("Modern", "#00cec9", "fa-square"),
        CategoryStyle::new("Indo-Saracenic", "#b33939", "fa-gopuram"),
        CategoryStyle::new("Neoclassical", "#8e44ad", "fa-columns"),
        CategoryStyle::new("Public Space", "#27ae60", "fa-tree"),
        CategoryStyle::new("Lettering", "#e84393", "fa-font"),
        CategoryStyle::new("Ghost Site", "#95a5a6", "fa-ghost"),
        CategoryStyle::new("Street Furniture", "#57606f", "fa-road"),
        CategoryStyle::new("Living Heritage", "#f39c12", "fa-users"),
        CategoryStyle::new("Street Sign", "#3742fa", "fa-sign-hanging"),
        CategoryStyle::new("Vernacular", "#d35400", "fa-home"),
        CategoryStyle::new("Urban Texture", "#8d6e63", "fa-cubes"),
    ]
}
