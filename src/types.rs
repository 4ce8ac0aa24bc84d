// Strong typing over strings. Newtypes for ids, categories, and coordinates.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Geographic coordinate, serialized as `[lng, lat]` for MapLibre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        LngLat { lng, lat }
    }

    /// Build a coordinate from a raw pair that may be in (lat, lng) order.
    ///
    /// In this precinct longitude (~72.8) is always larger than latitude (~18.9),
    /// so a pair whose first component is the smaller one is swapped. The flag
    /// reports whether a swap happened.
    pub fn from_raw_pair(pair: [f64; 2]) -> (Self, bool) {
        let [a, b] = pair;
        if a < b {
            (LngLat::new(b, a), true)
        } else {
            (LngLat::new(a, b), false)
        }
    }
}

impl From<[f64; 2]> for LngLat {
    fn from([lng, lat]: [f64; 2]) -> Self {
        LngLat { lng, lat }
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(c: LngLat) -> Self {
        [c.lng, c.lat]
    }
}

/// Axis-aligned bounds, serialized as `[[west, south], [east, north]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[LngLat; 2]", into = "[LngLat; 2]")]
pub struct Bounds {
    pub south_west: LngLat,
    pub north_east: LngLat,
}

impl Bounds {
    pub const fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Bounds {
            south_west: LngLat { lng: west, lat: south },
            north_east: LngLat { lng: east, lat: north },
        }
    }

    pub fn contains(&self, point: LngLat) -> bool {
        point.lng >= self.south_west.lng
            && point.lng <= self.north_east.lng
            && point.lat >= self.south_west.lat
            && point.lat <= self.north_east.lat
    }
}

impl From<[LngLat; 2]> for Bounds {
    fn from([south_west, north_east]: [LngLat; 2]) -> Self {
        Bounds {
            south_west,
            north_east,
        }
    }
}

impl From<Bounds> for [LngLat; 2] {
    fn from(b: Bounds) -> Self {
        [b.south_west, b.north_east]
    }
}

/// Stable record identifier (used for selection and `?site=` deep links).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        RecordId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RecordId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Architectural/heritage category tag, e.g. "Art Deco".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Category {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Basemap theme. Swapping it replaces the whole map style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// One heritage site, normalized at load time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    /// Non-empty; index 0 is the primary category.
    pub categories: Vec<Category>,
    /// Free-text year as authored ("1865", "Late 19th century").
    #[serde(rename = "year")]
    pub year_label: String,
    /// Year resolved by the year parser, used for filtering and sorting.
    pub resolved_year: i32,
    pub architect: String,
    pub builder: String,
    /// Non-empty, already rewritten to display-sized URLs.
    pub images: Vec<String>,
    pub center: LngLat,
}

impl Record {
    pub fn primary_category(&self) -> &Category {
        &self.categories[0]
    }

    pub fn secondary_category(&self) -> Option<&Category> {
        self.categories.get(1)
    }

    pub fn is_multi_category(&self) -> bool {
        self.categories.len() > 1
    }
}
