// Record store: loads the hand-authored dataset once, normalizes every record
// at the boundary, and serves lookups and search.

use std::collections::HashMap;

use serde::Deserialize;

use crate::category::normalize_categories;
use crate::config::MapConfig;
use crate::error::MapError;
use crate::types::{LngLat, Record, RecordId};
use crate::year::{parse_year, YearRange};

const UNKNOWN_CREDIT: &str = "Unknown";
const SEARCH_LIMIT: usize = 10;
const WIKIMEDIA_HOST: &str = "upload.wikimedia.org";
const THUMB_WIDTH: &str = "800px";

/// Dataset entry as authored. Tolerates both the legacy single-value fields
/// (`category`, `image`) and the list forms.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    #[serde(default)]
    pub year: Option<YearLabel>,
    #[serde(default)]
    pub architect: Option<String>,
    #[serde(default)]
    pub builder: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    pub location: RawLocation,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLocation {
    pub center: [f64; 2],
}

/// Year as authored: usually text, occasionally a bare number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum YearLabel {
    Text(String),
    Number(i64),
}

impl YearLabel {
    fn into_text(self) -> String {
        match self {
            YearLabel::Text(s) => s,
            YearLabel::Number(n) => n.to_string(),
        }
    }
}

/// Rewrite a full-resolution Wikimedia Commons URL to its 800px thumbnail.
/// Other URLs, and URLs that are already thumbnails, pass through.
pub fn optimize_image_url(url: &str) -> String {
    if !url.contains(WIKIMEDIA_HOST) || url.contains("/thumb/") {
        return url.to_string();
    }
    let mut parts: Vec<&str> = url.split('/').collect();
    let Some(commons) = parts.iter().position(|p| *p == "commons") else {
        return url.to_string();
    };
    let Some(filename) = parts.last().copied().filter(|f| !f.is_empty()) else {
        return url.to_string();
    };
    let thumb = format!("{THUMB_WIDTH}-{filename}");
    parts.insert(commons + 1, "thumb");
    parts.push(&thumb);
    parts.join("/")
}

fn normalize(raw: RawRecord, unknown_year: i32) -> Result<Record, MapError> {
    let id = raw.id.trim().to_string();
    if id.is_empty() {
        return Err(MapError::invalid_record(raw.title, "empty id"));
    }

    let categories = normalize_categories(raw.categories, raw.category);
    if categories.is_empty() {
        return Err(MapError::invalid_record(id, "no category"));
    }

    let images: Vec<String> = match (raw.images, raw.image) {
        (Some(list), _) => list,
        (None, Some(one)) => vec![one],
        (None, None) => Vec::new(),
    }
    .into_iter()
    .filter(|u| !u.trim().is_empty())
    .map(|u| optimize_image_url(u.trim()))
    .collect();
    if images.is_empty() {
        return Err(MapError::invalid_record(id, "no images"));
    }

    let [a, b] = raw.location.center;
    if !a.is_finite() || !b.is_finite() {
        return Err(MapError::invalid_record(id, "non-finite coordinate"));
    }
    let (center, swapped) = LngLat::from_raw_pair(raw.location.center);
    if swapped {
        log::info!("Auto-corrected coordinates for: {}", raw.title);
    }

    let year_label = raw.year.map(YearLabel::into_text).unwrap_or_default();
    let resolved_year = parse_year(Some(&year_label), unknown_year);

    let credit = |v: Option<String>| {
        v.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNKNOWN_CREDIT.to_string())
    };

    Ok(Record {
        id: RecordId::new(id),
        title: raw.title,
        description: raw.description,
        categories,
        year_label,
        resolved_year,
        architect: credit(raw.architect),
        builder: credit(raw.builder),
        images,
        center,
    })
}

/// Immutable, in-memory list of heritage sites keyed by id.
#[derive(Debug, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
    index: HashMap<RecordId, usize>,
    year_range: YearRange,
}

impl RecordStore {
    pub fn from_json(json: &str, config: &MapConfig) -> Result<Self, MapError> {
        let raw: Vec<RawRecord> = serde_json::from_str(json)?;
        Self::from_raw(raw, config)
    }

    pub fn from_raw(raw: Vec<RawRecord>, config: &MapConfig) -> Result<Self, MapError> {
        let mut records = Vec::with_capacity(raw.len());
        let mut index = HashMap::with_capacity(raw.len());

        for entry in raw {
            let record = normalize(entry, config.max_year).map_err(|e| {
                log::error!("Rejected dataset record: {e}");
                e
            })?;
            if index.contains_key(&record.id) {
                return Err(MapError::DuplicateRecord(record.id.to_string()));
            }
            index.insert(record.id.clone(), records.len());
            records.push(record);
        }

        let year_range = YearRange::from_years(
            records.iter().map(|r| r.resolved_year),
            config.fallback_min_year,
            config.max_year,
        );

        Ok(RecordStore {
            records,
            index,
            year_range,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Record> {
        self.index.get(id).map(|&i| &self.records[i])
    }

    pub fn year_range(&self) -> YearRange {
        self.year_range
    }

    /// Every distinct image URL across the dataset, in dataset order.
    pub fn image_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for url in self.records.iter().flat_map(|r| r.images.iter()) {
            if !urls.contains(&url.as_str()) {
                urls.push(url);
            }
        }
        urls
    }

    /// Case-insensitive search over title, description, and categories. The
    /// query is matched as typed, surrounding whitespace included.
    ///
    /// Ranked by: title starts with the query, then title contains it, then a
    /// category matches. Ties keep dataset order. At most ten results.
    pub fn search(&self, query: &str) -> Vec<&Record> {
        let query = query.to_lowercase();
        if query.is_empty() {
            return Vec::new();
        }

        let category_match = |r: &Record| {
            r.categories
                .iter()
                .any(|c| c.as_str().to_lowercase().contains(&query))
        };

        let mut hits: Vec<(u8, &Record)> = self
            .records
            .iter()
            .filter_map(|r| {
                let title = r.title.to_lowercase();
                let rank = if title.starts_with(&query) {
                    0
                } else if title.contains(&query) {
                    1
                } else if category_match(r) {
                    2
                } else if r.description.to_lowercase().contains(&query) {
                    3
                } else {
                    return None;
                };
                Some((rank, r))
            })
            .collect();

        // sort_by_key is stable, so dataset order breaks ties.
        hits.sort_by_key(|(rank, _)| *rank);
        hits.into_iter().take(SEARCH_LIMIT).map(|(_, r)| r).collect()
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Small precinct dataset used across module tests.
    pub const DATASET: &str = r#"[
        {"id":"wellington","category":"Neoclassical","title":"Wellington Fountain",
         "image":"https://upload.wikimedia.org/wikipedia/commons/0/0b/Wellington.jpg",
         "description":"Commemorates the Duke of Wellington.","year":"1865",
         "architect":"Gen. Barr","builder":"Public Subscription",
         "location":{"center":[18.925439,72.832344]}},
        {"id":"regal","categories":["Art Deco","Lettering"],"title":"Regal Cinema",
         "images":["https://example.org/regal-1.jpg","https://example.org/regal-2.jpg"],
         "description":"Art Deco cinema that opened in 1933.","year":"1933",
         "location":{"center":[72.8320,18.9260]}},
        {"id":"watson","category":"Victorian","title":"Watson's Hotel",
         "image":"https://example.org/watson.jpg",
         "description":"Cast-iron hotel building.","year":"Late 19th century",
         "location":{"center":[72.8310,18.9280]}},
        {"id":"kitab","category":"Living Heritage","title":"Kitab Khana",
         "image":"https://example.org/kitab.jpg",
         "description":"Bookshop in a heritage building.","year":"Ongoing",
         "location":{"center":[72.8330,18.9300]}}
    ]"#;

    pub fn store() -> RecordStore {
        RecordStore::from_json(DATASET, &MapConfig::default()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;
    use proptest::prelude::*;

    #[test]
    fn loads_and_normalizes() {
        let store = fixtures::store();
        assert_eq!(store.len(), 4);

        let wellington = store.get("wellington").unwrap();
        assert_eq!(wellington.categories, vec![Category::new("Neoclassical")]);
        assert_eq!(wellington.center, LngLat::new(72.832344, 18.925439));
        assert_eq!(wellington.resolved_year, 1865);
        assert_eq!(wellington.images.len(), 1);
        assert!(wellington.images[0].contains("/commons/thumb/"));

        let regal = store.get("regal").unwrap();
        assert_eq!(regal.primary_category(), &Category::new("Art Deco"));
        assert_eq!(regal.architect, "Unknown");
        assert_eq!(regal.builder, "Unknown");
        assert_eq!(regal.images.len(), 2);

        assert_eq!(store.get("watson").unwrap().resolved_year, 1890);
        assert_eq!(store.get("kitab").unwrap().resolved_year, 2025);
        assert!(store.get("missing").is_none());
    }

    #[test]
    fn year_range_from_dataset() {
        let range = fixtures::store().year_range();
        assert_eq!(range.min, 1865);
        assert_eq!(range.max, 2025);
    }

    #[test]
    fn missing_category_is_a_load_error() {
        let json = r#"[{"id":"x","title":"X","image":"a.jpg","location":{"center":[72.8,18.9]}}]"#;
        let err = RecordStore::from_json(json, &MapConfig::default()).unwrap_err();
        assert_eq!(err, MapError::invalid_record("x", "no category"));
    }

    #[test]
    fn missing_images_is_a_load_error() {
        let json = r#"[{"id":"x","title":"X","category":"Modern","location":{"center":[72.8,18.9]}}]"#;
        let err = RecordStore::from_json(json, &MapConfig::default()).unwrap_err();
        assert_eq!(err, MapError::invalid_record("x", "no images"));
    }

    #[test]
    fn duplicate_ids_rejected() {
        let json = r#"[
            {"id":"x","title":"X","category":"Modern","image":"a.jpg","location":{"center":[72.8,18.9]}},
            {"id":"x","title":"Y","category":"Modern","image":"b.jpg","location":{"center":[72.8,18.9]}}
        ]"#;
        let err = RecordStore::from_json(json, &MapConfig::default()).unwrap_err();
        assert_eq!(err, MapError::DuplicateRecord("x".to_string()));
    }

    #[test]
    fn numeric_year_accepted() {
        let json = r#"[{"id":"x","title":"X","category":"Modern","image":"a.jpg","year":1937,
                        "location":{"center":[72.8,18.9]}}]"#;
        let store = RecordStore::from_json(json, &MapConfig::default()).unwrap();
        assert_eq!(store.get("x").unwrap().resolved_year, 1937);
        assert_eq!(store.get("x").unwrap().year_label, "1937");
    }

    #[test]
    fn wikimedia_urls_become_thumbnails() {
        let url = "https://upload.wikimedia.org/wikipedia/commons/0/0b/Fountain.jpg";
        assert_eq!(
            optimize_image_url(url),
            "https://upload.wikimedia.org/wikipedia/commons/thumb/0/0b/Fountain.jpg/800px-Fountain.jpg"
        );

        let thumb = "https://upload.wikimedia.org/wikipedia/commons/thumb/0/0b/F.jpg/800px-F.jpg";
        assert_eq!(optimize_image_url(thumb), thumb);
        assert_eq!(optimize_image_url("https://example.org/a.jpg"), "https://example.org/a.jpg");
    }

    #[test]
    fn search_ranks_title_prefix_first() {
        let store = fixtures::store();

        let hits: Vec<&str> = store.search("regal").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["regal"]);

        // "art deco" matches regal by category only.
        let hits: Vec<&str> = store.search("ART DECO").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["regal"]);

        // "hotel" is in watson's title and description; "building" only in descriptions.
        let hits: Vec<&str> = store.search("building").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["watson", "kitab"]);

        assert!(store.search("").is_empty());
        assert!(store.search("   ").is_empty());
    }

    #[test]
    fn search_prefix_beats_contains() {
        let json = r#"[
            {"id":"a","title":"Old Kala Ghoda","category":"Modern","image":"a.jpg","location":{"center":[72.8,18.9]}},
            {"id":"b","title":"Kala Ghoda Statue","category":"Modern","image":"b.jpg","location":{"center":[72.8,18.9]}}
        ]"#;
        let store = RecordStore::from_json(json, &MapConfig::default()).unwrap();
        let hits: Vec<&str> = store.search("kala").iter().map(|r| r.id.as_str()).collect();
        assert_eq!(hits, vec!["b", "a"]);
    }

    #[test]
    fn search_keeps_whitespace_in_query() {
        let json = r#"[
            {"id":"h","title":"Hotel","description":"Rooms.","category":"Modern","image":"h.jpg","location":{"center":[72.8,18.9]}}
        ]"#;
        let store = RecordStore::from_json(json, &MapConfig::default()).unwrap();
        assert_eq!(store.search("hotel").len(), 1);
        assert!(store.search("hotel ").is_empty());
        assert!(store.search("").is_empty());
    }

    #[test]
    fn coordinates_load_exactly() {
        let json = r#"[
            {"id":"p","title":"P","category":"Modern","image":"p.jpg","location":{"center":[72.8,18.946700925746338]}}
        ]"#;
        let store = RecordStore::from_json(json, &MapConfig::default()).unwrap();
        assert_eq!(store.get("p").unwrap().center, LngLat::new(72.8, 18.946700925746338));
    }

    proptest! {
        #[test]
        fn stored_coordinates_are_lng_first(lat in 18.90f64..18.95, lng in 72.80f64..72.86, flip in any::<bool>()) {
            let center = if flip { [lat, lng] } else { [lng, lat] };
            let json = serde_json::json!([{
                "id": "p", "title": "P", "category": "Modern", "image": "p.jpg",
                "location": { "center": center }
            }]);
            let store = RecordStore::from_json(&json.to_string(), &MapConfig::default()).unwrap();
            prop_assert_eq!(store.get("p").unwrap().center, LngLat::new(lng, lat));
        }
    }
}
