// heritage_map_core: Rust/WASM engine behind the heritage map.
// Owns dataset, filters, visibility, and camera decisions; JS applies the effects.

mod camera;
mod category;
mod cluster;
mod config;
mod error;
mod filter;
mod logging;
mod preload;
mod prefs;
mod session;
mod share;
mod store;
mod types;
mod visibility;
mod year;

use serde::Serialize;
use wasm_bindgen::prelude::*;

pub use camera::{CameraCommand, CameraDirector};
pub use category::{MarkerStyle, Palette};
pub use cluster::{expand_cluster, ClusterHit, ClusterSource, JsClusterSource, StyleSetup};
pub use config::MapConfig;
pub use error::MapError;
pub use filter::{compute_eligible, FilterState};
pub use preload::{Carousel, ImagePreloader, PreloadProgress, PreloadStatus};
pub use prefs::{KeyValueStore, LocalStorage, MemoryStore};
pub use session::{Action, Effect, MapSession};
pub use share::{SharePayload, ShareStep, ShareOutcome};
pub use store::RecordStore;
pub use types::*;
pub use visibility::{derive_visibility, DisplayState, MarkerArena, VisibilityFrame};
pub use year::{parse_year, YearRange};

/// Install the panic hook and the console logger.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
    logging::init(log::LevelFilter::Info);
}

/// Change console verbosity ("error", "warn", "info", "debug", "trace", "off").
#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    logging::init(logging::level_from_str(level));
}

fn js_err(err: MapError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, JsValue> {
    serde_json::to_string(value).map_err(|e| js_err(e.into()))
}

/// One row of the category console.
#[derive(Serialize)]
struct CategoryEntry<'a> {
    name: &'a Category,
    color: &'a str,
    icon: &'a str,
    enabled: bool,
    soloed: bool,
}

/// Side panel content for one site.
#[derive(Serialize)]
struct RecordView<'a> {
    #[serde(flatten)]
    record: &'a Record,
    style: MarkerStyle,
    directions_url: String,
}

/// Main map interface exposed to JavaScript.
/// JSON in, JSON out: every event is one `dispatch` call returning the effects to apply.
#[wasm_bindgen]
pub struct HeritageMap {
    session: MapSession,
}

#[wasm_bindgen]
impl HeritageMap {
    /// `query` is `location.search`, used for `?site=` deep links.
    #[wasm_bindgen(constructor)]
    pub fn new(
        config_json: &str,
        dataset_json: &str,
        dark_theme: bool,
        viewport_width: u32,
        query: Option<String>,
    ) -> Result<HeritageMap, JsValue> {
        let config = MapConfig::from_json(config_json).map_err(js_err)?;
        let store = RecordStore::from_json(dataset_json, &config).map_err(js_err)?;
        let theme = if dark_theme { Theme::Dark } else { Theme::Light };
        log::info!("Loaded {} heritage sites", store.len());

        Ok(HeritageMap {
            session: MapSession::new(config, store, theme, viewport_width, query.as_deref()),
        })
    }

    /// Apply one action (tagged JSON) and return the resulting effects as a JSON array.
    pub fn dispatch(&mut self, action_json: &str) -> Result<String, JsValue> {
        let action: Action = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action: {}", e)))?;
        let effects = self.session.dispatch(action).map_err(js_err)?;
        to_json(&effects)
    }

    /// Marker definitions to create once the map is ready.
    pub fn markers_json(&self) -> Result<String, JsValue> {
        to_json(&self.session.marker_specs())
    }

    /// Current derived frame: eligible ids, marker states, cluster data, layers.
    pub fn frame_json(&self) -> Result<String, JsValue> {
        to_json(&self.session.frame())
    }

    /// Map options for constructing the MapLibre instance.
    pub fn config_json(&self) -> Result<String, JsValue> {
        to_json(self.session.config())
    }

    pub fn style_url(&self) -> String {
        self.session.config().style_url(self.session.theme()).to_string()
    }

    pub fn year_range_json(&self) -> Result<String, JsValue> {
        to_json(&self.session.store().year_range())
    }

    pub fn current_year(&self) -> i32 {
        self.session.filters().current_year()
    }

    pub fn historic_mode(&self) -> bool {
        self.session.filters().historic_mode()
    }

    pub fn time_slider_open(&self) -> bool {
        self.session.time_slider_open()
    }

    /// Category console rows, in palette order.
    pub fn categories_json(&self) -> Result<String, JsValue> {
        let filters = self.session.filters();
        let palette = self.session.palette();
        let rows: Vec<CategoryEntry> = palette
            .categories()
            .iter()
            .map(|name| CategoryEntry {
                name,
                color: palette.color_of(name.as_str()),
                icon: palette.icon_of(name.as_str()),
                enabled: !filters.is_disabled(name.as_str()),
                soloed: filters.is_soloed(name.as_str()),
            })
            .collect();
        to_json(&rows)
    }

    /// Side panel data for a site, or `null` when the id is unknown.
    pub fn record_json(&self, id: &str) -> Result<String, JsValue> {
        let view = self.session.store().get(id).map(|record| RecordView {
            record,
            style: self.session.palette().marker_style(record),
            directions_url: share::directions_url(record),
        });
        to_json(&view)
    }

    /// Image carousel for a site's side panel.
    pub fn carousel(&self, id: &str) -> Result<ImageCarousel, JsValue> {
        let record = self
            .session
            .store()
            .get(id)
            .ok_or_else(|| js_err(MapError::UnknownRecord(id.to_string())))?;
        Ok(ImageCarousel {
            inner: Carousel::new(&record.images),
        })
    }

    /// Filters, toggles, selection, zoom, and layout as last dispatched.
    pub fn state_json(&self) -> Result<String, JsValue> {
        to_json(self.session.state())
    }

    /// False until `MapLoaded` has been dispatched.
    pub fn is_map_ready(&self) -> bool {
        self.session.is_map_ready()
    }

    pub fn selected_id(&self) -> Option<String> {
        self.session.selected().map(|r| r.id.to_string())
    }

    /// Ranked search results (id, title, primary category).
    pub fn search(&self, query: &str) -> Result<String, JsValue> {
        let results: Vec<serde_json::Value> = self
            .session
            .store()
            .search(query)
            .into_iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id,
                    "title": r.title,
                    "category": r.primary_category(),
                    "color": self.session.palette().color_of(r.primary_category().as_str()),
                })
            })
            .collect();
        to_json(&results)
    }

    /// Payload for sharing a site from `base_url` (current location).
    pub fn share_payload(&self, id: &str, base_url: &str) -> Result<String, JsValue> {
        let record = self
            .session
            .store()
            .get(id)
            .ok_or_else(|| js_err(MapError::UnknownRecord(id.to_string())))?;
        to_json(&SharePayload::for_record(record, base_url))
    }

    /// Every distinct image URL, for startup preloading.
    pub fn image_urls_json(&self) -> Result<String, JsValue> {
        to_json(&self.session.store().image_urls())
    }

    /// Resolve a cluster click. `source` is the MapLibre GeoJSON source; the
    /// returned Promise yields the effects JSON (a single camera command).
    pub fn expand_cluster(&self, source: JsValue, hit_json: &str) -> Result<js_sys::Promise, JsValue> {
        let hit: ClusterHit = serde_json::from_str(hit_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid cluster hit: {}", e)))?;
        let director = self.session.director().clone();
        let zoom = self.session.zoom();

        Ok(wasm_bindgen_futures::future_to_promise(async move {
            let source = JsClusterSource::new(source);
            let command = cluster::expand_cluster(&source, &director, hit, zoom).await;
            to_json(&[Effect::Camera { command }]).map(JsValue::from)
        }))
    }

    /// Whether to show the first-run tutorial for this viewport.
    pub fn should_show_tutorial(&self, viewport_width: u32) -> bool {
        let is_mobile = self.session.config().is_mobile(viewport_width);
        prefs::should_show_tutorial(&LocalStorage::open(), is_mobile)
    }

    pub fn dismiss_tutorial(&self) -> Result<(), JsValue> {
        prefs::dismiss_tutorial(&mut LocalStorage::open()).map_err(js_err)
    }
}

/// Startup image preloader exposed to JavaScript.
#[wasm_bindgen]
pub struct Preloader {
    inner: ImagePreloader,
}

#[wasm_bindgen]
impl Preloader {
    /// `urls_json` is a JSON array of image URLs; `now_ms` is `performance.now()`.
    #[wasm_bindgen(constructor)]
    pub fn new(urls_json: &str, now_ms: f64) -> Result<Preloader, JsValue> {
        let urls: Vec<String> = serde_json::from_str(urls_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid url list: {}", e)))?;
        Ok(Preloader {
            inner: ImagePreloader::new(urls.iter().map(String::as_str), now_ms),
        })
    }

    /// Returns true when this finished the preload.
    pub fn mark_loaded(&mut self, url: &str) -> bool {
        self.inner.mark_loaded(url)
    }

    pub fn mark_failed(&mut self, url: &str) -> bool {
        self.inner.mark_failed(url)
    }

    /// Returns true when the timeout forced completion.
    pub fn tick(&mut self, now_ms: f64) -> bool {
        self.inner.tick(now_ms)
    }

    pub fn is_done(&self) -> bool {
        self.inner.is_done()
    }

    pub fn progress_json(&self) -> Result<String, JsValue> {
        to_json(&self.inner.progress())
    }
}

/// Side panel image carousel exposed to JavaScript.
#[wasm_bindgen]
pub struct ImageCarousel {
    inner: Carousel,
}

#[wasm_bindgen]
impl ImageCarousel {
    /// `[{ url, loading }]` for every slide.
    pub fn slides_json(&self) -> Result<String, JsValue> {
        to_json(self.inner.slides())
    }

    pub fn index(&self) -> usize {
        self.inner.index()
    }

    /// Call on the slide image's load or error event.
    pub fn settle(&mut self, slide: usize) {
        self.inner.settle(slide);
    }

    pub fn next(&mut self) {
        self.inner.next();
    }

    pub fn previous(&mut self) {
        self.inner.previous();
    }

    pub fn go_to(&mut self, slide: usize) {
        self.inner.go_to(slide);
    }
}

/// First share mechanism to try.
#[wasm_bindgen]
pub fn first_share_step(native_share_available: bool) -> Result<String, JsValue> {
    to_json(&share::first_share_step(native_share_available))
}

/// Next share mechanism after `step` ended with `outcome`, or `null` when done.
#[wasm_bindgen]
pub fn next_share_step(step_json: &str, outcome_json: &str) -> Result<String, JsValue> {
    let step: ShareStep = serde_json::from_str(step_json).map_err(|e| js_err(e.into()))?;
    let outcome: ShareOutcome = serde_json::from_str(outcome_json).map_err(|e| js_err(e.into()))?;
    to_json(&share::next_share_step(step, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map() -> HeritageMap {
        HeritageMap::new("{}", store::fixtures::DATASET, false, 1280, Some("?site=watson".into()))
            .unwrap()
    }

    #[test]
    fn map_creation_works() {
        let map = map();
        assert_eq!(map.current_year(), 2025);
        assert!(map.time_slider_open());
        assert!(!map.historic_mode());
    }

    #[test]
    fn dispatch_round_trips_json() {
        let mut map = map();
        let effects: serde_json::Value =
            serde_json::from_str(&map.dispatch(r#"{"type":"MapLoaded","zoom":16.5}"#).unwrap()).unwrap();
        let effects = effects.as_array().unwrap();
        assert_eq!(effects[0]["type"], "RebuildLayers");
        assert!(effects
            .iter()
            .any(|e| e["type"] == "ScheduleSelect" && e["id"] == "watson" && e["delay_ms"] == 500));

        let effects: serde_json::Value =
            serde_json::from_str(&map.dispatch(r#"{"type":"Select","id":"watson"}"#).unwrap()).unwrap();
        let camera = effects
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["type"] == "Camera")
            .unwrap();
        assert_eq!(camera["command"]["type"], "FlyTo");
        assert_eq!(camera["command"]["zoom"], 18.0);
        assert_eq!(map.selected_id().as_deref(), Some("watson"));
    }

    #[test]
    fn console_rows_track_filters() {
        let mut map = map();
        map.dispatch(r#"{"type":"SoloCategory","category":"Victorian"}"#).unwrap();
        let rows: serde_json::Value = serde_json::from_str(&map.categories_json().unwrap()).unwrap();
        let victorian = rows
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["name"] == "Victorian")
            .unwrap();
        assert_eq!(victorian["enabled"], true);
        assert_eq!(victorian["soloed"], true);
        assert_eq!(victorian["color"], "#e76f51");
    }

    #[test]
    fn record_view_flattens_style() {
        let map = map();
        let view: serde_json::Value = serde_json::from_str(&map.record_json("regal").unwrap()).unwrap();
        assert_eq!(view["title"], "Regal Cinema");
        assert_eq!(view["style"]["color"], "#2a9d8f");
        assert_eq!(
            view["directions_url"],
            "https://www.google.com/maps/dir/?api=1&destination=18.926,72.832&travelmode=walking"
        );
        assert_eq!(map.record_json("missing").unwrap(), "null");
    }

    #[test]
    fn search_returns_ranked_hits() {
        let map = map();
        let hits: serde_json::Value = serde_json::from_str(&map.search("hotel").unwrap()).unwrap();
        assert_eq!(hits[0]["id"], "watson");
    }

    #[test]
    fn carousel_built_from_record_images() {
        let map = map();
        let mut carousel = map.carousel("regal").unwrap();
        let slides: serde_json::Value = serde_json::from_str(&carousel.slides_json().unwrap()).unwrap();
        assert_eq!(slides.as_array().unwrap().len(), 2);
        assert_eq!(slides[0]["loading"], true);

        carousel.settle(0);
        carousel.next();
        assert_eq!(carousel.index(), 1);
        let slides: serde_json::Value = serde_json::from_str(&carousel.slides_json().unwrap()).unwrap();
        assert_eq!(slides[0]["loading"], false);
    }

    #[test]
    fn state_reports_readiness_and_toggles() {
        let mut map = map();
        assert!(!map.is_map_ready());
        map.dispatch(r#"{"type":"MapLoaded","zoom":16.5}"#).unwrap();
        map.dispatch(r#"{"type":"ToggleFortWall"}"#).unwrap();
        assert!(map.is_map_ready());

        let state: serde_json::Value = serde_json::from_str(&map.state_json().unwrap()).unwrap();
        assert_eq!(state["fort_wall_visible"], true);
        assert_eq!(state["zoom"], 16.5);
        assert_eq!(state["filters"]["current_year"], 2025);
    }
}
