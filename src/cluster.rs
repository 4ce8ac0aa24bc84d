// Cluster adapter: feeds eligible sites to MapLibre's GeoJSON clustering,
// expands clusters on click, and rebuilds every custom layer after a style swap.

use std::future::Future;

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use js_sys::{Function, Promise, Reflect};
use serde::{Deserialize, Serialize};
use serde_json::json;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::JsFuture;

use crate::camera::{CameraCommand, CameraDirector, MAX_EXPANSION_ZOOM};
use crate::category::Palette;
use crate::config::MapConfig;
use crate::error::MapError;
use crate::types::{LngLat, Record, Theme};
use crate::visibility::LayerVisibility;

pub const CLUSTER_SOURCE: &str = "heritage-clusters";
pub const CLUSTER_LAYER: &str = "clusters";
pub const CLUSTER_COUNT_LAYER: &str = "cluster-count";
pub const UNCLUSTERED_LAYER: &str = "unclustered-point";
pub const HISTORIC_SOURCE: &str = "source-1883";
pub const HISTORIC_LAYER: &str = "layer-1883";
pub const BUILDINGS_SOURCE: &str = "openmaptiles";
pub const BUILDINGS_LAYER: &str = "3d-buildings";
pub const FORT_WALL_SOURCE: &str = "fort-wall";
pub const FORT_WALL_LAYER: &str = "fort-wall-layer";

const EXPANSION_ZOOM_OFFSET: f64 = 0.5;
const FALLBACK_ZOOM_STEP: f64 = 2.0;

/// Point features handed to the clustering source.
pub type ClusterFeatures = FeatureCollection;

/// One point feature per eligible site, carrying id, title, primary category,
/// and its resolved color.
pub fn cluster_features(eligible: &[&Record], palette: &Palette) -> ClusterFeatures {
    let features = eligible
        .iter()
        .map(|record| {
            let category = record.primary_category().as_str();
            let mut properties = JsonObject::new();
            properties.insert("id".to_string(), json!(record.id.as_str()));
            properties.insert("title".to_string(), json!(record.title));
            properties.insert("category".to_string(), json!(category));
            properties.insert("color".to_string(), json!(palette.color_of(category)));
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    record.center.lng,
                    record.center.lat,
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Anything that can answer "at what zoom does this cluster split apart".
pub trait ClusterSource {
    fn expansion_zoom(&self, cluster_id: u64) -> impl Future<Output = Result<f64, MapError>>;
}

/// A clicked cluster: its id and rendered coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterHit {
    pub cluster_id: u64,
    pub center: LngLat,
}

/// Zoom to fly to for a cluster click, given the lookup outcome.
pub fn expansion_target(lookup: Result<f64, MapError>, current_zoom: f64) -> f64 {
    match lookup {
        Ok(zoom) => (zoom + EXPANSION_ZOOM_OFFSET).min(MAX_EXPANSION_ZOOM),
        Err(e) => {
            log::warn!("Cluster expansion error: {e}");
            (current_zoom + FALLBACK_ZOOM_STEP).min(MAX_EXPANSION_ZOOM)
        }
    }
}

/// Resolve a cluster click into a camera command. Never fails: a failed
/// lookup falls back to stepping the zoom in.
pub async fn expand_cluster<S: ClusterSource>(
    source: &S,
    director: &CameraDirector,
    hit: ClusterHit,
    current_zoom: f64,
) -> CameraCommand {
    let lookup = source.expansion_zoom(hit.cluster_id).await;
    director.expand_cluster(hit.center, expansion_target(lookup, current_zoom))
}

/// Canvas cursor while hovering the cluster layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Cursor {
    #[serde(rename = "pointer")]
    Pointer,
    #[serde(rename = "")]
    Default,
}

pub fn hover_cursor(over_cluster: bool) -> Cursor {
    if over_cluster {
        Cursor::Pointer
    } else {
        Cursor::Default
    }
}

/// Tracks whether the current basemap style may receive custom layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StyleTracker {
    theme: Theme,
    loaded: bool,
}

impl StyleTracker {
    pub fn new(theme: Theme) -> Self {
        StyleTracker {
            theme,
            loaded: false,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Start a style swap. Returns false when the theme did not change.
    pub fn begin_swap(&mut self, theme: Theme) -> bool {
        if theme == self.theme {
            return false;
        }
        self.theme = theme;
        self.loaded = false;
        true
    }

    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    pub fn ensure_loaded(&self) -> Result<(), MapError> {
        if self.loaded {
            Ok(())
        } else {
            log::error!("Attempted to add custom layers before the style finished loading");
            Err(MapError::StyleNotLoaded)
        }
    }
}

/// A source to add, as a MapLibre source spec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceSpec {
    pub id: &'static str,
    pub spec: serde_json::Value,
}

/// A layer to add. Layers with `requires_source` are skipped by JS when the
/// basemap style does not provide that source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_source: Option<&'static str>,
    pub spec: serde_json::Value,
}

/// Full teardown-and-rebuild plan for custom layers. Applied in field order:
/// remove layers, remove sources, add sources, add layers, rebind handlers on
/// `interactive_layers`, then move `raise` layers to the top.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyleSetup {
    pub remove_layers: Vec<&'static str>,
    pub remove_sources: Vec<&'static str>,
    pub sources: Vec<SourceSpec>,
    pub layers: Vec<LayerSpec>,
    pub interactive_layers: Vec<&'static str>,
    pub raise: Vec<&'static str>,
}

fn visibility(on: bool) -> &'static str {
    if on {
        "visible"
    } else {
        "none"
    }
}

impl StyleSetup {
    /// Build the plan from current state. Errors if the style is still loading.
    pub fn build(
        config: &MapConfig,
        style: &StyleTracker,
        layers: LayerVisibility,
        features: &ClusterFeatures,
    ) -> Result<Self, MapError> {
        style.ensure_loaded()?;

        let dark = style.theme() == Theme::Dark;
        let stroke = if dark { "#111" } else { "#fff" };
        let max_zoom = config.cluster_zoom_threshold();
        let overlay = &config.historic_overlay;
        let wall: Vec<[f64; 2]> = config.fort_wall.coordinates.iter().map(|c| (*c).into()).collect();

        let sources = vec![
            SourceSpec {
                id: HISTORIC_SOURCE,
                spec: json!({
                    "type": "image",
                    "url": overlay.image_url,
                    "coordinates": overlay.corners,
                }),
            },
            SourceSpec {
                id: FORT_WALL_SOURCE,
                spec: json!({
                    "type": "geojson",
                    "data": {
                        "type": "Feature",
                        "properties": {},
                        "geometry": { "type": "LineString", "coordinates": wall },
                    },
                }),
            },
            SourceSpec {
                id: CLUSTER_SOURCE,
                spec: json!({
                    "type": "geojson",
                    "data": features,
                    "cluster": true,
                    "clusterMaxZoom": max_zoom,
                    "clusterRadius": config.cluster.radius,
                }),
            },
        ];

        let layer_specs = vec![
            LayerSpec {
                requires_source: None,
                spec: json!({
                    "id": HISTORIC_LAYER,
                    "type": "raster",
                    "source": HISTORIC_SOURCE,
                    "paint": { "raster-fade-duration": 0 },
                    "layout": { "visibility": visibility(layers.historic_overlay) },
                }),
            },
            LayerSpec {
                requires_source: Some(BUILDINGS_SOURCE),
                spec: json!({
                    "id": BUILDINGS_LAYER,
                    "source": BUILDINGS_SOURCE,
                    "source-layer": "building",
                    "type": "fill-extrusion",
                    "minzoom": 15,
                    "paint": {
                        "fill-extrusion-color": if dark { "#222" } else { "#f0f0f0" },
                        "fill-extrusion-height": ["get", "render_height"],
                        "fill-extrusion-base": ["get", "render_min_height"],
                        "fill-extrusion-opacity": if dark { 0.6 } else { 0.9 },
                    },
                    "layout": { "visibility": visibility(layers.buildings_3d) },
                }),
            },
            LayerSpec {
                requires_source: None,
                spec: json!({
                    "id": FORT_WALL_LAYER,
                    "type": "line",
                    "source": FORT_WALL_SOURCE,
                    "layout": {
                        "line-join": "round",
                        "line-cap": "round",
                        "visibility": visibility(layers.fort_wall),
                    },
                    "paint": { "line-color": "#c0392b", "line-width": 4, "line-dasharray": [2, 4] },
                }),
            },
            LayerSpec {
                requires_source: None,
                spec: json!({
                    "id": UNCLUSTERED_LAYER,
                    "type": "circle",
                    "source": CLUSTER_SOURCE,
                    "filter": ["!", ["has", "point_count"]],
                    "maxzoom": max_zoom,
                    "paint": {
                        "circle-color": ["get", "color"],
                        "circle-radius": 10,
                        "circle-stroke-width": 2,
                        "circle-stroke-color": stroke,
                    },
                    "layout": { "visibility": visibility(layers.clusters) },
                }),
            },
            LayerSpec {
                requires_source: None,
                spec: json!({
                    "id": CLUSTER_LAYER,
                    "type": "circle",
                    "source": CLUSTER_SOURCE,
                    "filter": ["has", "point_count"],
                    "maxzoom": max_zoom,
                    "paint": {
                        "circle-color": ["step", ["get", "point_count"], "#2980b9", 10, "#8e44ad", 25, "#c0392b"],
                        "circle-radius": ["step", ["get", "point_count"], 18, 10, 24, 25, 30],
                        "circle-stroke-width": 3,
                        "circle-stroke-color": stroke,
                    },
                    "layout": { "visibility": visibility(layers.clusters) },
                }),
            },
            LayerSpec {
                requires_source: None,
                spec: json!({
                    "id": CLUSTER_COUNT_LAYER,
                    "type": "symbol",
                    "source": CLUSTER_SOURCE,
                    "filter": ["has", "point_count"],
                    "maxzoom": max_zoom,
                    "layout": {
                        "text-field": "{point_count_abbreviated}",
                        "text-font": ["Open Sans Bold", "Arial Unicode MS Bold"],
                        "text-size": 12,
                        "visibility": visibility(layers.clusters),
                    },
                    "paint": { "text-color": "#ffffff" },
                }),
            },
        ];

        let mut raise = vec![UNCLUSTERED_LAYER, CLUSTER_LAYER, CLUSTER_COUNT_LAYER];
        if layers.historic_overlay {
            raise.push(HISTORIC_LAYER);
        }

        Ok(StyleSetup {
            remove_layers: vec![
                HISTORIC_LAYER,
                BUILDINGS_LAYER,
                FORT_WALL_LAYER,
                CLUSTER_LAYER,
                UNCLUSTERED_LAYER,
                CLUSTER_COUNT_LAYER,
            ],
            remove_sources: vec![HISTORIC_SOURCE, FORT_WALL_SOURCE, CLUSTER_SOURCE],
            sources,
            layers: layer_specs,
            interactive_layers: vec![CLUSTER_LAYER],
            raise,
        })
    }
}

/// `ClusterSource` over a MapLibre GeoJSON source object.
///
/// MapLibre 4+ returns a Promise from `getClusterExpansionZoom(id)`; older
/// versions take a node-style `(err, zoom)` callback. Both are handled by
/// always passing the callback and preferring a returned Promise.
pub struct JsClusterSource {
    source: JsValue,
}

/// An in-flight lookup. The callback stays alive until the lookup settles
/// and is dropped with it, whichever convention answered.
struct PendingLookup {
    promise: Promise,
    _callback: Option<Closure<dyn FnMut(JsValue, JsValue)>>,
}

impl JsClusterSource {
    pub fn new(source: JsValue) -> Self {
        JsClusterSource { source }
    }

    fn lookup(&self, cluster_id: u64) -> Result<PendingLookup, MapError> {
        let func: Function = Reflect::get(&self.source, &JsValue::from_str("getClusterExpansionZoom"))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok())
            .ok_or_else(|| MapError::ClusterLookup("source has no getClusterExpansionZoom".to_string()))?;

        let id = JsValue::from_f64(cluster_id as f64);
        let mut callback = None;
        let mut returned = Ok(JsValue::UNDEFINED);
        let via_callback = Promise::new(&mut |resolve: Function, reject: Function| {
            let on_done: Closure<dyn FnMut(JsValue, JsValue)> =
                Closure::once(move |err: JsValue, zoom: JsValue| {
                    let _ = if err.is_null() || err.is_undefined() {
                        resolve.call1(&JsValue::NULL, &zoom)
                    } else {
                        reject.call1(&JsValue::NULL, &err)
                    };
                });
            returned = func.call2(&self.source, &id, on_done.as_ref());
            callback = Some(on_done);
        });

        let promise = match returned {
            Ok(value) if value.is_instance_of::<Promise>() => value.unchecked_into(),
            Ok(_) => via_callback,
            Err(err) => return Err(MapError::ClusterLookup(js_error_message(&err))),
        };
        Ok(PendingLookup {
            promise,
            _callback: callback,
        })
    }
}

fn js_error_message(err: &JsValue) -> String {
    if let Some(message) = err.as_string() {
        return message;
    }
    err.dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .unwrap_or_else(|| format!("{err:?}"))
}

impl ClusterSource for JsClusterSource {
    fn expansion_zoom(&self, cluster_id: u64) -> impl Future<Output = Result<f64, MapError>> {
        let lookup = self.lookup(cluster_id);
        async move {
            let pending = lookup?;
            let value = JsFuture::from(pending.promise.clone())
                .await
                .map_err(|e| MapError::ClusterLookup(js_error_message(&e)));
            drop(pending);
            value?
                .as_f64()
                .ok_or_else(|| MapError::ClusterLookup("expansion zoom is not a number".to_string()))
        }
    }
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use js_sys::Object;
    use wasm_bindgen_test::*;

    /// A stand-in GeoJSON source whose `getClusterExpansionZoom(id, cb)` runs `body`.
    fn fake_source(body: &str) -> JsClusterSource {
        let source = Object::new();
        let func = Function::new_with_args("id, cb", body);
        Reflect::set(&source, &JsValue::from_str("getClusterExpansionZoom"), &func).unwrap();
        JsClusterSource::new(source.into())
    }

    fn hit() -> ClusterHit {
        ClusterHit {
            cluster_id: 7,
            center: LngLat::new(72.832, 18.927),
        }
    }

    async fn flown_zoom(source: &JsClusterSource, current_zoom: f64) -> Option<f64> {
        let director = CameraDirector::new(&MapConfig::default());
        expand_cluster(source, &director, hit(), current_zoom)
            .await
            .target()
            .and_then(|(_, zoom)| zoom)
    }

    #[wasm_bindgen_test]
    async fn promise_convention() {
        let source = fake_source("return Promise.resolve(id + 1);");
        assert_eq!(flown_zoom(&source, 15.0).await, Some(8.5));
    }

    #[wasm_bindgen_test]
    async fn callback_convention() {
        let source = fake_source("setTimeout(function () { cb(null, id + 2); }, 0);");
        assert_eq!(flown_zoom(&source, 15.0).await, Some(9.5));
    }

    #[wasm_bindgen_test]
    async fn rejected_promise_steps_zoom() {
        let source = fake_source("return Promise.reject(new Error('gone'));");
        assert_eq!(flown_zoom(&source, 15.0).await, Some(17.0));
    }

    #[wasm_bindgen_test]
    async fn callback_error_steps_zoom() {
        let source = fake_source("cb(new Error('gone'));");
        assert_eq!(flown_zoom(&source, 16.5).await, Some(18.0));
    }

    #[wasm_bindgen_test]
    async fn throwing_lookup_steps_zoom() {
        let source = fake_source("throw new Error('boom');");
        assert_eq!(flown_zoom(&source, 14.5).await, Some(16.5));
    }

    #[wasm_bindgen_test]
    async fn missing_method_steps_zoom() {
        let source = JsClusterSource::new(Object::new().into());
        assert_eq!(flown_zoom(&source, 15.0).await, Some(17.0));
    }
}
