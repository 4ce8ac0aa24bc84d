// Visibility derivation: one pure function from display state to what the map shows.
// Derived fresh on every relevant event; the marker arena only diffs the result
// against what JS last applied.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::category::{MarkerStyle, Palette};
use crate::cluster::{cluster_features, ClusterFeatures};
use crate::filter::{compute_eligible, FilterState};
use crate::store::RecordStore;
use crate::types::{LngLat, Record, RecordId};

/// Everything that influences what is drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayState {
    pub filters: FilterState,
    pub fort_wall_visible: bool,
    pub buildings_3d_visible: bool,
    pub selected: Option<RecordId>,
    pub zoom: f64,
    /// Desktop layouts show the selected site as a floating indicator.
    pub is_desktop: bool,
}

impl DisplayState {
    pub fn is_selected(&self, id: &RecordId) -> bool {
        self.selected.as_ref() == Some(id)
    }
}

/// Per-marker visibility rule.
///
/// Shown iff eligible, and either zoomed in past the cluster threshold or
/// selected, and not replaced by the desktop floating indicator.
pub fn marker_visible(
    record: &Record,
    filters: &FilterState,
    zoom: f64,
    cluster_zoom_threshold: f64,
    selected: bool,
    is_desktop_floating: bool,
) -> bool {
    if filters.historic_mode() || (selected && is_desktop_floating) {
        return false;
    }
    filters.is_eligible(record) && (zoom >= cluster_zoom_threshold || selected)
}

/// Visibility of every programmatically added layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerVisibility {
    pub historic_overlay: bool,
    pub buildings_3d: bool,
    pub fort_wall: bool,
    pub clusters: bool,
}

impl LayerVisibility {
    pub fn from_state(state: &DisplayState) -> Self {
        let historic = state.filters.historic_mode();
        LayerVisibility {
            historic_overlay: historic,
            buildings_3d: state.buildings_3d_visible && !historic,
            fort_wall: state.fort_wall_visible,
            clusters: !historic,
        }
    }
}

/// Derived display state of one marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerState {
    pub id: RecordId,
    pub visible: bool,
    pub selected: bool,
}

/// Full derived frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisibilityFrame {
    pub eligible: Vec<RecordId>,
    pub markers: Vec<MarkerState>,
    pub clusters: ClusterFeatures,
    pub layers: LayerVisibility,
}

/// Marker states only; used on pure zoom changes where cluster data stays put.
pub fn derive_markers(
    store: &RecordStore,
    state: &DisplayState,
    cluster_zoom_threshold: f64,
) -> Vec<MarkerState> {
    store
        .records()
        .iter()
        .map(|record| {
            let selected = state.is_selected(&record.id);
            MarkerState {
                id: record.id.clone(),
                visible: marker_visible(
                    record,
                    &state.filters,
                    state.zoom,
                    cluster_zoom_threshold,
                    selected,
                    state.is_desktop,
                ),
                selected,
            }
        })
        .collect()
}

pub fn derive_visibility(
    store: &RecordStore,
    palette: &Palette,
    state: &DisplayState,
    cluster_zoom_threshold: f64,
) -> VisibilityFrame {
    let eligible = compute_eligible(store.records(), &state.filters);
    VisibilityFrame {
        eligible: eligible.iter().map(|r| r.id.clone()).collect(),
        markers: derive_markers(store, state, cluster_zoom_threshold),
        clusters: cluster_features(&eligible, palette),
        layers: LayerVisibility::from_state(state),
    }
}

/// What JS needs to create one DOM marker at map-ready time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSpec {
    pub id: RecordId,
    pub title: String,
    pub center: LngLat,
    pub multi_category: bool,
    pub style: MarkerStyle,
}

/// Change to apply to one DOM marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerUpdate {
    pub id: RecordId,
    pub visible: bool,
    pub selected: bool,
}

#[derive(Debug, Clone)]
struct MarkerSlot {
    spec: MarkerSpec,
    applied: Option<MarkerState>,
}

/// One persistent marker per record, keyed by id. Remembers the last state
/// handed to JS so each sync only reports markers that changed.
#[derive(Debug, Clone)]
pub struct MarkerArena {
    slots: Vec<MarkerSlot>,
    index: HashMap<RecordId, usize>,
}

impl MarkerArena {
    pub fn new(store: &RecordStore, palette: &Palette) -> Self {
        let slots: Vec<MarkerSlot> = store
            .records()
            .iter()
            .map(|r| MarkerSlot {
                spec: MarkerSpec {
                    id: r.id.clone(),
                    title: r.title.clone(),
                    center: r.center,
                    multi_category: r.is_multi_category(),
                    style: palette.marker_style(r),
                },
                applied: None,
            })
            .collect();
        let index = slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.spec.id.clone(), i))
            .collect();
        MarkerArena { slots, index }
    }

    pub fn specs(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.slots.iter().map(|s| &s.spec)
    }

    pub fn is_visible(&self, id: &str) -> bool {
        self.index
            .get(id)
            .and_then(|&i| self.slots[i].applied.as_ref())
            .is_some_and(|m| m.visible)
    }

    /// Record `markers` as applied and return the ones that differ from the
    /// previous sync. The first sync reports every marker.
    pub fn sync(&mut self, markers: &[MarkerState]) -> Vec<MarkerUpdate> {
        let mut updates = Vec::new();
        for marker in markers {
            let Some(&i) = self.index.get(&marker.id) else {
                continue;
            };
            let slot = &mut self.slots[i];
            if slot.applied.as_ref() != Some(marker) {
                updates.push(MarkerUpdate {
                    id: marker.id.clone(),
                    visible: marker.visible,
                    selected: marker.selected,
                });
                slot.applied = Some(marker.clone());
            }
        }
        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::store::fixtures;
    use crate::types::Category;

    const THRESHOLD: f64 = 16.0;

    fn state(zoom: f64) -> DisplayState {
        let config = MapConfig::default();
        DisplayState {
            filters: FilterState::new(
                config.categories.iter().map(|c| c.name.clone()).collect(),
                2025,
            ),
            fort_wall_visible: false,
            buildings_3d_visible: true,
            selected: None,
            zoom,
            is_desktop: false,
        }
    }

    fn visible_ids(markers: &[MarkerState]) -> Vec<&str> {
        markers.iter().filter(|m| m.visible).map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn markers_hidden_below_threshold() {
        let store = fixtures::store();
        let markers = derive_markers(&store, &state(15.0), THRESHOLD);
        assert!(visible_ids(&markers).is_empty());

        let markers = derive_markers(&store, &state(16.0), THRESHOLD);
        assert_eq!(visible_ids(&markers).len(), 4);
    }

    #[test]
    fn selected_marker_survives_low_zoom_on_mobile() {
        let store = fixtures::store();
        let mut s = state(14.5);
        s.selected = Some(RecordId::new("regal"));
        let markers = derive_markers(&store, &s, THRESHOLD);
        assert_eq!(visible_ids(&markers), vec!["regal"]);
    }

    #[test]
    fn selected_marker_replaced_by_floating_on_desktop() {
        let store = fixtures::store();
        let mut s = state(17.0);
        s.selected = Some(RecordId::new("regal"));
        s.is_desktop = true;
        let markers = derive_markers(&store, &s, THRESHOLD);
        let ids = visible_ids(&markers);
        assert!(!ids.contains(&"regal"));
        assert_eq!(ids.len(), 3);
        assert!(markers.iter().any(|m| m.id.as_str() == "regal" && m.selected));
    }

    #[test]
    fn historic_mode_hides_everything() {
        let store = fixtures::store();
        let palette = Palette::new(&MapConfig::default().categories);
        let mut s = state(18.0);
        s.selected = Some(RecordId::new("regal"));
        s.filters.set_historic_mode(true);

        let frame = derive_visibility(&store, &palette, &s, THRESHOLD);
        assert!(frame.eligible.is_empty());
        assert!(visible_ids(&frame.markers).is_empty());
        assert!(frame.clusters.features.is_empty());
        assert!(frame.layers.historic_overlay);
        assert!(!frame.layers.clusters);
        assert!(!frame.layers.buildings_3d);
    }

    #[test]
    fn frame_respects_filters() {
        let store = fixtures::store();
        let palette = Palette::new(&MapConfig::default().categories);
        let mut s = state(17.0);
        s.filters.toggle_category(&Category::new("Victorian"));
        s.filters.set_year(1900);

        let frame = derive_visibility(&store, &palette, &s, THRESHOLD);
        let eligible: Vec<&str> = frame.eligible.iter().map(|id| id.as_str()).collect();
        assert_eq!(eligible, vec!["wellington"]);
        assert_eq!(frame.clusters.features.len(), 1);
        assert_eq!(visible_ids(&frame.markers), vec!["wellington"]);
    }

    #[test]
    fn arena_reports_only_changes() {
        let store = fixtures::store();
        let palette = Palette::new(&MapConfig::default().categories);
        let mut arena = MarkerArena::new(&store, &palette);
        assert_eq!(arena.specs().count(), 4);
        assert!(arena.specs().any(|s| s.id.as_str() == "regal" && s.multi_category));

        let first = arena.sync(&derive_markers(&store, &state(15.0), THRESHOLD));
        assert_eq!(first.len(), 4);
        assert!(first.iter().all(|u| !u.visible));

        let same = arena.sync(&derive_markers(&store, &state(15.5), THRESHOLD));
        assert!(same.is_empty());

        let zoomed = arena.sync(&derive_markers(&store, &state(16.5), THRESHOLD));
        assert_eq!(zoomed.len(), 4);
        assert!(arena.is_visible("regal"));
    }
}
