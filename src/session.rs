// Map session: owns the display state and turns every UI/map event into a list
// of effects for JS to apply. Visibility is re-derived from state after each
// event rather than patched incrementally.

use serde::{Deserialize, Serialize};

use crate::camera::{CameraCommand, CameraDirector};
use crate::category::Palette;
use crate::cluster::{hover_cursor, ClusterFeatures, Cursor, StyleSetup, StyleTracker};
use crate::config::MapConfig;
use crate::error::MapError;
use crate::filter::FilterState;
use crate::share::deep_link_site;
use crate::store::RecordStore;
use crate::types::{Category, LngLat, Record, RecordId, Theme};
use crate::visibility::{
    derive_markers, derive_visibility, DisplayState, LayerVisibility, MarkerArena, MarkerSpec,
    MarkerUpdate, VisibilityFrame,
};

/// Delay between the map becoming ready and selecting a deep-linked site.
pub const DEEP_LINK_DELAY_MS: u32 = 500;

const FORT_WALL_NOTICE_ID: &str = "fort-wall-toast";
const FORT_WALL_NOTICE_TITLE: &str = "The Invisible Ramparts";
const FORT_WALL_NOTICE_BODY: &str =
    "This dashed line traces the demolished fortifications of the Bombay Fort (removed 1862).";

/// Input event from JS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// The map fired `load`: style is ready and markers may be created.
    MapLoaded { zoom: f64 },
    /// The style set by a `SetStyle` effect finished loading.
    StyleLoaded,
    ThemeChanged { theme: Theme },
    ZoomChanged { zoom: f64 },
    ViewportResized { width: u32 },
    ToggleCategory { category: Category },
    SoloCategory { category: Category },
    ResetCategories,
    SetYear { year: i32 },
    ToggleTimeSlider,
    ToggleHistoricMode,
    ToggleFortWall,
    Toggle3DBuildings,
    Select { id: RecordId },
    Deselect {
        #[serde(default)]
        keep_camera: bool,
    },
    MapClicked { on_cluster: bool },
    ClusterHover { entered: bool },
    ZoomIn,
    ZoomOut,
    ResetNorth,
    ResetView,
    Locate,
    LocationFound { center: LngLat },
    LocationFailed,
}

/// Transient notice (toast).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub title: String,
    pub body: String,
    /// `None` keeps the notice until dismissed.
    pub duration_ms: Option<u32>,
}

/// Desktop stand-in for the selected site's in-map marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FloatingMarker {
    pub id: RecordId,
    pub center: LngLat,
    pub color: String,
    pub icon: String,
}

/// Output instruction for JS.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Effect {
    Camera { command: CameraCommand },
    UpdateMarkers { updates: Vec<MarkerUpdate> },
    SetClusterData { data: ClusterFeatures },
    SetLayerVisibility { layers: LayerVisibility },
    SetStyle { url: String },
    RebuildLayers { setup: StyleSetup },
    SetFloatingMarker { marker: Option<FloatingMarker> },
    SetHistoricMode { active: bool },
    ShowNotice { notice: Notice },
    CloseConsole,
    SetTimeSliderOpen { open: bool },
    SetCursor { cursor: Cursor },
    RequestGeolocation,
    /// Dispatch `Select { id }` after `delay_ms`.
    ScheduleSelect { id: RecordId, delay_ms: u32 },
    /// Remove `?site=` from the address bar without reloading.
    StripSiteParam,
}

/// Selection/camera controller and owner of all session state.
pub struct MapSession {
    config: MapConfig,
    store: RecordStore,
    palette: Palette,
    director: CameraDirector,
    state: DisplayState,
    style: StyleTracker,
    /// Created when the map is ready; `None` before that.
    arena: Option<MarkerArena>,
    time_slider_open: bool,
    pending_deep_link: Option<RecordId>,
}

impl MapSession {
    /// `query` is `location.search`; a `site` parameter naming a known record
    /// is selected once the map is ready.
    pub fn new(
        config: MapConfig,
        store: RecordStore,
        theme: Theme,
        viewport_width: u32,
        query: Option<&str>,
    ) -> Self {
        let palette = Palette::new(&config.categories);
        let director = CameraDirector::new(&config);
        let is_desktop = !config.is_mobile(viewport_width);
        let filters = FilterState::new(palette.categories().to_vec(), store.year_range().max);

        let pending_deep_link = query.and_then(deep_link_site).and_then(|site| {
            match store.get(&site) {
                Some(record) => Some(record.id.clone()),
                None => {
                    log::warn!("Deep link names unknown site '{site}'");
                    None
                }
            }
        });

        MapSession {
            state: DisplayState {
                filters,
                fort_wall_visible: false,
                buildings_3d_visible: true,
                selected: None,
                zoom: config.initial_zoom,
                is_desktop,
            },
            style: StyleTracker::new(theme),
            arena: None,
            time_slider_open: is_desktop,
            pending_deep_link,
            config,
            store,
            palette,
            director,
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn director(&self) -> &CameraDirector {
        &self.director
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn filters(&self) -> &FilterState {
        &self.state.filters
    }

    pub fn zoom(&self) -> f64 {
        self.state.zoom
    }

    pub fn theme(&self) -> Theme {
        self.style.theme()
    }

    pub fn is_map_ready(&self) -> bool {
        self.arena.is_some()
    }

    pub fn time_slider_open(&self) -> bool {
        self.time_slider_open
    }

    pub fn selected(&self) -> Option<&Record> {
        self.state
            .selected
            .as_ref()
            .and_then(|id| self.store.get(id.as_str()))
    }

    /// Markers JS must create at map-ready time, all hidden until the first sync.
    pub fn marker_specs(&self) -> Vec<MarkerSpec> {
        match &self.arena {
            Some(arena) => arena.specs().cloned().collect(),
            None => MarkerArena::new(&self.store, &self.palette).specs().cloned().collect(),
        }
    }

    /// Current derived frame, without touching the arena.
    pub fn frame(&self) -> VisibilityFrame {
        derive_visibility(
            &self.store,
            &self.palette,
            &self.state,
            self.config.cluster_zoom_threshold(),
        )
    }

    pub fn floating_marker(&self) -> Option<FloatingMarker> {
        if !self.state.is_desktop {
            return None;
        }
        let record = self.selected()?;
        let style = self.palette.marker_style(record);
        Some(FloatingMarker {
            id: record.id.clone(),
            center: record.center,
            color: style.color,
            icon: style.icon,
        })
    }

    /// Apply one action and return the effects JS must perform, in order.
    pub fn dispatch(&mut self, action: Action) -> Result<Vec<Effect>, MapError> {
        let mut effects = Vec::new();
        let historic = self.state.filters.historic_mode();

        match action {
            Action::MapLoaded { zoom } => {
                self.state.zoom = zoom;
                self.style.mark_loaded();
                self.arena = Some(MarkerArena::new(&self.store, &self.palette));
                effects.push(Effect::RebuildLayers {
                    setup: self.style_setup()?,
                });
                self.sync_all(&mut effects);
                if let Some(id) = self.pending_deep_link.take() {
                    effects.push(Effect::ScheduleSelect {
                        id,
                        delay_ms: DEEP_LINK_DELAY_MS,
                    });
                    effects.push(Effect::StripSiteParam);
                }
            }

            Action::StyleLoaded => {
                self.style.mark_loaded();
                if self.arena.is_some() {
                    effects.push(Effect::RebuildLayers {
                        setup: self.style_setup()?,
                    });
                }
            }

            Action::ThemeChanged { theme } => {
                if self.style.begin_swap(theme) {
                    effects.push(Effect::SetStyle {
                        url: self.config.style_url(theme).to_string(),
                    });
                }
            }

            Action::ZoomChanged { zoom } => {
                self.state.zoom = zoom;
                self.sync_markers(&mut effects);
            }

            Action::ViewportResized { width } => {
                let is_desktop = !self.config.is_mobile(width);
                if is_desktop != self.state.is_desktop {
                    self.state.is_desktop = is_desktop;
                    self.sync_markers(&mut effects);
                    effects.push(Effect::SetFloatingMarker {
                        marker: self.floating_marker(),
                    });
                }
            }

            Action::ToggleCategory { .. }
            | Action::SoloCategory { .. }
            | Action::ResetCategories
            | Action::SetYear { .. }
            | Action::ToggleTimeSlider
                if historic =>
            {
                log::debug!("Ignoring {action:?} while the 1883 map is shown");
            }

            Action::ToggleCategory { category } => {
                self.state.filters.toggle_category(&category);
                self.sync_all(&mut effects);
            }

            Action::SoloCategory { category } => {
                self.state.filters.solo_category(&category);
                self.sync_all(&mut effects);
            }

            Action::ResetCategories => {
                self.state.filters.reset_categories();
                self.sync_all(&mut effects);
            }

            Action::SetYear { year } => {
                let year = self.store.year_range().clamp(year);
                if year != self.state.filters.current_year() {
                    self.state.filters.set_year(year);
                    self.sync_all(&mut effects);
                }
            }

            Action::ToggleTimeSlider => {
                self.time_slider_open = !self.time_slider_open;
                effects.push(Effect::SetTimeSliderOpen {
                    open: self.time_slider_open,
                });
            }

            Action::ToggleHistoricMode => {
                let entering = !historic;
                self.state.filters.set_historic_mode(entering);
                effects.push(Effect::SetHistoricMode { active: entering });
                self.sync_all(&mut effects);
                let command = if entering {
                    self.director.historic_entry()
                } else {
                    self.director.buildings_pitch(self.state.buildings_3d_visible)
                };
                effects.push(Effect::Camera { command });
            }

            Action::ToggleFortWall => {
                self.state.fort_wall_visible = !self.state.fort_wall_visible;
                self.push_layers(&mut effects);
                if self.state.fort_wall_visible {
                    effects.push(Effect::Camera {
                        command: self.director.fort_wall(),
                    });
                    effects.push(Effect::ShowNotice {
                        notice: Notice {
                            id: FORT_WALL_NOTICE_ID.to_string(),
                            title: FORT_WALL_NOTICE_TITLE.to_string(),
                            body: FORT_WALL_NOTICE_BODY.to_string(),
                            duration_ms: None,
                        },
                    });
                }
            }

            Action::Toggle3DBuildings => {
                if historic {
                    log::debug!("Ignoring 3D toggle while the 1883 map is shown");
                } else {
                    self.state.buildings_3d_visible = !self.state.buildings_3d_visible;
                    self.push_layers(&mut effects);
                    effects.push(Effect::Camera {
                        command: self.director.buildings_pitch(self.state.buildings_3d_visible),
                    });
                }
            }

            Action::Select { id } => self.select(&id, &mut effects)?,

            Action::Deselect { keep_camera } => self.deselect(keep_camera, &mut effects),

            Action::MapClicked { on_cluster } => {
                if !on_cluster {
                    let keep_camera = !self.state.is_desktop;
                    self.deselect(keep_camera, &mut effects);
                    effects.push(Effect::CloseConsole);
                }
            }

            Action::ClusterHover { entered } => effects.push(Effect::SetCursor {
                cursor: hover_cursor(entered),
            }),

            Action::ZoomIn => effects.push(Effect::Camera {
                command: CameraCommand::ZoomIn,
            }),
            Action::ZoomOut => effects.push(Effect::Camera {
                command: CameraCommand::ZoomOut,
            }),
            Action::ResetNorth => effects.push(Effect::Camera {
                command: CameraCommand::ResetNorth,
            }),
            Action::ResetView => effects.push(Effect::Camera {
                command: self.director.reset_view(),
            }),

            Action::Locate => effects.push(Effect::RequestGeolocation),
            Action::LocationFound { center } => effects.push(Effect::Camera {
                command: self.director.locate(center),
            }),
            Action::LocationFailed => log::debug!("Geolocation unavailable; camera unchanged"),
        }

        Ok(effects)
    }

    fn select(&mut self, id: &RecordId, effects: &mut Vec<Effect>) -> Result<(), MapError> {
        let center = self
            .store
            .get(id.as_str())
            .map(|r| r.center)
            .ok_or_else(|| MapError::UnknownRecord(id.to_string()))?;

        self.state.selected = Some(id.clone());
        effects.push(Effect::CloseConsole);
        if !self.state.is_desktop && self.time_slider_open {
            self.time_slider_open = false;
            effects.push(Effect::SetTimeSliderOpen { open: false });
        }
        self.sync_markers(effects);
        effects.push(Effect::SetFloatingMarker {
            marker: self.floating_marker(),
        });
        effects.push(Effect::Camera {
            command: self.director.select(center),
        });
        Ok(())
    }

    fn deselect(&mut self, keep_camera: bool, effects: &mut Vec<Effect>) {
        if self.state.selected.take().is_none() {
            return;
        }
        self.sync_markers(effects);
        effects.push(Effect::SetFloatingMarker { marker: None });
        if !keep_camera {
            effects.push(Effect::Camera {
                command: self.director.restore_after_deselect(),
            });
        }
    }

    fn style_setup(&self) -> Result<StyleSetup, MapError> {
        let frame = self.frame();
        StyleSetup::build(&self.config, &self.style, frame.layers, &frame.clusters)
    }

    fn push_layers(&self, effects: &mut Vec<Effect>) {
        if !self.style.is_loaded() {
            return;
        }
        effects.push(Effect::SetLayerVisibility {
            layers: LayerVisibility::from_state(&self.state),
        });
    }

    /// Markers, cluster data, and layer visibility. Used on filter/mode changes.
    /// While a new style is loading only markers are synced; the rebuild on
    /// `StyleLoaded` carries the current sources and layers.
    fn sync_all(&mut self, effects: &mut Vec<Effect>) {
        let Some(arena) = self.arena.as_mut() else {
            return;
        };
        let frame = derive_visibility(
            &self.store,
            &self.palette,
            &self.state,
            self.config.cluster_zoom_threshold(),
        );
        let updates = arena.sync(&frame.markers);
        if !updates.is_empty() {
            effects.push(Effect::UpdateMarkers { updates });
        }
        if !self.style.is_loaded() {
            return;
        }
        effects.push(Effect::SetClusterData {
            data: frame.clusters,
        });
        effects.push(Effect::SetLayerVisibility {
            layers: frame.layers,
        });
    }

    /// Markers only. Zoom and selection changes leave cluster data alone.
    fn sync_markers(&mut self, effects: &mut Vec<Effect>) {
        let Some(arena) = self.arena.as_mut() else {
            return;
        };
        let markers = derive_markers(&self.store, &self.state, self.config.cluster_zoom_threshold());
        let updates = arena.sync(&markers);
        if !updates.is_empty() {
            effects.push(Effect::UpdateMarkers { updates });
        }
    }
}
