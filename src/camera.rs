// Camera command vocabulary and the fixed framings of the precinct.
// The engine never moves the camera itself; it emits commands JS replays on MapLibre.

use serde::{Deserialize, Serialize};

use crate::config::MapConfig;
use crate::types::{Bounds, LngLat};

/// Close-up zoom used when a site is selected.
pub const SELECT_ZOOM: f64 = 18.0;
/// Zoom used after a successful geolocation.
pub const LOCATE_ZOOM: f64 = 17.0;
/// Cluster expansion never flies closer than this.
pub const MAX_EXPANSION_ZOOM: f64 = 18.0;
/// Pitch used while 3D buildings are shown.
pub const BUILDINGS_PITCH: f64 = 45.0;

const FLY_DURATION_MS: u32 = 1000;
const CLUSTER_FLY_DURATION_MS: u32 = 500;
const RESTORE_SPEED: f64 = 0.6;
const HISTORIC_PADDING: u32 = 100;
const FORT_WALL_PADDING: u32 = 150;
const FORT_WALL_DURATION_MS: u32 = 2000;

/// A camera instruction. Serialized with a `type` tag for the JS side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CameraCommand {
    FlyTo {
        #[serde(skip_serializing_if = "Option::is_none")]
        center: Option<LngLat>,
        #[serde(skip_serializing_if = "Option::is_none")]
        zoom: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pitch: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        bearing: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        speed: Option<f64>,
    },
    FitBounds {
        bounds: Bounds,
        padding: u32,
        pitch: f64,
        bearing: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u32>,
    },
    EaseTo {
        pitch: f64,
        duration_ms: u32,
    },
    ZoomIn,
    ZoomOut,
    ResetNorth,
}

impl CameraCommand {
    /// Plain fly to a point at a zoom with the default duration.
    pub fn fly_to(center: LngLat, zoom: f64) -> Self {
        CameraCommand::FlyTo {
            center: Some(center),
            zoom: Some(zoom),
            pitch: None,
            bearing: None,
            duration_ms: Some(FLY_DURATION_MS),
            speed: None,
        }
    }

    /// Target of a fly command, if it has one.
    pub fn target(&self) -> Option<(LngLat, Option<f64>)> {
        match self {
            CameraCommand::FlyTo { center: Some(c), zoom, .. } => Some((*c, *zoom)),
            _ => None,
        }
    }
}

/// Builds camera commands for the fixed framings defined by the config.
#[derive(Debug, Clone)]
pub struct CameraDirector {
    start_center: LngLat,
    initial_zoom: f64,
    default_pitch: f64,
    default_bearing: f64,
    historic_bounds: Bounds,
    fort_wall_bounds: Bounds,
}

impl CameraDirector {
    pub fn new(config: &MapConfig) -> Self {
        CameraDirector {
            start_center: config.start_center,
            initial_zoom: config.initial_zoom,
            default_pitch: config.default_pitch,
            default_bearing: config.default_bearing,
            historic_bounds: config.historic_overlay.bounds,
            fort_wall_bounds: config.fort_wall.bounds,
        }
    }

    pub fn select(&self, center: LngLat) -> CameraCommand {
        CameraCommand::fly_to(center, SELECT_ZOOM)
    }

    pub fn locate(&self, position: LngLat) -> CameraCommand {
        CameraCommand::fly_to(position, LOCATE_ZOOM)
    }

    /// "Reset view" control: back to the opening shot.
    pub fn reset_view(&self) -> CameraCommand {
        CameraCommand::FlyTo {
            center: Some(self.start_center),
            zoom: Some(self.initial_zoom),
            pitch: Some(self.default_pitch),
            bearing: Some(self.default_bearing),
            duration_ms: Some(FLY_DURATION_MS),
            speed: None,
        }
    }

    /// Gentle pull-back after the side panel closes.
    pub fn restore_after_deselect(&self) -> CameraCommand {
        CameraCommand::FlyTo {
            center: Some(self.start_center),
            zoom: Some(self.initial_zoom),
            pitch: None,
            bearing: None,
            duration_ms: None,
            speed: Some(RESTORE_SPEED),
        }
    }

    /// Flat, north-up fit of the 1883 overlay.
    pub fn historic_entry(&self) -> CameraCommand {
        CameraCommand::FitBounds {
            bounds: self.historic_bounds,
            padding: HISTORIC_PADDING,
            pitch: 0.0,
            bearing: 0.0,
            duration_ms: None,
        }
    }

    pub fn fort_wall(&self) -> CameraCommand {
        CameraCommand::FitBounds {
            bounds: self.fort_wall_bounds,
            padding: FORT_WALL_PADDING,
            pitch: self.default_pitch,
            bearing: self.default_bearing,
            duration_ms: Some(FORT_WALL_DURATION_MS),
        }
    }

    pub fn buildings_pitch(&self, show_3d: bool) -> CameraCommand {
        CameraCommand::EaseTo {
            pitch: if show_3d { BUILDINGS_PITCH } else { 0.0 },
            duration_ms: FLY_DURATION_MS,
        }
    }

    pub fn expand_cluster(&self, center: LngLat, zoom: f64) -> CameraCommand {
        CameraCommand::FlyTo {
            center: Some(center),
            zoom: Some(zoom),
            pitch: None,
            bearing: None,
            duration_ms: Some(CLUSTER_FLY_DURATION_MS),
            speed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_flies_close() {
        let director = CameraDirector::new(&MapConfig::default());
        let cmd = director.select(LngLat::new(72.832, 18.926));
        assert_eq!(cmd.target(), Some((LngLat::new(72.832, 18.926), Some(SELECT_ZOOM))));
    }

    #[test]
    fn historic_entry_is_flat() {
        let director = CameraDirector::new(&MapConfig::default());
        match director.historic_entry() {
            CameraCommand::FitBounds { pitch, bearing, bounds, .. } => {
                assert_eq!(pitch, 0.0);
                assert_eq!(bearing, 0.0);
                assert_eq!(bounds, MapConfig::default().historic_overlay.bounds);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn buildings_pitch_toggles() {
        let director = CameraDirector::new(&MapConfig::default());
        assert_eq!(
            director.buildings_pitch(true),
            CameraCommand::EaseTo { pitch: 45.0, duration_ms: 1000 }
        );
        assert_eq!(
            director.buildings_pitch(false),
            CameraCommand::EaseTo { pitch: 0.0, duration_ms: 1000 }
        );
    }

    #[test]
    fn commands_serialize_tagged_without_nulls() {
        let json = serde_json::to_value(CameraCommand::fly_to(LngLat::new(72.8, 18.9), 18.0)).unwrap();
        assert_eq!(json["type"], "FlyTo");
        assert_eq!(json["center"], serde_json::json!([72.8, 18.9]));
        assert!(json.get("pitch").is_none());

        let json = serde_json::to_value(CameraCommand::ZoomIn).unwrap();
        assert_eq!(json, serde_json::json!({"type": "ZoomIn"}));
    }
}
