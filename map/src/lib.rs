//! Map render capability.
//!
//! geotrack never draws maps itself. A map engine is plugged in through the
//! [`MapRenderer`] trait, which covers the handful of commands the tracking
//! presenter issues: create a map, fly the camera, place a marker, draw an
//! accuracy circle, remove a layer and destroy the map.
//!
//! [`MapHandle`] scopes one map to its owner and releases every layer it
//! created when it goes away. [`RecordingRenderer`] records commands instead
//! of drawing them.

#![warn(missing_docs)]

mod handle;
mod recording;

use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use handle::MapHandle;
pub use recording::{MapCommand, RecordingRenderer};

/// A point given as longitude and latitude in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LngLat {
    /// Longitude in degrees.
    pub lng: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl LngLat {
    /// Create a point.
    #[must_use]
    pub const fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.6}, {:.6}]", self.lng, self.lat)
    }
}

/// Settings for creating a map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    /// Identifier of the surface the map renders into.
    pub container: String,
    /// Camera center before the first fix.
    pub initial_center: LngLat,
    /// Zoom level before the first fix.
    pub initial_zoom: f64,
    /// Camera tilt in degrees.
    #[serde(default)]
    pub pitch: f64,
    /// Map style understood by the renderer.
    #[serde(default)]
    pub style: Option<String>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            container: "map".to_string(),
            initial_center: LngLat::new(0.0, 0.0),
            initial_zoom: 10.0,
            pitch: 0.0,
            style: None,
        }
    }
}

/// An animated camera transition.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraMove {
    /// Target center.
    pub center: LngLat,
    /// Target zoom level.
    pub zoom: f64,
    /// Target bearing in degrees, if it should change.
    pub bearing: Option<f64>,
    /// Length of the animation.
    pub duration: Duration,
}

/// Appearance and position of a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerStyle {
    /// Marker position.
    pub lng_lat: LngLat,
    /// Rotation in degrees clockwise, if the marker should point somewhere.
    pub rotation: Option<f64>,
    /// Marker color, renderer default if absent.
    pub color: Option<String>,
}

/// A filled circle with a radius in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct CircleStyle {
    /// Circle center.
    pub center: LngLat,
    /// Radius in meters on the ground.
    pub radius_meters: f64,
    /// Fill color.
    pub fill_color: String,
    /// Outline color.
    pub stroke_color: String,
}

/// Identifies a map created by a [`MapRenderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(pub u64);

impl fmt::Display for MapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map#{}", self.0)
    }
}

/// Identifies a marker or circle layer on a map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(Cow<'static, str>);

impl LayerId {
    /// A layer id from a static name.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// The layer name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LayerId {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors reported by a map renderer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    /// The map was never created or has been destroyed.
    #[error("unknown map {0}")]
    UnknownMap(MapId),
    /// The layer does not exist on the map.
    #[error("unknown layer {layer} on {map}")]
    UnknownLayer {
        /// Map the layer was looked up on.
        map: MapId,
        /// The missing layer.
        layer: LayerId,
    },
    /// The handle was already released.
    #[error("map handle already released")]
    Released,
    /// The map engine failed.
    #[error("renderer error: {0}")]
    Backend(String),
}

/// Result type for map operations.
pub type MapResult<T> = Result<T, MapError>;

/// The capability of a map engine.
///
/// Marker and circle commands upsert: the first call with an id creates the
/// layer, later calls update it in place.
pub trait MapRenderer: Send + Sync + fmt::Debug {
    /// Create a map.
    ///
    /// # Errors
    /// Returns a [`MapError`] if the engine cannot create the map.
    fn create_map(&self, options: &MapOptions) -> MapResult<MapId>;

    /// Animate the camera.
    ///
    /// # Errors
    /// Returns [`MapError::UnknownMap`] for maps that do not exist.
    fn fly_to(&self, map: MapId, camera: &CameraMove) -> MapResult<()>;

    /// Create or move a marker.
    ///
    /// # Errors
    /// Returns [`MapError::UnknownMap`] for maps that do not exist.
    fn add_or_update_marker(&self, map: MapId, id: &LayerId, marker: &MarkerStyle)
    -> MapResult<()>;

    /// Create or update a circle.
    ///
    /// # Errors
    /// Returns [`MapError::UnknownMap`] for maps that do not exist.
    fn add_or_update_circle(&self, map: MapId, id: &LayerId, circle: &CircleStyle)
    -> MapResult<()>;

    /// Remove a marker or circle.
    ///
    /// # Errors
    /// Returns a [`MapError`] if the map or the layer does not exist.
    fn remove_layer(&self, map: MapId, id: &LayerId) -> MapResult<()>;

    /// Destroy a map and everything on it.
    ///
    /// # Errors
    /// Returns [`MapError::UnknownMap`] for maps that do not exist.
    fn destroy(&self, map: MapId) -> MapResult<()>;
}
