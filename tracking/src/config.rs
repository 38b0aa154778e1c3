use geotrack_location::SamplingPolicy;
use geotrack_map::{LngLat, MapOptions};
use serde::{Deserialize, Serialize};

use crate::PresenterConfig;

/// How often a screen asks for a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SamplingMode {
    /// A single fix when the screen starts; retried only on request.
    OneShot,
    /// Fixes keep coming until the screen goes away.
    #[default]
    Continuous,
}

/// Everything that differs between tracking screens.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScreenConfig {
    /// One-shot or continuous sampling.
    pub mode: SamplingMode,
    /// Accuracy, timeout and freshness of requests.
    pub policy: SamplingPolicy,
    /// The map to draw on. Text-only screens have none.
    pub map: Option<MapOptions>,
    /// How the position is shown.
    pub presenter: PresenterConfig,
}

impl ScreenConfig {
    /// Full-screen live tracker with a tilted map that turns with the
    /// direction of travel, a rotating marker and a compass.
    #[must_use]
    pub fn live_tracker() -> Self {
        Self {
            mode: SamplingMode::Continuous,
            policy: SamplingPolicy::default(),
            map: Some(MapOptions {
                container: "map".to_string(),
                initial_center: LngLat::new(0.0, 0.0),
                initial_zoom: 10.0,
                pitch: 60.0,
                style: Some("mapbox://styles/mapbox/streets-v12".to_string()),
            }),
            presenter: PresenterConfig {
                zoom: 16.0,
                fly_duration_ms: 1_000,
                bearing_follows_heading: true,
                rotate_marker: true,
                show_compass: true,
                ..PresenterConfig::default()
            },
        }
    }

    /// Dashboard map starting over Hong Kong with a red marker.
    #[must_use]
    pub fn dashboard() -> Self {
        Self {
            mode: SamplingMode::Continuous,
            policy: SamplingPolicy::default(),
            map: Some(MapOptions {
                container: "map".to_string(),
                initial_center: LngLat::new(114.255, 22.77),
                initial_zoom: 9.0,
                pitch: 0.0,
                style: Some("mapbox://styles/mapbox/streets-v11".to_string()),
            }),
            presenter: PresenterConfig {
                zoom: 15.0,
                marker_color: Some("#FF0000".to_string()),
                ..PresenterConfig::default()
            },
        }
    }

    /// Text-only screen reading one fix with altitude.
    #[must_use]
    pub fn altitude_probe() -> Self {
        Self {
            mode: SamplingMode::OneShot,
            policy: SamplingPolicy::default()
                .with_timeout_ms(15_000)
                .unwrap_or_default(),
            map: None,
            presenter: PresenterConfig {
                show_accuracy: false,
                ..PresenterConfig::default()
            },
        }
    }

    /// Look up a preset by name.
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "live" | "live-tracker" => Some(Self::live_tracker()),
            "dashboard" => Some(Self::dashboard()),
            "altitude" | "altitude-probe" => Some(Self::altitude_probe()),
            _ => None,
        }
    }
}
