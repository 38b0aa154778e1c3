use geotrack_map::LngLat;
use serde::{Deserialize, Serialize};

/// Where a screen is in its locate/track lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrackingStatus {
    /// Mounted, nothing requested yet.
    #[default]
    Idle,
    /// Waiting for the first fix.
    Detecting,
    /// The coordinates reflect the most recent fix.
    Found,
    /// Location access was refused.
    PermissionDenied,
    /// No position could be determined.
    Unavailable,
    /// No fix arrived in time.
    TimedOut,
    /// Any other failure.
    UnknownError,
    /// The platform cannot sample location.
    Unsupported,
}

impl TrackingStatus {
    /// Whether the status reports a failure.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::PermissionDenied
                | Self::Unavailable
                | Self::TimedOut
                | Self::UnknownError
                | Self::Unsupported
        )
    }
}

/// Display-ready tracking state derived from the latest fix or failure.
///
/// Replaced wholesale on every update; absent measurements are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingState {
    /// Position of the latest fix.
    pub coordinates: Option<LngLat>,
    /// Horizontal accuracy radius in meters.
    pub accuracy_meters: Option<f64>,
    /// Altitude above sea level in meters.
    pub altitude_meters: Option<f64>,
    /// Vertical accuracy in meters.
    pub altitude_accuracy_meters: Option<f64>,
    /// Direction of travel in degrees clockwise from north.
    pub heading_degrees: Option<f64>,
    /// Ground speed in meters per second.
    pub speed_mps: Option<f64>,
    /// Whether the device is moving faster than walking-noise speed.
    pub is_moving: bool,
    /// Lifecycle status.
    pub status: TrackingStatus,
}

impl TrackingState {
    /// State at mount.
    #[must_use]
    pub fn idle() -> Self {
        Self::default()
    }

    /// State while the first fix is awaited.
    #[must_use]
    pub fn detecting() -> Self {
        Self::with_status(TrackingStatus::Detecting)
    }

    /// A state carrying only a status.
    #[must_use]
    pub fn with_status(status: TrackingStatus) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }
}
