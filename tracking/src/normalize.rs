use geotrack_location::{LocationError, PositionSample};
use geotrack_map::LngLat;

use crate::{TrackingState, TrackingStatus};

/// Speed above which a device counts as moving, in meters per second.
pub const MOVING_THRESHOLD_MPS: f64 = 0.5;

/// Turn a raw fix into tracking state.
///
/// Depends on nothing but `sample`. Missing or non-finite optional values
/// become `None`, never zero.
#[must_use]
pub fn normalize(sample: &PositionSample) -> TrackingState {
    let speed_mps = measured(sample.speed);
    TrackingState {
        coordinates: Some(LngLat::new(sample.longitude, sample.latitude)),
        accuracy_meters: Some(sample.accuracy).filter(|a| a.is_finite() && *a >= 0.0),
        altitude_meters: measured(sample.altitude),
        altitude_accuracy_meters: measured(sample.altitude_accuracy),
        heading_degrees: measured(sample.heading),
        speed_mps,
        is_moving: speed_mps.is_some_and(|speed| speed > MOVING_THRESHOLD_MPS),
        status: TrackingStatus::Found,
    }
}

fn measured(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

/// Status for a sampling failure.
#[must_use]
pub const fn status_for(error: &LocationError) -> TrackingStatus {
    match error {
        LocationError::Unsupported => TrackingStatus::Unsupported,
        LocationError::PermissionDenied => TrackingStatus::PermissionDenied,
        LocationError::PositionUnavailable => TrackingStatus::Unavailable,
        LocationError::TimedOut => TrackingStatus::TimedOut,
        LocationError::Unknown(_) => TrackingStatus::UnknownError,
    }
}

/// Tracking state for a sampling failure.
#[must_use]
pub fn normalize_error(error: &LocationError) -> TrackingState {
    TrackingState::with_status(status_for(error))
}
