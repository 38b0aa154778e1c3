//! Windows location provider using the WinRT Geolocator.

use futures::future::BoxFuture;
use futures::stream;
use futures_timer::Delay;
use windows::Devices::Geolocation::{
    AltitudeReferenceSystem, GeolocationAccessStatus, Geolocator, PositionAccuracy,
};

use super::{POLL_INTERVAL, timestamp_now};
use crate::{
    LocationProvider, PermissionStatus, PlatformError, PositionSample, PositionStream,
    SamplingPolicy,
};

/// Location provider backed by `Windows.Devices.Geolocation`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeolocatorProvider;

impl GeolocatorProvider {
    /// Create the provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LocationProvider for GeolocatorProvider {
    fn is_supported(&self) -> bool {
        true
    }

    fn permission_status(&self) -> BoxFuture<'static, PermissionStatus> {
        Box::pin(async { permission_status() })
    }

    fn current_position(
        &self,
        policy: &SamplingPolicy,
    ) -> BoxFuture<'static, Result<PositionSample, PlatformError>> {
        let high_accuracy = policy.high_accuracy();
        Box::pin(async move { read_position(high_accuracy) })
    }

    fn watch_position(&self, policy: &SamplingPolicy) -> Result<PositionStream, PlatformError> {
        let high_accuracy = policy.high_accuracy();
        Ok(Box::pin(stream::unfold(true, move |first| async move {
            if !first {
                Delay::new(POLL_INTERVAL).await;
            }
            Some((read_position(high_accuracy), false))
        })))
    }
}

fn permission_status() -> PermissionStatus {
    // Desktop apps are never prompted, so this only reports the current setting.
    match Geolocator::RequestAccessAsync().and_then(|op| op.get()) {
        Ok(GeolocationAccessStatus::Allowed) => PermissionStatus::Granted,
        Ok(GeolocationAccessStatus::Denied) => PermissionStatus::Denied,
        _ => PermissionStatus::NotDetermined,
    }
}

fn win_error(err: &windows::core::Error) -> PlatformError {
    PlatformError::new(0, err.message().to_string())
}

fn read_position(high_accuracy: bool) -> Result<PositionSample, PlatformError> {
    // Requesting access doubles as the permission check on Windows.
    let access = Geolocator::RequestAccessAsync()
        .map_err(|e| win_error(&e))?
        .get()
        .map_err(|e| win_error(&e))?;

    match access {
        GeolocationAccessStatus::Allowed => {}
        GeolocationAccessStatus::Denied => {
            return Err(PlatformError::new(
                PlatformError::PERMISSION_DENIED,
                "location access denied",
            ));
        }
        _ => {
            return Err(PlatformError::new(
                PlatformError::POSITION_UNAVAILABLE,
                "location access unspecified",
            ));
        }
    }

    let geolocator = Geolocator::new().map_err(|e| win_error(&e))?;
    let accuracy = if high_accuracy {
        PositionAccuracy::High
    } else {
        PositionAccuracy::Default
    };
    geolocator
        .SetDesiredAccuracy(accuracy)
        .map_err(|e| win_error(&e))?;

    let position = geolocator
        .GetGeopositionAsync()
        .map_err(|e| win_error(&e))?
        .get()
        .map_err(|e| {
            PlatformError::new(PlatformError::POSITION_UNAVAILABLE, e.message().to_string())
        })?;

    let coord = position.Coordinate().map_err(|e| win_error(&e))?;
    let geopoint = coord.Point().map_err(|e| win_error(&e))?;
    let point = geopoint.Position().map_err(|e| win_error(&e))?;
    let reference = geopoint
        .AltitudeReferenceSystem()
        .unwrap_or(AltitudeReferenceSystem::Unspecified);

    Ok(PositionSample {
        latitude: point.Latitude,
        longitude: point.Longitude,
        altitude: reported_altitude(point.Altitude, reference),
        accuracy: coord.Accuracy().map_err(|e| win_error(&e))?,
        altitude_accuracy: coord.AltitudeAccuracy().and_then(|a| a.Value()).ok(),
        heading: coord.Heading().and_then(|h| h.Value()).ok(),
        speed: coord.Speed().and_then(|s| s.Value()).ok(),
        timestamp: timestamp_now(),
    })
}

/// A position without an altitude reference carries a placeholder altitude
/// of zero.
fn reported_altitude(altitude: f64, reference: AltitudeReferenceSystem) -> Option<f64> {
    (reference != AltitudeReferenceSystem::Unspecified).then_some(altitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreferenced_altitude_is_absent() {
        assert_eq!(
            reported_altitude(0.0, AltitudeReferenceSystem::Unspecified),
            None
        );
        assert_eq!(
            reported_altitude(31.5, AltitudeReferenceSystem::Ellipsoid),
            Some(31.5)
        );
        assert_eq!(
            reported_altitude(12.0, AltitudeReferenceSystem::Geoid),
            Some(12.0)
        );
    }
}
