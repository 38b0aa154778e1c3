use serde::Serialize;

use crate::compass::compass_label;
use crate::{TrackingState, TrackingStatus};

/// Shown in place of a value that is not available.
pub const PLACEHOLDER: &str = "--";

const KMH_PER_MPS: f64 = 3.6;

/// One-line description of a status.
#[must_use]
pub const fn status_message(status: TrackingStatus) -> &'static str {
    match status {
        TrackingStatus::Idle => "Waiting to locate",
        TrackingStatus::Detecting => "Detecting your location...",
        TrackingStatus::Found => "Location detected",
        TrackingStatus::PermissionDenied => "Location permission denied",
        TrackingStatus::Unavailable => "Location information is unavailable",
        TrackingStatus::TimedOut => "Location request timed out",
        TrackingStatus::UnknownError => "An unknown error occurred while locating",
        TrackingStatus::Unsupported => "Geolocation is not supported by this platform",
    }
}

/// Formatted values of a [`TrackingState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Readout {
    /// Latitude to six decimals.
    pub latitude: String,
    /// Longitude to six decimals.
    pub longitude: String,
    /// Altitude in meters.
    pub altitude: String,
    /// Horizontal accuracy in meters.
    pub accuracy: String,
    /// Vertical accuracy in meters.
    pub altitude_accuracy: String,
    /// Speed in km/h.
    pub speed: String,
    /// Heading in degrees with compass label.
    pub heading: String,
    /// `Moving` or `Stationary`.
    pub motion: &'static str,
}

impl Default for Readout {
    fn default() -> Self {
        Self::from_state(&TrackingState::idle())
    }
}

impl Readout {
    /// Format every value of `state`.
    #[must_use]
    pub fn from_state(state: &TrackingState) -> Self {
        let coordinates = state.coordinates;
        Self {
            latitude: or_placeholder(coordinates.map(|c| format!("{:.6}", c.lat))),
            longitude: or_placeholder(coordinates.map(|c| format!("{:.6}", c.lng))),
            altitude: or_placeholder(state.altitude_meters.map(|a| format!("{a:.1} meters"))),
            accuracy: or_placeholder(state.accuracy_meters.map(|a| format!("±{a:.1} meters"))),
            altitude_accuracy: or_placeholder(
                state
                    .altitude_accuracy_meters
                    .map(|a| format!("±{a:.1} meters")),
            ),
            speed: or_placeholder(
                state
                    .speed_mps
                    .map(|s| format!("{:.1} km/h", s * KMH_PER_MPS)),
            ),
            heading: or_placeholder(heading_text(state.heading_degrees)),
            motion: if state.is_moving {
                "Moving"
            } else {
                "Stationary"
            },
        }
    }
}

fn heading_text(heading: Option<f64>) -> Option<String> {
    let label = compass_label(heading)?;
    heading.map(|h| format!("{}° {label}", h.round()))
}

fn or_placeholder(value: Option<String>) -> String {
    value.unwrap_or_else(|| PLACEHOLDER.to_string())
}

#[cfg(test)]
mod tests {
    use geotrack_location::PositionSample;

    use super::*;
    use crate::normalize;

    #[test]
    fn found_state_is_formatted() {
        let state = normalize(&PositionSample {
            altitude: Some(31.48),
            heading: Some(89.6),
            speed: Some(2.0),
            ..PositionSample::new(22.3118, 114.222, 12.0, 1)
        });
        let readout = Readout::from_state(&state);

        assert_eq!(readout.latitude, "22.311800");
        assert_eq!(readout.longitude, "114.222000");
        assert_eq!(readout.altitude, "31.5 meters");
        assert_eq!(readout.accuracy, "±12.0 meters");
        assert_eq!(readout.altitude_accuracy, PLACEHOLDER);
        assert_eq!(readout.speed, "7.2 km/h");
        assert_eq!(readout.heading, "90° E");
        assert_eq!(readout.motion, "Moving");
    }

    #[test]
    fn missing_values_use_placeholder() {
        let readout = Readout::default();
        assert_eq!(readout.latitude, PLACEHOLDER);
        assert_eq!(readout.heading, PLACEHOLDER);
        assert_eq!(readout.motion, "Stationary");
    }

    #[test]
    fn permission_message_mentions_permission() {
        assert!(status_message(TrackingStatus::PermissionDenied).contains("permission"));
    }
}
