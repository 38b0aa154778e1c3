//! Geolocation sampling.
//!
//! This crate requests location fixes from the platform, either once or as a
//! continuous watch, and surfaces them as [`PositionSample`]s together with a
//! closed [`LocationError`] taxonomy.
//!
//! # Usage
//!
//! ```ignore
//! use futures::StreamExt;
//! use geotrack_location::{Sampler, SamplingPolicy};
//!
//! let sampler = Sampler::platform();
//! let policy = SamplingPolicy::default();
//!
//! // One-shot fix
//! let fix = sampler.request_once(&policy).await?;
//! println!("{}, {}", fix.latitude, fix.longitude);
//!
//! // Or watch until cancelled
//! let mut watch = sampler.request_continuous(&policy)?;
//! let handle = watch.handle();
//! while let Some(event) = watch.next().await {
//!     println!("{event:?}");
//! }
//! handle.cancel();
//! ```

#![warn(missing_docs)]

mod policy;
pub mod replay;
mod sampler;
mod subscription;
/// Platform-specific implementations.
pub mod sys;

use std::fmt;
use std::pin::Pin;

use futures::Stream;
use futures::future::{self, BoxFuture};
use serde::{Deserialize, Serialize};

pub use policy::{PolicyError, SamplingPolicy};
pub use replay::{ReplayProvider, ReplayStep};
pub use sampler::Sampler;
pub use subscription::{Subscription, SubscriptionHandle};

/// A raw location fix as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSample {
    /// Latitude in degrees (-90 to 90).
    pub latitude: f64,
    /// Longitude in degrees (-180 to 180).
    pub longitude: f64,
    /// Altitude in meters above sea level, if available.
    #[serde(default)]
    pub altitude: Option<f64>,
    /// Horizontal accuracy radius in meters.
    pub accuracy: f64,
    /// Vertical accuracy in meters, if available.
    #[serde(default)]
    pub altitude_accuracy: Option<f64>,
    /// Direction of travel in degrees clockwise from true north, if available.
    #[serde(default)]
    pub heading: Option<f64>,
    /// Ground speed in meters per second, if available.
    #[serde(default)]
    pub speed: Option<f64>,
    /// Timestamp as Unix epoch milliseconds.
    #[serde(default)]
    pub timestamp: u64,
}

impl PositionSample {
    /// A fix with only the mandatory fields set.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: u64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy,
            altitude_accuracy: None,
            heading: None,
            speed: None,
            timestamp,
        }
    }
}

/// A coded failure reported by a platform provider.
///
/// Codes follow the W3C geolocation numbering so that providers backed by
/// browser-like APIs can forward them untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformError {
    /// Platform error code.
    pub code: u16,
    /// Human readable detail from the platform.
    #[serde(default)]
    pub message: String,
}

impl PlatformError {
    /// The user or the system refused location access.
    pub const PERMISSION_DENIED: u16 = 1;
    /// No position could be determined.
    pub const POSITION_UNAVAILABLE: u16 = 2;
    /// The platform gave up waiting for a fix.
    pub const TIMEOUT: u16 = 3;

    /// Create a platform error.
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for PlatformError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR({}): {}", self.code, self.message)
    }
}

/// Errors that can occur when sampling location.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    /// The platform has no location capability.
    #[error("geolocation is not supported")]
    Unsupported,
    /// Location permission was not granted.
    #[error("location permission denied")]
    PermissionDenied,
    /// No position could be determined.
    #[error("location not available")]
    PositionUnavailable,
    /// Location request timed out.
    #[error("location request timed out")]
    TimedOut,
    /// Any platform failure without a dedicated variant.
    #[error("unknown error: {0}")]
    Unknown(String),
}

impl LocationError {
    /// Whether retrying (or keeping a watch open) may still yield a fix.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::PositionUnavailable | Self::TimedOut | Self::Unknown(_)
        )
    }
}

impl From<&PlatformError> for LocationError {
    fn from(err: &PlatformError) -> Self {
        match err.code {
            PlatformError::PERMISSION_DENIED => Self::PermissionDenied,
            PlatformError::POSITION_UNAVAILABLE => Self::PositionUnavailable,
            PlatformError::TIMEOUT => Self::TimedOut,
            _ => Self::Unknown(err.to_string()),
        }
    }
}

impl From<PlatformError> for LocationError {
    fn from(err: PlatformError) -> Self {
        Self::from(&err)
    }
}

/// Result type for location operations.
pub type LocationResult<T> = Result<T, LocationError>;

/// A boxed stream of raw platform fixes and failures.
///
/// Dropping the stream releases the underlying platform watch.
pub type PositionStream = Pin<Box<dyn Stream<Item = Result<PositionSample, PlatformError>> + Send>>;

/// Whether the user lets this application read the location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionStatus {
    /// Location access has been granted.
    Granted,
    /// Location access has been denied by the user.
    Denied,
    /// Location access is blocked by policy.
    Restricted,
    /// The user has not decided yet; a request may prompt.
    #[default]
    NotDetermined,
}

impl PermissionStatus {
    /// Whether a request is certain to fail with a permission error.
    #[must_use]
    pub const fn is_refused(self) -> bool {
        matches!(self, Self::Denied | Self::Restricted)
    }
}

/// The location capability of a platform.
pub trait LocationProvider: Send + Sync + fmt::Debug {
    /// Whether the platform can sample location at all.
    fn is_supported(&self) -> bool;

    /// Current permission state, checked without prompting.
    ///
    /// Platforms that only learn about permission when a request is made
    /// report [`PermissionStatus::NotDetermined`].
    fn permission_status(&self) -> BoxFuture<'static, PermissionStatus> {
        Box::pin(future::ready(PermissionStatus::NotDetermined))
    }

    /// Request a single fix.
    fn current_position(
        &self,
        policy: &SamplingPolicy,
    ) -> BoxFuture<'static, Result<PositionSample, PlatformError>>;

    /// Start a continuous watch.
    ///
    /// # Errors
    /// Returns a [`PlatformError`] if the watch cannot be started.
    fn watch_position(&self, policy: &SamplingPolicy) -> Result<PositionStream, PlatformError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_codes_map_onto_taxonomy() {
        let cases = [
            (1, LocationError::PermissionDenied),
            (2, LocationError::PositionUnavailable),
            (3, LocationError::TimedOut),
        ];
        for (code, expected) in cases {
            assert_eq!(LocationError::from(PlatformError::new(code, "x")), expected);
        }

        let unknown = LocationError::from(PlatformError::new(42, "kernel panic"));
        assert_eq!(
            unknown,
            LocationError::Unknown("ERROR(42): kernel panic".to_string())
        );
    }

    #[test]
    fn only_access_failures_are_permanent() {
        assert!(!LocationError::Unsupported.is_transient());
        assert!(!LocationError::PermissionDenied.is_transient());
        assert!(LocationError::TimedOut.is_transient());
        assert!(LocationError::PositionUnavailable.is_transient());
        assert!(LocationError::Unknown(String::new()).is_transient());
    }

    #[test]
    fn denied_and_restricted_refuse_requests() {
        assert!(PermissionStatus::Denied.is_refused());
        assert!(PermissionStatus::Restricted.is_refused());
        assert!(!PermissionStatus::Granted.is_refused());
        assert!(!PermissionStatus::NotDetermined.is_refused());
    }

    #[test]
    fn sample_json_allows_missing_optionals() {
        let sample: PositionSample =
            serde_json::from_str(r#"{"latitude": 22.3118, "longitude": 114.222, "accuracy": 12}"#)
                .unwrap();
        assert_eq!(sample, PositionSample::new(22.3118, 114.222, 12.0, 0));
    }
}
