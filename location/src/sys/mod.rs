//! Platform-specific location providers.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{LocationProvider, PlatformError, PositionSample, PositionStream, SamplingPolicy};

#[cfg(target_os = "windows")]
mod windows;

#[cfg(target_os = "linux")]
mod linux;

#[cfg(target_os = "linux")]
pub use linux::GeoClueProvider;

#[cfg(target_os = "windows")]
pub use windows::GeolocatorProvider;

/// The location provider for the current platform.
#[must_use]
pub fn default_provider() -> Arc<dyn LocationProvider> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(GeoClueProvider::new())
    }
    #[cfg(target_os = "windows")]
    {
        Arc::new(GeolocatorProvider::new())
    }
    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Arc::new(UnsupportedProvider)
    }
}

/// A provider for platforms without location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedProvider;

impl LocationProvider for UnsupportedProvider {
    fn is_supported(&self) -> bool {
        false
    }

    fn current_position(
        &self,
        _policy: &SamplingPolicy,
    ) -> BoxFuture<'static, Result<PositionSample, PlatformError>> {
        Box::pin(async { Err(unsupported()) })
    }

    fn watch_position(&self, _policy: &SamplingPolicy) -> Result<PositionStream, PlatformError> {
        Err(unsupported())
    }
}

fn unsupported() -> PlatformError {
    PlatformError::new(
        PlatformError::POSITION_UNAVAILABLE,
        "geolocation is not supported on this platform",
    )
}

#[cfg(any(target_os = "linux", target_os = "windows"))]
fn timestamp_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Interval between polls of providers without native update callbacks.
#[cfg(any(target_os = "linux", target_os = "windows"))]
const POLL_INTERVAL: std::time::Duration = std::time::Duration::from_secs(1);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocationError, Sampler};

    #[tokio::test]
    async fn unsupported_provider_short_circuits() {
        let sampler = Sampler::new(Arc::new(UnsupportedProvider));
        assert!(!sampler.is_supported());
        assert_eq!(
            sampler.request_once(&SamplingPolicy::default()).await,
            Err(LocationError::Unsupported)
        );
    }
}
