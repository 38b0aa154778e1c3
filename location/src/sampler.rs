use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use futures::future::{self, Either};
use futures_timer::Delay;
use log::{debug, warn};

use crate::subscription::Subscription;
use crate::{
    LocationError, LocationProvider, LocationResult, PermissionStatus, PositionSample,
    SamplingPolicy,
};

#[derive(Debug, Clone)]
struct CachedFix {
    sample: PositionSample,
    taken_at: Instant,
}

/// Most recent fix seen by a sampler, shared with its subscriptions.
#[derive(Debug, Clone, Default)]
pub(crate) struct FixCache(Arc<Mutex<Option<CachedFix>>>);

impl FixCache {
    pub(crate) fn remember(&self, sample: &PositionSample) {
        let mut guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(CachedFix {
            sample: sample.clone(),
            taken_at: Instant::now(),
        });
    }

    fn fresh(&self, policy: &SamplingPolicy) -> Option<PositionSample> {
        if !policy.allows_cached() {
            return None;
        }
        let guard = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|cached| cached.taken_at.elapsed() <= policy.max_cache_age())
            .map(|cached| cached.sample.clone())
    }
}

/// Requests location fixes from a [`LocationProvider`].
#[derive(Debug, Clone)]
pub struct Sampler {
    provider: Arc<dyn LocationProvider>,
    cache: FixCache,
}

impl Sampler {
    /// Create a sampler on top of the given provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self {
            provider,
            cache: FixCache::default(),
        }
    }

    /// Create a sampler backed by the current platform's provider.
    #[must_use]
    pub fn platform() -> Self {
        Self::new(crate::sys::default_provider())
    }

    /// Whether the underlying platform can sample location.
    #[must_use]
    pub fn is_supported(&self) -> bool {
        self.provider.is_supported()
    }

    /// Current location permission, checked without prompting and without
    /// issuing a location request.
    pub async fn permission_status(&self) -> PermissionStatus {
        let status = self.provider.permission_status().await;
        debug!("location permission is {status:?}");
        status
    }

    /// Request a single fix.
    ///
    /// Issues exactly one platform request unless the policy allows a cached
    /// fix and one is fresh enough. Dropping the returned future abandons the
    /// request.
    ///
    /// # Errors
    /// Returns [`LocationError::Unsupported`] without issuing a request when
    /// the platform has no location capability, [`LocationError::TimedOut`]
    /// when no fix arrives within the policy timeout, and the mapped platform
    /// error otherwise.
    pub async fn request_once(&self, policy: &SamplingPolicy) -> LocationResult<PositionSample> {
        if !self.provider.is_supported() {
            return Err(LocationError::Unsupported);
        }

        if let Some(sample) = self.cache.fresh(policy) {
            debug!("answering location request from cache");
            return Ok(sample);
        }

        let request = self.provider.current_position(policy);
        let deadline = Delay::new(policy.timeout());
        let result = match future::select(request, deadline).await {
            Either::Left((result, _)) => result.map_err(LocationError::from),
            Either::Right(((), _)) => {
                warn!(
                    "location request timed out after {:?}",
                    policy.timeout()
                );
                Err(LocationError::TimedOut)
            }
        };

        if let Ok(sample) = &result {
            self.cache.remember(sample);
        }
        result
    }

    /// Start watching the position until the returned subscription is
    /// cancelled or dropped.
    ///
    /// # Errors
    /// Returns [`LocationError::Unsupported`] without starting a watch when
    /// the platform has no location capability, or the mapped platform error
    /// if the watch cannot be started.
    pub fn request_continuous(&self, policy: &SamplingPolicy) -> LocationResult<Subscription> {
        if !self.provider.is_supported() {
            return Err(LocationError::Unsupported);
        }

        let stream = self
            .provider
            .watch_position(policy)
            .map_err(LocationError::from)?;
        Ok(Subscription::new(stream, policy.timeout(), self.cache.clone()))
    }
}
