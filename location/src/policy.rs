use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Errors raised when building a [`SamplingPolicy`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    /// A request must be allowed some time to complete.
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}

/// Accuracy, timeout and freshness settings for a location request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPolicy", into = "RawPolicy")]
pub struct SamplingPolicy {
    high_accuracy: bool,
    timeout: Duration,
    max_cache_age: Duration,
}

impl SamplingPolicy {
    /// Create a policy.
    ///
    /// A `max_cache_age_ms` of zero forbids answering from a cached fix.
    ///
    /// # Errors
    /// Returns [`PolicyError::ZeroTimeout`] if `timeout_ms` is zero.
    pub const fn new(
        high_accuracy: bool,
        timeout_ms: u64,
        max_cache_age_ms: u64,
    ) -> Result<Self, PolicyError> {
        if timeout_ms == 0 {
            return Err(PolicyError::ZeroTimeout);
        }
        Ok(Self {
            high_accuracy,
            timeout: Duration::from_millis(timeout_ms),
            max_cache_age: Duration::from_millis(max_cache_age_ms),
        })
    }

    /// Whether the most accurate positioning source should be used.
    #[must_use]
    pub const fn high_accuracy(&self) -> bool {
        self.high_accuracy
    }

    /// How long a single fix may take.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The oldest cached fix that may be returned instead of a fresh one.
    #[must_use]
    pub const fn max_cache_age(&self) -> Duration {
        self.max_cache_age
    }

    /// Whether cached fixes may be returned at all.
    #[must_use]
    pub const fn allows_cached(&self) -> bool {
        !self.max_cache_age.is_zero()
    }

    /// Same policy with a different timeout.
    ///
    /// # Errors
    /// Returns [`PolicyError::ZeroTimeout`] if `timeout_ms` is zero.
    pub const fn with_timeout_ms(self, timeout_ms: u64) -> Result<Self, PolicyError> {
        Self::new(
            self.high_accuracy,
            timeout_ms,
            duration_millis(self.max_cache_age),
        )
    }
}

impl Default for SamplingPolicy {
    /// High accuracy, five second timeout, never cached.
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_millis(5_000),
            max_cache_age: Duration::ZERO,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPolicy {
    #[serde(default = "default_high_accuracy")]
    high_accuracy: bool,
    #[serde(default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(default)]
    max_cache_age_ms: u64,
}

const fn default_high_accuracy() -> bool {
    true
}

const fn default_timeout_ms() -> u64 {
    5_000
}

const fn duration_millis(duration: Duration) -> u64 {
    duration.as_secs() * 1_000 + duration.subsec_millis() as u64
}

impl TryFrom<RawPolicy> for SamplingPolicy {
    type Error = PolicyError;

    fn try_from(raw: RawPolicy) -> Result<Self, Self::Error> {
        Self::new(raw.high_accuracy, raw.timeout_ms, raw.max_cache_age_ms)
    }
}

impl From<SamplingPolicy> for RawPolicy {
    fn from(policy: SamplingPolicy) -> Self {
        Self {
            high_accuracy: policy.high_accuracy,
            timeout_ms: duration_millis(policy.timeout),
            max_cache_age_ms: duration_millis(policy.max_cache_age),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_timeout_is_rejected() {
        assert_eq!(
            SamplingPolicy::new(true, 0, 0),
            Err(PolicyError::ZeroTimeout)
        );
    }

    #[test]
    fn zero_cache_age_forbids_cached_fixes() {
        let policy = SamplingPolicy::new(false, 15_000, 0).unwrap();
        assert!(!policy.allows_cached());
        assert_eq!(policy.timeout(), Duration::from_secs(15));

        let relaxed = SamplingPolicy::new(false, 15_000, 60_000).unwrap();
        assert!(relaxed.allows_cached());
    }

    #[test]
    fn json_uses_millisecond_fields() {
        let policy: SamplingPolicy =
            serde_json::from_str(r#"{"highAccuracy": false, "timeoutMs": 15000}"#).unwrap();
        assert!(!policy.high_accuracy());
        assert_eq!(policy.timeout(), Duration::from_secs(15));
        assert_eq!(policy.max_cache_age(), Duration::ZERO);

        let err = serde_json::from_str::<SamplingPolicy>(r#"{"timeoutMs": 0}"#).unwrap_err();
        assert!(err.to_string().contains("timeout must be greater than zero"));
    }
}
