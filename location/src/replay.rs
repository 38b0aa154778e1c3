//! Scripted location provider.
//!
//! [`ReplayProvider`] plays back a recorded sequence of fixes, failures and
//! stalls. Every request, one-shot or watch, consumes steps from the same
//! queue, which makes it suitable for demos and for exercising the sampler
//! without a positioning device.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::stream;
use futures_timer::Delay;
use serde::{Deserialize, Serialize};

use crate::{
    LocationProvider, PermissionStatus, PlatformError, PositionSample, PositionStream,
    SamplingPolicy,
};

/// One entry of a replay script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ReplayStep {
    /// Report a fix after an optional delay.
    Fix {
        /// The fix to report.
        sample: PositionSample,
        /// Delay before the fix is reported.
        #[serde(rename = "delayMs", default)]
        delay_ms: u64,
    },
    /// Report a platform failure after an optional delay.
    Fail {
        /// The failure to report.
        error: PlatformError,
        /// Delay before the failure is reported.
        #[serde(rename = "delayMs", default)]
        delay_ms: u64,
    },
    /// Never answer.
    Stall,
}

impl ReplayStep {
    /// An immediate fix.
    #[must_use]
    pub const fn fix(sample: PositionSample) -> Self {
        Self::Fix {
            sample,
            delay_ms: 0,
        }
    }

    /// An immediate failure.
    pub fn fail(code: u16, message: impl Into<String>) -> Self {
        Self::Fail {
            error: PlatformError::new(code, message),
            delay_ms: 0,
        }
    }

    /// The same step, reported after `delay_ms` milliseconds.
    #[must_use]
    pub fn after_ms(self, delay_ms: u64) -> Self {
        match self {
            Self::Fix { sample, .. } => Self::Fix { sample, delay_ms },
            Self::Fail { error, .. } => Self::Fail { error, delay_ms },
            Self::Stall => Self::Stall,
        }
    }

    async fn play(self) -> Result<PositionSample, PlatformError> {
        match self {
            Self::Fix { sample, delay_ms } => {
                pause(delay_ms).await;
                Ok(sample)
            }
            Self::Fail { error, delay_ms } => {
                pause(delay_ms).await;
                Err(error)
            }
            Self::Stall => future::pending().await,
        }
    }
}

async fn pause(delay_ms: u64) {
    if delay_ms > 0 {
        Delay::new(Duration::from_millis(delay_ms)).await;
    }
}

type Script = Arc<Mutex<VecDeque<ReplayStep>>>;

fn next_step(script: &Script) -> Option<ReplayStep> {
    script
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .pop_front()
}

/// Counts a live watch until dropped.
#[derive(Debug)]
struct WatchGuard(Arc<AtomicUsize>);

impl WatchGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A [`LocationProvider`] that replays a script.
#[derive(Debug)]
pub struct ReplayProvider {
    script: Script,
    supported: bool,
    permission: PermissionStatus,
    requests: AtomicUsize,
    watches: Arc<AtomicUsize>,
}

impl ReplayProvider {
    /// A provider that plays `steps` in order.
    #[must_use]
    pub fn new(steps: Vec<ReplayStep>) -> Self {
        Self {
            script: Arc::new(Mutex::new(steps.into())),
            supported: true,
            permission: PermissionStatus::Granted,
            requests: AtomicUsize::new(0),
            watches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A provider standing in for a platform without location capability.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Vec::new())
        }
    }

    /// The same provider reporting `permission` as its permission state.
    #[must_use]
    pub fn with_permission(self, permission: PermissionStatus) -> Self {
        Self { permission, ..self }
    }

    /// Number of platform requests issued so far (one-shot and watch).
    #[must_use]
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Number of watches that have not been released yet.
    #[must_use]
    pub fn active_watches(&self) -> usize {
        self.watches.load(Ordering::SeqCst)
    }

    /// Number of steps not played yet.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl LocationProvider for ReplayProvider {
    fn is_supported(&self) -> bool {
        self.supported
    }

    fn permission_status(&self) -> BoxFuture<'static, PermissionStatus> {
        Box::pin(future::ready(self.permission))
    }

    fn current_position(
        &self,
        _policy: &SamplingPolicy,
    ) -> BoxFuture<'static, Result<PositionSample, PlatformError>> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let step = next_step(&self.script);
        Box::pin(async move {
            match step {
                Some(step) => step.play().await,
                None => Err(PlatformError::new(
                    PlatformError::POSITION_UNAVAILABLE,
                    "replay script exhausted",
                )),
            }
        })
    }

    fn watch_position(&self, _policy: &SamplingPolicy) -> Result<PositionStream, PlatformError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let guard = WatchGuard::new(self.watches.clone());
        let script = self.script.clone();
        Ok(Box::pin(stream::unfold(
            (script, guard),
            |(script, guard)| async move {
                let step = next_step(&script)?;
                let item = step.play().await;
                Some((item, (script, guard)))
            },
        )))
    }
}

#[cfg(test)]
mod tests {
    use futures::StreamExt;

    use super::*;

    #[test]
    fn script_json_round_trip_shape() {
        let steps: Vec<ReplayStep> = serde_json::from_str(
            r#"[
                {"kind": "fix", "delayMs": 1000,
                 "sample": {"latitude": 22.3118, "longitude": 114.222, "accuracy": 12, "timestamp": 1}},
                {"kind": "fail", "error": {"code": 1, "message": "User denied Geolocation"}},
                {"kind": "stall"}
            ]"#,
        )
        .unwrap();

        assert_eq!(
            steps,
            vec![
                ReplayStep::fix(PositionSample::new(22.3118, 114.222, 12.0, 1)).after_ms(1000),
                ReplayStep::fail(1, "User denied Geolocation"),
                ReplayStep::Stall,
            ]
        );
    }

    #[tokio::test]
    async fn dropping_a_watch_releases_it() {
        let provider = ReplayProvider::new(vec![
            ReplayStep::fix(PositionSample::new(1.0, 2.0, 3.0, 1)),
            ReplayStep::Stall,
        ]);
        let mut watch = provider
            .watch_position(&SamplingPolicy::default())
            .unwrap();
        assert_eq!(provider.active_watches(), 1);
        assert!(watch.next().await.is_some());

        drop(watch);
        assert_eq!(provider.active_watches(), 0);
        assert_eq!(provider.remaining(), 1);
    }

    #[tokio::test]
    async fn exhausted_script_reports_unavailable() {
        let provider = ReplayProvider::new(Vec::new());
        let err = provider
            .current_position(&SamplingPolicy::default())
            .await
            .unwrap_err();
        assert_eq!(err.code, PlatformError::POSITION_UNAVAILABLE);
    }
}
