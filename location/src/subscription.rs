use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_channel::{Receiver, Sender};
use futures::{Stream, StreamExt};
use futures_timer::Delay;
use log::{debug, warn};

use crate::sampler::FixCache;
use crate::{LocationError, LocationResult, PositionSample, PositionStream};

/// Cancels a [`Subscription`].
///
/// Cancellation signals via channel close, so every clone observes it and the
/// task polling the subscription is woken.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    sender: Sender<()>,
}

impl SubscriptionHandle {
    fn new() -> (Self, Receiver<()>) {
        let (sender, receiver) = async_channel::bounded(1);
        (Self { sender }, receiver)
    }

    /// Stop the watch. Calling this more than once has no further effect.
    pub fn cancel(&self) {
        if self.sender.close() {
            debug!("location subscription cancelled");
        }
    }

    /// Whether the subscription has been cancelled or has ended.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.sender.is_closed()
    }
}

/// A continuous location watch.
///
/// Yields every fix and every failure the platform reports. Failures never
/// end the watch; only cancellation, dropping, or the platform closing its
/// side does. When no fix arrives within the policy timeout a
/// [`LocationError::TimedOut`] is yielded and the watch keeps listening.
pub struct Subscription {
    stream: Option<PositionStream>,
    shutdown: Pin<Box<Receiver<()>>>,
    handle: SubscriptionHandle,
    timeout: Duration,
    deadline: Delay,
    cache: FixCache,
    last_timestamp: Option<u64>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.stream.is_some())
            .field("timeout", &self.timeout)
            .field("last_timestamp", &self.last_timestamp)
            .finish_non_exhaustive()
    }
}

impl Subscription {
    pub(crate) fn new(stream: PositionStream, timeout: Duration, cache: FixCache) -> Self {
        let (handle, shutdown) = SubscriptionHandle::new();
        Self {
            stream: Some(stream),
            shutdown: Box::pin(shutdown),
            handle,
            timeout,
            deadline: Delay::new(timeout),
            cache,
            last_timestamp: None,
        }
    }

    /// A handle that cancels this subscription.
    #[must_use]
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle.clone()
    }

    /// Drive the watch, invoking `on_sample` for each fix and `on_error` for
    /// each failure, until it is cancelled or the platform ends it.
    pub async fn deliver<S, E>(mut self, mut on_sample: S, mut on_error: E)
    where
        S: FnMut(PositionSample),
        E: FnMut(LocationError),
    {
        while let Some(event) = self.next().await {
            match event {
                Ok(sample) => on_sample(sample),
                Err(err) => on_error(err),
            }
        }
    }

    fn cancelled(&mut self, cx: &mut Context<'_>) -> bool {
        self.handle.is_cancelled()
            || matches!(self.shutdown.as_mut().poll_next(cx), Poll::Ready(None))
    }

    fn release(&mut self) {
        self.stream = None;
        self.handle.cancel();
    }
}

impl Stream for Subscription {
    type Item = LocationResult<PositionSample>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        loop {
            if this.stream.is_none() {
                return Poll::Ready(None);
            }
            if this.cancelled(cx) {
                this.release();
                return Poll::Ready(None);
            }
            let Some(stream) = this.stream.as_mut() else {
                return Poll::Ready(None);
            };

            match stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(sample))) => {
                    this.deadline.reset(this.timeout);
                    if this.handle.is_cancelled() {
                        continue;
                    }
                    if this
                        .last_timestamp
                        .is_some_and(|last| sample.timestamp < last)
                    {
                        debug!(
                            "discarding stale fix at {} (last delivered {:?})",
                            sample.timestamp, this.last_timestamp
                        );
                        continue;
                    }
                    this.last_timestamp = Some(sample.timestamp);
                    this.cache.remember(&sample);
                    return Poll::Ready(Some(Ok(sample)));
                }
                Poll::Ready(Some(Err(err))) => {
                    this.deadline.reset(this.timeout);
                    warn!("location watch reported {err}");
                    return Poll::Ready(Some(Err(LocationError::from(&err))));
                }
                Poll::Ready(None) => {
                    debug!("platform closed the location watch");
                    this.release();
                    return Poll::Ready(None);
                }
                Poll::Pending => {}
            }

            if Pin::new(&mut this.deadline).poll(cx).is_ready() {
                this.deadline.reset(this.timeout);
                warn!("no location fix within {:?}", this.timeout);
                return Poll::Ready(Some(Err(LocationError::TimedOut)));
            }
            return Poll::Pending;
        }
    }
}
