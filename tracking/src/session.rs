use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, AbortHandle, Abortable};
use futures::stream::{self, BoxStream, Stream, StreamExt};
use geotrack_location::{
    LocationError, LocationResult, PositionSample, Sampler, SubscriptionHandle,
};
use geotrack_map::{MapError, MapHandle, MapRenderer};
use log::{debug, info, warn};

use crate::{
    Presenter, PresenterView, SamplingMode, ScreenConfig, TrackingState, TrackingStatus,
    normalize, normalize_error,
};

/// Errors raised by a [`TrackingSession`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The session was unmounted.
    #[error("tracking session is unmounted")]
    Unmounted,
    /// A request is still outstanding.
    #[error("a location request is already in flight")]
    RequestInFlight,
    /// Only one-shot screens can be retried.
    #[error("retry is only available on one-shot screens")]
    NotOneShot,
    /// A map command failed.
    #[error(transparent)]
    Map(#[from] MapError),
}

/// One sampling outcome, tagged with the request generation that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    /// Generation of the `start`/`retry` call.
    pub generation: u64,
    /// The fix or failure.
    pub outcome: LocationResult<PositionSample>,
}

/// Outcomes of one `start`/`retry`, to be passed to
/// [`TrackingSession::handle`].
///
/// Dropping a feed abandons its request.
pub struct Feed {
    generation: u64,
    inner: BoxStream<'static, FeedEvent>,
    abort: Option<AbortHandle>,
}

impl fmt::Debug for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feed")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl Feed {
    fn empty(generation: u64) -> Self {
        Self {
            generation,
            inner: stream::empty().boxed(),
            abort: None,
        }
    }

    /// Generation of the request this feed belongs to.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        if let Some(abort) = &self.abort {
            abort.abort();
        }
    }
}

impl Stream for Feed {
    type Item = FeedEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

#[derive(Debug)]
enum Outstanding {
    Nothing,
    OneShot(AbortHandle),
    Watch(SubscriptionHandle),
}

/// The context of one tracking screen, from mount to unmount.
///
/// Owns the screen's map, presenter and state. Requests are started with
/// [`start`](Self::start), which returns a [`Feed`]; each outcome read from
/// the feed goes through [`handle`](Self::handle), or the whole feed through
/// [`drive`](Self::drive). Outcomes of superseded requests, and anything
/// arriving after unmount, are ignored.
#[derive(Debug)]
pub struct TrackingSession {
    config: ScreenConfig,
    sampler: Sampler,
    map: Option<MapHandle>,
    presenter: Presenter,
    state: TrackingState,
    generation: u64,
    outstanding: Outstanding,
    mounted: bool,
}

impl TrackingSession {
    /// Mount a screen.
    ///
    /// A map is created when the configuration asks for one and a renderer is
    /// given; otherwise the screen is text-only.
    ///
    /// # Errors
    /// Returns [`SessionError::Map`] if the map cannot be created.
    pub fn mount(
        config: ScreenConfig,
        sampler: Sampler,
        renderer: Option<Arc<dyn MapRenderer>>,
    ) -> Result<Self, SessionError> {
        let map = match (&config.map, renderer) {
            (Some(options), Some(renderer)) => Some(MapHandle::create(renderer, options)?),
            _ => None,
        };
        info!(
            "tracking session mounted ({:?}, {})",
            config.mode,
            if map.is_some() { "map" } else { "text only" }
        );
        let presenter = Presenter::new(config.presenter.clone());
        Ok(Self {
            config,
            sampler,
            map,
            presenter,
            state: TrackingState::idle(),
            generation: 0,
            outstanding: Outstanding::Nothing,
            mounted: true,
        })
    }

    /// Current tracking state.
    #[must_use]
    pub const fn state(&self) -> &TrackingState {
        &self.state
    }

    /// Text for the current state.
    #[must_use]
    pub const fn view(&self) -> &PresenterView {
        self.presenter.view()
    }

    /// The screen's configuration.
    #[must_use]
    pub const fn config(&self) -> &ScreenConfig {
        &self.config
    }

    /// The screen's map, if it has one.
    #[must_use]
    pub const fn map(&self) -> Option<&MapHandle> {
        self.map.as_ref()
    }

    /// Generation of the latest `start`/`retry`.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the session is still mounted.
    #[must_use]
    pub const fn is_mounted(&self) -> bool {
        self.mounted
    }

    /// Whether a request is outstanding.
    #[must_use]
    pub fn in_flight(&self) -> bool {
        match &self.outstanding {
            Outstanding::Nothing => false,
            Outstanding::OneShot(abort) => !abort.is_aborted(),
            Outstanding::Watch(handle) => !handle.is_cancelled(),
        }
    }

    /// A handle that ends the current watch, for use from another task while
    /// [`drive`](Self::drive) runs.
    #[must_use]
    pub fn watch_handle(&self) -> Option<SubscriptionHandle> {
        match &self.outstanding {
            Outstanding::Watch(handle) => Some(handle.clone()),
            _ => None,
        }
    }

    /// Request location according to the screen's mode.
    ///
    /// Moves to `Detecting`. Without issuing a request it moves straight to
    /// `Unsupported` when the platform cannot sample location, or to
    /// `PermissionDenied` when access is already refused.
    ///
    /// # Errors
    /// Returns [`SessionError::Unmounted`] after unmount,
    /// [`SessionError::RequestInFlight`] while a previous request is
    /// outstanding, and [`SessionError::Map`] if updating the map fails.
    pub async fn start(&mut self) -> Result<Feed, SessionError> {
        if !self.mounted {
            return Err(SessionError::Unmounted);
        }
        if self.in_flight() {
            return Err(SessionError::RequestInFlight);
        }
        self.generation += 1;
        let generation = self.generation;

        if !self.sampler.is_supported() {
            self.apply(normalize_error(&LocationError::Unsupported))?;
            return Ok(Feed::empty(generation));
        }

        let permission = self.sampler.permission_status().await;
        if permission.is_refused() {
            info!("location access is {permission:?}, not requesting a fix");
            self.apply(normalize_error(&LocationError::PermissionDenied))?;
            return Ok(Feed::empty(generation));
        }

        let policy = self.config.policy;
        let mut abort = None;
        let inner = match self.config.mode {
            SamplingMode::OneShot => {
                let sampler = self.sampler.clone();
                let (handle, registration) = AbortHandle::new_pair();
                let request = Abortable::new(
                    async move { sampler.request_once(&policy).await },
                    registration,
                );
                abort = Some(handle.clone());
                self.outstanding = Outstanding::OneShot(handle);
                stream::once(request)
                    .filter_map(move |result| {
                        future::ready(result.ok().map(|outcome| FeedEvent {
                            generation,
                            outcome,
                        }))
                    })
                    .boxed()
            }
            SamplingMode::Continuous => match self.sampler.request_continuous(&policy) {
                Ok(subscription) => {
                    self.outstanding = Outstanding::Watch(subscription.handle());
                    subscription
                        .map(move |outcome| FeedEvent {
                            generation,
                            outcome,
                        })
                        .boxed()
                }
                Err(err) => {
                    self.apply(normalize_error(&err))?;
                    return Ok(Feed::empty(generation));
                }
            },
        };

        self.apply(TrackingState::detecting())?;
        debug!("location request {generation} started");
        Ok(Feed {
            generation,
            inner,
            abort,
        })
    }

    /// Ask for a new fix on a one-shot screen.
    ///
    /// # Errors
    /// Returns [`SessionError::NotOneShot`] on continuous screens, otherwise
    /// the same errors as [`start`](Self::start).
    pub async fn retry(&mut self) -> Result<Feed, SessionError> {
        if self.config.mode != SamplingMode::OneShot {
            return Err(SessionError::NotOneShot);
        }
        self.start().await
    }

    /// Apply one outcome.
    ///
    /// Returns whether it was applied; outcomes of superseded requests and
    /// anything arriving after unmount are ignored.
    ///
    /// # Errors
    /// Returns [`SessionError::Map`] if updating the map fails. The state is
    /// updated regardless.
    pub fn handle(&mut self, event: FeedEvent) -> Result<bool, SessionError> {
        if !self.mounted {
            debug!("ignoring location outcome after unmount");
            return Ok(false);
        }
        if event.generation != self.generation {
            debug!(
                "ignoring outcome of request {} (current {})",
                event.generation, self.generation
            );
            return Ok(false);
        }
        if matches!(self.outstanding, Outstanding::OneShot(_)) {
            self.outstanding = Outstanding::Nothing;
        }

        let state = match &event.outcome {
            Ok(sample) => normalize(sample),
            Err(err) => {
                warn!("location request {} failed: {err}", event.generation);
                normalize_error(err)
            }
        };
        self.apply(state)?;
        Ok(true)
    }

    /// Apply every outcome of `feed` until it ends.
    ///
    /// A one-shot feed ends after its single outcome; a watch ends when it is
    /// cancelled (see [`watch_handle`](Self::watch_handle)).
    ///
    /// # Errors
    /// Stops at the first error returned by [`handle`](Self::handle).
    pub async fn drive(&mut self, mut feed: Feed) -> Result<(), SessionError> {
        while let Some(event) = feed.next().await {
            self.handle(event)?;
        }
        Ok(())
    }

    /// Cancel the outstanding request, if any, keeping the screen mounted.
    ///
    /// A screen still waiting for its first outcome goes back to `Idle`;
    /// any other state is kept.
    pub fn stop(&mut self) {
        match std::mem::replace(&mut self.outstanding, Outstanding::Nothing) {
            Outstanding::Nothing => return,
            Outstanding::OneShot(abort) => abort.abort(),
            Outstanding::Watch(handle) => handle.cancel(),
        }
        debug!("location request {} stopped", self.generation);
        if self.state.status == TrackingStatus::Detecting {
            self.state = TrackingState::idle();
            // Idle draws nothing on the map.
            self.presenter.render_text(&self.state);
        }
    }

    /// Tear the screen down: cancel requests, discard state and release the
    /// map with everything drawn on it. Calling it again has no effect.
    ///
    /// # Errors
    /// Returns [`SessionError::Map`] if the map could not be released
    /// cleanly. The session is unmounted regardless.
    pub fn unmount(&mut self) -> Result<(), SessionError> {
        if !self.mounted {
            return Ok(());
        }
        self.mounted = false;
        self.stop();
        self.state = TrackingState::idle();
        let released = self.map.take().map_or(Ok(()), MapHandle::release);
        info!("tracking session unmounted");
        released.map_err(SessionError::from)
    }

    fn apply(&mut self, state: TrackingState) -> Result<(), SessionError> {
        if state.status != self.state.status {
            debug!("tracking status {:?} -> {:?}", self.state.status, state.status);
        }
        self.state = state;
        match self.map.as_mut() {
            Some(map) => self.presenter.sync(&self.state, map)?,
            None => self.presenter.render_text(&self.state),
        }
        Ok(())
    }

    /// Whether the session reached a state it will not leave on its own.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !self.in_flight()
            && !matches!(
                self.state.status,
                TrackingStatus::Idle | TrackingStatus::Detecting
            )
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        if let Err(err) = self.unmount() {
            warn!("tracking session did not unmount cleanly: {err}");
        }
    }
}
