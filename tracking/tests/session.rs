use std::sync::Arc;

use futures::StreamExt;
use geotrack_location::{
    PermissionStatus, PlatformError, PositionSample, ReplayProvider, ReplayStep, Sampler,
};
use geotrack_map::{LngLat, MapCommand, RecordingRenderer};
use geotrack_tracking::{
    FeedEvent, PLACEHOLDER, SamplingMode, ScreenConfig, SessionError, TrackingSession,
    TrackingStatus,
};

fn kowloon_bay(timestamp: u64) -> PositionSample {
    PositionSample::new(22.3118, 114.222, 12.0, timestamp)
}

fn mount(
    config: ScreenConfig,
    steps: Vec<ReplayStep>,
) -> (Arc<ReplayProvider>, RecordingRenderer, TrackingSession) {
    let provider = Arc::new(ReplayProvider::new(steps));
    let renderer = RecordingRenderer::new();
    let session = TrackingSession::mount(
        config,
        Sampler::new(provider.clone()),
        Some(Arc::new(renderer.clone())),
    )
    .unwrap();
    (provider, renderer, session)
}

fn drawn(renderer: &RecordingRenderer) -> Vec<MapCommand> {
    renderer
        .commands()
        .into_iter()
        .filter(|c| !matches!(c, MapCommand::CreateMap { .. }))
        .collect()
}

#[tokio::test]
async fn first_fix_places_marker_circle_and_camera() {
    let (_, renderer, mut session) = mount(
        ScreenConfig::dashboard(),
        vec![ReplayStep::fix(kowloon_bay(1))],
    );
    assert_eq!(session.state().status, TrackingStatus::Idle);

    let feed = session.start().await.unwrap();
    assert_eq!(session.state().status, TrackingStatus::Detecting);
    assert_eq!(session.view().status_line, "Detecting your location...");
    session.drive(feed).await.unwrap();

    let state = session.state();
    assert_eq!(state.status, TrackingStatus::Found);
    assert_eq!(state.coordinates, Some(LngLat::new(114.222, 22.3118)));
    assert_eq!(state.accuracy_meters, Some(12.0));
    assert!(!state.is_moving);
    assert_eq!(session.view().readout.latitude, "22.311800");
    assert_eq!(session.view().readout.altitude, PLACEHOLDER);

    let commands = drawn(&renderer);
    assert_eq!(commands.len(), 3);
    assert!(commands.iter().any(|c| matches!(
        c,
        MapCommand::AddMarker { marker, .. } if marker.color.as_deref() == Some("#FF0000")
    )));
    assert!(commands.iter().any(|c| matches!(
        c,
        MapCommand::AddCircle { circle, .. } if (circle.radius_meters - 12.0).abs() < f64::EPSILON
    )));
    assert!(commands.iter().any(|c| matches!(
        c,
        MapCommand::FlyTo { camera, .. } if camera.center == LngLat::new(114.222, 22.3118)
    )));
}

#[tokio::test]
async fn permission_denied_only_updates_text() {
    let (_, renderer, mut session) = mount(
        ScreenConfig::dashboard(),
        vec![ReplayStep::fail(
            PlatformError::PERMISSION_DENIED,
            "User denied Geolocation",
        )],
    );

    let feed = session.start().await.unwrap();
    session.drive(feed).await.unwrap();

    assert_eq!(session.state().status, TrackingStatus::PermissionDenied);
    assert_eq!(session.state().coordinates, None);
    assert!(session.view().status_line.contains("permission"));
    assert!(drawn(&renderer).is_empty());
}

#[tokio::test]
async fn watch_recovers_after_a_failure() {
    let (_, renderer, mut session) = mount(
        ScreenConfig::dashboard(),
        vec![
            ReplayStep::fail(PlatformError::POSITION_UNAVAILABLE, "No fix yet"),
            ReplayStep::fix(kowloon_bay(1)),
            ReplayStep::Stall,
        ],
    );
    let mut feed = session.start().await.unwrap();

    let event = feed.next().await.unwrap();
    assert!(session.handle(event).unwrap());
    assert_eq!(session.state().status, TrackingStatus::Unavailable);
    assert!(drawn(&renderer).is_empty());

    let event = feed.next().await.unwrap();
    assert!(session.handle(event).unwrap());
    assert_eq!(session.state().status, TrackingStatus::Found);
    assert_eq!(
        renderer.count(|c| matches!(c, MapCommand::AddMarker { .. })),
        1
    );
}

#[tokio::test]
async fn unmount_stops_the_watch_and_releases_the_map() {
    let (provider, renderer, mut session) = mount(
        ScreenConfig::live_tracker(),
        vec![ReplayStep::fix(kowloon_bay(1)), ReplayStep::Stall],
    );
    let mut feed = session.start().await.unwrap();
    let event = feed.next().await.unwrap();
    session.handle(event.clone()).unwrap();
    assert_eq!(provider.active_watches(), 1);
    assert!(session.in_flight());

    session.unmount().unwrap();

    assert!(!session.is_mounted());
    assert_eq!(session.state().status, TrackingStatus::Idle);
    assert!(feed.next().await.is_none());
    assert_eq!(provider.active_watches(), 0);
    assert!(renderer.live_maps().is_empty());
    assert!(matches!(
        renderer.commands().last(),
        Some(MapCommand::Destroy { .. })
    ));

    let before = renderer.commands().len();
    assert!(!session.handle(event).unwrap());
    assert_eq!(renderer.commands().len(), before);
    assert!(matches!(session.start().await, Err(SessionError::Unmounted)));
    session.unmount().unwrap();
}

#[tokio::test]
async fn dropping_the_session_releases_the_map() {
    let (provider, renderer, mut session) = mount(
        ScreenConfig::dashboard(),
        vec![ReplayStep::fix(kowloon_bay(1)), ReplayStep::Stall],
    );
    let mut feed = session.start().await.unwrap();
    let event = feed.next().await.unwrap();
    session.handle(event).unwrap();

    drop(session);

    assert!(feed.next().await.is_none());
    assert_eq!(provider.active_watches(), 0);
    assert!(renderer.live_maps().is_empty());
}

#[tokio::test]
async fn superseded_one_shot_is_ignored() {
    let (provider, _, mut session) = mount(
        ScreenConfig::altitude_probe(),
        vec![ReplayStep::fix(PositionSample {
            altitude: Some(31.48),
            ..kowloon_bay(2)
        })],
    );
    assert!(session.map().is_none());

    let mut first = session.start().await.unwrap();
    assert!(matches!(session.start().await, Err(SessionError::RequestInFlight)));
    session.stop();
    let second = session.start().await.unwrap();
    assert_eq!(second.generation(), first.generation() + 1);

    assert!(first.next().await.is_none());
    let late = FeedEvent {
        generation: first.generation(),
        outcome: Ok(kowloon_bay(1)),
    };
    assert!(!session.handle(late).unwrap());
    assert_eq!(session.state().status, TrackingStatus::Detecting);

    session.drive(second).await.unwrap();
    assert_eq!(session.state().status, TrackingStatus::Found);
    assert_eq!(session.view().readout.altitude, "31.5 meters");
    assert_eq!(provider.requests(), 1);
    assert!(session.is_settled());
}

#[tokio::test]
async fn one_shot_can_be_retried_after_a_timeout() {
    let (_, _, mut session) = mount(
        ScreenConfig::altitude_probe(),
        vec![
            ReplayStep::fail(PlatformError::TIMEOUT, "Timeout expired"),
            ReplayStep::fix(kowloon_bay(1)),
        ],
    );

    let feed = session.start().await.unwrap();
    session.drive(feed).await.unwrap();
    assert_eq!(session.state().status, TrackingStatus::TimedOut);
    assert!(!session.in_flight());

    let feed = session.retry().await.unwrap();
    assert_eq!(session.state().status, TrackingStatus::Detecting);
    session.drive(feed).await.unwrap();
    assert_eq!(session.state().status, TrackingStatus::Found);
}

#[tokio::test]
async fn retry_is_refused_on_watch_screens() {
    let (_, _, mut session) = mount(ScreenConfig::dashboard(), Vec::new());
    assert_eq!(session.config().mode, SamplingMode::Continuous);
    assert!(matches!(session.retry().await, Err(SessionError::NotOneShot)));
}

#[tokio::test]
async fn unsupported_platform_issues_no_request() {
    let provider = Arc::new(ReplayProvider::unsupported());
    let renderer = RecordingRenderer::new();
    let mut session = TrackingSession::mount(
        ScreenConfig::live_tracker(),
        Sampler::new(provider.clone()),
        Some(Arc::new(renderer.clone())),
    )
    .unwrap();

    let mut feed = session.start().await.unwrap();

    assert!(feed.next().await.is_none());
    assert_eq!(session.state().status, TrackingStatus::Unsupported);
    assert_eq!(provider.requests(), 0);
    assert!(drawn(&renderer).is_empty());
    assert!(session.is_settled());
}

#[tokio::test]
async fn dropped_one_shot_feed_can_be_retried() {
    let (provider, _, mut session) = mount(
        ScreenConfig::altitude_probe(),
        vec![ReplayStep::fix(kowloon_bay(1))],
    );

    let feed = session.start().await.unwrap();
    assert!(session.in_flight());
    drop(feed);

    assert!(!session.in_flight());
    let feed = session.retry().await.unwrap();
    session.drive(feed).await.unwrap();
    assert_eq!(session.state().status, TrackingStatus::Found);
    assert_eq!(provider.requests(), 1);
}

#[tokio::test]
async fn refused_permission_skips_the_request() {
    let provider = Arc::new(
        ReplayProvider::new(vec![ReplayStep::fix(kowloon_bay(1))])
            .with_permission(PermissionStatus::Denied),
    );
    let renderer = RecordingRenderer::new();
    let mut session = TrackingSession::mount(
        ScreenConfig::dashboard(),
        Sampler::new(provider.clone()),
        Some(Arc::new(renderer.clone())),
    )
    .unwrap();

    let mut feed = session.start().await.unwrap();

    assert!(feed.next().await.is_none());
    assert_eq!(session.state().status, TrackingStatus::PermissionDenied);
    assert!(session.view().status_line.contains("permission"));
    assert_eq!(provider.requests(), 0);
    assert_eq!(provider.active_watches(), 0);
    assert!(drawn(&renderer).is_empty());
    assert!(session.is_settled());
}

#[tokio::test]
async fn undecided_permission_still_requests() {
    let provider = Arc::new(
        ReplayProvider::new(vec![ReplayStep::fix(kowloon_bay(1))])
            .with_permission(PermissionStatus::NotDetermined),
    );
    let mut session = TrackingSession::mount(
        ScreenConfig::altitude_probe(),
        Sampler::new(provider.clone()),
        None,
    )
    .unwrap();

    let feed = session.start().await.unwrap();
    session.drive(feed).await.unwrap();

    assert_eq!(session.state().status, TrackingStatus::Found);
    assert_eq!(provider.requests(), 1);
}

#[tokio::test]
async fn stop_before_any_outcome_returns_to_idle() {
    let (provider, _, mut session) = mount(ScreenConfig::dashboard(), vec![ReplayStep::Stall]);
    let mut feed = session.start().await.unwrap();
    assert_eq!(session.state().status, TrackingStatus::Detecting);

    session.stop();

    assert_eq!(session.state().status, TrackingStatus::Idle);
    assert_eq!(session.view().status_line, "Waiting to locate");
    assert!(!session.in_flight());
    assert!(feed.next().await.is_none());
    assert_eq!(provider.active_watches(), 0);
}

#[tokio::test]
async fn stop_keeps_the_last_fix() {
    let (_, _, mut session) = mount(
        ScreenConfig::dashboard(),
        vec![ReplayStep::fix(kowloon_bay(1)), ReplayStep::Stall],
    );
    let mut feed = session.start().await.unwrap();
    let event = feed.next().await.unwrap();
    session.handle(event).unwrap();

    session.stop();

    assert_eq!(session.state().status, TrackingStatus::Found);
    assert!(session.is_settled());
}
