use std::time::Duration;

use geotrack_map::{CameraMove, CircleStyle, LayerId, LngLat, MapHandle, MapResult, MarkerStyle};
use serde::{Deserialize, Serialize};

use crate::compass::compass_label;
use crate::readout::{Readout, status_message};
use crate::{TrackingState, TrackingStatus};

/// Layer holding the position marker.
pub const MARKER_LAYER: LayerId = LayerId::new("geotrack-position");
/// Layer holding the accuracy circle.
pub const ACCURACY_LAYER: LayerId = LayerId::new("geotrack-accuracy");

/// How a screen shows its position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PresenterConfig {
    /// Zoom level the camera flies to.
    pub zoom: f64,
    /// Length of each camera transition in milliseconds.
    pub fly_duration_ms: u64,
    /// Re-center the camera on every new position, not just the first.
    pub follow: bool,
    /// Turn the map so the direction of travel points up.
    pub bearing_follows_heading: bool,
    /// Rotate the marker towards the direction of travel.
    pub rotate_marker: bool,
    /// Marker color, renderer default if absent.
    pub marker_color: Option<String>,
    /// Draw the accuracy circle.
    pub show_accuracy: bool,
    /// Accuracy circle fill.
    pub circle_fill: String,
    /// Accuracy circle outline.
    pub circle_stroke: String,
    /// Show the compass label.
    pub show_compass: bool,
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            zoom: 16.0,
            fly_duration_ms: 1_000,
            follow: true,
            bearing_follows_heading: false,
            rotate_marker: false,
            marker_color: None,
            show_accuracy: true,
            circle_fill: "#4285F433".to_string(),
            circle_stroke: "#4285F4".to_string(),
            show_compass: false,
        }
    }
}

/// Text the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenterView {
    /// Status the text was derived from.
    pub status: TrackingStatus,
    /// One-line status message.
    pub status_line: &'static str,
    /// Formatted measurements.
    pub readout: Readout,
    /// Compass direction, when the compass is shown and a heading is known.
    pub compass: Option<&'static str>,
}

impl Default for PresenterView {
    fn default() -> Self {
        Self {
            status: TrackingStatus::Idle,
            status_line: status_message(TrackingStatus::Idle),
            readout: Readout::default(),
            compass: None,
        }
    }
}

#[derive(Debug, Clone)]
struct Placed {
    center: LngLat,
    marker: MarkerStyle,
    circle: Option<CircleStyle>,
}

/// Keeps a map and its status text consistent with a [`TrackingState`].
///
/// Remembers what it last drew so that repeated syncs with the same state
/// issue no map commands.
#[derive(Debug, Clone, Default)]
pub struct Presenter {
    config: PresenterConfig,
    placed: Option<Placed>,
    view: PresenterView,
}

impl Presenter {
    /// Create a presenter.
    #[must_use]
    pub fn new(config: PresenterConfig) -> Self {
        Self {
            config,
            placed: None,
            view: PresenterView::default(),
        }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &PresenterConfig {
        &self.config
    }

    /// The text rendered for the last state.
    #[must_use]
    pub const fn view(&self) -> &PresenterView {
        &self.view
    }

    /// Update the status text only. Used by screens without a map.
    pub fn render_text(&mut self, state: &TrackingState) {
        self.view = PresenterView {
            status: state.status,
            status_line: status_message(state.status),
            readout: Readout::from_state(state),
            compass: if self.config.show_compass {
                compass_label(state.heading_degrees)
            } else {
                None
            },
        };
    }

    /// Bring `map` and the status text in line with `state`.
    ///
    /// The first state with coordinates creates the marker and accuracy
    /// circle and flies the camera there. Later states update them in place;
    /// the circle is removed when accuracy becomes unknown. States without
    /// coordinates, including every failure, only update the text.
    ///
    /// # Errors
    /// Returns the first map command that failed. Nothing is remembered for
    /// the failed sync, so the next one retries.
    pub fn sync(&mut self, state: &TrackingState, map: &mut MapHandle) -> MapResult<()> {
        self.render_text(state);

        if state.status != TrackingStatus::Found {
            return Ok(());
        }
        let Some(center) = state.coordinates else {
            return Ok(());
        };

        let marker = self.marker_style(center, state.heading_degrees);
        let circle = self.circle_style(center, state.accuracy_meters);
        let previous = self.placed.as_ref();
        let first = previous.is_none();
        let moved = previous.is_none_or(|placed| placed.center != center);

        if previous.map(|placed| &placed.marker) != Some(&marker) {
            map.upsert_marker(&MARKER_LAYER, &marker)?;
        }
        match (previous.and_then(|placed| placed.circle.as_ref()), &circle) {
            (old, Some(new)) if old != Some(new) => map.upsert_circle(&ACCURACY_LAYER, new)?,
            (Some(_), None) => map.remove_layer(&ACCURACY_LAYER)?,
            _ => {}
        }
        if first || (self.config.follow && moved) {
            map.fly_to(&self.camera(center, state.heading_degrees))?;
        }

        self.placed = Some(Placed {
            center,
            marker,
            circle,
        });
        Ok(())
    }

    fn marker_style(&self, center: LngLat, heading: Option<f64>) -> MarkerStyle {
        MarkerStyle {
            lng_lat: center,
            rotation: heading.filter(|_| self.config.rotate_marker),
            color: self.config.marker_color.clone(),
        }
    }

    fn circle_style(&self, center: LngLat, accuracy: Option<f64>) -> Option<CircleStyle> {
        accuracy
            .filter(|_| self.config.show_accuracy)
            .map(|radius_meters| CircleStyle {
                center,
                radius_meters,
                fill_color: self.config.circle_fill.clone(),
                stroke_color: self.config.circle_stroke.clone(),
            })
    }

    fn camera(&self, center: LngLat, heading: Option<f64>) -> CameraMove {
        CameraMove {
            center,
            zoom: self.config.zoom,
            bearing: self
                .config
                .bearing_follows_heading
                .then(|| heading.unwrap_or(0.0)),
            duration: Duration::from_millis(self.config.fly_duration_ms),
        }
    }
}
