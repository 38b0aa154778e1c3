//! Location tracking for map screens.
//!
//! Fixes from [`geotrack_location`] are normalized into a [`TrackingState`],
//! which a [`Presenter`] turns into text and, when the screen has a map, into
//! idempotent map commands. [`TrackingSession`] ties these together for one
//! screen, from mount to unmount.
//!
//! # Usage
//!
//! ```ignore
//! use geotrack_location::Sampler;
//! use geotrack_tracking::{ScreenConfig, TrackingSession};
//!
//! let mut session = TrackingSession::mount(ScreenConfig::altitude_probe(), Sampler::platform(), None)?;
//! let feed = session.start().await?;
//! session.drive(feed).await?;
//! println!("{}", session.view().status_line);
//! ```

#![warn(missing_docs)]

mod compass;
mod config;
mod normalize;
mod presenter;
mod readout;
mod session;
mod state;

pub use compass::{CompassPoint, compass_label};
pub use config::{SamplingMode, ScreenConfig};
pub use normalize::{MOVING_THRESHOLD_MPS, normalize, normalize_error, status_for};
pub use presenter::{ACCURACY_LAYER, MARKER_LAYER, Presenter, PresenterConfig, PresenterView};
pub use readout::{PLACEHOLDER, Readout, status_message};
pub use session::{Feed, FeedEvent, SessionError, TrackingSession};
pub use state::{TrackingState, TrackingStatus};
