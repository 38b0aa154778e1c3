//! # Geotrack
//!
//! Geolocation sampling and live map tracking.
//!
//! Geotrack asks the platform for the device's position, once or
//! continuously, turns each fix into a normalized tracking state and keeps a
//! map and its status text in sync with it.
//!
//! ## Features
//!
//! - `location`: one-shot and continuous sampling with platform providers.
//! - `map`: the map render capability and scoped map handles.
//! - `tracking`: state normalization, the presenter and screen sessions.
//!
//! `full` (the default) enables everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! geotrack = { version = "0.1", default-features = false, features = ["location"] }
//! ```
//!
//! ```ignore
//! use geotrack::location::{Sampler, SamplingPolicy};
//!
//! async fn print_position() {
//!     if let Ok(fix) = Sampler::platform().request_once(&SamplingPolicy::default()).await {
//!         println!("Latitude: {}, Longitude: {}", fix.latitude, fix.longitude);
//!     }
//! }
//! ```

#[cfg(feature = "location")]
pub use geotrack_location as location;

#[cfg(feature = "map")]
pub use geotrack_map as map;

#[cfg(feature = "tracking")]
pub use geotrack_tracking as tracking;
