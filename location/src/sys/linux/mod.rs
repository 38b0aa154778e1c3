//! Linux location provider using the GeoClue2 D-Bus service.

use std::sync::OnceLock;

use futures::future::BoxFuture;
use futures::stream;
use futures_timer::Delay;
use log::warn;
use zbus::Connection;
use zbus::zvariant::{OwnedObjectPath, OwnedValue, Value};

use super::{POLL_INTERVAL, timestamp_now};
use crate::{LocationProvider, PlatformError, PositionSample, PositionStream, SamplingPolicy};

const GEOCLUE_BUS: &str = "org.freedesktop.GeoClue2";
const MANAGER_PATH: &str = "/org/freedesktop/GeoClue2/Manager";
const MANAGER_IFACE: &str = "org.freedesktop.GeoClue2.Manager";
const CLIENT_IFACE: &str = "org.freedesktop.GeoClue2.Client";
const LOCATION_IFACE: &str = "org.freedesktop.GeoClue2.Location";
const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
const DBUS_BUS: &str = "org.freedesktop.DBus";
const DBUS_PATH: &str = "/org/freedesktop/DBus";

// GClueAccuracyLevel
const ACCURACY_EXACT: u32 = 8;
const ACCURACY_NEIGHBORHOOD: u32 = 5;

/// Location provider backed by GeoClue2.
#[derive(Debug, Clone)]
pub struct GeoClueProvider {
    desktop_id: String,
    service: OnceLock<bool>,
}

impl Default for GeoClueProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl GeoClueProvider {
    /// A provider registering itself with GeoClue as `geotrack`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_desktop_id("geotrack")
    }

    /// A provider registering itself with the given desktop id.
    ///
    /// GeoClue authorizes clients by desktop id.
    pub fn with_desktop_id(desktop_id: impl Into<String>) -> Self {
        Self {
            desktop_id: desktop_id.into(),
            service: OnceLock::new(),
        }
    }
}

impl LocationProvider for GeoClueProvider {
    fn is_supported(&self) -> bool {
        *self.service.get_or_init(|| {
            let present = geoclue_present();
            if !present {
                warn!("GeoClue2 is neither running nor activatable on the system bus");
            }
            present
        })
    }

    fn current_position(
        &self,
        policy: &SamplingPolicy,
    ) -> BoxFuture<'static, Result<PositionSample, PlatformError>> {
        let desktop_id = self.desktop_id.clone();
        let accuracy = accuracy_level(policy);
        Box::pin(async move {
            let mut client = Client::start(&desktop_id, accuracy).await?;
            let result = loop {
                match client.next_fix().await {
                    Ok(Some(sample)) => break Ok(sample),
                    Ok(None) => Delay::new(POLL_INTERVAL / 4).await,
                    Err(err) => break Err(err),
                }
            };
            client.stop().await;
            result
        })
    }

    fn watch_position(&self, policy: &SamplingPolicy) -> Result<PositionStream, PlatformError> {
        let state = WatchState {
            desktop_id: self.desktop_id.clone(),
            accuracy: accuracy_level(policy),
            client: None,
            first: true,
        };
        // The GeoClue client is owned by the D-Bus connection, so dropping the
        // stream (and with it the connection) ends the watch on the service side.
        Ok(Box::pin(stream::unfold(state, |mut state| async move {
            loop {
                if !state.first {
                    Delay::new(POLL_INTERVAL).await;
                }
                state.first = false;
                match state.poll().await {
                    Ok(Some(sample)) => return Some((Ok(sample), state)),
                    Ok(None) => {}
                    Err(err) => return Some((Err(err), state)),
                }
            }
        })))
    }
}

/// Whether GeoClue owns its bus name or can be started on demand.
fn geoclue_present() -> bool {
    let Ok(connection) = zbus::blocking::Connection::system() else {
        return false;
    };
    let has_owner = connection
        .call_method(
            Some(DBUS_BUS),
            DBUS_PATH,
            Some(DBUS_BUS),
            "NameHasOwner",
            &(GEOCLUE_BUS,),
        )
        .and_then(|reply| reply.body().deserialize::<bool>())
        .unwrap_or(false);
    let activatable: Vec<String> = connection
        .call_method(
            Some(DBUS_BUS),
            DBUS_PATH,
            Some(DBUS_BUS),
            "ListActivatableNames",
            &(),
        )
        .and_then(|reply| reply.body().deserialize())
        .unwrap_or_default();
    service_available(has_owner, &activatable)
}

fn service_available(has_owner: bool, activatable: &[String]) -> bool {
    has_owner || activatable.iter().any(|name| name == GEOCLUE_BUS)
}

const fn accuracy_level(policy: &SamplingPolicy) -> u32 {
    if policy.high_accuracy() {
        ACCURACY_EXACT
    } else {
        ACCURACY_NEIGHBORHOOD
    }
}

struct WatchState {
    desktop_id: String,
    accuracy: u32,
    client: Option<Client>,
    first: bool,
}

impl WatchState {
    async fn poll(&mut self) -> Result<Option<PositionSample>, PlatformError> {
        if self.client.is_none() {
            self.client = Some(Client::start(&self.desktop_id, self.accuracy).await?);
        }
        let Some(client) = self.client.as_mut() else {
            return Ok(None);
        };
        let result = client.next_fix().await;
        if result.is_err() {
            // Reconnect on the next poll.
            self.client = None;
        }
        result
    }
}

struct Client {
    connection: Connection,
    path: OwnedObjectPath,
    last_location: Option<OwnedObjectPath>,
}

impl Client {
    async fn start(desktop_id: &str, accuracy: u32) -> Result<Self, PlatformError> {
        let connection = Connection::system()
            .await
            .map_err(|e| dbus_error("D-Bus connection failed", &e))?;

        let reply: (OwnedObjectPath,) = connection
            .call_method(
                Some(GEOCLUE_BUS),
                MANAGER_PATH,
                Some(MANAGER_IFACE),
                "GetClient",
                &(),
            )
            .await
            .map_err(|e| dbus_error("GeoClue2 not available", &e))?
            .body()
            .deserialize()
            .map_err(|e| dbus_error("failed to parse client path", &e))?;

        let client = Self {
            connection,
            path: reply.0,
            last_location: None,
        };
        client
            .set_property("DesktopId", Value::from(desktop_id))
            .await?;
        client
            .set_property("RequestedAccuracyLevel", Value::from(accuracy))
            .await?;
        client
            .connection
            .call_method(
                Some(GEOCLUE_BUS),
                client.path.as_str(),
                Some(CLIENT_IFACE),
                "Start",
                &(),
            )
            .await
            .map_err(|e| dbus_error("failed to start GeoClue client", &e))?;
        Ok(client)
    }

    async fn set_property(&self, name: &str, value: Value<'_>) -> Result<(), PlatformError> {
        self.connection
            .call_method(
                Some(GEOCLUE_BUS),
                self.path.as_str(),
                Some(PROPERTIES_IFACE),
                "Set",
                &(CLIENT_IFACE, name, value),
            )
            .await
            .map_err(|e| dbus_error("failed to configure GeoClue client", &e))?;
        Ok(())
    }

    /// Reads the client's location if it changed since the last call.
    async fn next_fix(&mut self) -> Result<Option<PositionSample>, PlatformError> {
        let value: OwnedValue = self
            .connection
            .call_method(
                Some(GEOCLUE_BUS),
                self.path.as_str(),
                Some(PROPERTIES_IFACE),
                "Get",
                &(CLIENT_IFACE, "Location"),
            )
            .await
            .map_err(|e| dbus_error("failed to get location", &e))?
            .body()
            .deserialize()
            .map_err(|e| dbus_error("failed to parse location path", &e))?;

        let location = OwnedObjectPath::try_from(value).map_err(|e| {
            PlatformError::new(
                PlatformError::POSITION_UNAVAILABLE,
                format!("unexpected location path: {e}"),
            )
        })?;

        // "/" until the first fix arrives.
        if location.as_str() == "/" || self.last_location.as_ref() == Some(&location) {
            return Ok(None);
        }

        let latitude = self.location_property(&location, "Latitude").await?;
        let longitude = self.location_property(&location, "Longitude").await?;
        let accuracy = self.location_property(&location, "Accuracy").await?;
        let altitude = self.location_property(&location, "Altitude").await.ok();
        let heading = self.location_property(&location, "Heading").await.ok();
        let speed = self.location_property(&location, "Speed").await.ok();

        self.last_location = Some(location);
        Ok(Some(PositionSample {
            latitude,
            longitude,
            // GeoClue reports -DBL_MAX when altitude is unknown.
            altitude: altitude.filter(|a| *a > f64::MIN),
            accuracy,
            altitude_accuracy: None,
            // Negative heading and speed mean unknown.
            heading: heading.filter(|h| *h >= 0.0),
            speed: speed.filter(|s| *s >= 0.0),
            timestamp: timestamp_now(),
        }))
    }

    async fn location_property(
        &self,
        location: &OwnedObjectPath,
        name: &str,
    ) -> Result<f64, PlatformError> {
        let value: OwnedValue = self
            .connection
            .call_method(
                Some(GEOCLUE_BUS),
                location.as_str(),
                Some(PROPERTIES_IFACE),
                "Get",
                &(LOCATION_IFACE, name),
            )
            .await
            .map_err(|e| dbus_error("failed to read location", &e))?
            .body()
            .deserialize()
            .map_err(|e| dbus_error("failed to parse location", &e))?;

        f64::try_from(value).map_err(|e| {
            PlatformError::new(
                PlatformError::POSITION_UNAVAILABLE,
                format!("{name} is not a number: {e}"),
            )
        })
    }

    async fn stop(self) {
        let _ = self
            .connection
            .call_method(
                Some(GEOCLUE_BUS),
                self.path.as_str(),
                Some(CLIENT_IFACE),
                "Stop",
                &(),
            )
            .await;
    }
}

fn dbus_error(context: &str, err: &zbus::Error) -> PlatformError {
    let code = match err {
        zbus::Error::MethodError(name, ..) if name.as_str().ends_with("AccessDenied") => {
            PlatformError::PERMISSION_DENIED
        }
        _ => PlatformError::POSITION_UNAVAILABLE,
    };
    PlatformError::new(code, format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_or_activatable_service_is_available() {
        assert!(service_available(true, &[]));
        assert!(service_available(
            false,
            &["org.freedesktop.systemd1".to_string(), GEOCLUE_BUS.to_string()]
        ));
        assert!(!service_available(
            false,
            &["org.freedesktop.systemd1".to_string()]
        ));
    }
}
