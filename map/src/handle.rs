use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use log::{debug, warn};

use crate::{
    CameraMove, CircleStyle, LayerId, MapError, MapId, MapOptions, MapRenderer, MapResult,
    MarkerStyle,
};

/// A map owned by one screen.
///
/// The handle remembers every layer it created. [`release`](Self::release),
/// or dropping the handle, removes those layers and destroys the map.
pub struct MapHandle {
    renderer: Arc<dyn MapRenderer>,
    map: MapId,
    layers: BTreeSet<LayerId>,
    released: bool,
}

impl fmt::Debug for MapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapHandle")
            .field("map", &self.map)
            .field("layers", &self.layers)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl MapHandle {
    /// Create a map on `renderer`.
    ///
    /// # Errors
    /// Returns the renderer's error if the map cannot be created.
    pub fn create(renderer: Arc<dyn MapRenderer>, options: &MapOptions) -> MapResult<Self> {
        let map = renderer.create_map(options)?;
        debug!("created {map} in container {:?}", options.container);
        Ok(Self {
            renderer,
            map,
            layers: BTreeSet::new(),
            released: false,
        })
    }

    /// The renderer's id for this map.
    #[must_use]
    pub const fn id(&self) -> MapId {
        self.map
    }

    /// Whether a layer with this id was created through the handle and not
    /// removed since.
    #[must_use]
    pub fn has_layer(&self, id: &LayerId) -> bool {
        self.layers.contains(id)
    }

    /// Animate the camera.
    ///
    /// # Errors
    /// Returns [`MapError::Released`] after release, or the renderer's error.
    pub fn fly_to(&mut self, camera: &CameraMove) -> MapResult<()> {
        self.ensure_live()?;
        self.renderer.fly_to(self.map, camera)
    }

    /// Create or move a marker.
    ///
    /// # Errors
    /// Returns [`MapError::Released`] after release, or the renderer's error.
    pub fn upsert_marker(&mut self, id: &LayerId, marker: &MarkerStyle) -> MapResult<()> {
        self.ensure_live()?;
        self.renderer.add_or_update_marker(self.map, id, marker)?;
        self.layers.insert(id.clone());
        Ok(())
    }

    /// Create or update a circle.
    ///
    /// # Errors
    /// Returns [`MapError::Released`] after release, or the renderer's error.
    pub fn upsert_circle(&mut self, id: &LayerId, circle: &CircleStyle) -> MapResult<()> {
        self.ensure_live()?;
        self.renderer.add_or_update_circle(self.map, id, circle)?;
        self.layers.insert(id.clone());
        Ok(())
    }

    /// Remove a layer created through this handle.
    ///
    /// # Errors
    /// Returns [`MapError::Released`] after release, or the renderer's error.
    pub fn remove_layer(&mut self, id: &LayerId) -> MapResult<()> {
        self.ensure_live()?;
        self.renderer.remove_layer(self.map, id)?;
        self.layers.remove(id);
        Ok(())
    }

    /// Remove every layer and destroy the map.
    ///
    /// # Errors
    /// Returns the first renderer error. The handle counts as released
    /// regardless, and no further cleanup is attempted on drop.
    pub fn release(mut self) -> MapResult<()> {
        self.teardown()
    }

    fn ensure_live(&self) -> MapResult<()> {
        if self.released {
            Err(MapError::Released)
        } else {
            Ok(())
        }
    }

    fn teardown(&mut self) -> MapResult<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut first_error = None;
        for layer in std::mem::take(&mut self.layers) {
            if let Err(err) = self.renderer.remove_layer(self.map, &layer) {
                warn!("failed to remove {layer} from {}: {err}", self.map);
                first_error.get_or_insert(err);
            }
        }
        if let Err(err) = self.renderer.destroy(self.map) {
            warn!("failed to destroy {}: {err}", self.map);
            first_error.get_or_insert(err);
        }
        debug!("released {}", self.map);
        first_error.map_or(Ok(()), Err)
    }
}

impl Drop for MapHandle {
    fn drop(&mut self) {
        let _ = self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LngLat, MapCommand, RecordingRenderer};

    const MARKER: LayerId = LayerId::new("marker");

    fn marker() -> MarkerStyle {
        MarkerStyle {
            lng_lat: LngLat::new(114.222, 22.3118),
            rotation: None,
            color: None,
        }
    }

    #[test]
    fn release_removes_created_layers_then_destroys() {
        let renderer = RecordingRenderer::new();
        let mut handle =
            MapHandle::create(Arc::new(renderer.clone()), &MapOptions::default()).unwrap();
        handle.upsert_marker(&MARKER, &marker()).unwrap();
        let map = handle.id();
        renderer.clear();

        handle.release().unwrap();

        assert_eq!(
            renderer.commands(),
            vec![
                MapCommand::RemoveLayer {
                    map,
                    id: MARKER.clone()
                },
                MapCommand::Destroy { map },
            ]
        );
        assert!(renderer.live_maps().is_empty());
    }

    #[test]
    fn drop_releases_the_map() {
        let renderer = RecordingRenderer::new();
        {
            let mut handle =
                MapHandle::create(Arc::new(renderer.clone()), &MapOptions::default()).unwrap();
            handle.upsert_marker(&MARKER, &marker()).unwrap();
        }
        assert!(renderer.live_maps().is_empty());
        assert_eq!(renderer.count(|c| matches!(c, MapCommand::Destroy { .. })), 1);
    }

    #[test]
    fn removed_layers_are_not_removed_twice() {
        let renderer = RecordingRenderer::new();
        let mut handle =
            MapHandle::create(Arc::new(renderer.clone()), &MapOptions::default()).unwrap();
        handle.upsert_marker(&MARKER, &marker()).unwrap();
        handle.remove_layer(&MARKER).unwrap();
        assert!(!handle.has_layer(&MARKER));

        handle.release().unwrap();
        assert_eq!(
            renderer.count(|c| matches!(c, MapCommand::RemoveLayer { .. })),
            1
        );
    }
}
