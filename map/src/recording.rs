use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    CameraMove, CircleStyle, LayerId, MapError, MapId, MapOptions, MapRenderer, MapResult,
    MarkerStyle,
};

/// A command received by a [`RecordingRenderer`].
#[derive(Debug, Clone, PartialEq)]
pub enum MapCommand {
    /// A map was created.
    CreateMap {
        /// Id handed out for the map.
        map: MapId,
        /// Options it was created with.
        options: MapOptions,
    },
    /// The camera was animated.
    FlyTo {
        /// Target map.
        map: MapId,
        /// Requested transition.
        camera: CameraMove,
    },
    /// A marker layer was created.
    AddMarker {
        /// Target map.
        map: MapId,
        /// Layer id.
        id: LayerId,
        /// Marker appearance.
        marker: MarkerStyle,
    },
    /// An existing marker layer was updated.
    UpdateMarker {
        /// Target map.
        map: MapId,
        /// Layer id.
        id: LayerId,
        /// Marker appearance.
        marker: MarkerStyle,
    },
    /// A circle layer was created.
    AddCircle {
        /// Target map.
        map: MapId,
        /// Layer id.
        id: LayerId,
        /// Circle appearance.
        circle: CircleStyle,
    },
    /// An existing circle layer was updated.
    UpdateCircle {
        /// Target map.
        map: MapId,
        /// Layer id.
        id: LayerId,
        /// Circle appearance.
        circle: CircleStyle,
    },
    /// A layer was removed.
    RemoveLayer {
        /// Target map.
        map: MapId,
        /// Layer id.
        id: LayerId,
    },
    /// A map was destroyed.
    Destroy {
        /// Target map.
        map: MapId,
    },
}

#[derive(Debug, Default)]
struct Recording {
    next_id: u64,
    commands: Vec<MapCommand>,
    maps: BTreeMap<MapId, BTreeSet<LayerId>>,
}

impl Recording {
    fn layers(&mut self, map: MapId) -> MapResult<&mut BTreeSet<LayerId>> {
        self.maps.get_mut(&map).ok_or(MapError::UnknownMap(map))
    }
}

/// A [`MapRenderer`] that records commands instead of drawing.
///
/// Clones share the same recording. It tracks which maps and layers exist and
/// rejects commands for missing ones like a real engine would.
#[derive(Debug, Clone, Default)]
pub struct RecordingRenderer {
    inner: Arc<Mutex<Recording>>,
}

impl RecordingRenderer {
    /// Create an empty recording.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every command received so far, oldest first.
    #[must_use]
    pub fn commands(&self) -> Vec<MapCommand> {
        self.lock().commands.clone()
    }

    /// Number of recorded commands matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&MapCommand) -> bool) -> usize {
        self.lock().commands.iter().filter(|c| predicate(c)).count()
    }

    /// Forget recorded commands, keeping maps and layers.
    pub fn clear(&self) {
        self.lock().commands.clear();
    }

    /// Maps that were created and not destroyed.
    #[must_use]
    pub fn live_maps(&self) -> Vec<MapId> {
        self.lock().maps.keys().copied().collect()
    }

    /// Layers currently on `map`.
    #[must_use]
    pub fn layers(&self, map: MapId) -> Vec<LayerId> {
        self.lock()
            .maps
            .get(&map)
            .map(|layers| layers.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl MapRenderer for RecordingRenderer {
    fn create_map(&self, options: &MapOptions) -> MapResult<MapId> {
        let mut recording = self.lock();
        recording.next_id += 1;
        let map = MapId(recording.next_id);
        recording.maps.insert(map, BTreeSet::new());
        recording.commands.push(MapCommand::CreateMap {
            map,
            options: options.clone(),
        });
        Ok(map)
    }

    fn fly_to(&self, map: MapId, camera: &CameraMove) -> MapResult<()> {
        let mut recording = self.lock();
        recording.layers(map)?;
        recording.commands.push(MapCommand::FlyTo {
            map,
            camera: camera.clone(),
        });
        Ok(())
    }

    fn add_or_update_marker(
        &self,
        map: MapId,
        id: &LayerId,
        marker: &MarkerStyle,
    ) -> MapResult<()> {
        let mut recording = self.lock();
        let created = recording.layers(map)?.insert(id.clone());
        let (id, marker) = (id.clone(), marker.clone());
        recording.commands.push(if created {
            MapCommand::AddMarker { map, id, marker }
        } else {
            MapCommand::UpdateMarker { map, id, marker }
        });
        Ok(())
    }

    fn add_or_update_circle(
        &self,
        map: MapId,
        id: &LayerId,
        circle: &CircleStyle,
    ) -> MapResult<()> {
        let mut recording = self.lock();
        let created = recording.layers(map)?.insert(id.clone());
        let (id, circle) = (id.clone(), circle.clone());
        recording.commands.push(if created {
            MapCommand::AddCircle { map, id, circle }
        } else {
            MapCommand::UpdateCircle { map, id, circle }
        });
        Ok(())
    }

    fn remove_layer(&self, map: MapId, id: &LayerId) -> MapResult<()> {
        let mut recording = self.lock();
        if !recording.layers(map)?.remove(id) {
            return Err(MapError::UnknownLayer {
                map,
                layer: id.clone(),
            });
        }
        recording.commands.push(MapCommand::RemoveLayer {
            map,
            id: id.clone(),
        });
        Ok(())
    }

    fn destroy(&self, map: MapId) -> MapResult<()> {
        let mut recording = self.lock();
        if recording.maps.remove(&map).is_none() {
            return Err(MapError::UnknownMap(map));
        }
        recording.commands.push(MapCommand::Destroy { map });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::LngLat;

    #[test]
    fn second_upsert_is_recorded_as_update() {
        let renderer = RecordingRenderer::new();
        let map = renderer.create_map(&MapOptions::default()).unwrap();
        let id = LayerId::new("accuracy");
        let circle = CircleStyle {
            center: LngLat::new(1.0, 2.0),
            radius_meters: 12.0,
            fill_color: "#4285F433".to_string(),
            stroke_color: "#4285F4".to_string(),
        };

        renderer.add_or_update_circle(map, &id, &circle).unwrap();
        renderer.add_or_update_circle(map, &id, &circle).unwrap();

        assert_eq!(
            renderer.count(|c| matches!(c, MapCommand::AddCircle { .. })),
            1
        );
        assert_eq!(
            renderer.count(|c| matches!(c, MapCommand::UpdateCircle { .. })),
            1
        );
        assert_eq!(renderer.layers(map), vec![id]);
    }

    #[test]
    fn commands_for_destroyed_maps_are_rejected() {
        let renderer = RecordingRenderer::new();
        let map = renderer.create_map(&MapOptions::default()).unwrap();
        renderer.destroy(map).unwrap();

        let camera = CameraMove {
            center: LngLat::new(0.0, 0.0),
            zoom: 3.0,
            bearing: None,
            duration: Duration::from_millis(500),
        };
        assert_eq!(
            renderer.fly_to(map, &camera),
            Err(MapError::UnknownMap(map))
        );
        assert_eq!(renderer.destroy(map), Err(MapError::UnknownMap(map)));
    }

    #[test]
    fn removing_a_missing_layer_fails() {
        let renderer = RecordingRenderer::new();
        let map = renderer.create_map(&MapOptions::default()).unwrap();
        let err = renderer
            .remove_layer(map, &LayerId::new("nope"))
            .unwrap_err();
        assert!(matches!(err, MapError::UnknownLayer { .. }));
    }

    #[test]
    fn map_options_read_from_json() {
        let options: MapOptions = serde_json::from_str(
            r#"{"container": "map", "initialCenter": {"lng": 114.255, "lat": 22.77}, "initialZoom": 9}"#,
        )
        .unwrap();
        assert_eq!(options.initial_center, LngLat::new(114.255, 22.77));
        assert!((options.pitch - 0.0).abs() < f64::EPSILON);
        assert!(options.style.is_none());
    }
}
