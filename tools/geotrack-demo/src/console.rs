//! A map renderer that prints its commands.

use std::sync::atomic::{AtomicU64, Ordering};

use geotrack_map::{
    CameraMove, CircleStyle, LayerId, MapId, MapOptions, MapRenderer, MapResult, MarkerStyle,
};
use owo_colors::OwoColorize;

#[derive(Debug, Default)]
pub struct ConsoleRenderer {
    next_id: AtomicU64,
}

fn command(map: MapId, text: &str) {
    println!("  {} {text}", format!("[{map}]").dimmed());
}

impl MapRenderer for ConsoleRenderer {
    fn create_map(&self, options: &MapOptions) -> MapResult<MapId> {
        let map = MapId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        command(
            map,
            &format!(
                "create in '{}' at {} zoom {} pitch {}",
                options.container, options.initial_center, options.initial_zoom, options.pitch
            ),
        );
        Ok(map)
    }

    fn fly_to(&self, map: MapId, camera: &CameraMove) -> MapResult<()> {
        let bearing = camera
            .bearing
            .map_or_else(String::new, |b| format!(" bearing {b:.0}°"));
        command(
            map,
            &format!(
                "fly to {} zoom {}{bearing} over {:?}",
                camera.center, camera.zoom, camera.duration
            )
            .cyan()
            .to_string(),
        );
        Ok(())
    }

    fn add_or_update_marker(
        &self,
        map: MapId,
        id: &LayerId,
        marker: &MarkerStyle,
    ) -> MapResult<()> {
        let rotation = marker
            .rotation
            .map_or_else(String::new, |r| format!(" rotated {r:.0}°"));
        let color = marker.color.as_deref().unwrap_or("default");
        command(
            map,
            &format!("marker {id} at {} ({color}){rotation}", marker.lng_lat),
        );
        Ok(())
    }

    fn add_or_update_circle(
        &self,
        map: MapId,
        id: &LayerId,
        circle: &CircleStyle,
    ) -> MapResult<()> {
        command(
            map,
            &format!(
                "circle {id} at {} radius {:.1} m",
                circle.center, circle.radius_meters
            ),
        );
        Ok(())
    }

    fn remove_layer(&self, map: MapId, id: &LayerId) -> MapResult<()> {
        command(map, &format!("remove {id}"));
        Ok(())
    }

    fn destroy(&self, map: MapId) -> MapResult<()> {
        command(map, &"destroy".red().to_string());
        Ok(())
    }
}
