//! Deterministic tile source standing in for a map server.

use std::thread;
use std::time::Duration;

use geotile_geo::{GeoCoordinate, QuadKey};
use geotile_tiling::{ElevationType, MapElement, ProviderError, TileContent, TileSource};

/// Emits a ground mesh and a few landmark elements per tile.
///
/// Landmarks are placed on the grid one level coarser than the tile, so the
/// four children of a parent repeat the same ids, the way features crossing
/// tile borders come back from a real server.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    latency: Duration,
    landmarks_per_tile: u32,
}

impl SyntheticSource {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            landmarks_per_tile: 3,
        }
    }

    fn landmark(&self, parent: &QuadKey, index: u32, elevation: f64) -> MapElement {
        let bounds = parent.bounding_box();
        // Offset so no landmark sits on a child tile border.
        let fraction = (f64::from(index) + 0.3) / f64::from(self.landmarks_per_tile);
        let coordinate = GeoCoordinate::new(
            bounds.min_point.latitude + bounds.height() * fraction,
            bounds.min_point.longitude + bounds.width() * fraction,
        );
        MapElement {
            id: landmark_id(parent, index),
            name: format!("{parent}/{index}"),
            coordinate,
            elevation,
        }
    }
}

/// Stable id derived from the parent tile and landmark index.
fn landmark_id(parent: &QuadKey, index: u32) -> u64 {
    (u64::from(parent.lod) << 56)
        | (u64::from(parent.tile_y) << 32)
        | (u64::from(parent.tile_x) << 8)
        | u64::from(index)
}

impl TileSource for SyntheticSource {
    fn load(
        &self,
        quad_key: &QuadKey,
        elevation_type: ElevationType,
    ) -> Result<Vec<TileContent>, ProviderError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }

        let parent = quad_key.parent().unwrap_or(*quad_key);
        let mut content = vec![TileContent::Mesh {
            name: format!("ground {quad_key}"),
        }];
        for index in 0..self.landmarks_per_tile {
            let mut element = self.landmark(&parent, index, 0.0);
            if elevation_type != ElevationType::Flat {
                element.elevation = self.elevation(element.coordinate);
            }
            if quad_key.bounding_box().contains(&element.coordinate) {
                content.push(TileContent::Element(element));
            }
        }
        Ok(content)
    }

    /// No data beyond the polar circles.
    fn has_data(&self, quad_key: &QuadKey) -> bool {
        let bounds = quad_key.bounding_box();
        bounds.max_point.latitude > -66.5 && bounds.min_point.latitude < 66.5
    }

    /// Gentle rolling hills, in meters.
    fn elevation(&self, coordinate: GeoCoordinate) -> f64 {
        let lat = coordinate.latitude.to_radians();
        let lon = coordinate.longitude.to_radians();
        (200.0 * (lat * 40.0).sin() * (lon * 40.0).cos()).max(0.0)
    }
}
