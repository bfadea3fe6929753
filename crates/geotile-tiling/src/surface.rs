//! Bounded controller for a locally flat view of the surface.

use geotile_geo::{GeoCoordinate, Projection};
use geotile_lod::{LodIntervalTree, LodRange, Viewport, surface_tree};
use serde::{Deserialize, Serialize};

use crate::planar::{PlanarCore, PlanarParams};
use crate::{
    Delivery, ElevationType, FloatingOrigin, MapDataProvider, NodeHandle, SceneGraph, Tile,
    TileEvent, TileSetManager, TilingError, UpdateOutcome, ViewerState,
};

/// Configuration of a [`SurfaceController`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSettings {
    pub lod_range: LodRange,
    /// World units per meter.
    pub scale: f64,
    /// Height (world units) above which the controller reports "above max".
    pub max_distance: f64,
    pub viewport: Viewport,
    pub elevation_type: ElevationType,
    /// Pivot moves shorter than this (world units) do not trigger an update.
    pub position_sensitivity: f64,
    /// Planar distance (world units) from zero that triggers a recenter.
    pub origin_threshold: f64,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            lod_range: LodRange::new(9, 15),
            scale: 0.01,
            max_distance: 2000.0,
            viewport: Viewport::default(),
            elevation_type: ElevationType::Grid,
            position_sensitivity: 1.0,
            origin_threshold: 2000.0,
        }
    }
}

/// Keeps the 3×3 tile block under the pivot of a surface camera rig.
///
/// Distance is the pivot height above the tangent plane. Tiles are placed with
/// a scaled Cartesian projection around the geo-origin, which follows the pivot
/// via floating-origin recentering.
#[derive(Debug)]
pub struct SurfaceController {
    core: PlanarCore,
}

impl SurfaceController {
    pub fn new(settings: SurfaceSettings, geo_origin: GeoCoordinate, root: NodeHandle) -> Self {
        let params = PlanarParams {
            lod_range: settings.lod_range,
            scale: settings.scale,
            max_distance: settings.max_distance,
            viewport: settings.viewport,
            elevation_type: settings.elevation_type,
            position_sensitivity: settings.position_sensitivity,
            floating_origin: Some(FloatingOrigin::new(settings.origin_threshold)),
        };
        Self {
            core: PlanarCore::new(params, surface_tree, geo_origin, root),
        }
    }

    pub fn geo_origin(&self) -> GeoCoordinate {
        self.core.geo_origin()
    }

    /// Current LOD of the resident tiles.
    pub fn lod(&self) -> Option<u8> {
        self.core.grid().lod()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.core.grid().tiles()
    }
}

impl TileSetManager for SurfaceController {
    fn update(
        &mut self,
        viewer: &ViewerState,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) -> Result<UpdateOutcome, TilingError> {
        self.core.update(viewer, scene, provider)
    }

    fn deliver(&mut self, event: TileEvent, scene: &mut dyn SceneGraph) -> Delivery {
        self.core.deliver(event, scene)
    }

    fn dispose(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider) {
        self.core.dispose(scene, provider);
    }

    fn lod_tree(&self) -> &LodIntervalTree {
        &self.core.layout().tree
    }

    fn projection(&self) -> &Projection {
        self.core.projection()
    }

    fn zoom_level(&self) -> f64 {
        self.core.zoom()
    }

    fn coordinate_at(&self, viewer: &ViewerState) -> GeoCoordinate {
        self.core.coordinate_at(viewer)
    }

    fn distance_of(&self, viewer: &ViewerState) -> f64 {
        viewer.position.y
    }

    fn move_geo_origin(&mut self, coordinate: GeoCoordinate) {
        self.core.move_geo_origin(coordinate);
    }

    fn field_of_view(&self) -> Option<f64> {
        Some(self.core.layout().field_of_view)
    }

    fn resident_count(&self) -> usize {
        self.core.grid().len()
    }
}
