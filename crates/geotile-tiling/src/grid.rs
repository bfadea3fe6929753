//! Standalone controller with an unbounded LOD range.

use geotile_geo::{GeoCoordinate, Projection};
use geotile_lod::{LodIntervalTree, LodRange, Viewport, grid_tree};
use serde::{Deserialize, Serialize};

use crate::planar::{PlanarCore, PlanarParams};
use crate::{
    Delivery, ElevationType, FloatingOrigin, MapDataProvider, NodeHandle, SceneGraph, Tile,
    TileEvent, TileSetManager, TilingError, UpdateOutcome, ViewerState,
};

/// Configuration of a [`GridController`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GridSettings {
    pub lod_range: LodRange,
    pub scale: f64,
    /// Height at which the coarsest LOD's tile block fills the viewport.
    pub max_distance: f64,
    pub viewport: Viewport,
    pub elevation_type: ElevationType,
    /// Recenter threshold; `None` disables floating origin.
    pub origin_threshold: Option<f64>,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            lod_range: LodRange::new(9, 16),
            scale: 1.0,
            max_distance: 100_000.0,
            viewport: Viewport::default(),
            elevation_type: ElevationType::Flat,
            origin_threshold: Some(50_000.0),
        }
    }
}

/// A single tile grid that never hands over to another controller: the
/// coarsest LOD reaches to infinity and the finest down to the ground.
#[derive(Debug)]
pub struct GridController {
    core: PlanarCore,
}

impl GridController {
    pub fn new(settings: GridSettings, geo_origin: GeoCoordinate, root: NodeHandle) -> Self {
        let params = PlanarParams {
            lod_range: settings.lod_range,
            scale: settings.scale,
            max_distance: settings.max_distance,
            viewport: settings.viewport,
            elevation_type: settings.elevation_type,
            position_sensitivity: 0.0,
            floating_origin: settings.origin_threshold.map(FloatingOrigin::new),
        };
        Self {
            core: PlanarCore::new(params, grid_tree, geo_origin, root),
        }
    }

    pub fn lod(&self) -> Option<u8> {
        self.core.grid().lod()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &Tile> {
        self.core.grid().tiles()
    }

    fn speed_ratio(&self) -> f64 {
        let min = self.core.layout().tree.min_lod();
        let lod = self.lod().unwrap_or(min);
        2f64.powi(-i32::from(lod - min)) * self.core.scale()
    }

    /// Camera zoom speed multiplier; halves with every finer LOD.
    pub fn zoom_speed_ratio(&self) -> f64 {
        self.speed_ratio()
    }

    /// Camera pan speed multiplier; halves with every finer LOD.
    pub fn pan_speed_ratio(&self) -> f64 {
        self.speed_ratio()
    }
}

impl TileSetManager for GridController {
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

#[cfg(test)]
mod tests {
    use glam::DVec3;

    use super::*;
    use crate::testing::RecordingProvider;
    use crate::{SceneArena, TileChange};

    const BERLIN: GeoCoordinate = GeoCoordinate::new(52.53171, 13.38721);

    fn controller(scene: &mut SceneArena) -> GridController {
        let root = scene.create_node(None, "grid");
        GridController::new(GridSettings::default(), BERLIN, root)
    }

    fn viewer(x: f64, height: f64) -> ViewerState {
        ViewerState::new(DVec3::new(x, height, 0.0), DVec3::ZERO)
    }

    #[test]
    fn test_never_above_max_or_below_min() {
        let mut scene = SceneArena::new();
        let grid = controller(&mut scene);
        assert!(!grid.is_above_max(&viewer(0.0, 1e12)));
        assert!(!grid.is_below_min(&viewer(0.0, 0.0)));
    }

    #[test]
    fn test_exact_repeat_is_noop_but_tiny_move_is_not() {
        let mut scene = SceneArena::new();
        let provider = RecordingProvider::new();
        let mut grid = controller(&mut scene);

        let first = grid.update(&viewer(0.0, 200_000.0), &mut scene, &provider).unwrap();
        assert_eq!(first.change, TileChange::Zoom { lod: 9 });
        let mutations = scene.mutation_count();

        let repeat = grid.update(&viewer(0.0, 200_000.0), &mut scene, &provider).unwrap();
        assert_eq!(repeat, UpdateOutcome::default());
        assert_eq!(scene.mutation_count(), mutations);

        // A moved viewer is re-evaluated even if the tile set ends up identical.
        let nudge = grid.update(&viewer(0.01, 200_000.0), &mut scene, &provider).unwrap();
        assert_eq!(nudge.change, TileChange::None);
        assert_eq!(grid.resident_count(), 9);
    }

    #[test]
    fn test_speed_ratios_halve_per_lod() {
        let mut scene = SceneArena::new();
        let provider = RecordingProvider::new();
        let mut grid = controller(&mut scene);
        assert_eq!(grid.zoom_speed_ratio(), 1.0);

        let tree = grid.lod_tree().clone();
        let interval = tree.interval_for(11).unwrap();
        let height = (interval.from + interval.to) * 0.5;
        grid.update(&viewer(0.0, height), &mut scene, &provider).unwrap();

        assert_eq!(grid.lod(), Some(11));
        assert_eq!(grid.zoom_speed_ratio(), 0.25);
        assert_eq!(grid.pan_speed_ratio(), 0.25);
    }

    #[test]
    fn test_dispose_clears_everything() {
        let mut scene = SceneArena::new();
        let provider = RecordingProvider::new();
        let mut grid = controller(&mut scene);
        grid.update(&viewer(0.0, 500.0), &mut scene, &provider).unwrap();
        assert_eq!(grid.resident_count(), 9);

        grid.dispose(&mut scene, &provider);
        assert_eq!(grid.resident_count(), 0);
        // Only the root node remains.
        assert_eq!(scene.len(), 1);
        assert!(provider.requests().iter().all(|r| r.token.is_cancelled()));
    }
}
