//! The per-frame contract shared by all tile-set controllers.

use geotile_geo::{GeoCoordinate, Projection};
use geotile_lod::{LodIntervalTree, LodRange};
use glam::DVec3;

use crate::{
    GridController, MapDataProvider, SceneGraph, SphereController, SurfaceController, TileEvent,
    TileWarning, TilingError,
};

/// What the controller sees of the viewer each frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewerState {
    /// Pivot local position for planar controllers, camera offset from the
    /// planet center for the sphere controller.
    pub position: DVec3,
    /// Pivot orientation as Euler angles in degrees (x = pitch, y = yaw, z = roll).
    pub orientation: DVec3,
}

impl ViewerState {
    pub fn new(position: DVec3, orientation: DVec3) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

/// How the resident tile set changed during an update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TileChange {
    /// Nothing was loaded or evicted.
    #[default]
    None,
    /// Same LOD, different neighbourhood.
    Pan,
    /// LOD changed and the tile set was rebuilt.
    Zoom { lod: u8 },
}

/// Result of a successful [`TileSetManager::update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateOutcome {
    pub change: TileChange,
    /// Set when the geo-origin moved. The owner must move the viewer by
    /// `-offset` to stay aligned with the shifted content.
    pub recentered: Option<DVec3>,
    /// Tiles that could not be requested this frame.
    pub warnings: Vec<TileWarning>,
}

/// What happened to a delivered provider event.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery {
    /// The event changed the owning tile.
    Applied,
    /// The tile is live but the event was redundant.
    Ignored,
    /// No live tile owns the event.
    Discarded,
    /// First failure report for a live tile.
    Warning(TileWarning),
}

/// A controller owning one resident tile set.
pub trait TileSetManager {
    /// Bring the resident tile set in line with the viewer.
    fn update(
        &mut self,
        viewer: &ViewerState,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) -> Result<UpdateOutcome, TilingError>;

    /// Route one provider event to the tile it belongs to.
    fn deliver(&mut self, event: TileEvent, scene: &mut dyn SceneGraph) -> Delivery;

    /// Evict every resident tile.
    fn dispose(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider);

    fn lod_tree(&self) -> &LodIntervalTree;

    fn projection(&self) -> &Projection;

    /// Continuous zoom level as of the last update.
    fn zoom_level(&self) -> f64;

    /// Geographic position the viewer is looking at.
    fn coordinate_at(&self, viewer: &ViewerState) -> GeoCoordinate;

    /// Viewer distance in the units of [`Self::lod_tree`].
    fn distance_of(&self, viewer: &ViewerState) -> f64;

    /// Re-seed the geo-origin. Only meaningful while no tiles are resident.
    fn move_geo_origin(&mut self, coordinate: GeoCoordinate);

    /// Vertical field of view in degrees the LOD tree was computed for.
    fn field_of_view(&self) -> Option<f64>;

    fn resident_count(&self) -> usize;

    fn lod_range(&self) -> LodRange {
        self.lod_tree().lod_range()
    }

    fn is_above_max(&self, viewer: &ViewerState) -> bool {
        self.lod_tree().is_above_max(self.distance_of(viewer))
    }

    fn is_below_min(&self, viewer: &ViewerState) -> bool {
        self.lod_tree().is_below_min(self.distance_of(viewer))
    }

    fn get_height(&self, zoom: f64) -> f64 {
        self.lod_tree().get_height(zoom)
    }

    fn calculate_zoom(&self, distance: f64) -> f64 {
        self.lod_tree().calculate_zoom(distance)
    }
}

/// The closed set of controller flavours.
#[derive(Debug)]
pub enum TileController {
    Grid(GridController),
    Surface(SurfaceController),
    Sphere(SphereController),
}

macro_rules! dispatch {
    ($self:expr, $c:ident => $body:expr) => {
        match $self {
            TileController::Grid($c) => $body,
            TileController::Surface($c) => $body,
            TileController::Sphere($c) => $body,
        }
    };
}

impl TileSetManager for TileController {
    fn update(
        &mut self,
        viewer: &ViewerState,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) -> Result<UpdateOutcome, TilingError> {
        dispatch!(self, c => c.update(viewer, scene, provider))
    }

    fn deliver(&mut self, event: TileEvent, scene: &mut dyn SceneGraph) -> Delivery {
        dispatch!(self, c => c.deliver(event, scene))
    }

    fn dispose(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider) {
        dispatch!(self, c => c.dispose(scene, provider))
    }

    fn lod_tree(&self) -> &LodIntervalTree {
        dispatch!(self, c => c.lod_tree())
    }

    fn projection(&self) -> &Projection {
        dispatch!(self, c => c.projection())
    }

    fn zoom_level(&self) -> f64 {
        dispatch!(self, c => c.zoom_level())
    }

    fn coordinate_at(&self, viewer: &ViewerState) -> GeoCoordinate {
        dispatch!(self, c => c.coordinate_at(viewer))
    }

    fn distance_of(&self, viewer: &ViewerState) -> f64 {
        dispatch!(self, c => c.distance_of(viewer))
    }

    fn move_geo_origin(&mut self, coordinate: GeoCoordinate) {
        dispatch!(self, c => c.move_geo_origin(coordinate))
    }

    fn field_of_view(&self) -> Option<f64> {
        dispatch!(self, c => c.field_of_view())
    }

    fn resident_count(&self) -> usize {
        dispatch!(self, c => c.resident_count())
    }
}

impl From<GridController> for TileController {
    fn from(controller: GridController) -> Self {
        TileController::Grid(controller)
    }
}

impl From<SurfaceController> for TileController {
    fn from(controller: SurfaceController) -> Self {
        TileController::Surface(controller)
    }
}

impl From<SphereController> for TileController {
    fn from(controller: SphereController) -> Self {
        TileController::Sphere(controller)
    }
}
