//! State shared by the flat (grid and surface) controllers.

use geotile_geo::{GeoCoordinate, Projection, QuadKey};
use geotile_lod::{LodLayout, LodRange, Viewport};
use glam::DVec3;

use crate::tile_grid::TileGrid;
use crate::{
    Delivery, ElevationType, FloatingOrigin, MapDataProvider, NodeHandle, SceneGraph, TileEvent,
    TilingError, UpdateOutcome, ViewerState,
};

/// Builds the interval tree for a geo-origin.
pub(crate) type LayoutBuilder = fn(GeoCoordinate, LodRange, f64, f64, &Viewport) -> LodLayout;

/// Parameters common to the flat controllers.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlanarParams {
    pub lod_range: LodRange,
    pub scale: f64,
    pub max_distance: f64,
    pub viewport: Viewport,
    pub elevation_type: ElevationType,
    /// Moves shorter than this are ignored; zero ignores only exact repeats.
    pub position_sensitivity: f64,
    pub floating_origin: Option<FloatingOrigin>,
}

#[derive(Debug)]
pub(crate) struct PlanarCore {
    params: PlanarParams,
    build_layout: LayoutBuilder,
    geo_origin: GeoCoordinate,
    projection: Projection,
    layout: LodLayout,
    grid: TileGrid,
    last_position: Option<DVec3>,
    zoom: f64,
}

impl PlanarCore {
    pub fn new(
        params: PlanarParams,
        build_layout: LayoutBuilder,
        geo_origin: GeoCoordinate,
        root: NodeHandle,
    ) -> Self {
        let layout = build_layout(
            geo_origin,
            params.lod_range,
            params.scale,
            params.max_distance,
            &params.viewport,
        );
        Self {
            projection: Projection::scaled(Projection::cartesian(geo_origin), params.scale),
            zoom: f64::from(params.lod_range.min),
            grid: TileGrid::new(root, params.elevation_type),
            params,
            build_layout,
            geo_origin,
            layout,
            last_position: None,
        }
    }

    pub fn update(
        &mut self,
        viewer: &ViewerState,
        scene: &mut dyn SceneGraph,
        provider: &dyn MapDataProvider,
    ) -> Result<UpdateOutcome, TilingError> {
        let position = viewer.position;
        if let Some(last) = self.last_position {
            let unchanged = if self.params.position_sensitivity > 0.0 {
                last.distance(position) < self.params.position_sensitivity
            } else {
                last == position
            };
            if unchanged {
                return Ok(UpdateOutcome::default());
            }
        }
        self.last_position = Some(position);

        let tree = &self.layout.tree;
        let height = position.y;
        self.zoom = tree.calculate_zoom(height);
        let lod = tree.lookup(height);
        let center = QuadKey::from_coordinate(self.projection.unproject(position), lod);

        let (change, warnings) = self.grid.rebuild(center, &self.projection, scene, provider)?;
        let recentered = self.keep_origin(position, scene);

        Ok(UpdateOutcome {
            change,
            recentered,
            warnings,
        })
    }

    /// Move the geo-origin under the viewer once it has drifted past the threshold.
    fn keep_origin(&mut self, position: DVec3, scene: &mut dyn SceneGraph) -> Option<DVec3> {
        let offset = self.params.floating_origin?.check(position)?;

        self.geo_origin = self.projection.unproject(offset);
        self.projection = self.projection.recentered(self.geo_origin);
        self.grid.translate(-offset, scene);
        if let Some(last) = self.last_position.as_mut() {
            *last -= offset;
        }

        tracing::info!(
            geo_origin = %self.geo_origin,
            offset_x = offset.x,
            offset_z = offset.z,
            "Recentered floating origin"
        );
        Some(offset)
    }

    pub fn deliver(&mut self, event: TileEvent, scene: &mut dyn SceneGraph) -> Delivery {
        self.grid.deliver(event, scene)
    }

    pub fn dispose(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider) {
        self.grid.dispose(scene, provider);
        self.last_position = None;
    }

    /// Re-seed the geo-origin with a fresh projection and interval tree.
    pub fn move_geo_origin(&mut self, coordinate: GeoCoordinate) {
        debug_assert!(self.grid.is_empty(), "geo-origin moved while tiles are resident");
        self.geo_origin = coordinate;
        self.projection = Projection::scaled(Projection::cartesian(coordinate), self.params.scale);
        self.layout = (self.build_layout)(
            coordinate,
            self.params.lod_range,
            self.params.scale,
            self.params.max_distance,
            &self.params.viewport,
        );
        self.last_position = None;
    }

    pub fn geo_origin(&self) -> GeoCoordinate {
        self.geo_origin
    }

    pub fn layout(&self) -> &LodLayout {
        &self.layout
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn scale(&self) -> f64 {
        self.params.scale
    }

    pub fn coordinate_at(&self, viewer: &ViewerState) -> GeoCoordinate {
        self.projection.unproject(viewer.position)
    }
}
