//! A single projection regime: tile controller, animator and scene root.

use std::fmt;
use std::time::Duration;

use geotile_animation::{AnimationTarget, Animator, AnimatorKind, CameraRig, TimeInterpolator};
use geotile_geo::{GeoCoordinate, euler_from_rotation};
use geotile_lod::LodRange;
use geotile_tiling::{
    MapDataProvider, NodeHandle, SceneGraph, TileController, TileSetManager, ViewerState,
};
use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpaceKind {
    /// The whole planet as a sphere.
    Orbit,
    /// Locally flat map at a reduced scale.
    Surface,
    /// Locally flat map at full scale.
    Detail,
}

impl SpaceKind {
    fn animator_kind(self) -> AnimatorKind {
        match self {
            SpaceKind::Orbit => AnimatorKind::Sphere,
            SpaceKind::Surface | SpaceKind::Detail => AnimatorKind::Surface,
        }
    }

    /// Camera and light orientation relative to the pivot.
    fn view_rotation(self) -> DQuat {
        match self {
            SpaceKind::Orbit => DQuat::IDENTITY,
            // Straight down onto the map.
            SpaceKind::Surface | SpaceKind::Detail => {
                DQuat::from_rotation_x(-std::f64::consts::FRAC_PI_2)
            }
        }
    }
}

impl fmt::Display for SpaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SpaceKind::Orbit => "orbit",
            SpaceKind::Surface => "surface",
            SpaceKind::Detail => "detail",
        };
        f.write_str(name)
    }
}

/// One regime with its own tiles, animator and scene root.
#[derive(Debug)]
pub struct Space {
    kind: SpaceKind,
    root: NodeHandle,
    manager: TileController,
    animator: Animator,
}

impl Space {
    pub fn new(
        kind: SpaceKind,
        root: NodeHandle,
        manager: TileController,
        interpolator: TimeInterpolator,
    ) -> Self {
        Self {
            kind,
            root,
            manager,
            animator: Animator::new(kind.animator_kind(), interpolator),
        }
    }

    pub fn kind(&self) -> SpaceKind {
        self.kind
    }

    pub fn root(&self) -> NodeHandle {
        self.root
    }

    pub fn manager(&self) -> &TileController {
        &self.manager
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    pub fn lod_range(&self) -> LodRange {
        self.manager.lod_range()
    }

    /// Zoom level at the coarse (`from_top`) or fine edge of this space.
    pub fn boundary_zoom(&self, from_top: bool) -> f64 {
        let range = self.lod_range();
        if from_top {
            f64::from(range.min)
        } else {
            f64::from(range.max) + 1.0
        }
    }

    /// What the tile controller sees of the rig.
    pub fn viewer(&self, rig: &CameraRig, scene: &dyn SceneGraph) -> ViewerState {
        match self.kind {
            SpaceKind::Orbit => ViewerState::new(
                scene.local_position(rig.camera),
                euler_from_rotation(scene.local_rotation(rig.pivot)),
            ),
            SpaceKind::Surface | SpaceKind::Detail => {
                ViewerState::new(scene.local_position(rig.pivot), DVec3::ZERO)
            }
        }
    }

    pub fn coordinate(&self, rig: &CameraRig, scene: &dyn SceneGraph) -> GeoCoordinate {
        self.manager.coordinate_at(&self.viewer(rig, scene))
    }

    pub fn animate_to(
        &mut self,
        coordinate: GeoCoordinate,
        zoom: f64,
        duration: Duration,
        rig: &CameraRig,
        scene: &mut dyn SceneGraph,
    ) {
        self.animator
            .animate_to(coordinate, zoom, duration, &self.manager, rig, scene);
    }

    /// Target of a finished animation that lies outside this space's levels.
    pub(crate) fn landed_outside(&self) -> Option<AnimationTarget> {
        let range = self.lod_range();
        self.animator.landed().filter(|target| {
            let lod = target.zoom.floor();
            lod < f64::from(range.min) || lod > f64::from(range.max)
        })
    }

    pub(crate) fn animator_mut(&mut self) -> &mut Animator {
        &mut self.animator
    }

    pub(crate) fn manager_mut(&mut self) -> &mut TileController {
        &mut self.manager
    }

    /// Continue another space's animation after the rig was placed at the boundary.
    pub(crate) fn resume(
        &mut self,
        remaining: geotile_animation::Remaining,
        rig: &CameraRig,
        scene: &mut dyn SceneGraph,
    ) {
        self.animator.resume(remaining, &self.manager, rig, scene);
    }

    /// Show this space and re-seed its geo-origin at `coordinate`.
    pub(crate) fn enter(
        &mut self,
        coordinate: GeoCoordinate,
        rig: &CameraRig,
        scene: &mut dyn SceneGraph,
    ) {
        scene.set_active(self.root, true);
        rig.reset(scene, self.kind.view_rotation());
        self.manager.move_geo_origin(coordinate);
        tracing::debug!(space = %self.kind, %coordinate, "Entered space");
    }

    /// Stop animating, drop every tile and hide this space.
    pub(crate) fn leave(&mut self, scene: &mut dyn SceneGraph, provider: &dyn MapDataProvider) {
        self.animator.cancel();
        self.manager.dispose(scene, provider);
        scene.set_active(self.root, false);
        tracing::debug!(space = %self.kind, "Left space");
    }
}

#[cfg(test)]
mod tests {
    use geotile_tiling::testing::RecordingProvider;
    use geotile_tiling::{
        SceneArena, SphereController, SphereSettings, SurfaceController, SurfaceSettings,
    };

    use super::*;

    const BERLIN: GeoCoordinate = GeoCoordinate::new(52.53171, 13.38721);

    fn surface(scene: &mut SceneArena) -> Space {
        let root = scene.create_node(None, "surface");
        let manager = SurfaceController::new(SurfaceSettings::default(), BERLIN, root);
        Space::new(SpaceKind::Surface, root, manager.into(), TimeInterpolator::Decelerate)
    }

    #[test]
    fn test_boundary_zoom() {
        let mut scene = SceneArena::new();
        let space = surface(&mut scene);
        assert_eq!(space.boundary_zoom(true), 9.0);
        assert_eq!(space.boundary_zoom(false), 16.0);
    }

    #[test]
    fn test_enter_resets_rig_and_activates_root() {
        let mut scene = SceneArena::new();
        let rig = CameraRig::create(&mut scene, None);
        let mut space = surface(&mut scene);
        scene.set_active(space.root(), false);
        scene.set_local_position(rig.pivot, DVec3::new(5.0, 6.0, 7.0));

        let paris = GeoCoordinate::new(48.8566, 2.3522);
        space.enter(paris, &rig, &mut scene);

        assert!(scene.is_active(space.root()));
        assert_eq!(scene.local_position(rig.pivot), DVec3::ZERO);
        assert_eq!(space.manager().projection().origin(), Some(paris));
        assert!(space.coordinate(&rig, &scene).approx_eq(&paris, 1e-9));
    }

    #[test]
    fn test_leave_disposes_tiles_and_hides_root() {
        let mut scene = SceneArena::new();
        let provider = RecordingProvider::new();
        let rig = CameraRig::create(&mut scene, None);
        let mut space = surface(&mut scene);
        space.enter(BERLIN, &rig, &mut scene);
        space.animate_to(BERLIN, 10.0, Duration::ZERO, &rig, &mut scene);
        let viewer = space.viewer(&rig, &scene);
        space.manager_mut().update(&viewer, &mut scene, &provider).unwrap();
        assert_eq!(space.manager().resident_count(), 9);

        space.animate_to(BERLIN, 12.0, Duration::from_secs(5), &rig, &mut scene);
        space.leave(&mut scene, &provider);
        assert_eq!(space.manager().resident_count(), 0);
        assert!(!space.animator().is_running());
        assert!(!scene.is_active(space.root()));
    }

    #[test]
    fn test_landed_outside_levels() {
        let mut scene = SceneArena::new();
        let rig = CameraRig::create(&mut scene, None);
        let mut space = surface(&mut scene);
        space.enter(BERLIN, &rig, &mut scene);

        space.animate_to(BERLIN, 15.9, Duration::ZERO, &rig, &mut scene);
        assert!(space.landed_outside().is_none());
        space.animate_to(BERLIN, 16.0, Duration::ZERO, &rig, &mut scene);
        assert_eq!(space.landed_outside().map(|target| target.zoom), Some(16.0));
        space.animate_to(BERLIN, 8.5, Duration::ZERO, &rig, &mut scene);
        assert_eq!(space.landed_outside().map(|target| target.zoom), Some(8.5));

        // Still on its way.
        space.animate_to(BERLIN, 16.0, Duration::from_secs(1), &rig, &mut scene);
        assert!(space.landed_outside().is_none());
    }

    #[test]
    fn test_orbit_viewer_reads_camera_and_pivot() {
        let mut scene = SceneArena::new();
        let rig = CameraRig::create(&mut scene, None);
        let root = scene.create_node(None, "planet");
        let mut orbit = Space::new(
            SpaceKind::Orbit,
            root,
            SphereController::new(SphereSettings::default(), root).into(),
            TimeInterpolator::Decelerate,
        );
        orbit.enter(BERLIN, &rig, &mut scene);
        orbit.animate_to(BERLIN, 4.0, Duration::ZERO, &rig, &mut scene);

        let viewer = orbit.viewer(&rig, &scene);
        assert!((viewer.position.length() - orbit.manager().get_height(4.0)).abs() < 1e-6);
        assert!(orbit.coordinate(&rig, &scene).approx_eq(&BERLIN, 1e-6));
    }
}
