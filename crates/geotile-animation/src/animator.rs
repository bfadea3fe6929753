//! Builds rig animations toward a (coordinate, zoom) target and runs them.

use std::time::Duration;

use geotile_geo::{GeoCoordinate, euler_from_coordinate, rotation_from_euler};
use geotile_tiling::{SceneGraph, TileSetManager};
use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::{Animation, AnimationTarget, CameraRig, Remaining, TimeInterpolator, Track};

/// How a target maps onto the rig.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimatorKind {
    /// Rotate the pivot over the target and back the camera off to the
    /// zoom's distance.
    Sphere,
    /// Move the pivot over the projected target at the zoom's height.
    Surface,
}

/// Owns at most one running animation for a space.
#[derive(Debug)]
pub struct Animator {
    kind: AnimatorKind,
    interpolator: TimeInterpolator,
    animation: Option<Animation>,
}

impl Animator {
    pub fn new(kind: AnimatorKind, interpolator: TimeInterpolator) -> Self {
        Self {
            kind,
            interpolator,
            animation: None,
        }
    }

    pub fn kind(&self) -> AnimatorKind {
        self.kind
    }

    pub fn animation(&self) -> Option<&Animation> {
        self.animation.as_ref()
    }

    /// Start animating toward `coordinate` at `zoom`, replacing any running
    /// animation. A zero `duration` moves the rig immediately.
    pub fn animate_to(
        &mut self,
        coordinate: GeoCoordinate,
        zoom: f64,
        duration: Duration,
        manager: &dyn TileSetManager,
        rig: &CameraRig,
        scene: &mut dyn SceneGraph,
    ) {
        self.cancel();
        let height = manager.get_height(zoom);
        let tracks = match self.kind {
            AnimatorKind::Sphere => vec![
                Track::Path {
                    node: rig.camera,
                    from: scene.local_position(rig.camera),
                    to: DVec3::new(0.0, 0.0, -height),
                },
                Track::Rotation {
                    node: rig.pivot,
                    from: scene.local_rotation(rig.pivot),
                    to: rotation_from_euler(euler_from_coordinate(coordinate)),
                },
            ],
            AnimatorKind::Surface => {
                let ground = manager.projection().project(coordinate, 0.0);
                vec![Track::Path {
                    node: rig.pivot,
                    from: scene.local_position(rig.pivot),
                    to: DVec3::new(ground.x, height, ground.z),
                }]
            }
        };

        tracing::debug!(
            kind = ?self.kind,
            %coordinate,
            zoom,
            duration_ms = duration.as_millis() as u64,
            "Animating rig"
        );

        let mut animation = Animation::new(
            tracks,
            self.interpolator,
            duration,
            AnimationTarget { coordinate, zoom },
        );
        if duration.is_zero() {
            animation.update(Duration::ZERO, scene);
        }
        self.animation = Some(animation);
    }

    /// Continue an animation handed over from another animator.
    pub fn resume(
        &mut self,
        remaining: Remaining,
        manager: &dyn TileSetManager,
        rig: &CameraRig,
        scene: &mut dyn SceneGraph,
    ) {
        self.animate_to(
            remaining.target.coordinate,
            remaining.target.zoom,
            remaining.duration,
            manager,
            rig,
            scene,
        );
    }

    /// Advance the running animation. Returns whether it is still running.
    pub fn update(&mut self, delta: Duration, scene: &mut dyn SceneGraph) -> bool {
        match self.animation.as_mut() {
            Some(animation) => animation.update(delta, scene),
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.animation.as_ref().is_some_and(Animation::is_running)
    }

    pub fn cancel(&mut self) {
        if let Some(animation) = self.animation.as_mut() {
            animation.stop();
        }
    }

    /// Forget the last animation, whether it landed or not.
    pub fn clear(&mut self) {
        self.animation = None;
    }

    /// Where the last animation came to rest, if it ran to its end.
    pub fn landed(&self) -> Option<AnimationTarget> {
        self.animation
            .as_ref()
            .filter(|a| a.has_landed())
            .map(Animation::target)
    }

    /// What is left of the running animation, if any.
    pub fn remaining(&self) -> Option<Remaining> {
        self.animation
            .as_ref()
            .filter(|a| a.is_running())
            .map(Animation::remaining)
    }

    /// Cancel the running animation and return what was left of it.
    pub fn take_remaining(&mut self) -> Option<Remaining> {
        let remaining = self.remaining();
        self.cancel();
        remaining
    }

    /// Follow a floating-origin shift of the world.
    pub fn translate(&mut self, offset: DVec3) {
        if let Some(animation) = self.animation.as_mut() {
            animation.translate(offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use geotile_geo::{coordinate_from_euler, euler_from_rotation};
    use geotile_tiling::{
        SceneArena, SphereController, SphereSettings, SurfaceController, SurfaceSettings,
    };

    use super::*;

    const BERLIN: GeoCoordinate = GeoCoordinate::new(52.53171, 13.38721);
    const SYDNEY: GeoCoordinate = GeoCoordinate::new(-33.8688, 151.2093);

    struct Fixture {
        scene: SceneArena,
        rig: CameraRig,
        sphere: SphereController,
        surface: SurfaceController,
    }

    fn fixture() -> Fixture {
        let mut scene = SceneArena::new();
        let rig = CameraRig::create(&mut scene, None);
        let planet = scene.create_node(None, "planet");
        let ground = scene.create_node(None, "surface");
        Fixture {
            sphere: SphereController::new(SphereSettings::default(), planet),
            surface: SurfaceController::new(SurfaceSettings::default(), BERLIN, ground),
            scene,
            rig,
        }
    }

    #[test]
    fn test_instant_sphere_animation_snaps_rig() {
        let mut f = fixture();
        let mut animator = Animator::new(AnimatorKind::Sphere, TimeInterpolator::Decelerate);
        animator.animate_to(SYDNEY, 3.0, Duration::ZERO, &f.sphere, &f.rig, &mut f.scene);

        assert!(!animator.is_running());
        let height = f.sphere.get_height(3.0);
        let camera = f.scene.local_position(f.rig.camera);
        assert!((camera - DVec3::new(0.0, 0.0, -height)).length() < 1e-6);

        let euler = euler_from_rotation(f.scene.local_rotation(f.rig.pivot));
        assert!(coordinate_from_euler(euler).approx_eq(&SYDNEY, 1e-6));
    }

    #[test]
    fn test_surface_animation_moves_pivot_over_target() {
        let mut f = fixture();
        let mut animator = Animator::new(AnimatorKind::Surface, TimeInterpolator::Linear);
        animator.animate_to(BERLIN, 12.0, Duration::from_secs(2), &f.surface, &f.rig, &mut f.scene);
        assert!(animator.is_running());
        assert_eq!(f.scene.local_position(f.rig.pivot), DVec3::ZERO);

        animator.update(Duration::from_secs(1), &mut f.scene);
        let height = f.surface.get_height(12.0);
        let halfway = f.scene.local_position(f.rig.pivot);
        assert!((halfway.y - height * 0.5).abs() < 1e-6);

        assert!(!animator.update(Duration::from_secs(1), &mut f.scene));
        let end = f.scene.local_position(f.rig.pivot);
        assert!((end - DVec3::new(0.0, height, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_remaining_animation_is_transplanted() {
        let mut f = fixture();
        let mut orbit = Animator::new(AnimatorKind::Sphere, TimeInterpolator::Decelerate);
        orbit.animate_to(BERLIN, 14.0, Duration::from_secs(10), &f.sphere, &f.rig, &mut f.scene);
        orbit.update(Duration::from_secs(7), &mut f.scene);

        let remaining = orbit.take_remaining().unwrap();
        assert!(!orbit.is_running());
        assert_eq!(remaining.duration, Duration::from_secs(3));
        assert_eq!(remaining.target.zoom, 14.0);

        let mut surface = Animator::new(AnimatorKind::Surface, TimeInterpolator::Decelerate);
        surface.resume(remaining, &f.surface, &f.rig, &mut f.scene);
        assert_eq!(surface.remaining().map(|r| r.duration), Some(Duration::from_secs(3)));
        assert!(surface.update(Duration::from_millis(2999), &mut f.scene));
        assert!(!surface.update(Duration::from_millis(1), &mut f.scene));
    }

    #[test]
    fn test_new_target_replaces_running_animation() {
        let mut f = fixture();
        let mut animator = Animator::new(AnimatorKind::Surface, TimeInterpolator::Linear);
        animator.animate_to(BERLIN, 10.0, Duration::from_secs(5), &f.surface, &f.rig, &mut f.scene);
        animator.animate_to(BERLIN, 13.0, Duration::from_secs(5), &f.surface, &f.rig, &mut f.scene);
        let target = animator.animation().unwrap().target();
        assert_eq!(target.zoom, 13.0);
        assert_eq!(animator.remaining().unwrap().duration, Duration::from_secs(5));
    }

    #[test]
    fn test_cancel_leaves_nothing_to_transplant() {
        let mut f = fixture();
        let mut animator = Animator::new(AnimatorKind::Surface, TimeInterpolator::Linear);
        animator.animate_to(BERLIN, 10.0, Duration::from_secs(5), &f.surface, &f.rig, &mut f.scene);
        animator.cancel();
        assert!(animator.take_remaining().is_none());
        assert!(!animator.update(Duration::from_secs(1), &mut f.scene));
    }

    #[test]
    fn test_landed_only_after_running_to_the_end() {
        let mut f = fixture();
        let mut animator = Animator::new(AnimatorKind::Surface, TimeInterpolator::Linear);
        assert!(animator.landed().is_none());

        animator.animate_to(BERLIN, 11.0, Duration::from_secs(2), &f.surface, &f.rig, &mut f.scene);
        assert!(animator.landed().is_none());
        animator.update(Duration::from_secs(2), &mut f.scene);
        assert_eq!(animator.landed().map(|target| target.zoom), Some(11.0));

        animator.animate_to(BERLIN, 13.0, Duration::from_secs(2), &f.surface, &f.rig, &mut f.scene);
        animator.update(Duration::from_secs(1), &mut f.scene);
        animator.cancel();
        assert!(animator.landed().is_none());

        animator.animate_to(BERLIN, 14.0, Duration::ZERO, &f.surface, &f.rig, &mut f.scene);
        assert_eq!(animator.landed().map(|target| target.zoom), Some(14.0));
        animator.clear();
        assert!(animator.landed().is_none());
        assert!(animator.animation().is_none());
    }

    #[test]
    fn test_translate_follows_recenter() {
        let mut f = fixture();
        let mut animator = Animator::new(AnimatorKind::Surface, TimeInterpolator::Linear);
        animator.animate_to(BERLIN, 12.0, Duration::from_secs(2), &f.surface, &f.rig, &mut f.scene);
        animator.translate(DVec3::new(-100.0, 0.0, 50.0));
        animator.update(Duration::from_secs(2), &mut f.scene);
        let end = f.scene.local_position(f.rig.pivot);
        assert!((end.x + 100.0).abs() < 1e-6);
        assert!((end.z - 50.0).abs() < 1e-6);
    }
}
