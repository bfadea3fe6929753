//! The camera rig: a pivot carrying a camera and a light.

use geotile_tiling::{NodeHandle, SceneGraph};
use glam::{DQuat, DVec3};

/// A local transform snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: DVec3,
    pub rotation: DQuat,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        position: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn of(node: NodeHandle, scene: &dyn SceneGraph) -> Self {
        Self {
            position: scene.local_position(node),
            rotation: scene.local_rotation(node),
        }
    }

    pub fn apply(&self, node: NodeHandle, scene: &mut dyn SceneGraph) {
        scene.set_local_position(node, self.position);
        scene.set_local_rotation(node, self.rotation);
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Node handles making up the camera rig.
///
/// Navigation moves and rotates the pivot; the camera and the light are its
/// children. In orbit the camera backs away from the pivot along -Z, on the
/// surface the pivot itself carries the height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CameraRig {
    pub pivot: NodeHandle,
    pub camera: NodeHandle,
    pub light: NodeHandle,
}

impl CameraRig {
    pub fn create(scene: &mut dyn SceneGraph, parent: Option<NodeHandle>) -> Self {
        let pivot = scene.create_node(parent, "pivot");
        let camera = scene.create_node(Some(pivot), "camera");
        let light = scene.create_node(Some(pivot), "light");
        Self {
            pivot,
            camera,
            light,
        }
    }

    /// Put the pivot and camera back at identity and aim the camera and light
    /// with `view_rotation`.
    pub fn reset(&self, scene: &mut dyn SceneGraph, view_rotation: DQuat) {
        Transform::IDENTITY.apply(self.pivot, scene);
        Transform {
            position: DVec3::ZERO,
            rotation: view_rotation,
        }
        .apply(self.camera, scene);
        Transform {
            position: DVec3::ZERO,
            rotation: view_rotation,
        }
        .apply(self.light, scene);
    }

    pub fn pivot_transform(&self, scene: &dyn SceneGraph) -> Transform {
        Transform::of(self.pivot, scene)
    }

    pub fn camera_transform(&self, scene: &dyn SceneGraph) -> Transform {
        Transform::of(self.camera, scene)
    }
}

#[cfg(test)]
mod tests {
    use geotile_tiling::SceneArena;

    use super::*;

    #[test]
    fn test_rig_hierarchy() {
        let mut scene = SceneArena::new();
        let rig = CameraRig::create(&mut scene, None);
        assert_eq!(scene.parent(rig.camera), Some(rig.pivot));
        assert_eq!(scene.parent(rig.light), Some(rig.pivot));
        assert_eq!(scene.name(rig.pivot), Some("pivot"));
    }

    #[test]
    fn test_reset_restores_identity() {
        let mut scene = SceneArena::new();
        let rig = CameraRig::create(&mut scene, None);
        scene.set_local_position(rig.pivot, DVec3::new(10.0, 20.0, 30.0));
        scene.set_local_rotation(rig.pivot, DQuat::from_rotation_y(1.0));
        scene.set_local_position(rig.camera, DVec3::new(0.0, 0.0, -500.0));

        let down = DQuat::from_rotation_x(90f64.to_radians());
        rig.reset(&mut scene, down);

        assert_eq!(rig.pivot_transform(&scene), Transform::IDENTITY);
        let camera = rig.camera_transform(&scene);
        assert_eq!(camera.position, DVec3::ZERO);
        assert!(camera.rotation.abs_diff_eq(down, 1e-12));
        assert!(scene.local_rotation(rig.light).abs_diff_eq(down, 1e-12));
    }
}
