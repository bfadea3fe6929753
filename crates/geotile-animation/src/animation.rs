//! Time-driven interpolation of rig nodes toward a geographic target.

use std::time::Duration;

use geotile_geo::GeoCoordinate;
use geotile_tiling::{NodeHandle, SceneGraph};
use glam::{DQuat, DVec3};

use crate::TimeInterpolator;

/// One animated property of one node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Track {
    /// Linear path between two local positions.
    Path {
        node: NodeHandle,
        from: DVec3,
        to: DVec3,
    },
    /// Shortest-arc rotation between two local rotations.
    Rotation {
        node: NodeHandle,
        from: DQuat,
        to: DQuat,
    },
}

impl Track {
    fn apply(&self, t: f64, scene: &mut dyn SceneGraph) {
        match *self {
            Track::Path { node, from, to } => scene.set_local_position(node, from.lerp(to, t)),
            Track::Rotation { node, from, to } => scene.set_local_rotation(node, from.slerp(to, t)),
        }
    }

    fn translate(&mut self, offset: DVec3) {
        if let Track::Path { from, to, .. } = self {
            *from += offset;
            *to += offset;
        }
    }
}

/// Where an animation is heading, in map terms.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationTarget {
    pub coordinate: GeoCoordinate,
    pub zoom: f64,
}

/// The unfinished part of an animation, handed over on a space change.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Remaining {
    pub target: AnimationTarget,
    pub duration: Duration,
}

/// Several tracks driven by one clock and one interpolator.
#[derive(Clone, Debug)]
pub struct Animation {
    tracks: Vec<Track>,
    interpolator: TimeInterpolator,
    duration: Duration,
    elapsed: Duration,
    target: AnimationTarget,
    running: bool,
}

impl Animation {
    pub fn new(
        tracks: Vec<Track>,
        interpolator: TimeInterpolator,
        duration: Duration,
        target: AnimationTarget,
    ) -> Self {
        Self {
            tracks,
            interpolator,
            duration,
            elapsed: Duration::ZERO,
            target,
            running: true,
        }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn target(&self) -> AnimationTarget {
        self.target
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ran to its end rather than being stopped early.
    pub fn has_landed(&self) -> bool {
        !self.running && self.elapsed >= self.duration
    }

    /// Linear progress in `[0, 1]`. A zero-length animation is always complete.
    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn remaining(&self) -> Remaining {
        Remaining {
            target: self.target,
            duration: self.duration.saturating_sub(self.elapsed),
        }
    }

    /// Advance by `delta` and write the interpolated state. The final frame
    /// lands exactly on the end values. Returns whether it is still running.
    pub fn update(&mut self, delta: Duration, scene: &mut dyn SceneGraph) -> bool {
        if !self.running {
            return false;
        }
        self.elapsed = (self.elapsed + delta).min(self.duration);
        let t = self.interpolator.apply(self.progress());
        for track in &self.tracks {
            track.apply(t, scene);
        }
        if self.elapsed >= self.duration {
            self.running = false;
        }
        self.running
    }

    /// Stop without touching the rig.
    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Shift every path by `offset`.
    pub fn translate(&mut self, offset: DVec3) {
        for track in &mut self.tracks {
            track.translate(offset);
        }
    }
}

#[cfg(test)]
mod tests {
    use geotile_tiling::SceneArena;

    use super::*;

    fn target() -> AnimationTarget {
        AnimationTarget {
            coordinate: GeoCoordinate::new(52.53171, 13.38721),
            zoom: 12.0,
        }
    }

    fn path_animation(scene: &mut SceneArena, seconds: u64) -> (NodeHandle, Animation) {
        let node = scene.create_node(None, "pivot");
        let animation = Animation::new(
            vec![Track::Path {
                node,
                from: DVec3::ZERO,
                to: DVec3::new(1000.0, 2000.0, 3000.0),
            }],
            TimeInterpolator::Linear,
            Duration::from_secs(seconds),
            target(),
        );
        (node, animation)
    }

    #[test]
    fn test_mid_animation_is_interpolated() {
        let mut scene = SceneArena::new();
        let (node, mut animation) = path_animation(&mut scene, 10);
        assert!(animation.update(Duration::from_secs(5), &mut scene));
        let position = scene.local_position(node);
        assert!((position - DVec3::new(500.0, 1000.0, 1500.0)).length() < 1e-9);
        assert_eq!(animation.remaining().duration, Duration::from_secs(5));
    }

    #[test]
    fn test_overshoot_lands_on_end_state() {
        let mut scene = SceneArena::new();
        let (node, mut animation) = path_animation(&mut scene, 2);
        assert!(!animation.update(Duration::from_secs(3), &mut scene));
        assert_eq!(scene.local_position(node), DVec3::new(1000.0, 2000.0, 3000.0));
        assert!(!animation.is_running());
        assert_eq!(animation.remaining().duration, Duration::ZERO);
    }

    #[test]
    fn test_zero_duration_snaps_on_first_update() {
        let mut scene = SceneArena::new();
        let (node, mut animation) = path_animation(&mut scene, 0);
        assert_eq!(animation.progress(), 1.0);
        assert!(!animation.update(Duration::ZERO, &mut scene));
        assert_eq!(scene.local_position(node), DVec3::new(1000.0, 2000.0, 3000.0));
    }

    #[test]
    fn test_rotation_track_follows_shortest_arc() {
        let mut scene = SceneArena::new();
        let node = scene.create_node(None, "pivot");
        let mut animation = Animation::new(
            vec![Track::Rotation {
                node,
                from: DQuat::IDENTITY,
                to: DQuat::from_rotation_y(std::f64::consts::FRAC_PI_2),
            }],
            TimeInterpolator::Linear,
            Duration::from_secs(4),
            target(),
        );
        animation.update(Duration::from_secs(2), &mut scene);
        let expected = DQuat::from_rotation_y(std::f64::consts::FRAC_PI_4);
        assert!(scene.local_rotation(node).abs_diff_eq(expected, 1e-9));
    }

    #[test]
    fn test_stopped_animation_leaves_rig_alone() {
        let mut scene = SceneArena::new();
        let (node, mut animation) = path_animation(&mut scene, 10);
        animation.stop();
        assert!(!animation.update(Duration::from_secs(1), &mut scene));
        assert_eq!(scene.local_position(node), DVec3::ZERO);
    }

    #[test]
    fn test_translate_shifts_paths_only() {
        let mut scene = SceneArena::new();
        let (node, mut animation) = path_animation(&mut scene, 10);
        animation.translate(DVec3::new(-1000.0, 0.0, 0.0));
        assert_eq!(
            animation.tracks()[0],
            Track::Path {
                node,
                from: DVec3::new(-1000.0, 0.0, 0.0),
                to: DVec3::new(0.0, 2000.0, 3000.0),
            }
        );
    }
}
