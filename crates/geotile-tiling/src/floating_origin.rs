//! Geo-origin recentering for world-space precision.
//!
//! Content is placed relative to a geo-origin. When the viewer wanders far
//! from world zero the origin is moved under the viewer and everything already
//! placed is shifted back by the same amount, keeping coordinates small.

use glam::DVec3;

/// Decides when the geo-origin must follow the viewer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatingOrigin {
    /// Planar (XZ) distance from world zero that triggers a recenter.
    pub threshold: f64,
}

impl FloatingOrigin {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// The planar offset to recenter by, or `None` while the viewer is within
    /// the threshold. Height is never part of the offset.
    pub fn check(&self, position: DVec3) -> Option<DVec3> {
        let planar = DVec3::new(position.x, 0.0, position.z);
        (planar.length() > self.threshold).then_some(planar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_small_movement_no_recenter() {
        let origin = FloatingOrigin::new(2000.0);
        assert!(origin.check(DVec3::new(1000.0, 5000.0, 1000.0)).is_none());
    }

    #[test]
    fn test_large_movement_returns_planar_offset() {
        let origin = FloatingOrigin::new(2000.0);
        let offset = origin.check(DVec3::new(1500.0, 300.0, -1500.0));
        assert_eq!(offset, Some(DVec3::new(1500.0, 0.0, -1500.0)));
    }

    #[test]
    fn test_threshold_is_exclusive() {
        let origin = FloatingOrigin::new(2000.0);
        assert!(origin.check(DVec3::new(2000.0, 0.0, 0.0)).is_none());
        assert!(origin.check(DVec3::new(2000.1, 0.0, 0.0)).is_some());
    }
}
