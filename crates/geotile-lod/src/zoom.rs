//! Continuous zoom level ↔ viewer distance.
//!
//! Zoom `z` inside the tree reads as `lod + t`, where `t` runs from 0 at the far
//! edge of the LOD's interval to 1 at its near edge. Zoom `min_lod` therefore sits
//! at the tree's upper bound and zoom `max_lod + 1` at its lower bound, which is
//! what lets neighbouring controllers hand a zoom level to each other.

use crate::LodIntervalTree;

impl LodIntervalTree {
    /// Distance change per zoom step used beyond the tree's bounds.
    fn height_per_zoom(&self) -> f64 {
        let steps = f64::from(self.lod_range().count());
        (self.finite_max() - self.min()) / steps
    }

    /// Viewer distance for a continuous zoom level.
    ///
    /// Zoom levels outside `[min_lod, max_lod + 1]` are extrapolated linearly
    /// with the tree's average distance per zoom step.
    pub fn get_height(&self, zoom: f64) -> f64 {
        let min_zoom = f64::from(self.min_lod());
        let max_zoom = f64::from(self.max_lod()) + 1.0;

        if zoom >= max_zoom {
            return (self.min() - (zoom - max_zoom) * self.height_per_zoom()).max(0.0);
        }
        if zoom < min_zoom {
            return self.finite_max() + (min_zoom - zoom) * self.height_per_zoom();
        }

        let lod = zoom.floor();
        let fraction = zoom - lod;
        let index = usize::from(self.max_lod() - lod as u8);
        let (from, to) = self.finite_bounds(index);
        to - fraction * (to - from)
    }

    /// Continuous zoom level for a viewer distance, clamped to
    /// `[min_lod, max_lod + 1]`.
    pub fn calculate_zoom(&self, distance: f64) -> f64 {
        let min_zoom = f64::from(self.min_lod());
        if distance < self.min() {
            return f64::from(self.max_lod()) + 1.0;
        }
        if distance >= self.max() {
            return min_zoom;
        }

        let lod = self.lookup(distance);
        let index = usize::from(self.max_lod() - lod);
        let (from, to) = self.finite_bounds(index);
        let zoom = f64::from(lod) + (to - distance) / (to - from);
        zoom.max(min_zoom)
    }
}

#[cfg(test)]
mod tests {
    use crate::{LodInterval, LodIntervalTree};

    fn bounded_tree() -> LodIntervalTree {
        LodIntervalTree::new(vec![
            LodInterval::new(10.0, 20.0, 11),
            LodInterval::new(20.0, 40.0, 10),
            LodInterval::new(40.0, 80.0, 9),
        ])
    }

    #[test]
    fn test_zoom_at_bounds() {
        let tree = bounded_tree();
        assert_eq!(tree.calculate_zoom(80.0), 9.0);
        assert_eq!(tree.calculate_zoom(500.0), 9.0);
        assert_eq!(tree.calculate_zoom(5.0), 12.0);
        assert_eq!(tree.get_height(9.0), 80.0);
        assert_eq!(tree.get_height(12.0), 10.0);
    }

    #[test]
    fn test_zoom_interpolates_within_interval() {
        let tree = bounded_tree();
        assert!((tree.calculate_zoom(30.0) - 10.5).abs() < 1e-12);
        assert!((tree.get_height(10.5) - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_height_zoom_roundtrip() {
        let tree = bounded_tree();
        let mut distance = 10.5;
        while distance < 80.0 {
            let zoom = tree.calculate_zoom(distance);
            assert_eq!(zoom.floor() as u8, tree.lookup(distance), "distance {distance}");
            assert!((tree.get_height(zoom) - distance).abs() < 1e-9);
            distance += 3.7;
        }
    }

    #[test]
    fn test_extrapolation_is_continuous_and_monotonic() {
        let tree = bounded_tree();
        // (80 - 10) / 3 levels
        let ratio = 70.0 / 3.0;
        assert!((tree.get_height(8.0) - (80.0 + ratio)).abs() < 1e-9);
        assert!((tree.get_height(12.1) - (10.0 - 0.1 * ratio)).abs() < 1e-9);
        assert!(tree.get_height(8.5) > tree.get_height(9.0));
        assert!(tree.get_height(12.0) > tree.get_height(12.2));
        assert_eq!(tree.get_height(30.0), 0.0);
    }

    #[test]
    fn test_unbounded_top_interval() {
        let tree = LodIntervalTree::new(vec![
            LodInterval::new(0.0, 50.0, 2),
            LodInterval::new(50.0, f64::MAX, 1),
        ]);
        assert_eq!(tree.get_height(1.0), 100.0);
        assert!((tree.calculate_zoom(75.0) - 1.5).abs() < 1e-12);
        assert_eq!(tree.calculate_zoom(1e12), 1.0);
        assert!((tree.get_height(tree.calculate_zoom(60.0)) - 60.0).abs() < 1e-9);
    }
}
