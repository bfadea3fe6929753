//! Distance → LOD lookup over contiguous half-open intervals.

use geotile_geo::QuadKey;
use serde::{Deserialize, Serialize};

/// Inclusive range of levels of detail handled by one controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LodRange {
    pub min: u8,
    pub max: u8,
}

impl LodRange {
    /// # Panics
    ///
    /// Panics if `min > max` or `max` exceeds [`QuadKey::MAX_LOD`].
    pub fn new(min: u8, max: u8) -> Self {
        assert!(min <= max, "LOD range min {min} > max {max}");
        assert!(
            max <= QuadKey::MAX_LOD,
            "LOD {max} exceeds MAX_LOD {}",
            QuadKey::MAX_LOD
        );
        Self { min, max }
    }

    pub fn contains(&self, lod: u8) -> bool {
        lod >= self.min && lod <= self.max
    }

    /// Number of levels in the range.
    pub fn count(&self) -> u8 {
        self.max - self.min + 1
    }
}

/// One entry of the tree: distances in `[from, to)` select `lod`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodInterval {
    pub from: f64,
    pub to: f64,
    pub lod: u8,
}

impl LodInterval {
    pub fn new(from: f64, to: f64, lod: u8) -> Self {
        Self { from, to, lod }
    }

    pub fn contains(&self, distance: f64) -> bool {
        distance >= self.from && distance < self.to
    }

    /// `true` when the interval runs to infinity or `f64::MAX`.
    pub fn is_unbounded(&self) -> bool {
        !(self.to < f64::MAX)
    }
}

/// Immutable, sorted set of contiguous intervals mapping viewer distance to LOD.
///
/// Intervals are stored nearest first, so the finest LOD comes first and the
/// coarsest last. Adjacent intervals share their boundary exactly; a distance on
/// a boundary belongs to the farther (coarser) interval.
#[derive(Clone, Debug, PartialEq)]
pub struct LodIntervalTree {
    intervals: Vec<LodInterval>,
}

impl LodIntervalTree {
    /// Build a tree from intervals in any order.
    ///
    /// # Panics
    ///
    /// Panics if `intervals` is empty, if any interval is empty or starts below
    /// zero, if neighbouring intervals leave a gap or overlap, or if the LODs are
    /// not consecutive and decreasing with distance.
    pub fn new(mut intervals: Vec<LodInterval>) -> Self {
        assert!(!intervals.is_empty(), "LOD tree must have at least one interval");
        intervals.sort_by(|a, b| a.from.total_cmp(&b.from));

        for (i, interval) in intervals.iter().enumerate() {
            assert!(
                interval.from >= 0.0 && interval.from < interval.to,
                "invalid LOD interval [{}, {}) for LOD {}",
                interval.from,
                interval.to,
                interval.lod
            );
            if i > 0 {
                let prev = &intervals[i - 1];
                assert!(
                    prev.to == interval.from,
                    "LOD intervals must be contiguous: [{}, {}) then [{}, {})",
                    prev.from,
                    prev.to,
                    interval.from,
                    interval.to
                );
                assert!(
                    prev.lod == interval.lod + 1,
                    "LODs must be consecutive and decrease with distance: {} then {}",
                    prev.lod,
                    interval.lod
                );
            }
        }

        Self { intervals }
    }

    /// Intervals ordered by distance, nearest first.
    pub fn intervals(&self) -> &[LodInterval] {
        &self.intervals
    }

    /// Lower distance bound of the whole tree.
    pub fn min(&self) -> f64 {
        self.intervals[0].from
    }

    /// Upper distance bound of the whole tree (may be infinite).
    pub fn max(&self) -> f64 {
        self.intervals[self.intervals.len() - 1].to
    }

    /// Coarsest LOD in the tree.
    pub fn min_lod(&self) -> u8 {
        self.intervals[self.intervals.len() - 1].lod
    }

    /// Finest LOD in the tree.
    pub fn max_lod(&self) -> u8 {
        self.intervals[0].lod
    }

    pub fn lod_range(&self) -> LodRange {
        LodRange::new(self.min_lod(), self.max_lod())
    }

    /// LOD for `distance`, clamped to the tree's LOD range outside its bounds.
    pub fn lookup(&self, distance: f64) -> u8 {
        if distance < self.min() {
            return self.max_lod();
        }
        if distance >= self.max() {
            return self.min_lod();
        }
        self.intervals[self.index_of(distance)].lod
    }

    /// The interval containing `distance`, if it lies within the tree's bounds.
    pub fn find(&self, distance: f64) -> Option<&LodInterval> {
        if distance < self.min() || distance >= self.max() {
            return None;
        }
        Some(&self.intervals[self.index_of(distance)])
    }

    /// The interval selecting `lod`, if it is in range.
    pub fn interval_for(&self, lod: u8) -> Option<&LodInterval> {
        if !self.lod_range().contains(lod) {
            return None;
        }
        Some(&self.intervals[(self.max_lod() - lod) as usize])
    }

    /// Strictly farther than the tree's upper bound.
    pub fn is_above_max(&self, distance: f64) -> bool {
        distance > self.max()
    }

    /// Strictly nearer than the tree's lower bound.
    pub fn is_below_min(&self, distance: f64) -> bool {
        distance < self.min()
    }

    /// Index of the interval containing an in-bounds distance.
    fn index_of(&self, distance: f64) -> usize {
        self.intervals
            .partition_point(|interval| interval.to <= distance)
            .min(self.intervals.len() - 1)
    }

    /// Finite `(from, to)` used to interpolate within the interval at `index`.
    ///
    /// An unbounded interval borrows the width of its nearer neighbour, or its
    /// own lower bound when it has none.
    pub(crate) fn finite_bounds(&self, index: usize) -> (f64, f64) {
        let interval = &self.intervals[index];
        if !interval.is_unbounded() {
            return (interval.from, interval.to);
        }
        let width = match index.checked_sub(1).map(|i| &self.intervals[i]) {
            Some(nearer) => nearer.to - nearer.from,
            None if interval.from > 0.0 => interval.from,
            None => 1.0,
        };
        (interval.from, interval.from + width)
    }

    /// Upper bound of the tree with an unbounded last interval made finite.
    pub(crate) fn finite_max(&self) -> f64 {
        self.finite_bounds(self.intervals.len() - 1).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> LodIntervalTree {
        LodIntervalTree::new(vec![
            LodInterval::new(100.0, 200.0, 3),
            LodInterval::new(0.0, 50.0, 5),
            LodInterval::new(50.0, 100.0, 4),
        ])
    }

    #[test]
    fn test_bounds_and_lod_range() {
        let tree = sample_tree();
        assert_eq!(tree.min(), 0.0);
        assert_eq!(tree.max(), 200.0);
        assert_eq!(tree.min_lod(), 3);
        assert_eq!(tree.max_lod(), 5);
        assert_eq!(tree.lod_range(), LodRange::new(3, 5));
    }

    #[test]
    fn test_lookup_inside_intervals() {
        let tree = sample_tree();
        assert_eq!(tree.lookup(0.0), 5);
        assert_eq!(tree.lookup(49.999), 5);
        assert_eq!(tree.lookup(75.0), 4);
        assert_eq!(tree.lookup(150.0), 3);
    }

    #[test]
    fn test_boundary_belongs_to_farther_interval() {
        let tree = sample_tree();
        assert_eq!(tree.lookup(50.0), 4);
        assert_eq!(tree.lookup(100.0), 3);
    }

    #[test]
    fn test_lookup_clamps_outside_bounds() {
        let tree = sample_tree();
        assert_eq!(tree.lookup(200.0), 3);
        assert_eq!(tree.lookup(1e9), 3);
        assert!(tree.find(200.0).is_none());
        assert_eq!(tree.find(199.0).map(|i| i.lod), Some(3));
    }

    #[test]
    fn test_above_and_below_are_strict() {
        let tree = LodIntervalTree::new(vec![
            LodInterval::new(10.0, 20.0, 2),
            LodInterval::new(20.0, 40.0, 1),
        ]);
        assert!(!tree.is_above_max(40.0));
        assert!(tree.is_above_max(40.001));
        assert!(!tree.is_below_min(10.0));
        assert!(tree.is_below_min(9.999));
        assert_eq!(tree.lookup(5.0), 2);
    }

    #[test]
    fn test_interval_for_lod() {
        let tree = sample_tree();
        assert_eq!(tree.interval_for(4).map(|i| (i.from, i.to)), Some((50.0, 100.0)));
        assert!(tree.interval_for(6).is_none());
        assert!(tree.interval_for(2).is_none());
    }

    #[test]
    fn test_unbounded_interval_borrows_neighbour_width() {
        let tree = LodIntervalTree::new(vec![
            LodInterval::new(0.0, 30.0, 2),
            LodInterval::new(30.0, f64::INFINITY, 1),
        ]);
        assert!(tree.intervals()[1].is_unbounded());
        assert_eq!(tree.finite_bounds(1), (30.0, 60.0));
        assert_eq!(tree.finite_max(), 60.0);
    }

    #[test]
    #[should_panic(expected = "contiguous")]
    fn test_gap_panics() {
        let _ = LodIntervalTree::new(vec![
            LodInterval::new(0.0, 10.0, 2),
            LodInterval::new(11.0, 20.0, 1),
        ]);
    }

    #[test]
    #[should_panic(expected = "consecutive")]
    fn test_non_consecutive_lods_panic() {
        let _ = LodIntervalTree::new(vec![
            LodInterval::new(0.0, 10.0, 4),
            LodInterval::new(10.0, 20.0, 1),
        ]);
    }

    #[test]
    #[should_panic(expected = "at least one")]
    fn test_empty_tree_panics() {
        let _ = LodIntervalTree::new(Vec::new());
    }
}
