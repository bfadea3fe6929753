//! Interval tree construction for each controller flavour.

use geotile_geo::{GeoCoordinate, QuadKey, distance};
use serde::{Deserialize, Serialize};

use crate::{LodInterval, LodIntervalTree, LodRange};

/// Viewport dimensions and how much of its height the 3×3 tile block should fill.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    /// Fraction of the viewport covered by the tile block when entering a LOD.
    pub size_ratio: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920.0,
            height: 1080.0,
            size_ratio: 0.75,
        }
    }
}

impl Viewport {
    pub fn aspect(&self) -> f64 {
        self.width / self.height
    }

    /// Frustum height per unit of tile-block width. Landscape viewports are
    /// limited by their height, so the block is scaled down by the aspect ratio.
    pub fn frame_fraction(&self) -> f64 {
        if self.height < self.width {
            self.size_ratio / self.aspect()
        } else {
            self.size_ratio
        }
    }
}

/// An interval tree together with the vertical field of view it was computed for.
#[derive(Clone, Debug, PartialEq)]
pub struct LodLayout {
    pub tree: LodIntervalTree,
    /// Vertical field of view in degrees.
    pub field_of_view: f64,
}

/// World-space width of the 3-tile row centered on the tile containing `origin`.
pub fn grid_width(origin: GeoCoordinate, lod: u8, scale: f64) -> f64 {
    let bbox = QuadKey::from_coordinate(origin, lod).bounding_box();
    let latitude = bbox.center().latitude;
    let tile_width = bbox.width();
    let west = GeoCoordinate::new(latitude, bbox.min_point.longitude - tile_width);
    let east = GeoCoordinate::new(latitude, bbox.max_point.longitude + tile_width);
    distance(west, east) * scale
}

/// Distance at which a frustum of `fov` radians is `frustum_height` tall.
fn standoff(frustum_height: f64, fov: f64) -> f64 {
    frustum_height * 0.5 / (fov * 0.5).tan()
}

/// Tree for a bounded surface controller.
///
/// The field of view is chosen so that the coarsest LOD's tile block fills the
/// frame at `max_distance`. Each finer LOD starts where its own block fills the
/// frame at that field of view, so the finest interval ends at a non-zero
/// standoff below which the controller reports "below min". A single-LOD range
/// covers `[0, max_distance)`.
///
/// # Panics
///
/// Panics if `max_distance` is not positive.
pub fn surface_tree(
    origin: GeoCoordinate,
    range: LodRange,
    scale: f64,
    max_distance: f64,
    viewport: &Viewport,
) -> LodLayout {
    assert!(max_distance > 0.0, "max distance must be positive");
    let fraction = viewport.frame_fraction();
    let frustum = |lod: u8| grid_width(origin, lod, scale) * fraction;
    let fov = 2.0 * (frustum(range.min) / max_distance).atan();

    let intervals = if range.min == range.max {
        vec![LodInterval::new(0.0, max_distance, range.min)]
    } else {
        let mut upper = max_distance;
        (range.min..=range.max)
            .map(|lod| {
                let lower = standoff(frustum(lod), fov);
                let interval = LodInterval::new(lower, upper, lod);
                upper = lower;
                interval
            })
            .collect()
    };

    let tree = LodIntervalTree::new(intervals);
    tracing::debug!(
        min_lod = range.min,
        max_lod = range.max,
        min_distance = tree.min(),
        max_distance = tree.max(),
        fov = fov.to_degrees(),
        "Built surface LOD tree"
    );
    LodLayout {
        tree,
        field_of_view: fov.to_degrees(),
    }
}

/// Tree for a standalone, unbounded grid controller.
///
/// The field of view makes the coarsest LOD's block fill the frame at
/// `max_distance`. Every LOD hands over to the next finer one where that LOD's
/// block fills the frame, the coarsest reaches out to infinity and the finest
/// down to zero.
///
/// # Panics
///
/// Panics if `max_distance` is not positive.
pub fn grid_tree(
    origin: GeoCoordinate,
    range: LodRange,
    scale: f64,
    max_distance: f64,
    viewport: &Viewport,
) -> LodLayout {
    assert!(max_distance > 0.0, "max distance must be positive");
    let fraction = viewport.frame_fraction();
    let frustum = |lod: u8| grid_width(origin, lod, scale) * fraction;
    let fov = 2.0 * (frustum(range.min) * 0.5 / max_distance).atan();

    let mut intervals = Vec::with_capacity(usize::from(range.count()));
    let mut upper = f64::INFINITY;
    for lod in range.min + 1..=range.max {
        let lower = standoff(frustum(lod), fov);
        intervals.push(LodInterval::new(lower, upper, lod - 1));
        upper = lower;
    }
    intervals.push(LodInterval::new(0.0, upper, range.max));

    let tree = LodIntervalTree::new(intervals);
    tracing::debug!(
        min_lod = range.min,
        max_lod = range.max,
        fov = fov.to_degrees(),
        "Built grid LOD tree"
    );
    LodLayout {
        tree,
        field_of_view: fov.to_degrees(),
    }
}

fn fibonacci(n: u8) -> f64 {
    let (mut a, mut b) = (0.0, 1.0);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    a
}

/// Tree for the orbit sphere of the given radius.
///
/// LOD 1 starts at two radii from the center; each following LOD takes a
/// shrinking Fibonacci fraction of the remaining radius, so intervals tighten
/// toward the surface. The coarsest LOD of `range` always extends to `f64::MAX`.
///
/// # Panics
///
/// Panics if `range.min` is 0.
pub fn sphere_tree(range: LodRange, radius: f64) -> LodIntervalTree {
    assert!(range.min >= 1, "sphere LOD range must start at 1 or above");
    let base = 2.0 * radius;

    let mut intervals: Vec<LodInterval> = (range.min..=range.max)
        .map(|lod| match lod {
            1 => LodInterval::new(base, f64::MAX, lod),
            2 => LodInterval::new(base - radius / 3.0, base, lod),
            _ => {
                let outer = fibonacci(lod - 1);
                let inner = fibonacci(lod);
                let to = if lod == 3 {
                    base - radius / 3.0
                } else {
                    base - radius * outer / (outer + 1.0)
                };
                let from = base - radius * inner / (inner + 1.0);
                LodInterval::new(from, to, lod)
            }
        })
        .collect();

    if let Some(coarsest) = intervals.first_mut() {
        coarsest.to = f64::MAX;
    }

    let tree = LodIntervalTree::new(intervals);
    tracing::debug!(
        min_lod = range.min,
        max_lod = range.max,
        radius,
        min_distance = tree.min(),
        "Built sphere LOD tree"
    );
    tree
}
