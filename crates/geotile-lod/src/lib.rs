//! Level-of-detail selection: the distance → LOD interval tree, the tree builders
//! for the grid, surface and sphere controllers, and the continuous zoom ↔ height
//! mapping shared by all of them.

mod builder;
mod interval_tree;
mod zoom;

pub use builder::{LodLayout, Viewport, grid_tree, grid_width, sphere_tree, surface_tree};
pub use interval_tree::{LodInterval, LodIntervalTree, LodRange};
