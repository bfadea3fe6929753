//! Tile streaming: the resident tile sets kept around a moving viewer, the
//! external interfaces they drive (map data provider and scene graph), and the
//! floating-origin bookkeeping that keeps world coordinates small.

mod cancellation;
mod channel_provider;
mod controller;
mod error;
mod floating_origin;
mod grid;
mod planar;
mod provider;
mod scene;
mod sphere;
mod surface;
mod tile;
mod tile_grid;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use cancellation::CancellationToken;
pub use channel_provider::{ChannelDataProvider, ProviderSettings, TileSource};
pub use controller::{
    Delivery, TileChange, TileController, TileSetManager, UpdateOutcome, ViewerState,
};
pub use error::{ProviderError, TileWarning, TilingError};
pub use floating_origin::FloatingOrigin;
pub use grid::{GridController, GridSettings};
pub use provider::{ElevationType, MapDataProvider, MapElement, TileContent, TileEvent, TileRequest};
pub use scene::{NodeHandle, SceneArena, SceneGraph};
pub use sphere::{SphereController, SphereSettings};
pub use surface::{SurfaceController, SurfaceSettings};
pub use tile::{Tile, TileId, TileIds};
