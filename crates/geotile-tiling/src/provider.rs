//! The interface to whatever turns tile requests into map content.

use geotile_geo::{GeoCoordinate, QuadKey};
use serde::{Deserialize, Serialize};

use crate::{CancellationToken, ProviderError, TileId, TilingError};

/// Source of terrain height used when placing a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElevationType {
    /// No elevation; tiles sit at height zero.
    #[default]
    Flat,
    /// Regular elevation grid.
    Grid,
    /// SRTM elevation data.
    Srtm,
}

/// A request to load one tile.
#[derive(Clone, Debug)]
pub struct TileRequest {
    pub tile: TileId,
    pub quad_key: QuadKey,
    pub elevation_type: ElevationType,
    /// Shared with the tile; cancelled when the tile is disposed.
    pub token: CancellationToken,
}

/// A map feature produced for a tile.
#[derive(Clone, Debug, PartialEq)]
pub struct MapElement {
    /// Stable feature id. Features crossing tile borders may be delivered more
    /// than once with the same id.
    pub id: u64,
    pub name: String,
    pub coordinate: GeoCoordinate,
    pub elevation: f64,
}

/// One piece of tile content.
#[derive(Clone, Debug, PartialEq)]
pub enum TileContent {
    Element(MapElement),
    /// Prebuilt geometry attached directly under the tile.
    Mesh { name: String },
}

/// An asynchronous result, correlated with its tile by id.
#[derive(Clone, Debug, PartialEq)]
pub enum TileEvent {
    Content { tile: TileId, content: TileContent },
    Completed { tile: TileId },
    Failed { tile: TileId, error: ProviderError },
}

impl TileEvent {
    pub fn tile(&self) -> TileId {
        match self {
            TileEvent::Content { tile, .. }
            | TileEvent::Completed { tile }
            | TileEvent::Failed { tile, .. } => *tile,
        }
    }
}

/// Loads tile content asynchronously and hands results back on the caller's thread.
pub trait MapDataProvider {
    /// Queue a request. [`TilingError::ProviderDisconnected`] means the
    /// provider is gone for good.
    fn submit(&self, request: TileRequest) -> Result<(), TilingError>;

    /// Stop work on a tile. No-op for unknown or finished tiles.
    fn cancel(&self, tile: TileId);

    /// Every result that arrived since the last call.
    fn drain(&self) -> Vec<TileEvent>;

    /// Whether any data exists for the tile.
    fn has_data(&self, quad_key: &QuadKey) -> bool;

    /// Terrain height in meters at `coordinate`.
    fn elevation(&self, coordinate: GeoCoordinate) -> f64;

    /// Id for a new tile, unique among everything submitted to this provider.
    fn next_tile_id(&self) -> TileId;
}
