//! Error types for tile streaming.

use geotile_geo::QuadKey;

use crate::TileId;

/// Errors returned from controller updates and provider submissions.
#[derive(Debug, thiserror::Error)]
pub enum TilingError {
    /// The data provider can no longer accept requests. Not retried.
    #[error("map data provider disconnected")]
    ProviderDisconnected,

    /// The provider's request queue is full.
    #[error("request queue full, tile {tile} ({quad_key}) rejected")]
    QueueFull { tile: TileId, quad_key: QuadKey },

    /// A provider worker thread could not be started.
    #[error("failed to spawn provider worker: {0}")]
    WorkerSpawn(#[from] std::io::Error),
}

impl TilingError {
    /// Fatal errors abort the frame and are returned to the owner. Everything
    /// else only affects a single tile.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TilingError::QueueFull { .. })
    }
}

/// Why the provider could not produce a tile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("no map data for {0}")]
    NoData(QuadKey),

    #[error("tile load failed: {0}")]
    Load(String),

    #[error("request rejected: {0}")]
    Rejected(String),
}

/// A per-tile failure reported to the owning controller exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct TileWarning {
    pub tile: TileId,
    pub quad_key: QuadKey,
    pub error: ProviderError,
}
