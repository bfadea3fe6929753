//! Errors raised while building or driving a [`crate::SpaceController`].

use geotile_lod::LodRange;
use geotile_tiling::TilingError;

#[derive(Debug, thiserror::Error)]
pub enum SpaceError {
    #[error("no spaces configured")]
    NoSpaces,

    /// Spaces must be added coarsest first with adjoining LOD ranges.
    #[error("LOD range {next:?} does not continue {previous:?}")]
    RangeGap { previous: LodRange, next: LodRange },

    #[error("zoom level {0} is outside every space")]
    ZoomOutOfRange(f64),

    #[error("space controller has not been started")]
    NotStarted,

    #[error(transparent)]
    Tiling(#[from] TilingError),
}
