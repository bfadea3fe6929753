//! Configuration error types.

/// Errors that can occur when loading, saving, or parsing configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    ReadError(#[source] std::io::Error),

    /// Failed to write the config file to disk.
    #[error("failed to write config: {0}")]
    WriteError(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    ParseError(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    SerializeError(#[source] ron::Error),

    /// Space ranges overlap or leave a gap.
    #[error("space {index} covers levels {min}..={max}, expected to start at {expected}")]
    SpaceRange {
        index: usize,
        min: u8,
        max: u8,
        expected: u8,
    },

    /// A space reaches past the finest level a quad key can address.
    #[error("space {index} reaches level {lod}, the finest supported level is {limit}")]
    LodTooFine { index: usize, lod: u8, limit: u8 },

    /// The orbit space must start at level 1 or above.
    #[error("orbit space {index} starts at level 0, the globe needs level 1 or above")]
    OrbitMinLod { index: usize },

    /// Only the coarsest space may be an orbit.
    #[error("orbit space at index {index}, orbit must be the first space")]
    OrbitNotFirst { index: usize },

    /// Surface and detail spaces need a positive outer camera distance.
    #[error("space {index} has max_distance {value}, it must be positive")]
    MaxDistance { index: usize, value: f64 },
}
