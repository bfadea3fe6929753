//! Configuration for the geotile map.
//!
//! Settings persist to disk as a RON file. Every section falls back to its
//! defaults, so partial or older files still load. Command-line arguments
//! override whatever was read from disk.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AnimationConfig, CONFIG_FILE, DebugConfig, MapConfig, PlanetConfig, SpaceConfig, StartConfig,
    StreamingConfig, default_config_dir,
};
pub use error::ConfigError;
