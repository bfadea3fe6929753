//! Command-line argument parsing for geotile.

use std::path::PathBuf;

use clap::Parser;

use crate::MapConfig;

/// geotile command-line arguments.
///
/// CLI values override settings loaded from `geotile.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "geotile", about = "Planet-scale tile streaming")]
pub struct CliArgs {
    /// Start latitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub latitude: Option<f64>,

    /// Start longitude in degrees.
    #[arg(long, allow_negative_numbers = true)]
    pub longitude: Option<f64>,

    /// Start zoom level.
    #[arg(long)]
    pub zoom: Option<f64>,

    /// Viewport width.
    #[arg(long)]
    pub width: Option<f64>,

    /// Viewport height.
    #[arg(long)]
    pub height: Option<f64>,

    /// Number of tile loader threads.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl MapConfig {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(lat) = args.latitude {
            self.start.latitude = lat;
        }
        if let Some(lon) = args.longitude {
            self.start.longitude = lon;
        }
        if let Some(zoom) = args.zoom {
            self.start.zoom = zoom;
        }
        if let Some(w) = args.width {
            self.viewport.width = w;
        }
        if let Some(h) = args.height {
            self.viewport.height = h;
        }
        if let Some(workers) = args.workers {
            self.streaming.worker_threads = Some(workers);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
