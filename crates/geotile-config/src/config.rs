//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use geotile_animation::TimeInterpolator;
use geotile_geo::{GeoCoordinate, QuadKey};
use geotile_lod::{LodRange, Viewport};
use geotile_space::SpaceKind;
use geotile_tiling::{ElevationType, ProviderSettings, SphereSettings, SurfaceSettings};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration.
pub const CONFIG_FILE: &str = "geotile.ron";

/// Platform config directory for geotile, e.g. `~/.config/geotile`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("geotile")
}

/// Top-level map configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MapConfig {
    /// Where the camera starts.
    pub start: StartConfig,
    /// Viewport the LOD trees are computed for.
    pub viewport: Viewport,
    /// Planet settings.
    pub planet: PlanetConfig,
    /// Spaces ordered from the coarsest to the finest levels of detail.
    pub spaces: Vec<SpaceConfig>,
    /// Update thresholds and loader pool sizing.
    pub streaming: StreamingConfig,
    /// Camera animation settings.
    pub animation: AnimationConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Initial camera position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StartConfig {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Fractional zoom level.
    pub zoom: f64,
}

/// Planet configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Sphere radius in world units of the orbit space.
    pub radius: f64,
}

/// One projection regime and the levels of detail it handles.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpaceConfig {
    pub kind: SpaceKind,
    pub min_lod: u8,
    pub max_lod: u8,
    /// World units per meter. Ignored by the orbit space.
    #[serde(default = "default_scale")]
    pub scale: f64,
    /// Height above which the space hands over to the coarser one.
    /// Ignored by the orbit space.
    #[serde(default)]
    pub max_distance: f64,
    #[serde(default)]
    pub elevation: ElevationType,
}

fn default_scale() -> f64 {
    1.0
}

/// Update thresholds and loader sizing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Planar distance from zero that triggers a floating-origin recenter.
    pub origin_threshold: f64,
    /// Pivot moves shorter than this do not update surface tiles.
    pub position_sensitivity: f64,
    /// Orientation changes below this many degrees do not update orbit tiles.
    pub rotation_sensitivity: f64,
    /// Camera distance changes below this do not update orbit tiles.
    pub height_sensitivity: f64,
    /// Loader threads; `None` picks a count from the available cores.
    pub worker_threads: Option<usize>,
    /// Requests beyond this many queued ones are rejected.
    pub queue_capacity: usize,
}

/// Camera animation settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub interpolator: TimeInterpolator,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
    /// Also write JSON logs to this directory.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for StartConfig {
    fn default() -> Self {
        Self {
            latitude: 52.53171,
            longitude: 13.38721,
            zoom: 3.0,
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self { radius: 6371.0 }
    }
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            origin_threshold: 2000.0,
            position_sensitivity: 1.0,
            rotation_sensitivity: 0.5,
            height_sensitivity: 10.0,
            worker_threads: None,
            queue_capacity: 128,
        }
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            interpolator: TimeInterpolator::Decelerate,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl SpaceConfig {
    pub fn lod_range(&self) -> LodRange {
        LodRange::new(self.min_lod, self.max_lod)
    }

    /// Orbit, surface and detail spaces covering levels 1 through 16.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                kind: SpaceKind::Orbit,
                min_lod: 1,
                max_lod: 8,
                scale: 1.0,
                max_distance: 0.0,
                elevation: ElevationType::Flat,
            },
            Self {
                kind: SpaceKind::Surface,
                min_lod: 9,
                max_lod: 15,
                scale: 0.01,
                max_distance: 2000.0,
                elevation: ElevationType::Grid,
            },
            Self {
                kind: SpaceKind::Detail,
                min_lod: 16,
                max_lod: 16,
                scale: 1.0,
                max_distance: 3000.0,
                elevation: ElevationType::Grid,
            },
        ]
    }

    /// Checks that concern this one space alone.
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let lod = self.min_lod.max(self.max_lod);
        if lod > QuadKey::MAX_LOD {
            return Err(ConfigError::LodTooFine {
                index,
                lod,
                limit: QuadKey::MAX_LOD,
            });
        }
        match self.kind {
            SpaceKind::Orbit if index > 0 => Err(ConfigError::OrbitNotFirst { index }),
            SpaceKind::Orbit if self.min_lod == 0 => Err(ConfigError::OrbitMinLod { index }),
            // NaN fails this too.
            SpaceKind::Surface | SpaceKind::Detail if !(self.max_distance > 0.0) => {
                Err(ConfigError::MaxDistance {
                    index,
                    value: self.max_distance,
                })
            }
            _ => Ok(()),
        }
    }
}

// --- Conversions into controller settings ---

impl MapConfig {
    pub fn start_coordinate(&self) -> GeoCoordinate {
        GeoCoordinate::new(self.start.latitude, self.start.longitude)
    }

    /// Configured spaces, or the default three when none are listed.
    pub fn spaces(&self) -> Vec<SpaceConfig> {
        if self.spaces.is_empty() {
            SpaceConfig::defaults()
        } else {
            self.spaces.clone()
        }
    }

    /// Check that every space can be built and that together they are
    /// ordered and contiguous.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut expected = None;
        for (index, space) in self.spaces().iter().enumerate() {
            space.validate(index)?;
            let contiguous = expected.is_none_or(|next| space.min_lod == next);
            if space.min_lod > space.max_lod || !contiguous {
                return Err(ConfigError::SpaceRange {
                    index,
                    min: space.min_lod,
                    max: space.max_lod,
                    expected: expected.unwrap_or(space.min_lod),
                });
            }
            expected = Some(space.max_lod.saturating_add(1));
        }
        Ok(())
    }

    pub fn sphere_settings(&self, space: &SpaceConfig) -> SphereSettings {
        SphereSettings {
            lod_range: space.lod_range(),
            radius: self.planet.radius,
            elevation_type: space.elevation,
            rotation_sensitivity: self.streaming.rotation_sensitivity,
            height_sensitivity: self.streaming.height_sensitivity,
        }
    }

    pub fn surface_settings(&self, space: &SpaceConfig) -> SurfaceSettings {
        SurfaceSettings {
            lod_range: space.lod_range(),
            scale: space.scale,
            max_distance: space.max_distance,
            viewport: self.viewport,
            elevation_type: space.elevation,
            position_sensitivity: self.streaming.position_sensitivity,
            origin_threshold: self.streaming.origin_threshold,
        }
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        let defaults = ProviderSettings::default();
        ProviderSettings {
            worker_threads: self
                .streaming
                .worker_threads
                .unwrap_or(defaults.worker_threads)
                .max(1),
            queue_capacity: self.streaming.queue_capacity,
            ..defaults
        }
    }
}

// --- Load / Save / Reload ---

impl MapConfig {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: MapConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = MapConfig {
                spaces: SpaceConfig::defaults(),
                ..MapConfig::default()
            };
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as [`CONFIG_FILE`].
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: MapConfig = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}
