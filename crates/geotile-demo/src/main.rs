//! Headless geotile driver.
//!
//! Loads the config, streams tiles from a synthetic source on a worker pool
//! and flies the camera from orbit down to street level and back out,
//! logging every space transition on the way.

mod flight;
mod game_loop;
mod source;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use geotile_config::{CliArgs, ConfigError, MapConfig, default_config_dir};
use geotile_geo::GeoCoordinate;
use geotile_space::{SpaceController, SpaceError, SpaceKind};
use geotile_tiling::{
    ChannelDataProvider, SceneArena, SphereController, SurfaceController, TileChange,
    TileSetManager, TilingError,
};
use tracing::{debug, error, info, warn};

use crate::flight::Flight;
use crate::game_loop::{FIXED_DT, GameLoop};
use crate::source::SyntheticSource;

type Map = SpaceController<SceneArena, ChannelDataProvider<SyntheticSource>>;

#[derive(Parser, Debug)]
#[command(name = "geotile-demo", about = "Scripted flight through orbit, surface and detail spaces")]
struct DemoArgs {
    #[command(flatten)]
    map: CliArgs,

    /// Pace frames by the wall clock instead of simulating them.
    #[arg(long)]
    realtime: bool,

    /// Artificial load time per tile in milliseconds.
    #[arg(long, default_value_t = 2)]
    latency_ms: u64,

    /// Where the flight ends up.
    #[arg(long, default_value_t = -33.8688, allow_negative_numbers = true)]
    away_latitude: f64,

    #[arg(long, default_value_t = 151.2093, allow_negative_numbers = true)]
    away_longitude: f64,
}

#[derive(Debug, thiserror::Error)]
enum DemoError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Space(#[from] SpaceError),
    #[error(transparent)]
    Tiling(#[from] TilingError),
}

fn main() {
    let args = DemoArgs::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        eprintln!("geotile-demo: {e}");
        std::process::exit(1);
    }
}

fn run(args: &DemoArgs) -> Result<(), DemoError> {
    let config_dir = args.map.config.clone().unwrap_or_else(default_config_dir);
    let mut config = MapConfig::load_or_create(&config_dir)?;
    config.apply_cli_overrides(&args.map);
    config.validate()?;

    let log_dir: PathBuf = config
        .debug
        .log_dir
        .clone()
        .unwrap_or_else(|| config_dir.join("logs"));
    geotile_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));
    info!(config_dir = %config_dir.display(), "geotile demo starting");

    let mut map = build_map(&config, Duration::from_millis(args.latency_ms))?;
    map.start(config.start_coordinate(), config.start.zoom)?;

    let away = GeoCoordinate::new(args.away_latitude, args.away_longitude);
    let mut flight = Flight::round_trip(config.start_coordinate(), away);
    info!(
        legs = flight.remaining(),
        seconds = flight.total_duration().as_secs_f64(),
        "Flight planned"
    );

    fly(&mut map, &mut flight, args.realtime)?;
    drain(&mut map)?;

    if let (Some(kind), Some(coordinate)) = (map.current_kind(), map.coordinate()) {
        info!(
            space = %kind,
            %coordinate,
            zoom = map.zoom_level().unwrap_or_default(),
            scene_nodes = map.scene().len(),
            "Flight finished"
        );
    }
    map.dispose();
    Ok(())
}

fn build_map(config: &MapConfig, latency: Duration) -> Result<Map, DemoError> {
    let provider =
        ChannelDataProvider::new(SyntheticSource::new(latency), config.provider_settings())?;
    let mut map = SpaceController::new(SceneArena::new(), provider)
        .with_interpolator(config.animation.interpolator);

    let start = config.start_coordinate();
    for space in config.spaces() {
        map.push_space(space.kind, |root| match space.kind {
            SpaceKind::Orbit => SphereController::new(config.sphere_settings(&space), root).into(),
            SpaceKind::Surface | SpaceKind::Detail => {
                SurfaceController::new(config.surface_settings(&space), start, root).into()
            }
        })?;
    }
    Ok(map)
}

/// Run the fixed-step loop until every leg has been flown.
fn fly(map: &mut Map, flight: &mut Flight, realtime: bool) -> Result<(), DemoError> {
    let mut game_loop = GameLoop::new();
    let mut last_status = 0.0;

    while !(flight.is_finished() && !map.is_animating()) {
        let update = |dt: f64, sim_time: f64| -> Result<(), DemoError> {
            if !map.is_animating()
                && let Some(leg) = flight.next_leg()
            {
                info!(destination = %leg.coordinate, zoom = leg.zoom, "Next leg");
                map.animate_to(leg.coordinate, leg.zoom, leg.duration)?;
            }
            step(map, Duration::from_secs_f64(dt), sim_time)
        };
        let render = |_alpha: f64| {};

        if realtime {
            game_loop.tick(update, render)?;
            std::thread::sleep(Duration::from_secs_f64(FIXED_DT / 2.0));
        } else {
            game_loop.advance(FIXED_DT, update, render)?;
        }

        if game_loop.total_sim_time() - last_status >= 1.0 {
            last_status = game_loop.total_sim_time();
            log_status(map, last_status);
        }
    }

    info!(
        frames = game_loop.frame_count(),
        updates = game_loop.update_count(),
        "Flight complete"
    );
    Ok(())
}

fn step(map: &mut Map, delta: Duration, sim_time: f64) -> Result<(), DemoError> {
    let report = map.update(delta)?;
    if let TileChange::Zoom { lod } = report.change {
        debug!(sim_time, lod, "Tile set rebuilt");
    }
    if let Some(offset) = report.recentered {
        info!(sim_time, ?offset, "Geo-origin moved");
    }
    for transition in &report.transitions {
        if let Some(fov) = transition.field_of_view {
            debug!(space = %transition.to, fov, "Field of view");
        }
    }
    if !report.warnings.is_empty() {
        warn!(sim_time, count = report.warnings.len(), "Tiles failed this frame");
    }
    Ok(())
}

/// Keep delivering until the worker pool has nothing left in flight.
fn drain(map: &mut Map) -> Result<(), DemoError> {
    for _ in 0..500 {
        if map.provider().in_flight_count() == 0 {
            break;
        }
        std::thread::sleep(Duration::from_millis(2));
        map.update(Duration::ZERO)?;
    }
    // Deliver whatever the last workers sent.
    map.update(Duration::ZERO)?;
    Ok(())
}

fn log_status(map: &Map, sim_time: f64) {
    let Some(space) = map.current_space() else {
        return;
    };
    info!(
        sim_time = sim_time.round(),
        space = %space.kind(),
        zoom = format_args!("{:.2}", map.zoom_level().unwrap_or_default()),
        tiles = space.manager().resident_count(),
        in_flight = map.provider().in_flight_count(),
        "Status"
    );
}
