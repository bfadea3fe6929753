//! Scripted camera flight through every space.

use std::collections::VecDeque;
use std::time::Duration;

use geotile_geo::GeoCoordinate;

/// One leg of the flight.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Waypoint {
    pub coordinate: GeoCoordinate,
    pub zoom: f64,
    pub duration: Duration,
}

impl Waypoint {
    fn new(coordinate: GeoCoordinate, zoom: f64, seconds: f64) -> Self {
        Self {
            coordinate,
            zoom,
            duration: Duration::from_secs_f64(seconds),
        }
    }
}

/// Waypoints consumed one at a time, each once the previous leg has landed.
#[derive(Debug, Default)]
pub struct Flight {
    legs: VecDeque<Waypoint>,
}

impl Flight {
    pub fn new(legs: impl IntoIterator<Item = Waypoint>) -> Self {
        Self {
            legs: legs.into_iter().collect(),
        }
    }

    /// Dive from orbit to street level around `home`, drift a few kilometers,
    /// then climb back out and cross half the planet to `away`.
    pub fn round_trip(home: GeoCoordinate, away: GeoCoordinate) -> Self {
        let drift = GeoCoordinate::new(home.latitude + 0.02, home.longitude + 0.03);
        Self::new([
            Waypoint::new(home, 12.0, 6.0),
            Waypoint::new(home, 16.5, 3.0),
            Waypoint::new(drift, 16.5, 4.0),
            Waypoint::new(drift, 10.0, 4.0),
            Waypoint::new(away, 3.0, 8.0),
            Waypoint::new(away, 2.0, 2.0),
        ])
    }

    /// Next leg to fly, if any are left.
    pub fn next_leg(&mut self) -> Option<Waypoint> {
        self.legs.pop_front()
    }

    pub fn remaining(&self) -> usize {
        self.legs.len()
    }

    pub fn is_finished(&self) -> bool {
        self.legs.is_empty()
    }

    /// Seconds of animation left in the script.
    pub fn total_duration(&self) -> Duration {
        self.legs.iter().map(|leg| leg.duration).sum()
    }
}
