//! Latitude/longitude value types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A point on the planet expressed as latitude and longitude in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoCoordinate {
    /// Latitude in degrees. Range: \[-90, 90\]. Positive = north.
    pub latitude: f64,
    /// Longitude in degrees. Range: \[-180, 180\]. Positive = east.
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Create a new coordinate.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Returns `true` if both components are within `epsilon` degrees of `other`.
    pub fn approx_eq(&self, other: &GeoCoordinate, epsilon: f64) -> bool {
        (self.latitude - other.latitude).abs() <= epsilon
            && (self.longitude - other.longitude).abs() <= epsilon
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lat_dir = if self.latitude >= 0.0 { "N" } else { "S" };
        let lon_dir = if self.longitude >= 0.0 { "E" } else { "W" };
        write!(
            f,
            "{:.5}\u{00B0}{}, {:.5}\u{00B0}{}",
            self.latitude.abs(),
            lat_dir,
            self.longitude.abs(),
            lon_dir,
        )
    }
}

/// Axis-aligned geographic rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// South-west corner.
    pub min_point: GeoCoordinate,
    /// North-east corner.
    pub max_point: GeoCoordinate,
}

impl BoundingBox {
    pub fn new(min_point: GeoCoordinate, max_point: GeoCoordinate) -> Self {
        Self {
            min_point,
            max_point,
        }
    }

    /// Geographic center of the box.
    #[must_use]
    pub fn center(&self) -> GeoCoordinate {
        GeoCoordinate::new(
            (self.min_point.latitude + self.max_point.latitude) * 0.5,
            (self.min_point.longitude + self.max_point.longitude) * 0.5,
        )
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.max_point.latitude - self.min_point.latitude
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.max_point.longitude - self.min_point.longitude
    }

    /// Half-open containment: the south and west edges are inside, the north and
    /// east edges belong to the neighbouring box.
    pub fn contains(&self, coordinate: &GeoCoordinate) -> bool {
        coordinate.latitude >= self.min_point.latitude
            && coordinate.latitude < self.max_point.latitude
            && coordinate.longitude >= self.min_point.longitude
            && coordinate.longitude < self.max_point.longitude
    }
}
