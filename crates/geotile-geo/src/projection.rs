//! Mappings between geographic coordinates and local 3-D world space.
//!
//! World axes: +X east, +Y up, +Z north. All projections are values; moving the
//! geo-origin produces a new projection via [`Projection::recentered`].

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::GeoCoordinate;
use crate::geo_utils::EARTH_RADIUS_M;

/// Locally-flat tangent-plane projection around a geo-origin.
///
/// Longitude distances are measured at a fixed standard parallel instead of at
/// the origin's latitude. The standard parallel is kept when the projection is
/// recentered, so the mapping between two recentered projections is a pure
/// translation and already-placed content can be shifted instead of rebuilt.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartesianProjection {
    origin: GeoCoordinate,
    standard_parallel: f64,
    radius: f64,
}

impl CartesianProjection {
    /// Tangent plane at `origin` on a planet of the mean Earth radius.
    pub fn new(origin: GeoCoordinate) -> Self {
        Self::with_radius(origin, EARTH_RADIUS_M)
    }

    /// Tangent plane at `origin` on a planet of the given radius (meters).
    pub fn with_radius(origin: GeoCoordinate, radius: f64) -> Self {
        Self {
            origin,
            standard_parallel: origin.latitude,
            radius,
        }
    }

    /// The geo-origin mapped to world `(0, 0, 0)`.
    pub fn origin(&self) -> GeoCoordinate {
        self.origin
    }

    /// Latitude (degrees) at which east-west distances are true to scale.
    pub fn standard_parallel(&self) -> f64 {
        self.standard_parallel
    }

    /// Same plane, moved so that `origin` maps to world zero.
    #[must_use]
    pub fn recentered(&self, origin: GeoCoordinate) -> Self {
        Self {
            origin,
            standard_parallel: self.standard_parallel,
            radius: self.radius,
        }
    }

    fn meters_per_degree_east(&self) -> f64 {
        self.radius * self.standard_parallel.to_radians().cos() * std::f64::consts::PI / 180.0
    }

    fn meters_per_degree_north(&self) -> f64 {
        self.radius * std::f64::consts::PI / 180.0
    }

    pub fn project(&self, coordinate: GeoCoordinate, elevation: f64) -> DVec3 {
        let mut delta_lon = coordinate.longitude - self.origin.longitude;
        if delta_lon >= 180.0 {
            delta_lon -= 360.0;
        } else if delta_lon < -180.0 {
            delta_lon += 360.0;
        }
        DVec3::new(
            delta_lon * self.meters_per_degree_east(),
            elevation,
            (coordinate.latitude - self.origin.latitude) * self.meters_per_degree_north(),
        )
    }

    pub fn unproject(&self, point: DVec3) -> GeoCoordinate {
        let longitude = self.origin.longitude + point.x / self.meters_per_degree_east();
        GeoCoordinate::new(
            self.origin.latitude + point.z / self.meters_per_degree_north(),
            (longitude + 180.0).rem_euclid(360.0) - 180.0,
        )
    }
}

/// Projection onto a sphere centered at world zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SphericalProjection {
    /// Sphere radius in world units.
    pub radius: f64,
}

impl SphericalProjection {
    pub fn new(radius: f64) -> Self {
        Self { radius }
    }

    pub fn project(&self, coordinate: GeoCoordinate, elevation: f64) -> DVec3 {
        let r = self.radius + elevation;
        let lat = coordinate.latitude.to_radians();
        let lon = coordinate.longitude.to_radians();
        DVec3::new(
            r * lat.cos() * lon.cos(),
            r * lat.sin(),
            r * lat.cos() * lon.sin(),
        )
    }

    pub fn unproject(&self, point: DVec3) -> GeoCoordinate {
        let r = point.length();
        if r == 0.0 {
            return GeoCoordinate::default();
        }
        GeoCoordinate::new(
            (point.y / r).clamp(-1.0, 1.0).asin().to_degrees(),
            point.z.atan2(point.x).to_degrees(),
        )
    }
}

/// Any supported mapping from `(GeoCoordinate, elevation)` to world space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    /// Locally-flat tangent plane around a geo-origin.
    Cartesian(CartesianProjection),
    /// Another projection followed by a uniform scale.
    Scaled { inner: Box<Projection>, scale: f64 },
    /// Sphere centered at world zero.
    Spherical(SphericalProjection),
}

impl Projection {
    pub fn cartesian(origin: GeoCoordinate) -> Self {
        Projection::Cartesian(CartesianProjection::new(origin))
    }

    /// Wrap `inner` with a uniform scale.
    ///
    /// # Panics
    ///
    /// Panics if `scale` is not strictly positive.
    pub fn scaled(inner: Projection, scale: f64) -> Self {
        assert!(scale > 0.0, "projection scale must be positive, got {scale}");
        Projection::Scaled {
            inner: Box::new(inner),
            scale,
        }
    }

    pub fn spherical(radius: f64) -> Self {
        Projection::Spherical(SphericalProjection::new(radius))
    }

    /// World position of `coordinate` raised by `elevation` meters.
    pub fn project(&self, coordinate: GeoCoordinate, elevation: f64) -> DVec3 {
        match self {
            Projection::Cartesian(p) => p.project(coordinate, elevation),
            Projection::Scaled { inner, scale } => inner.project(coordinate, elevation) * *scale,
            Projection::Spherical(p) => p.project(coordinate, elevation),
        }
    }

    /// Geographic coordinate under a world position. Elevation is discarded.
    pub fn unproject(&self, point: DVec3) -> GeoCoordinate {
        match self {
            Projection::Cartesian(p) => p.unproject(point),
            Projection::Scaled { inner, scale } => inner.unproject(point / *scale),
            Projection::Spherical(p) => p.unproject(point),
        }
    }

    /// The geo-origin, if this projection has one.
    pub fn origin(&self) -> Option<GeoCoordinate> {
        match self {
            Projection::Cartesian(p) => Some(p.origin()),
            Projection::Scaled { inner, .. } => inner.origin(),
            Projection::Spherical(_) => None,
        }
    }

    /// Overall scale from meters to world units.
    pub fn scale(&self) -> f64 {
        match self {
            Projection::Scaled { inner, scale } => inner.scale() * scale,
            _ => 1.0,
        }
    }

    /// Same projection with its geo-origin moved. Projections without an
    /// origin are returned unchanged.
    #[must_use]
    pub fn recentered(&self, origin: GeoCoordinate) -> Projection {
        match self {
            Projection::Cartesian(p) => Projection::Cartesian(p.recentered(origin)),
            Projection::Scaled { inner, scale } => Projection::Scaled {
                inner: Box::new(inner.recentered(origin)),
                scale: *scale,
            },
            Projection::Spherical(p) => Projection::Spherical(*p),
        }
    }
}
