//! Geographic primitives: coordinates, bounding boxes, the quadkey tile index and
//! projections from geographic to local world space.

mod coordinate;
mod geo_utils;
mod projection;
mod quad_key;

pub use coordinate::{BoundingBox, GeoCoordinate};
pub use geo_utils::{
    EARTH_RADIUS_M, coordinate_from_euler, distance, euler_from_coordinate, euler_from_rotation,
    rotation_from_euler, to_geo_coordinate,
};
pub use projection::{CartesianProjection, Projection, SphericalProjection};
pub use quad_key::{QuadKey, QuadKeyError};
