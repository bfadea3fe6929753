//! Distance and orientation helpers.

use glam::{DQuat, DVec3, EulerRot};

use crate::GeoCoordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates in meters (haversine formula).
pub fn distance(a: GeoCoordinate, b: GeoCoordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat * 0.5).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon * 0.5).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Coordinate at a metric `offset` (x east, z north; y ignored) from `origin`,
/// using the equirectangular approximation.
pub fn to_geo_coordinate(origin: GeoCoordinate, offset: DVec3) -> GeoCoordinate {
    let lat = origin.latitude + (offset.z / EARTH_RADIUS_M).to_degrees();
    let lon = origin.longitude
        + (offset.x / (EARTH_RADIUS_M * origin.latitude.to_radians().cos())).to_degrees();
    GeoCoordinate::new(lat, lon)
}

/// Coordinate under an orbit pivot with the given Euler angles in degrees
/// (x = pitch, y = yaw). Pitch is the latitude; yaw 270 faces longitude 0.
pub fn coordinate_from_euler(euler_deg: DVec3) -> GeoCoordinate {
    let mut latitude = euler_deg.x;
    if latitude > 90.0 {
        latitude -= 360.0;
    }
    let mut longitude = (-90.0 - euler_deg.y) % 360.0;
    if longitude < -180.0 {
        longitude += 360.0;
    } else if longitude >= 180.0 {
        longitude -= 360.0;
    }
    GeoCoordinate::new(latitude, longitude)
}

/// Orbit pivot Euler angles in degrees that look down on `coordinate`.
pub fn euler_from_coordinate(coordinate: GeoCoordinate) -> DVec3 {
    DVec3::new(coordinate.latitude, 270.0 - coordinate.longitude, 0.0)
}

/// Rotation from Euler angles in degrees, applied yaw (Y), then pitch (X), then roll (Z).
pub fn rotation_from_euler(euler_deg: DVec3) -> DQuat {
    DQuat::from_euler(
        EulerRot::YXZ,
        euler_deg.y.to_radians(),
        euler_deg.x.to_radians(),
        euler_deg.z.to_radians(),
    )
}

/// Euler angles in degrees, each normalized to `[0, 360)`.
pub fn euler_from_rotation(rotation: DQuat) -> DVec3 {
    let (yaw, pitch, roll) = rotation.to_euler(EulerRot::YXZ);
    let wrap = |a: f64| a.to_degrees().rem_euclid(360.0);
    DVec3::new(wrap(pitch), wrap(yaw), wrap(roll))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance_one_degree_latitude() {
        let d = distance(GeoCoordinate::new(0.0, 0.0), GeoCoordinate::new(1.0, 0.0));
        let expected = EARTH_RADIUS_M * 1f64.to_radians();
        assert!((d - expected).abs() < 1e-6);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = GeoCoordinate::new(52.53, 13.38);
        let b = GeoCoordinate::new(48.85, 2.35);
        assert!((distance(a, b) - distance(b, a)).abs() < 1e-6);
        // Berlin - Paris is roughly 880 km.
        assert!((distance(a, b) - 878_000.0).abs() < 10_000.0);
    }

    #[test]
    fn test_to_geo_coordinate_moves_north_and_east() {
        let origin = GeoCoordinate::new(52.0, 13.0);
        let c = to_geo_coordinate(origin, DVec3::new(1000.0, 0.0, 1000.0));
        assert!(c.latitude > origin.latitude);
        assert!(c.longitude > origin.longitude);
        assert!((distance(origin, c) - 1414.2).abs() < 5.0);
    }

    #[test]
    fn test_euler_coordinate_roundtrip() {
        for coordinate in [
            GeoCoordinate::new(52.53171, 13.38721),
            GeoCoordinate::new(-33.9, 151.2),
            GeoCoordinate::new(40.7, -74.0),
            GeoCoordinate::new(0.0, 0.0),
        ] {
            let euler = euler_from_coordinate(coordinate);
            let back = coordinate_from_euler(euler);
            assert!(back.approx_eq(&coordinate, 1e-9), "{back} != {coordinate}");
        }
    }

    #[test]
    fn test_negative_pitch_from_wrapped_angle() {
        let c = coordinate_from_euler(DVec3::new(330.0, 270.0, 0.0));
        assert!((c.latitude + 30.0).abs() < 1e-9);
        assert!(c.longitude.abs() < 1e-9);
    }

    #[test]
    fn test_rotation_euler_roundtrip() {
        let euler = DVec3::new(52.5, 256.6, 0.0);
        let back = euler_from_rotation(rotation_from_euler(euler));
        assert!((back - euler).length() < 1e-9, "{back}");
        let c = coordinate_from_euler(back);
        assert!((c.latitude - 52.5).abs() < 1e-9);
        assert!((c.longitude - 13.4).abs() < 1e-9);
    }

    #[test]
    fn test_pivot_rotation_looks_down_on_coordinate() {
        use crate::Projection;

        let coordinate = GeoCoordinate::new(52.53171, 13.38721);
        let rotation = rotation_from_euler(euler_from_coordinate(coordinate));
        let camera = rotation * DVec3::new(0.0, 0.0, -1.0);
        let expected = Projection::spherical(1.0).project(coordinate, 0.0);
        assert!((camera - expected).length() < 1e-9);
    }
}
