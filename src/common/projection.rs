use glam::{dvec2 as vec2, DVec2 as Vec2};
use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

/// Radius of the spherical-mercator sphere in meters, no datum shift.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Project geographic (lon, lat) degrees onto planar mercator meters.
pub fn lon_lat_to_mercator(lon: f64, lat: f64) -> Vec2 {
    let x = EARTH_RADIUS * lon.to_radians();
    let y = EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    vec2(x, y)
}

/// Invert [`lon_lat_to_mercator`], returning (lon, lat) degrees.
pub fn mercator_to_lon_lat(point: Vec2) -> (f64, f64) {
    let lon = (point.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn origin_maps_to_origin() {
        let projected = lon_lat_to_mercator(0.0, 0.0);
        assert_relative_eq!(projected.x, 0.0);
        assert_relative_eq!(projected.y, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn antimeridian_x_extent() {
        let projected = lon_lat_to_mercator(180.0, 0.0);
        assert_relative_eq!(projected.x, 20_037_508.342789244, epsilon = 1e-6);
    }

    #[test]
    fn round_trip_stays_within_tolerance() {
        for &(lon, lat) in &[
            (0.0, 0.0),
            (-122.419, 37.775),
            (13.405, 52.52),
            (151.209, -33.868),
            (-179.9, 84.9),
        ] {
            let (lon_back, lat_back) = mercator_to_lon_lat(lon_lat_to_mercator(lon, lat));
            assert_relative_eq!(lon_back, lon, epsilon = 1e-9);
            assert_relative_eq!(lat_back, lat, epsilon = 1e-9);
        }
    }
}
