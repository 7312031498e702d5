//! Spherical Web Mercator (EPSG:3857).

use std::f64::consts::PI;

use crate::Coordinate;

pub const EARTH_RADIUS_M: f64 = 6_378_137.0;
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_6;
/// Half the width of the projected world in metres.
pub const HALF_WORLD_M: f64 = PI * EARTH_RADIUS_M;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projected {
    pub x: f64,
    pub y: f64,
}

pub fn project(coord: Coordinate) -> Projected {
    let latitude = coord.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    Projected {
        x: EARTH_RADIUS_M * coord.longitude.to_radians(),
        y: EARTH_RADIUS_M * (PI / 4.0 + latitude.to_radians() / 2.0).tan().ln(),
    }
}

pub fn unproject(point: Projected) -> Coordinate {
    Coordinate::new(
        (2.0 * (point.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees(),
        (point.x / EARTH_RADIUS_M).to_degrees(),
    )
}
