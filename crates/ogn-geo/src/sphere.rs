use std::f64::consts::PI;

use crate::Coordinate;

/// Mean earth radius used for distances.
pub const MEAN_RADIUS_M: f64 = 6_371_008.8;
/// Equatorial radius used for drawing range rings.
pub const EQUATORIAL_RADIUS_M: f64 = 6_378_137.0;

pub fn haversine_m(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + (dlon / 2.0).sin().powi(2) * lat1.cos() * lat2.cos();
    2.0 * MEAN_RADIUS_M * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Point reached by travelling `distance_m` from `origin` on `bearing` (radians).
pub fn offset(origin: Coordinate, distance_m: f64, bearing: f64, radius_m: f64) -> Coordinate {
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();
    let angular = distance_m / radius_m;
    let lat = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lon = lon1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat.sin());
    Coordinate::new(lat.to_degrees(), lon.to_degrees())
}

/// Closed ring approximating a circle of `radius_m` around `center`.
pub fn circle(center: Coordinate, radius_m: f64, vertices: usize) -> Vec<Coordinate> {
    let vertices = vertices.max(3);
    let mut ring: Vec<Coordinate> = (0..vertices)
        .map(|i| {
            let bearing = 2.0 * PI * i as f64 / vertices as f64;
            offset(center, radius_m, bearing, EQUATORIAL_RADIUS_M)
        })
        .collect();
    ring.push(ring[0]);
    ring
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude() {
        let d = haversine_m(Coordinate::new(45.0, 6.0), Coordinate::new(46.0, 6.0));
        assert!((d - 111_195.0).abs() < 10.0, "{d}");
    }

    #[test]
    fn circle_is_closed_and_round() {
        let center = Coordinate::new(52.0, 5.0);
        let ring = circle(center, 10_000.0, 64);
        assert_eq!(ring.len(), 65);
        assert_eq!(ring.first(), ring.last());
        for vertex in &ring {
            let d = haversine_m(center, *vertex);
            assert!((d - 10_000.0).abs() < 30.0, "{d}");
        }
    }
}
