pub mod mercator;
pub mod mgrs;
pub mod polyline;
pub mod sphere;

use serde::{Deserialize, Serialize};

pub const LATITUDE_LIMIT: f64 = 90.0;
pub const LONGITUDE_LIMIT: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Finite and within ±90° latitude and ±180° longitude.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude.abs() <= LATITUDE_LIMIT
            && self.longitude.abs() <= LONGITUDE_LIMIT
    }

    /// Rounds both axes to `decimals` places, as used when comparing view centres.
    pub fn rounded(&self, decimals: i32) -> Self {
        let factor = 10f64.powi(decimals);
        Self {
            latitude: (self.latitude * factor).round() / factor,
            longitude: (self.longitude * factor).round() / factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// Builds a box from two opposite corners in any order.
    pub fn from_corners(a: Coordinate, b: Coordinate) -> Self {
        Self {
            north: a.latitude.max(b.latitude),
            south: a.latitude.min(b.latitude),
            east: a.longitude.max(b.longitude),
            west: a.longitude.min(b.longitude),
        }
    }

    pub fn contains(&self, coord: Coordinate) -> bool {
        coord.latitude <= self.north
            && coord.latitude >= self.south
            && coord.longitude <= self.east
            && coord.longitude >= self.west
    }

    pub fn is_finite(&self) -> bool {
        [self.north, self.south, self.east, self.west]
            .iter()
            .all(|edge| edge.is_finite())
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.north + self.south) / 2.0,
            (self.east + self.west) / 2.0,
        )
    }

    pub fn south_west(&self) -> Coordinate {
        Coordinate::new(self.south, self.west)
    }

    pub fn north_east(&self) -> Coordinate {
        Coordinate::new(self.north, self.east)
    }

    /// Orders the edges and clamps them to the given latitude and longitude limits.
    pub fn normalized(&self, lat_limit: f64, lon_limit: f64) -> Self {
        let (north, south) = if self.north < self.south {
            (self.south, self.north)
        } else {
            (self.north, self.south)
        };
        let (east, west) = if self.east < self.west {
            (self.west, self.east)
        } else {
            (self.east, self.west)
        };
        Self {
            north: north.clamp(-lat_limit, lat_limit),
            south: south.clamp(-lat_limit, lat_limit),
            east: east.clamp(-lon_limit, lon_limit),
            west: west.clamp(-lon_limit, lon_limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_inverted_and_out_of_range_boxes() {
        let bounds = BoundingBox {
            north: 40.0,
            south: 89.0,
            east: -200.0,
            west: 10.0,
        }
        .normalized(85.0, 180.0);
        assert_eq!(bounds.north, 85.0);
        assert_eq!(bounds.south, 40.0);
        assert_eq!(bounds.east, 10.0);
        assert_eq!(bounds.west, -180.0);
    }

    #[test]
    fn coordinates_outside_the_globe_are_invalid() {
        assert!(Coordinate::new(45.0, 6.0).is_valid());
        assert!(Coordinate::new(-90.0, 180.0).is_valid());
        assert!(!Coordinate::new(90.5, 0.0).is_valid());
        assert!(!Coordinate::new(45.0, 1e17).is_valid());
        assert!(!Coordinate::new(45.0, f64::INFINITY).is_valid());
        assert!(!Coordinate::new(f64::NAN, 6.0).is_valid());
    }

    #[test]
    fn corners_in_any_order() {
        let bounds = BoundingBox::from_corners(
            Coordinate::new(46.0, 7.0),
            Coordinate::new(45.0, 6.0),
        );
        assert!(bounds.contains(Coordinate::new(45.5, 6.5)));
        assert!(!bounds.contains(Coordinate::new(47.0, 6.5)));
        assert_eq!(bounds.center(), Coordinate::new(45.5, 6.5));
    }
}
