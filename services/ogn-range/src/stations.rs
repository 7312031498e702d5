use ogn_core::{Station, StationName};
use ogn_geo::{sphere, Coordinate};
use ogn_map::{Feature, Geometry, Rgba, Style, VectorLayer};
use std::collections::BTreeMap;
use std::fmt;

/// Pin icon footprint in CSS pixels, anchored bottom-centre.
pub const PIN_SIZE: (f64, f64) = (25.0, 36.0);
/// Range rings drawn around every station: radius in km and stroke opacity.
pub const RINGS: [(u16, f64); 3] = [(10, 0.7), (20, 0.5), (30, 0.3)];
const RING_VERTICES: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RingKey {
    pub station: StationName,
    pub radius_km: u16,
}

impl fmt::Display for RingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}km", self.station, self.radius_km)
    }
}

#[derive(Debug, Default)]
pub struct StationRegistry {
    stations: BTreeMap<StationName, Station>,
}

impl StationRegistry {
    pub fn replace(&mut self, stations: Vec<Station>) {
        self.stations = stations
            .into_iter()
            .filter(|station| !station.name.is_empty())
            .map(|station| (station.name.clone(), station))
            .collect();
    }

    pub fn get(&self, name: &StationName) -> Option<&Station> {
        self.stations.get(name)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// Exact match first, then the first case-insensitive one.
    pub fn match_name(&self, input: &str) -> Option<&Station> {
        self.stations.get(&StationName::new(input)).or_else(|| {
            self.stations
                .values()
                .find(|station| station.name.matches_ignore_case(input))
        })
    }

    /// Names containing `query`, ignoring case, in case-insensitive order.
    pub fn search(&self, query: &str, limit: usize) -> Vec<StationName> {
        let needle = query.to_lowercase();
        let mut found: Vec<StationName> = self
            .stations
            .keys()
            .filter(|name| name.as_str().to_lowercase().contains(&needle))
            .cloned()
            .collect();
        found.sort_by_key(|name| name.as_str().to_lowercase());
        found.truncate(limit);
        found
    }
}

pub fn position(station: &Station) -> Coordinate {
    Coordinate::new(station.latitude, station.longitude)
}

pub fn marker(station: &Station) -> Feature {
    let colour = station.status().marker_colour();
    let fill = Rgba::parse(colour).unwrap_or(Rgba::BLACK);
    Feature::new(
        Geometry::Point(position(station)),
        Style::icon(format!("pin-{colour}"), 1.0).with_fill(fill),
    )
    .with_title(station.info_text())
}

pub fn rings(station: &Station) -> impl Iterator<Item = (RingKey, Feature)> + '_ {
    RINGS.iter().map(move |(radius_km, opacity)| {
        let ring = sphere::circle(
            position(station),
            f64::from(*radius_km) * 1000.0,
            RING_VERTICES,
        );
        let key = RingKey {
            station: station.name.clone(),
            radius_km: *radius_km,
        };
        let feature = Feature::new(
            Geometry::Polygon(ring),
            Style::stroke(Rgba::with_alpha(48, 48, 48, *opacity), 1.0),
        );
        (key, feature)
    })
}

/// Rebuilds the marker and ring layers from the registry.
pub fn populate(
    registry: &StationRegistry,
    markers: &mut VectorLayer<StationName>,
    circles: &mut VectorLayer<RingKey>,
) {
    markers.clear();
    circles.clear();
    for station in registry.iter() {
        markers.insert(station.name.clone(), marker(station));
        for (key, feature) in rings(station) {
            circles.insert(key, feature);
        }
    }
}
