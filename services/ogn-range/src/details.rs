//! Nearby-station listing for a clicked coverage square.

use ogn_core::StationName;
use ogn_geo::{mgrs, sphere, Coordinate};
use ogn_map::{Feature, Geometry, Style, VectorLayer};
use serde::Serialize;

use crate::api::{DetailsResponse, NearbyStation};
use crate::stations::{position, StationRegistry};

/// Vertical offset of a listing number above the station pin.
pub const LABEL_OFFSET_Y: f64 = -22.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailLine {
    pub id: usize,
    pub station: StationName,
    pub distance_km: Option<f64>,
    pub subtle: bool,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Details {
    #[default]
    Hidden,
    Loading,
    Nearby { reference: String, lines: Vec<DetailLine> },
}

impl Details {
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

/// Numbers the entries from 1. When a station filter is active the entries
/// that do not match it are marked subtle.
pub fn build_lines(
    response: &DetailsResponse,
    registry: &StationRegistry,
    filter: &StationName,
) -> Vec<DetailLine> {
    let square = mgrs::inverse(&response.query.reference)
        .ok()
        .map(|bounds| bounds.center());

    response
        .position
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let distance_km = match (square, registry.get(&entry.s)) {
                (Some(point), Some(station)) => Some(rounded_km(point, position(station))),
                _ => None,
            };
            let subtle = !filter.is_empty() && !filter.matches_ignore_case(entry.s.as_str());
            DetailLine {
                id: index + 1,
                station: entry.s.clone(),
                distance_km,
                subtle,
                text: format_line(index + 1, entry, distance_km),
            }
        })
        .collect()
}

fn rounded_km(a: Coordinate, b: Coordinate) -> f64 {
    (sphere::haversine_m(a, b) / 100.0).round() / 10.0
}

fn format_line(id: usize, entry: &NearbyStation, distance_km: Option<f64>) -> String {
    let distance = distance_km.map_or_else(|| "?".to_string(), |km| km.to_string());
    let mut text = format!(
        "{id}:{}: {distance}km, {}-{}m, Avg Max:{}db, Samples:{}, Gliders:{} ({}",
        entry.s,
        entry.l,
        entry.h,
        entry.a / 10.0,
        entry.c,
        entry.g,
        entry.first
    );
    if !entry.last.is_empty() && entry.last != entry.first {
        text.push_str(" to ");
        text.push_str(&entry.last);
    }
    text.push(')');
    text
}

/// Puts each listed station's number above its pin. Stations without a
/// pin get no label.
pub fn label(lines: &[DetailLine], registry: &StationRegistry, labels: &mut VectorLayer<StationName>) {
    labels.clear();
    for line in lines {
        if let Some(station) = registry.get(&line.station) {
            labels.insert(
                line.station.clone(),
                Feature::new(
                    Geometry::Point(position(station)),
                    Style::text(line.id.to_string(), LABEL_OFFSET_Y),
                ),
            );
        }
    }
}
