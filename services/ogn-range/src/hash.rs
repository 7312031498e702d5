//! URL fragment codec for the range viewer.
//!
//! `station,source,when,lat_lon,zoom,min:max,flag;flag;` with every value
//! slot terminated by a comma, even when empty.

use ogn_core::{DatePreset, StationName};
use ogn_geo::Coordinate;

use crate::selection::{ColourScheme, Overlay, Selection, Source};

pub fn encode(selection: &Selection) -> String {
    let mut fragment = String::new();
    fragment.push_str(selection.station.as_str());
    fragment.push(',');
    fragment.push_str(selection.source.as_str());
    fragment.push(',');
    fragment.push_str(&selection.when.token());
    fragment.push(',');
    if let Some(center) = selection.center {
        fragment.push_str(&format!("{:.5}_{:.5}", center.latitude, center.longitude));
    }
    fragment.push(',');
    if let Some(zoom) = selection.zoom {
        fragment.push_str(&zoom.to_string());
    }
    fragment.push(',');
    fragment.push_str(selection.colour.as_str());
    fragment.push(',');
    for overlay in Overlay::ALL {
        if selection.overlays.get(overlay) {
            fragment.push_str(overlay.name());
            fragment.push(';');
        }
    }
    fragment
}

/// Builds a selection from a fragment (leading `#` optional). An empty
/// fragment yields the defaults; otherwise every absent slot takes its
/// per-field default.
pub fn decode(fragment: &str) -> Selection {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    if fragment.is_empty() {
        return Selection::default();
    }

    let values: Vec<&str> = fragment.split(',').collect();
    let slot = |index: usize| values.get(index).copied().unwrap_or("");
    let mut selection = Selection::default();

    selection.overlays = Default::default();
    for name in slot(6).split(';').filter(|name| !name.is_empty()) {
        match Overlay::parse(name) {
            Some(overlay) => selection.overlays.set(overlay, true),
            None => tracing::debug!(overlay = %name, "ignoring unknown overlay"),
        }
    }

    selection.colour = match slot(5) {
        "" => ColourScheme::default(),
        value => ColourScheme::parse(value).unwrap_or_else(|err| {
            tracing::warn!(colour = %value, error = %err, "invalid colour scheme in fragment");
            ColourScheme::default()
        }),
    };

    selection.when = match slot(2) {
        "" => DatePreset::All,
        value => DatePreset::parse(value).unwrap_or_else(|err| {
            tracing::warn!(when = %value, error = %err, "invalid date preset in fragment");
            DatePreset::All
        }),
    };

    if !slot(1).is_empty() {
        selection.source = Source::new(slot(1));
    }
    selection.station = StationName::new(slot(0));
    selection.center = parse_center(slot(3));
    selection.zoom = parse_zoom(slot(4));
    selection
}

fn parse_center(value: &str) -> Option<Coordinate> {
    let (lat, lon) = value.split_once('_')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    Some(Coordinate::new(lat, lon)).filter(Coordinate::is_valid)
}

/// Leading digits only, so `9.5` reads as zoom 9.
fn parse_zoom(value: &str) -> Option<u8> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::Overlays;
    use ogn_map::Rgba;

    #[test]
    fn decodes_full_fragment() {
        let selection = decode("ABC,max,lastweek,51.12345_-0.98765,9,ff0000ff:00ff00ff,circles;");
        assert_eq!(selection.station.as_str(), "ABC");
        assert_eq!(selection.source.as_str(), "max");
        assert_eq!(selection.when, DatePreset::LastWeek);
        assert_eq!(selection.center, Some(Coordinate::new(51.12345, -0.98765)));
        assert_eq!(selection.zoom, Some(9));
        let (min, max) = selection.colour.endpoints().unwrap();
        assert_eq!(min, Rgba::RED);
        assert_eq!(max, Rgba::opaque(0, 255, 0));
        assert_eq!(
            selection.overlays,
            Overlays {
                circles: true,
                ..Overlays::default()
            }
        );
    }

    #[test]
    fn empty_fragment_gives_defaults() {
        let selection = decode("#");
        assert_eq!(selection, Selection::default());
        assert_eq!(selection.when, DatePreset::LastWeek);
        assert!(selection.overlays.circles);
        assert_eq!(selection.colour.as_str(), "#80000040:#008000ff");
    }

    #[test]
    fn missing_fields_take_per_field_defaults() {
        let selection = decode("#LFLE,,");
        assert_eq!(selection.station.as_str(), "LFLE");
        assert_eq!(selection.source.as_str(), "max");
        assert_eq!(selection.when, DatePreset::All);
        assert_eq!(selection.colour, ColourScheme::default());
        assert_eq!(selection.center, None);
        assert_eq!(selection.zoom, None);
        assert!(!selection.overlays.circles);
    }

    #[test]
    fn encode_writes_every_slot() {
        let mut selection = Selection::default();
        assert_eq!(encode(&selection), ",max,lastweek,,,#80000040:#008000ff,circles;");
        selection.station = StationName::new("LFLE");
        selection.set_center(Coordinate::new(45.123456, 6.5));
        selection.zoom = Some(10);
        selection.overlays.ambiguity = true;
        selection.overlays.airports = true;
        assert_eq!(
            encode(&selection),
            "LFLE,max,lastweek,45.12346_6.50000,10,#80000040:#008000ff,airports;circles;ambiguity;"
        );
    }

    #[test]
    fn fragment_round_trip() {
        let mut selection = Selection {
            station: StationName::new("EGHL"),
            source: Source::new("avg"),
            when: DatePreset::Days(30),
            zoom: Some(11),
            colour: ColourScheme::parse("#00000000:#ff00ffff").unwrap(),
            ..Selection::default()
        };
        selection.set_center(Coordinate::new(51.25, -1.0));
        selection.overlays.airspace = true;
        assert_eq!(decode(&encode(&selection)), selection);
    }

    #[test]
    fn unknown_preset_falls_back_to_all() {
        assert_eq!(decode("X,max,fortnight,,,,").when, DatePreset::All);
    }

    #[test]
    fn centres_off_the_globe_are_ignored() {
        for centre in ["45.0_1e17", "45_inf", "91_0", "NaN_6"] {
            let fragment = format!("ABC,,,{centre},9,,");
            assert_eq!(decode(&fragment).center, None, "{centre}");
        }
        assert!(decode("ABC,,,-90_180,9,,").center.is_some());
    }

    #[test]
    fn fractional_zoom_is_truncated() {
        assert_eq!(decode(",,,,9.7,,").zoom, Some(9));
    }
}
