//! URL fragment codec for the live viewer.
//!
//! `c=lat,lon&z=…&m=…` with keys written in a fixed order and only when they
//! differ from the page defaults. `t` (task file URL) is accepted but never
//! written back.

use ogn_core::{DeviceTypes, Units};
use ogn_geo::{BoundingBox, Coordinate};
use std::collections::HashMap;

use crate::options::{BASE_MAPS, LiveOptions, LiveOverlay, PathLength};

pub fn encode(options: &LiveOptions) -> String {
    let mut fragment = format!(
        "c={:.5},{:.5}",
        options.center.latitude, options.center.longitude
    );
    let mut push = |key: char, value: &str| {
        fragment.push('&');
        fragment.push(key);
        fragment.push('=');
        fragment.push_str(value);
    };

    if let Some(zoom) = options.zoom {
        push('z', &zoom.to_string());
    }
    if let Some(base_map) = options.base_map {
        push('m', &base_map.to_string());
    }
    if options.show_offline {
        push('o', "1");
    }
    if let Some(bounds) = options.bounds {
        push(
            'b',
            &format!(
                "{:.4},{:.4},{:.4},{:.4}",
                bounds.north, bounds.south, bounds.east, bounds.west
            ),
        );
    }
    if options.auto_bounds {
        push('s', "1");
    }
    let letters: String = LiveOverlay::ALL
        .into_iter()
        .filter(|overlay| options.has_overlay(*overlay))
        .map(|overlay| overlay.letter())
        .collect();
    if !letters.is_empty() {
        push('l', &letters);
    }
    if options.warning_hidden {
        push('w', "0");
    }
    if let Some(code) = options.path_length.code() {
        push('p', code);
    }
    if options.units == Units::Imperial {
        push('u', "i");
    }
    if options.list_hidden {
        push('n', "0");
    }
    if !options.device_types.is_all() {
        push('y', &options.device_types.bits().to_string());
    }
    if options.sticks {
        push('a', "1");
    }
    if options.barogram {
        push('g', "1");
    }
    fragment
}

/// Builds the options a fragment describes, starting from the page defaults.
/// Unparseable values are ignored.
pub fn decode(fragment: &str, default_center: Coordinate) -> LiveOptions {
    let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
    let params: HashMap<&str, &str> = fragment
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .collect();
    let flag = |key: &str, on: &str| params.get(key).is_some_and(|value| *value == on);

    let mut options = LiveOptions::new(default_center);
    if let Some(center) = params.get("c").and_then(|value| parse_center(value)) {
        options.center = center;
    }
    options.zoom = params.get("z").and_then(|value| leading_int(value));
    options.base_map = params
        .get("m")
        .and_then(|value| leading_int(value))
        .filter(|id| *id < BASE_MAPS);
    options.show_offline = flag("o", "1");

    // Without an explicit box the filter always follows the view; `s` alone
    // carries no extra information.
    let bounds = params.get("b").and_then(|value| parse_bounds(value));
    options.set_bounds(bounds);

    if let Some(letters) = params.get("l") {
        for letter in letters.chars() {
            match LiveOverlay::from_letter(letter) {
                Some(overlay) => options.set_overlay(overlay, true),
                None => tracing::debug!(%letter, "ignoring unknown overlay letter"),
            }
        }
    }
    options.cap_zoom_for_weather();

    options.warning_hidden = flag("w", "0");
    options.list_hidden = flag("n", "0");
    if let Some(code) = params.get("p") {
        options.path_length = PathLength::from_code(code);
    }
    if flag("u", "i") {
        options.units = Units::Imperial;
    }
    if let Some(bits) = params.get("y").and_then(|value| value.trim().parse::<u8>().ok()) {
        options.device_types = DeviceTypes::from_bits(bits);
    }
    options.sticks = flag("a", "1");
    options.barogram = flag("g", "1");
    options.task_url = params
        .get("t")
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty());
    options
}

fn parse_center(value: &str) -> Option<Coordinate> {
    let (lat, lon) = value.split_once(',')?;
    let lat = lat.trim().parse::<f64>().ok()?;
    let lon = lon.trim().parse::<f64>().ok()?;
    Some(Coordinate::new(lat, lon)).filter(Coordinate::is_valid)
}

fn parse_bounds(value: &str) -> Option<BoundingBox> {
    let edges: Vec<f64> = value
        .split(',')
        .map(|edge| edge.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .ok()?;
    match edges.as_slice() {
        [north, south, east, west] => Some(BoundingBox {
            north: *north,
            south: *south,
            east: *east,
            west: *west,
        }),
        _ => None,
    }
}

fn leading_int(value: &str) -> Option<u8> {
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

    fn home() -> Coordinate {
        Coordinate::new(46.5, 6.5)
    }

    #[test]
    fn defaults_write_center_and_follow_view() {
        let options = decode("", home());
        assert_eq!(encode(&options), "c=46.50000,6.50000&s=1");
        assert!(options.device_types.is_all());
        assert_eq!(options.task_url, None);
    }

    #[test]
    fn keys_are_written_in_order() {
        let mut options = LiveOptions::new(Coordinate::new(45.123456, 5.5));
        options.zoom = Some(9);
        options.base_map = Some(2);
        options.show_offline = true;
        options.set_bounds(Some(BoundingBox {
            north: 44.0,
            south: 46.5,
            east: 7.25,
            west: 5.0,
        }));
        options.set_overlay(LiveOverlay::Receivers, true);
        options.set_overlay(LiveOverlay::Airspace, true);
        options.warning_hidden = true;
        options.path_length = PathLength::Full;
        options.units = Units::Imperial;
        options.list_hidden = true;
        options.device_types = DeviceTypes::from_bits(3);
        options.sticks = true;
        options.barogram = true;
        assert_eq!(
            encode(&options),
            "c=45.12346,5.50000&z=9&m=2&o=1&b=46.5000,44.0000,7.2500,5.0000\
             &l=zr&w=0&p=3&u=i&n=0&y=3&a=1&g=1"
        );
    }

    #[test]
    fn decodes_every_key() {
        let options = decode(
            "#c=45.5,6.25&z=10&m=1&o=1&b=46,45,7,6&l=ar&w=0&p=2&u=i&n=0&y=5&a=1&g=1&t=http://x/task.json",
            home(),
        );
        assert_eq!(options.center, Coordinate::new(45.5, 6.25));
        assert_eq!(options.zoom, Some(10));
        assert_eq!(options.base_map, Some(1));
        assert!(options.show_offline);
        assert!(!options.auto_bounds);
        assert_eq!(options.bounds.map(|b| b.north), Some(46.0));
        assert_eq!(
            options.overlays,
            vec![LiveOverlay::Airports, LiveOverlay::Receivers]
        );
        assert!(options.warning_hidden);
        assert_eq!(options.path_length, PathLength::Long);
        assert_eq!(options.units, Units::Imperial);
        assert!(options.list_hidden);
        assert_eq!(options.device_types.bits(), 5);
        assert!(options.sticks && options.barogram);
        assert_eq!(options.task_url.as_deref(), Some("http://x/task.json"));
        assert!(!encode(&options).contains("t="));
    }

    #[test]
    fn weather_letters_cap_decoded_zoom() {
        let options = decode("c=45,6&z=12&l=tv", home());
        assert_eq!(options.zoom, Some(7));
        let options = decode("c=45,6&z=12&l=r", home());
        assert_eq!(options.zoom, Some(12));
    }

    #[test]
    fn bad_values_fall_back() {
        let options = decode("c=abc&z=x&m=9&b=1,2,3&y=junk", home());
        assert_eq!(options.center, home());
        assert_eq!(options.zoom, None);
        assert_eq!(options.base_map, None);
        assert!(options.auto_bounds);
        assert!(options.device_types.is_all());
    }

    #[test]
    fn centres_off_the_globe_fall_back() {
        for centre in ["45,1e17", "45,inf", "-91,6"] {
            assert_eq!(decode(&format!("c={centre}"), home()).center, home(), "{centre}");
        }
    }

    #[test]
    fn decoded_bounds_are_normalised() {
        let options = decode("c=45,6&b=-10,89,-200,5.5", home());
        let bounds = options.bounds.unwrap();
        assert_eq!(
            (bounds.north, bounds.south, bounds.east, bounds.west),
            (85.0, -10.0, 5.5, -180.0)
        );
    }

    #[test]
    fn fragment_round_trip() {
        let fragment = "c=45.00000,6.00000&z=8&b=46.0000,45.0000,7.0000,6.0000&l=zr&p=2&y=6&a=1";
        assert_eq!(encode(&decode(fragment, home())), fragment);
    }
}
