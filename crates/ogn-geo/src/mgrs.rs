//! Military Grid Reference System conversion on the WGS84 ellipsoid.
//!
//! Grid references are `<zone><band><100 km square><easting digits><northing digits>`.
//! Coverage tiles use the zone, band and square (five characters); samples
//! extend them with one digit pair per ten-fold increase in precision.

use ogn_core::{OgnError, OgnResult};

use crate::{BoundingBox, Coordinate};

const SEMI_MAJOR_M: f64 = 6_378_137.0;
const ECC_SQUARED: f64 = 0.006_694_38;
const SCALE_FACTOR: f64 = 0.9996;
const FALSE_EASTING_M: f64 = 500_000.0;
const FALSE_NORTHING_M: f64 = 10_000_000.0;

const BAND_LETTERS: &[u8; 20] = b"CDEFGHJKLMNPQRSTUVWX";
const SET_ORIGIN_COLUMNS: &[u8; 6] = b"AJSAJS";
const SET_ORIGIN_ROWS: &[u8; 6] = b"AFAFAF";

const A: u8 = b'A';
const I: u8 = b'I';
const O: u8 = b'O';
const V: u8 = b'V';
const Z: u8 = b'Z';

pub const MIN_LATITUDE: f64 = -80.0;
pub const MAX_LATITUDE: f64 = 84.0;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Utm {
    easting: f64,
    northing: f64,
    zone: u8,
    band: u8,
}

/// A decoded grid reference: the south-west corner of its square and the
/// square's edge length in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSquare {
    pub easting: f64,
    pub northing: f64,
    pub zone: u8,
    pub band: char,
    pub accuracy_m: f64,
}

/// Encodes a position as a grid reference with `digits` digits per axis (0..=5).
pub fn forward(coord: Coordinate, digits: usize) -> OgnResult<String> {
    if !(MIN_LATITUDE..=MAX_LATITUDE).contains(&coord.latitude) {
        return Err(OgnError::invalid(format!(
            "latitude {} is outside MGRS coverage",
            coord.latitude
        )));
    }
    let utm = to_utm(coord);
    let digits = digits.min(5);
    let easting = utm.easting.round() as i64;
    let northing = utm.northing.round() as i64;
    let east_digits = format!("{:05}", easting.rem_euclid(100_000));
    let north_digits = format!("{:05}", northing.rem_euclid(100_000));
    Ok(format!(
        "{}{}{}{}{}",
        utm.zone,
        utm.band as char,
        square_id(easting, northing, utm.zone),
        &east_digits[..digits],
        &north_digits[..digits]
    ))
}

/// Returns the area covered by a grid reference.
pub fn inverse(reference: &str) -> OgnResult<BoundingBox> {
    let square = decode(&reference.to_ascii_uppercase())?;
    let corner = from_utm(square.easting, square.northing, square.zone, square.band)?;
    let opposite = from_utm(
        square.easting + square.accuracy_m,
        square.northing + square.accuracy_m,
        square.zone,
        square.band,
    )?;
    Ok(BoundingBox {
        north: opposite.latitude,
        south: corner.latitude,
        east: opposite.longitude,
        west: corner.longitude,
    })
}

pub fn decode(reference: &str) -> OgnResult<GridSquare> {
    let bad = || OgnError::invalid(format!("bad MGRS reference {reference}"));
    let bytes = reference.as_bytes();
    let zone_len = bytes
        .iter()
        .take_while(|byte| byte.is_ascii_digit())
        .count();
    if zone_len == 0 || zone_len > 2 || zone_len + 3 > bytes.len() {
        return Err(bad());
    }
    let zone: u8 = reference[..zone_len].parse().map_err(|_| bad())?;
    if zone == 0 || zone > 60 {
        return Err(bad());
    }
    let band = bytes[zone_len];
    if !BAND_LETTERS.contains(&band) {
        return Err(bad());
    }
    let set = square_set(zone);
    let mut easting = easting_from_letter(bytes[zone_len + 1], set).ok_or_else(bad)?;
    let mut northing = northing_from_letter(bytes[zone_len + 2], set).ok_or_else(bad)?;
    let min_northing = band_min_northing(band).ok_or_else(bad)?;
    while northing < min_northing {
        northing += 2_000_000.0;
    }

    let digits = &reference[zone_len + 3..];
    if digits.len() % 2 != 0 || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(bad());
    }
    let precision = digits.len() / 2;
    let accuracy_m = 100_000.0 / 10f64.powi(precision as i32);
    if precision > 0 {
        let east: f64 = digits[..precision].parse().map_err(|_| bad())?;
        let north: f64 = digits[precision..].parse().map_err(|_| bad())?;
        easting += east * accuracy_m;
        northing += north * accuracy_m;
    }

    Ok(GridSquare {
        easting,
        northing,
        zone,
        band: band as char,
        accuracy_m,
    })
}

fn to_utm(coord: Coordinate) -> Utm {
    let lat = coord.latitude;
    let lon = coord.longitude;
    let zone = zone_for(lat, lon);
    let lat_rad = lat.to_radians();
    let lon_origin = f64::from(zone - 1) * 6.0 - 180.0 + 3.0;
    let lon_delta = (lon - lon_origin).to_radians();

    let e2 = ECC_SQUARED;
    let ep2 = e2 / (1.0 - e2);
    let n = SEMI_MAJOR_M / (1.0 - e2 * lat_rad.sin().powi(2)).sqrt();
    let t = lat_rad.tan().powi(2);
    let c = ep2 * lat_rad.cos().powi(2);
    let a = lat_rad.cos() * lon_delta;
    let m = SEMI_MAJOR_M
        * ((1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0) * lat_rad
            - (3.0 * e2 / 8.0 + 3.0 * e2 * e2 / 32.0 + 45.0 * e2 * e2 * e2 / 1024.0)
                * (2.0 * lat_rad).sin()
            + (15.0 * e2 * e2 / 256.0 + 45.0 * e2 * e2 * e2 / 1024.0) * (4.0 * lat_rad).sin()
            - (35.0 * e2 * e2 * e2 / 3072.0) * (6.0 * lat_rad).sin());

    let easting = SCALE_FACTOR
        * n
        * (a + (1.0 - t + c) * a.powi(3) / 6.0
            + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0)
        + FALSE_EASTING_M;
    let mut northing = SCALE_FACTOR
        * (m + n
            * lat_rad.tan()
            * (a * a / 2.0
                + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0));
    if lat < 0.0 {
        northing += FALSE_NORTHING_M;
    }

    Utm {
        easting,
        northing,
        zone,
        band: band_letter(lat),
    }
}

fn from_utm(easting: f64, northing: f64, zone: u8, band: char) -> OgnResult<Coordinate> {
    if easting < 0.0 || northing < 0.0 {
        return Err(OgnError::invalid("negative UTM coordinate"));
    }
    let e2 = ECC_SQUARED;
    let ep2 = e2 / (1.0 - e2);
    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
    let x = easting - FALSE_EASTING_M;
    let mut y = northing;
    if band < 'N' {
        y -= FALSE_NORTHING_M;
    }
    let lon_origin = f64::from(zone - 1) * 6.0 - 180.0 + 3.0;

    let m = y / SCALE_FACTOR;
    let mu = m / (SEMI_MAJOR_M * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));
    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1 * e1 / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin();

    let n1 = SEMI_MAJOR_M / (1.0 - e2 * phi1.sin().powi(2)).sqrt();
    let t1 = phi1.tan().powi(2);
    let c1 = ep2 * phi1.cos().powi(2);
    let r1 = SEMI_MAJOR_M * (1.0 - e2) / (1.0 - e2 * phi1.sin().powi(2)).powf(1.5);
    let d = x / (n1 * SCALE_FACTOR);

    let lat = phi1
        - (n1 * phi1.tan() / r1)
            * (d * d / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1 - 252.0 * ep2 - 3.0 * c1 * c1)
                    * d.powi(6)
                    / 720.0);
    let lon = (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
        + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1) * d.powi(5)
            / 120.0)
        / phi1.cos();

    Ok(Coordinate::new(
        lat.to_degrees(),
        lon_origin + lon.to_degrees(),
    ))
}

fn zone_for(lat: f64, lon: f64) -> u8 {
    if lon >= 180.0 {
        return 60;
    }
    // Southwest Norway.
    if (56.0..64.0).contains(&lat) && (3.0..12.0).contains(&lon) {
        return 32;
    }
    // Svalbard.
    if (72.0..84.0).contains(&lat) {
        if (0.0..9.0).contains(&lon) {
            return 31;
        } else if (9.0..21.0).contains(&lon) {
            return 33;
        } else if (21.0..33.0).contains(&lon) {
            return 35;
        } else if (33.0..42.0).contains(&lon) {
            return 37;
        }
    }
    (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8
}

fn band_letter(lat: f64) -> u8 {
    let index = ((lat - MIN_LATITUDE) / 8.0).floor() as i32;
    BAND_LETTERS[index.clamp(0, 19) as usize]
}

fn square_set(zone: u8) -> usize {
    match zone % 6 {
        0 => 6,
        set => set as usize,
    }
}

fn square_id(easting: i64, northing: i64, zone: u8) -> String {
    let set = square_set(zone);
    let column = easting.div_euclid(100_000) as i32;
    let row = northing.div_euclid(100_000).rem_euclid(20) as i32;
    let col_origin = i32::from(SET_ORIGIN_COLUMNS[set - 1]);
    let row_origin = i32::from(SET_ORIGIN_ROWS[set - 1]);
    let (a, i, o, v, z) = (
        i32::from(A),
        i32::from(I),
        i32::from(O),
        i32::from(V),
        i32::from(Z),
    );

    let mut col = col_origin + column - 1;
    let mut rollover = false;
    if col > z {
        col = col - z + a - 1;
        rollover = true;
    }
    if col == i || (col_origin < i && col > i) || ((col > i || col_origin < i) && rollover) {
        col += 1;
    }
    if col == o || (col_origin < o && col > o) || ((col > o || col_origin < o) && rollover) {
        col += 1;
        if col == i {
            col += 1;
        }
    }
    if col > z {
        col = col - z + a - 1;
    }

    let mut row_letter = row_origin + row;
    let rollover = if row_letter > v {
        row_letter = row_letter - v + a - 1;
        true
    } else {
        false
    };
    if row_letter == i
        || (row_origin < i && row_letter > i)
        || ((row_letter > i || row_origin < i) && rollover)
    {
        row_letter += 1;
    }
    if row_letter == o
        || (row_origin < o && row_letter > o)
        || ((row_letter > o || row_origin < o) && rollover)
    {
        row_letter += 1;
        if row_letter == i {
            row_letter += 1;
        }
    }
    if row_letter > v {
        row_letter = row_letter - v + a - 1;
    }

    let mut id = String::with_capacity(2);
    id.push(col as u8 as char);
    id.push(row_letter as u8 as char);
    id
}

fn easting_from_letter(letter: u8, set: usize) -> Option<f64> {
    let mut current = SET_ORIGIN_COLUMNS[set - 1];
    let mut easting = 100_000.0;
    let mut rewound = false;
    while current != letter {
        current += 1;
        if current == I {
            current += 1;
        }
        if current == O {
            current += 1;
        }
        if current > Z {
            if rewound {
                return None;
            }
            current = A;
            rewound = true;
        }
        easting += 100_000.0;
    }
    Some(easting)
}

fn northing_from_letter(letter: u8, set: usize) -> Option<f64> {
    if letter > V {
        return None;
    }
    let mut current = SET_ORIGIN_ROWS[set - 1];
    let mut northing = 0.0;
    let mut rewound = false;
    while current != letter {
        current += 1;
        if current == I {
            current += 1;
        }
        if current == O {
            current += 1;
        }
        if current > V {
            if rewound {
                return None;
            }
            current = A;
            rewound = true;
        }
        northing += 100_000.0;
    }
    Some(northing)
}

fn band_min_northing(band: u8) -> Option<f64> {
    let northing = match band {
        b'C' => 1_100_000.0,
        b'D' => 2_000_000.0,
        b'E' => 2_800_000.0,
        b'F' => 3_700_000.0,
        b'G' => 4_600_000.0,
        b'H' => 5_500_000.0,
        b'J' => 6_400_000.0,
        b'K' => 7_300_000.0,
        b'L' => 8_200_000.0,
        b'M' => 9_100_000.0,
        b'N' => 0.0,
        b'P' => 800_000.0,
        b'Q' => 1_700_000.0,
        b'R' => 2_600_000.0,
        b'S' => 3_500_000.0,
        b'T' => 4_400_000.0,
        b'U' => 5_300_000.0,
        b'V' => 6_200_000.0,
        b'W' => 7_000_000.0,
        b'X' => 7_900_000.0,
        _ => return None,
    };
    Some(northing)
}
