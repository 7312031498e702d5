//! Encoded polyline decoding (five decimal places, latitude first).

use ogn_core::{OgnError, OgnResult};

use crate::Coordinate;

const FACTOR: f64 = 1e5;

pub fn decode(encoded: &str) -> OgnResult<Vec<Coordinate>> {
    let mut values = Vec::new();
    let mut current: i64 = 0;
    let mut shift = 0;
    for byte in encoded.bytes() {
        if !(63..=126).contains(&byte) {
            return Err(OgnError::invalid(format!("bad polyline byte {byte}")));
        }
        let chunk = i64::from(byte - 63);
        current |= (chunk & 0x1f) << shift;
        if chunk < 0x20 {
            let value = if current & 1 == 1 {
                !(current >> 1)
            } else {
                current >> 1
            };
            values.push(value);
            current = 0;
            shift = 0;
        } else {
            shift += 5;
            if shift > 60 {
                return Err(OgnError::invalid("polyline value overflow"));
            }
        }
    }
    if shift != 0 || values.len() % 2 != 0 {
        return Err(OgnError::invalid("truncated polyline"));
    }

    let mut lat = 0i64;
    let mut lon = 0i64;
    Ok(values
        .chunks_exact(2)
        .map(|delta| {
            lat += delta[0];
            lon += delta[1];
            Coordinate::new(lat as f64 / FACTOR, lon as f64 / FACTOR)
        })
        .collect())
}
