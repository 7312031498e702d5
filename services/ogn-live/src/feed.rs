//! Readers for the live backend's XML: every payload is a list of empty
//! `<m …/>` elements whose attributes carry the data.

use ogn_core::{AircraftFix, ErrorCode, OgnError, OgnResult, Receiver, ReceiverName};
use ogn_geo::{polyline, Coordinate};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use std::collections::BTreeMap;

type Attributes = BTreeMap<String, String>;

fn markers(xml: &str) -> OgnResult<Vec<Attributes>> {
    let mut reader = Reader::from_str(xml);
    let mut entries = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Empty(element)) | Ok(Event::Start(element))
                if element.name().as_ref() == b"m" =>
            {
                entries.push(attributes(&element)?);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                return Err(OgnError::invalid(format!(
                    "malformed XML at byte {}: {err}",
                    reader.buffer_position()
                )));
            }
        }
    }
    Ok(entries)
}

fn attributes(element: &BytesStart<'_>) -> OgnResult<Attributes> {
    element
        .attributes()
        .map(|attribute| {
            let attribute = attribute.map_err(|err| OgnError::invalid(err.to_string()))?;
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let value = attribute
                .unescape_value()
                .map_err(|err| OgnError::invalid(err.to_string()))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

fn status_ok(entry: &Attributes) -> bool {
    entry.get("e").is_none_or(|code| code.trim() == "0")
}

/// Position reports; malformed records are skipped.
pub fn parse_aircraft(xml: &str) -> OgnResult<Vec<AircraftFix>> {
    let mut fixes = Vec::new();
    for entry in markers(xml)? {
        let Some(record) = entry.get("a") else {
            continue;
        };
        match AircraftFix::parse(record) {
            Ok(fix) => fixes.push(fix),
            Err(err) => tracing::debug!(record = %record, error = %err, "skipping aircraft record"),
        }
    }
    Ok(fixes)
}

/// Receiver list. A non-zero status entry or an empty list is an error so
/// the caller retries sooner.
pub fn parse_receivers(xml: &str) -> OgnResult<Vec<Receiver>> {
    let entries = markers(xml)?;
    if let Some(status) = entries.iter().find(|entry| entry.contains_key("e")) {
        if !status_ok(status) {
            return Err(OgnError::new(
                ErrorCode::Upstream,
                format!(
                    "receiver feed status {}",
                    status.get("e").map(String::as_str).unwrap_or_default()
                ),
            ));
        }
    }

    let receivers: Vec<Receiver> = entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("a")?;
            let latitude = entry.get("b")?.trim().parse().ok()?;
            let longitude = entry.get("c")?.trim().parse().ok()?;
            let online = entry.get("d").is_some_and(|flag| flag.trim() == "1");
            Some(Receiver {
                name: ReceiverName::new(name.as_str()),
                latitude,
                longitude,
                offline: !online,
            })
        })
        .collect();

    if receivers.is_empty() {
        return Err(OgnError::new(ErrorCode::Upstream, "receiver feed is empty"));
    }
    Ok(receivers)
}

/// Extended aircraft metadata, answered for the aircraft named in `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceInfo {
    pub key: String,
    pub model: String,
}

/// `g` is the lookup status; anything but `0` means the device is unknown.
pub fn parse_device_info(xml: &str) -> OgnResult<DeviceInfo> {
    let mut entry = markers(xml)?
        .into_iter()
        .next()
        .ok_or_else(|| OgnError::invalid("device info reply is empty"))?;
    let status = entry.get("g").map(|code| code.trim()).unwrap_or_default();
    if status.parse::<f64>().ok() != Some(0.0) {
        return Err(OgnError::new(
            ErrorCode::NotFound,
            format!("no device information (status {status:?})"),
        ));
    }
    Ok(DeviceInfo {
        key: entry.remove("i").unwrap_or_default(),
        model: entry.remove("c").unwrap_or_default(),
    })
}

/// Historical path of one aircraft.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackReply {
    pub id: String,
    pub points: Vec<Coordinate>,
}

pub fn parse_track(xml: &str) -> OgnResult<TrackReply> {
    let entry = markers(xml)?
        .into_iter()
        .find(|entry| entry.contains_key("e"))
        .ok_or_else(|| OgnError::invalid("track reply has no status"))?;
    if !status_ok(&entry) {
        return Err(OgnError::new(ErrorCode::NotFound, "no track for aircraft"));
    }
    let encoded = entry.get("r").map(String::as_str).unwrap_or_default();
    if encoded.len() <= 2 {
        return Err(OgnError::new(ErrorCode::NotFound, "track is empty"));
    }
    Ok(TrackReply {
        id: entry.get("i").cloned().unwrap_or_default(),
        points: polyline::decode(encoded)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogn_core::{AircraftType, FlarmId};

    const AIRCRAFT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<markers>
<m a="45.1234567,6.7654321,AB,D-1234,1520,12:01:02,15,270,95,-1.5,1,LFLE,DD1234,DD1234"/>
<m a="broken"/>
<m a="46.0000000,7.0000000,,F-CXYZ,900,12:00:00,900,0,0,0,8,BERN,0,ABCDEF"/>
</markers>"#;

    #[test]
    fn aircraft_records_are_parsed_and_bad_ones_skipped() {
        let fixes = parse_aircraft(AIRCRAFT).unwrap();
        assert_eq!(fixes.len(), 2);
        assert_eq!(fixes[0].competition_id, "AB");
        assert_eq!(fixes[0].aircraft_type, AircraftType::Glider);
        assert_eq!(fixes[0].key.as_str(), "DD1234");
        assert!(fixes[0].is_online());
        assert_eq!(fixes[1].competition_id, "_");
        assert_eq!(fixes[1].flarm_id, FlarmId::hidden());
        assert!(!fixes[1].is_online());
    }

    #[test]
    fn receivers_need_a_good_status_and_entries() {
        let xml = r#"<markers><m e="0"/><m a="LFLE" b="45.5" c="5.9" d="1"/><m a="BERN" b="46.9" c="7.4" d="0"/></markers>"#;
        let receivers = parse_receivers(xml).unwrap();
        assert_eq!(receivers.len(), 2);
        assert!(!receivers[0].offline);
        assert!(receivers[1].offline);

        assert!(parse_receivers(r#"<markers><m e="1"/><m a="X" b="1" c="2" d="1"/></markers>"#).is_err());
        assert!(parse_receivers(r#"<markers><m e="0"/></markers>"#).is_err());
        assert!(parse_receivers("<markers><m a=").is_err());
    }

    #[test]
    fn device_info_needs_status_zero() {
        let info =
            parse_device_info(r#"<markers><m g="0" i="DD1234" c="ASK 21"/></markers>"#).unwrap();
        assert_eq!(info.key, "DD1234");
        assert_eq!(info.model, "ASK 21");
        assert!(parse_device_info(r#"<markers><m g="1" i="DD1234"/></markers>"#).is_err());
        assert!(parse_device_info("<markers></markers>").is_err());
    }

    #[test]
    fn track_requires_status_zero_and_a_path() {
        let xml = r#"<markers><m e="0" i="DD1234" r="_p~iF~ps|U_ulLnnqC_mqNvxq`@"/></markers>"#;
        let track = parse_track(xml).unwrap();
        assert_eq!(track.id, "DD1234");
        assert_eq!(track.points.len(), 3);
        assert!((track.points[0].latitude - 38.5).abs() < 1e-9);

        assert!(parse_track(r#"<markers><m e="1" i="X" r="_p~iF~ps|U"/></markers>"#).is_err());
        assert!(parse_track(r#"<markers><m e="0" i="X" r="ab"/></markers>"#).is_err());
    }
}
