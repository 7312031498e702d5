use serde::{Deserialize, Serialize};

use crate::error::{OgnError, OgnResult};
use crate::ids::{AircraftKey, FlarmId, ReceiverName, StationName};

/// Firmware versions that mark a receiver as running outdated software.
const OLD_VERSIONS: [&str; 5] = ["old", "?", "undefined", "", "0.1.3"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    #[serde(rename = "s")]
    pub name: StationName,
    #[serde(rename = "lt")]
    pub latitude: f64,
    #[serde(rename = "lg")]
    pub longitude: f64,
    #[serde(rename = "u", default)]
    pub up: String,
    #[serde(rename = "ut", default)]
    pub updated: Option<String>,
    #[serde(rename = "v", default)]
    pub version: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StationStatus {
    UpCurrent,
    UpOld,
    DownCurrent,
    DownOld,
}

impl StationStatus {
    pub fn marker_colour(&self) -> &'static str {
        match self {
            Self::UpCurrent => "00ff00",
            Self::UpOld => "0000ff",
            Self::DownOld => "aa00aa",
            Self::DownCurrent => "aa0000",
        }
    }
}

impl Station {
    pub fn is_up(&self) -> bool {
        self.up == "U"
    }

    pub fn has_old_version(&self) -> bool {
        match self.version.as_deref() {
            None => true,
            Some(version) => OLD_VERSIONS.contains(&version),
        }
    }

    pub fn status(&self) -> StationStatus {
        match (self.is_up(), self.has_old_version()) {
            (true, false) => StationStatus::UpCurrent,
            (true, true) => StationStatus::UpOld,
            (false, true) => StationStatus::DownOld,
            (false, false) => StationStatus::DownCurrent,
        }
    }

    pub fn info_text(&self) -> String {
        let when = if self.is_up() {
            "Last heartbeat at:\n"
        } else {
            "Last point at "
        };
        format!(
            "{}\n{}{}Z\nVersion {}",
            self.name,
            when,
            self.updated.as_deref().unwrap_or(""),
            self.version.as_deref().unwrap_or("undefined")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receiver {
    pub name: ReceiverName,
    pub latitude: f64,
    pub longitude: f64,
    pub offline: bool,
}

impl Receiver {
    /// `rec1.png` for receivers reporting as active, `rec0.png` otherwise.
    pub fn icon(&self) -> String {
        format!("rec{}.png", u8::from(!self.offline))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftType {
    Unknown,
    Glider,
    TowPlane,
    Helicopter,
    Parachute,
    DropPlane,
    HangGlider,
    Paraglider,
    Plane,
    Jet,
    Ufo,
    Balloon,
    Airship,
    Drone,
    StaticObject,
}

impl AircraftType {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Glider,
            2 => Self::TowPlane,
            3 => Self::Helicopter,
            4 => Self::Parachute,
            5 => Self::DropPlane,
            6 => Self::HangGlider,
            7 => Self::Paraglider,
            8 => Self::Plane,
            9 => Self::Jet,
            10 => Self::Ufo,
            11 => Self::Balloon,
            12 => Self::Airship,
            13 => Self::Drone,
            15 => Self::StaticObject,
            _ => Self::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Glider => "Glider/MotorGlider",
            Self::TowPlane => "Tow Plane",
            Self::Helicopter => "Helicopter",
            Self::Parachute => "Parachute",
            Self::DropPlane => "Drop Plane",
            Self::HangGlider => "Hangglider",
            Self::Paraglider => "Paraglider",
            Self::Plane => "Plane",
            Self::Jet => "Jet",
            Self::Ufo => "UFO",
            Self::Balloon => "Balloon",
            Self::Airship => "Airship",
            Self::Drone => "Drone",
            Self::StaticObject => "Static Object",
        }
    }

    /// Marker icon colour suffix.
    pub fn icon_suffix(&self) -> &'static str {
        match self {
            Self::Glider => "",
            Self::TowPlane => "_g",
            Self::Helicopter => "_r",
            Self::HangGlider | Self::Paraglider => "_p",
            Self::Drone => "_k",
            _ => "_b",
        }
    }
}

/// Device families requested from the live feed, as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceTypes(u8);

impl DeviceTypes {
    pub const ICAO: u8 = 1;
    pub const FLARM: u8 = 2;
    pub const OGN: u8 = 4;

    pub fn all() -> Self {
        Self(Self::ICAO | Self::FLARM | Self::OGN)
    }

    pub fn from_bits(bits: u8) -> Self {
        Self(bits & Self::all().0)
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn is_all(&self) -> bool {
        *self == Self::all()
    }

    pub fn contains(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }

    pub fn toggle(&mut self, flag: u8) {
        self.0 ^= flag & Self::all().0;
    }
}

impl Default for DeviceTypes {
    fn default() -> Self {
        Self::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClimbTrend {
    /// No report for more than two minutes.
    Stale,
    Level,
    SinkingFast,
    Sinking,
    SinkingSlow,
    ClimbingFast,
    Climbing,
    ClimbingSlow,
}

impl ClimbTrend {
    pub fn classify(elapsed_s: u32, vz: f64) -> Self {
        if elapsed_s > 120 {
            Self::Stale
        } else if vz == 0.0 {
            Self::Level
        } else if vz < -4.0 {
            Self::SinkingFast
        } else if vz < -1.0 {
            Self::Sinking
        } else if vz < 0.0 {
            Self::SinkingSlow
        } else if vz > 4.0 {
            Self::ClimbingFast
        } else if vz > 1.0 {
            Self::Climbing
        } else {
            Self::ClimbingSlow
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Stale => "n",
            Self::Level => "z",
            Self::SinkingFast => "mmm",
            Self::Sinking => "mm",
            Self::SinkingSlow => "m",
            Self::ClimbingFast => "ppp",
            Self::Climbing => "pp",
            Self::ClimbingSlow => "p",
        }
    }
}

/// One position report from the live feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftFix {
    pub key: AircraftKey,
    pub latitude: f64,
    pub longitude: f64,
    pub competition_id: String,
    pub registration: String,
    pub altitude_m: f64,
    pub time: String,
    pub elapsed_s: u32,
    pub track_deg: f64,
    pub speed_kmh: f64,
    pub vz_ms: f64,
    pub aircraft_type: AircraftType,
    pub receiver: String,
    pub flarm_id: FlarmId,
}

impl AircraftFix {
    /// Reports older than ten minutes count as offline.
    pub const ONLINE_WINDOW_S: u32 = 600;

    /// Parses the comma separated `a` attribute of a feed entry:
    /// `lat,lon,cn,reg,alt,time,elapsed,track,speed,vz,type,receiver,flarmid,key`.
    pub fn parse(record: &str) -> OgnResult<Self> {
        let fields: Vec<&str> = record.split(',').collect();
        if fields.len() < 14 {
            return Err(OgnError::invalid(format!(
                "aircraft record has {} fields",
                fields.len()
            )));
        }
        let number = |index: usize| -> OgnResult<f64> {
            fields[index].trim().parse::<f64>().map_err(|_| {
                OgnError::invalid(format!("field {index} is not numeric: {}", fields[index]))
            })
        };
        let competition_id = if fields[2].is_empty() {
            "_".to_string()
        } else {
            fields[2].to_string()
        };
        let type_code = fields[10].trim().parse::<u8>().unwrap_or(0);
        Ok(Self {
            latitude: number(0)?,
            longitude: number(1)?,
            competition_id,
            registration: fields[3].to_string(),
            altitude_m: number(4)?,
            time: fields[5].to_string(),
            elapsed_s: number(6)?.max(0.0) as u32,
            track_deg: number(7).unwrap_or(0.0),
            speed_kmh: number(8).unwrap_or(0.0),
            vz_ms: number(9).unwrap_or(0.0),
            aircraft_type: AircraftType::from_code(type_code),
            receiver: fields[11].to_string(),
            flarm_id: FlarmId::from_report(fields[12]),
            key: AircraftKey::new(fields[13]),
        })
    }

    pub fn is_online(&self) -> bool {
        self.elapsed_s < Self::ONLINE_WINDOW_S
    }

    pub fn climb_trend(&self) -> ClimbTrend {
        ClimbTrend::classify(self.elapsed_s, self.vz_ms)
    }

    pub fn label(&self) -> String {
        format!("{} - {}", self.competition_id, self.registration)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn altitude(&self, metres: f64) -> f64 {
        match self {
            Self::Metric => metres,
            Self::Imperial => metres * 3.2808,
        }
    }

    pub fn altitude_unit(&self) -> &'static str {
        match self {
            Self::Metric => "m",
            Self::Imperial => "ft",
        }
    }

    pub fn speed(&self, kmh: f64) -> f64 {
        match self {
            Self::Metric => kmh,
            Self::Imperial => kmh * 0.53996,
        }
    }

    pub fn speed_unit(&self) -> &'static str {
        match self {
            Self::Metric => "km/h",
            Self::Imperial => "kt",
        }
    }

    pub fn vertical_speed(&self, ms: f64) -> f64 {
        match self {
            Self::Metric => ms,
            Self::Imperial => ms * 1.94384,
        }
    }

    pub fn vertical_speed_unit(&self) -> &'static str {
        match self {
            Self::Metric => "m/s",
            Self::Imperial => "kt",
        }
    }
}
