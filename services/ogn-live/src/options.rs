use ogn_core::{DeviceTypes, Units};
use ogn_geo::{BoundingBox, Coordinate};
use serde::{Deserialize, Serialize};

/// Highest zoom the weather tile layers are rendered at.
pub const WEATHER_MAX_ZOOM: u8 = 7;
pub const BASE_MAPS: u8 = 4;

/// Toggleable overlay layers, in fragment slot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveOverlay {
    Temperature,
    Wind,
    Pressure,
    Airspace,
    Airports,
    Receivers,
    Rain,
}

impl LiveOverlay {
    pub const ALL: [LiveOverlay; 7] = [
        LiveOverlay::Temperature,
        LiveOverlay::Wind,
        LiveOverlay::Pressure,
        LiveOverlay::Airspace,
        LiveOverlay::Airports,
        LiveOverlay::Receivers,
        LiveOverlay::Rain,
    ];

    pub fn letter(&self) -> char {
        match self {
            Self::Temperature => 't',
            Self::Wind => 'v',
            Self::Pressure => 'p',
            Self::Airspace => 'z',
            Self::Airports => 'a',
            Self::Receivers => 'r',
            Self::Rain => 'n',
        }
    }

    pub fn from_letter(letter: char) -> Option<Self> {
        Self::ALL.into_iter().find(|overlay| overlay.letter() == letter)
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|overlay| overlay.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Wind => "wind",
            Self::Pressure => "pressure",
            Self::Airspace => "airspace",
            Self::Airports => "airports",
            Self::Receivers => "receivers",
            Self::Rain => "rain",
        }
    }

    pub fn is_weather(&self) -> bool {
        matches!(
            self,
            Self::Temperature | Self::Wind | Self::Pressure | Self::Rain
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathLength {
    #[default]
    Short,
    Long,
    Full,
}

impl PathLength {
    pub fn points(&self) -> usize {
        match self {
            Self::Short => 30,
            Self::Long => 60,
            Self::Full => 99_999,
        }
    }

    /// Fragment code, `None` for the default length.
    pub fn code(&self) -> Option<&'static str> {
        match self {
            Self::Short => None,
            Self::Long => Some("2"),
            Self::Full => Some("3"),
        }
    }

    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "2" => Self::Long,
            "3" => Self::Full,
            _ => Self::Short,
        }
    }
}

/// The live viewer's UI options: everything the fragment carries plus the
/// flags that only live in the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveOptions {
    pub center: Coordinate,
    pub zoom: Option<u8>,
    pub base_map: Option<u8>,
    pub show_offline: bool,
    /// Explicit filter box, stored normalised.
    pub bounds: Option<BoundingBox>,
    /// The filter box follows the map view.
    pub auto_bounds: bool,
    pub overlays: Vec<LiveOverlay>,
    pub warning_hidden: bool,
    pub path_length: PathLength,
    pub units: Units,
    pub list_hidden: bool,
    pub device_types: DeviceTypes,
    pub sticks: bool,
    pub barogram: bool,
    pub task_url: Option<String>,
    /// Newly seen aircraft start hidden in the list and on the map.
    pub hide_new: bool,
}

impl LiveOptions {
    pub fn new(center: Coordinate) -> Self {
        Self {
            center,
            zoom: None,
            base_map: None,
            show_offline: false,
            bounds: None,
            auto_bounds: true,
            overlays: Vec::new(),
            warning_hidden: false,
            path_length: PathLength::default(),
            units: Units::default(),
            list_hidden: false,
            device_types: DeviceTypes::all(),
            sticks: false,
            barogram: false,
            task_url: None,
            hide_new: false,
        }
    }

    pub fn has_overlay(&self, overlay: LiveOverlay) -> bool {
        self.overlays.contains(&overlay)
    }

    /// Enabling a weather overlay pulls the zoom back to the weather maximum.
    pub fn set_overlay(&mut self, overlay: LiveOverlay, enabled: bool) {
        self.overlays.retain(|current| *current != overlay);
        if enabled {
            self.overlays.push(overlay);
            self.overlays.sort();
        }
        self.cap_zoom_for_weather();
    }

    pub fn cap_zoom_for_weather(&mut self) {
        if self.overlays.iter().any(LiveOverlay::is_weather) {
            if let Some(zoom) = self.zoom.filter(|zoom| *zoom > WEATHER_MAX_ZOOM) {
                tracing::debug!(zoom, "weather overlay caps zoom");
                self.zoom = Some(WEATHER_MAX_ZOOM);
            }
        }
    }

    /// Explicit bounds and view-following bounds exclude each other; dropping
    /// the explicit box falls back to following the view.
    pub fn set_bounds(&mut self, bounds: Option<BoundingBox>) {
        self.bounds = bounds.map(normalize_bounds);
        self.auto_bounds = self.bounds.is_none();
    }

    pub fn set_auto_bounds(&mut self, enabled: bool) {
        self.auto_bounds = enabled;
        if enabled {
            self.bounds = None;
        }
    }
}

/// Orders and clamps a filter box, keeping four decimals.
pub fn normalize_bounds(bounds: BoundingBox) -> BoundingBox {
    let bounds = bounds.normalized(85.0, 180.0);
    let round = |value: f64| (value * 1e4).round() / 1e4;
    BoundingBox {
        north: round(bounds.north),
        south: round(bounds.south),
        east: round(bounds.east),
        west: round(bounds.west),
    }
}
