//! The range viewer's UI state store.

use ogn_core::{DatePreset, OgnResult, StationName};
use ogn_geo::Coordinate;
use ogn_map::Rgba;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::settings::LOWRES_SOURCE;

pub const DEFAULT_COLOUR: &str = "#80000040:#008000ff";

/// Coverage data source, e.g. `max`, `avg`, `count`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source(String);

impl Source {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_lowres(&self) -> bool {
        self.0 == LOWRES_SOURCE
    }

    /// Network-wide sources are never filtered by station.
    pub fn ignores_station(&self) -> bool {
        matches!(self.0.as_str(), "receivers" | "coverage")
    }

    pub fn label(&self) -> String {
        match self.0.as_str() {
            "max" => "Maximum Signal".to_string(),
            "avg" => "Average Signal".to_string(),
            "count" => "Sample Count".to_string(),
            "receivers" => "Receiver Count".to_string(),
            "coverage" => "Coverage".to_string(),
            LOWRES_SOURCE => "Low Resolution Coverage".to_string(),
            other => other.to_string(),
        }
    }
}

impl Default for Source {
    fn default() -> Self {
        Self::new("max")
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Overlay {
    Airports,
    Airspace,
    Circles,
    Ambiguity,
}

impl Overlay {
    /// Order in which enabled overlays are written to the fragment.
    pub const ALL: [Overlay; 4] = [
        Overlay::Airports,
        Overlay::Airspace,
        Overlay::Circles,
        Overlay::Ambiguity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Airports => "airports",
            Self::Airspace => "airspace",
            Self::Circles => "circles",
            Self::Ambiguity => "ambiguity",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|overlay| overlay.name() == name)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overlays {
    pub airports: bool,
    pub airspace: bool,
    pub circles: bool,
    pub ambiguity: bool,
}

impl Overlays {
    pub fn get(&self, overlay: Overlay) -> bool {
        match overlay {
            Overlay::Airports => self.airports,
            Overlay::Airspace => self.airspace,
            Overlay::Circles => self.circles,
            Overlay::Ambiguity => self.ambiguity,
        }
    }

    pub fn set(&mut self, overlay: Overlay, enabled: bool) {
        match overlay {
            Overlay::Airports => self.airports = enabled,
            Overlay::Airspace => self.airspace = enabled,
            Overlay::Circles => self.circles = enabled,
            Overlay::Ambiguity => self.ambiguity = enabled,
        }
    }
}

/// Gradient endpoints written as `min:max`, each a hex colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColourScheme(String);

impl ColourScheme {
    pub fn parse(value: &str) -> OgnResult<Self> {
        let scheme = Self(value.to_string());
        scheme.endpoints()?;
        Ok(scheme)
    }

    /// Returns `(min, max)`.
    pub fn endpoints(&self) -> OgnResult<(Rgba, Rgba)> {
        let (min, max) = self
            .0
            .split_once(':')
            .ok_or_else(|| ogn_core::OgnError::invalid(format!("bad colour scheme {}", self.0)))?;
        Ok((Rgba::parse(min)?, Rgba::parse(max)?))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn with_min(&self, colour: Rgba) -> Self {
        let max = self.0.split_once(':').map(|(_, max)| max).unwrap_or("");
        Self(format!("{}:{max}", colour.to_hex()))
    }

    pub fn with_max(&self, colour: Rgba) -> Self {
        let min = self.0.split_once(':').map(|(min, _)| min).unwrap_or("");
        Self(format!("{min}:{}", colour.to_hex()))
    }
}

impl Default for ColourScheme {
    fn default() -> Self {
        Self(DEFAULT_COLOUR.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub station: StationName,
    pub source: Source,
    pub when: DatePreset,
    /// `None` keeps whatever the map currently shows.
    pub center: Option<Coordinate>,
    pub zoom: Option<u8>,
    pub colour: ColourScheme,
    pub overlays: Overlays,
}

impl Default for Selection {
    fn default() -> Self {
        Self {
            station: StationName::new(""),
            source: Source::default(),
            when: DatePreset::LastWeek,
            center: None,
            zoom: None,
            colour: ColourScheme::default(),
            overlays: Overlays {
                circles: true,
                ..Overlays::default()
            },
        }
    }
}

impl Selection {
    /// Stored centres keep the five decimals the fragment carries.
    pub fn set_center(&mut self, center: Coordinate) {
        self.center = Some(center.rounded(5));
    }

    /// Station filter sent with tile requests.
    pub fn station_filter(&self) -> &str {
        if self.source.ignores_station() {
            ""
        } else {
            self.station.as_str()
        }
    }

    pub fn title(&self) -> String {
        format!("Onglide Range{}", self.title_suffix())
    }

    pub fn description(&self) -> String {
        self.title_suffix()
            .strip_prefix(" - ")
            .unwrap_or_default()
            .to_string()
    }

    fn title_suffix(&self) -> String {
        let mut title = format!(" - {}", self.source.label());
        if !self.station.is_empty() {
            title.push_str(" - ");
            title.push_str(self.station.as_str());
        }
        title.push_str(" - ");
        title.push_str(&self.when.label());
        title
    }
}
