use ogn_core::{AircraftFix, AircraftKey, Units};
use ogn_geo::Coordinate;
use ogn_map::{Feature, Geometry, MapView, Rgba, Style, VectorLayer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::feed::DeviceInfo;
use crate::options::LiveOptions;

/// Path colours handed out to aircraft in order of first appearance.
pub const PATH_COLOURS: [&str; 16] = [
    "000000", "FF0000", "00B000", "0000FF", "808000", "008080", "FF00FF", "606060", "505028",
    "500000", "800080", "FF8040", "80B000", "4040FF", "804000", "000080",
];
/// Degrees of latitude per metre of altitude when drawing altitude sticks.
pub const STICK_SCALE: f64 = 0.00001;
pub const LINE_WIDTH: f64 = 2.0;
pub const MARKER_SIZE: (f64, f64) = (30.0, 30.0);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "state", content = "device", rename_all = "snake_case")]
pub enum InfoState {
    #[default]
    NotRequested,
    Pending,
    Available(DeviceInfo),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarogramPoint {
    pub time: String,
    pub altitude_m: f64,
}

#[derive(Debug, Clone)]
pub struct AircraftState {
    pub fix: AircraftFix,
    pub path: Vec<Coordinate>,
    pub barogram: Vec<BarogramPoint>,
    pub colour_index: usize,
    /// The path holds a loaded flight history and is no longer trimmed.
    pub full_track: bool,
    pub info: InfoState,
    pub marker_visible: bool,
    pub path_visible: bool,
    pub offline: bool,
}

impl AircraftState {
    fn new(fix: AircraftFix, colour_index: usize, visible: bool) -> Self {
        Self {
            fix,
            path: Vec::new(),
            barogram: Vec::new(),
            colour_index,
            full_track: false,
            info: InfoState::default(),
            marker_visible: visible,
            path_visible: visible,
            offline: false,
        }
    }

    pub fn position(&self) -> Coordinate {
        Coordinate::new(self.fix.latitude, self.fix.longitude)
    }

    pub fn stick_top(&self) -> Coordinate {
        Coordinate::new(
            self.fix.latitude + STICK_SCALE * self.fix.altitude_m,
            self.fix.longitude,
        )
    }

    pub fn colour_hex(&self) -> &'static str {
        PATH_COLOURS[self.colour_index % PATH_COLOURS.len()]
    }

    pub fn colour(&self) -> Rgba {
        Rgba::parse(self.colour_hex()).unwrap_or(Rgba::BLACK)
    }

    pub fn icon(&self) -> String {
        if self.offline {
            format!("markers/{}_o.png", self.fix.competition_id)
        } else {
            format!(
                "markers/{}{}.png",
                self.fix.competition_id,
                self.fix.aircraft_type.icon_suffix()
            )
        }
    }

    pub fn title(&self, units: Units) -> String {
        format!(
            "{} @ {:.0}{} @ {}",
            self.fix.label(),
            units.altitude(self.fix.altitude_m),
            units.altitude_unit(),
            self.fix.time
        )
    }

    fn record(&mut self, fix: AircraftFix, path_length: usize) {
        let position = Coordinate::new(fix.latitude, fix.longitude);
        if !self.full_track {
            trim_front(&mut self.path, path_length);
        }
        self.path.push(position);
        trim_front(&mut self.barogram, path_length);
        self.barogram.push(BarogramPoint {
            time: fix.time.clone(),
            altitude_m: fix.altitude_m,
        });
        self.fix = fix;
        self.offline = false;
    }
}

/// Drops the oldest entries so one more still fits in `limit`.
fn trim_front<T>(items: &mut Vec<T>, limit: usize) {
    keep_last(items, limit.saturating_sub(1));
}

fn keep_last<T>(items: &mut Vec<T>, keep: usize) {
    if items.len() > keep {
        items.drain(..items.len() - keep);
    }
}

/// One line of the aircraft list panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftRow {
    pub key: AircraftKey,
    pub competition_id: String,
    pub registration: String,
    pub altitude: String,
    pub trend: &'static str,
    pub colour: String,
    pub offline: bool,
    pub marker_visible: bool,
    pub path_visible: bool,
    pub selected: bool,
}

/// The info panel of the selected aircraft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AircraftDetails {
    pub key: AircraftKey,
    pub competition_id: String,
    pub registration: String,
    pub aircraft_type: &'static str,
    pub flarm_id: String,
    pub time: String,
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: String,
    pub speed: String,
    pub track: String,
    pub climb: String,
    pub receiver: String,
    pub receiver_distance_km: Option<f64>,
    pub info: InfoState,
    pub full_track: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FleetUpdate {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

/// Live aircraft keyed by feed key, plus the map layers drawn from them.
pub struct Fleet {
    aircraft: BTreeMap<AircraftKey, AircraftState>,
    next_colour: usize,
    whitelist: BTreeSet<String>,
    selected: Option<AircraftKey>,
    markers: VectorLayer<AircraftKey>,
    paths: VectorLayer<AircraftKey>,
    sticks: VectorLayer<AircraftKey>,
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            aircraft: BTreeMap::new(),
            next_colour: 0,
            whitelist: BTreeSet::new(),
            selected: None,
            markers: VectorLayer::new("aircraft", 50, true),
            paths: VectorLayer::new("paths", 20, true),
            sticks: VectorLayer::new("sticks", 30, false),
        }
    }

    pub fn len(&self) -> usize {
        self.aircraft.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aircraft.is_empty()
    }

    pub fn get(&self, key: &AircraftKey) -> Option<&AircraftState> {
        self.aircraft.get(key)
    }

    pub fn selected(&self) -> Option<&AircraftKey> {
        self.selected.as_ref()
    }

    pub fn whitelist(&self) -> &BTreeSet<String> {
        &self.whitelist
    }

    fn admitted(&self, fix: &AircraftFix) -> bool {
        self.whitelist.is_empty()
            || self.whitelist.contains(fix.flarm_id.as_str())
            || self.whitelist.contains(fix.key.as_str())
    }

    /// Applies one poll. Aircraft absent from the poll are dropped, as are
    /// offline ones unless offline aircraft are shown.
    pub fn apply(&mut self, fixes: Vec<AircraftFix>, options: &LiveOptions) -> FleetUpdate {
        let mut update = FleetUpdate::default();
        let mut seen = BTreeSet::new();
        let path_length = options.path_length.points();

        for fix in fixes {
            if !self.admitted(&fix) {
                continue;
            }
            let key = fix.key.clone();
            let online = fix.is_online();
            if !online && !options.show_offline {
                continue;
            }
            seen.insert(key.clone());

            match self.aircraft.get_mut(&key) {
                Some(state) => {
                    if online {
                        state.record(fix, path_length);
                    } else {
                        state.fix = fix;
                        state.offline = true;
                    }
                    update.updated += 1;
                }
                None => {
                    let colour = self.next_colour;
                    self.next_colour = (self.next_colour + 1) % PATH_COLOURS.len();
                    let mut state = AircraftState::new(fix.clone(), colour, !options.hide_new);
                    if online {
                        state.record(fix, path_length);
                    } else {
                        state.offline = true;
                    }
                    self.aircraft.insert(key, state);
                    update.added += 1;
                }
            }
        }

        let before = self.aircraft.len();
        self.aircraft.retain(|key, _| seen.contains(key));
        update.removed = before - self.aircraft.len();
        if self
            .selected
            .as_ref()
            .is_some_and(|key| !self.aircraft.contains_key(key))
        {
            self.selected = None;
        }

        self.redraw(options);
        update
    }

    /// Adds task whitelist entries. A non-empty whitelist restarts tracking
    /// from scratch.
    pub fn extend_whitelist(&mut self, ids: impl IntoIterator<Item = String>) -> bool {
        self.whitelist
            .extend(ids.into_iter().filter(|id| !id.trim().is_empty()));
        if self.whitelist.is_empty() {
            return false;
        }
        self.reset();
        true
    }

    /// Forgets every aircraft, e.g. when the request filter changed.
    pub fn reset(&mut self) {
        self.aircraft.clear();
        self.selected = None;
        self.markers.clear();
        self.paths.clear();
        self.sticks.clear();
    }

    /// Marks the aircraft selected and reports whether device information
    /// should be fetched for it.
    pub fn select(&mut self, key: &AircraftKey) -> Option<bool> {
        let state = self.aircraft.get_mut(key)?;
        self.selected = Some(key.clone());
        let fetch = state.info == InfoState::NotRequested && !state.fix.flarm_id.is_hidden();
        if fetch {
            state.info = InfoState::Pending;
        }
        Some(fetch)
    }

    /// Stores a device information answer; answers for aircraft that are no
    /// longer tracked are dropped.
    pub fn info_loaded(&mut self, key: &AircraftKey, info: InfoState) -> bool {
        match self.aircraft.get_mut(key) {
            Some(state) => {
                state.info = info;
                true
            }
            None => false,
        }
    }

    /// Replaces the path with a loaded flight history.
    pub fn track_loaded(
        &mut self,
        key: &AircraftKey,
        points: Vec<Coordinate>,
        options: &LiveOptions,
    ) -> bool {
        let Some(state) = self.aircraft.get_mut(key) else {
            return false;
        };
        state.full_track = true;
        state.path = points;
        self.redraw(options);
        true
    }

    pub fn set_visibility(
        &mut self,
        key: &AircraftKey,
        marker: Option<bool>,
        path: Option<bool>,
        options: &LiveOptions,
    ) -> bool {
        let Some(state) = self.aircraft.get_mut(key) else {
            return false;
        };
        if let Some(marker) = marker {
            state.marker_visible = marker;
        }
        if let Some(path) = path {
            state.path_visible = path;
        }
        self.redraw(options);
        true
    }

    /// Moves the aircraft to the next path colour.
    pub fn cycle_colour(&mut self, key: &AircraftKey, options: &LiveOptions) -> Option<String> {
        let state = self.aircraft.get_mut(key)?;
        state.colour_index = (state.colour_index + 1) % PATH_COLOURS.len();
        let colour = format!("#{}", state.colour_hex());
        self.redraw(options);
        Some(colour)
    }

    /// Shortens every path and barogram to `path_length` points. Full
    /// tracks keep their path.
    pub fn trim_paths(&mut self, path_length: usize) {
        for state in self.aircraft.values_mut() {
            if !state.full_track {
                keep_last(&mut state.path, path_length);
            }
            keep_last(&mut state.barogram, path_length);
        }
    }

    /// Rebuilds the marker, path and stick features from the aircraft state.
    pub fn redraw(&mut self, options: &LiveOptions) {
        self.markers.clear();
        self.paths.clear();
        self.sticks.clear();
        self.sticks.set_visible(options.sticks);

        for (key, state) in &self.aircraft {
            let opacity = if state.marker_visible { 1.0 } else { 0.0 };
            let anchor = if options.sticks {
                state.stick_top()
            } else {
                state.position()
            };
            self.markers.insert(
                key.clone(),
                Feature::new(Geometry::Point(anchor), Style::icon(state.icon(), opacity))
                    .with_title(state.title(options.units)),
            );

            let colour = state.colour();
            let alpha = if state.path_visible { 255 } else { 0 };
            self.paths.insert(
                key.clone(),
                Feature::new(
                    Geometry::LineString(state.path.clone()),
                    Style::stroke(Rgba::new(colour.r, colour.g, colour.b, alpha), LINE_WIDTH),
                )
                .with_title(state.fix.label()),
            );

            if options.sticks {
                let alpha = if state.marker_visible { 255 } else { 0 };
                self.sticks.insert(
                    key.clone(),
                    Feature::new(
                        Geometry::LineString(vec![state.position(), state.stick_top()]),
                        Style::stroke(Rgba::new(0, 0, 0, alpha), LINE_WIDTH),
                    ),
                );
            }
        }
    }

    pub fn hit(&self, view: &MapView, pixel: (f64, f64)) -> Option<AircraftKey> {
        self.markers.hit_icon(view, pixel, MARKER_SIZE).cloned()
    }

    pub fn markers(&self) -> &VectorLayer<AircraftKey> {
        &self.markers
    }

    pub fn paths(&self) -> &VectorLayer<AircraftKey> {
        &self.paths
    }

    pub fn sticks(&self) -> &VectorLayer<AircraftKey> {
        &self.sticks
    }

    /// List panel rows, sorted by competition id.
    pub fn rows(&self, units: Units) -> Vec<AircraftRow> {
        let mut rows: Vec<AircraftRow> = self
            .aircraft
            .iter()
            .map(|(key, state)| AircraftRow {
                key: key.clone(),
                competition_id: state.fix.competition_id.clone(),
                registration: state.fix.registration.clone(),
                altitude: format!(
                    "{:.0}{}",
                    units.altitude(state.fix.altitude_m),
                    units.altitude_unit()
                ),
                trend: if state.offline {
                    "n"
                } else {
                    state.fix.climb_trend().symbol()
                },
                colour: format!("#{}", state.colour_hex()),
                offline: state.offline,
                marker_visible: state.marker_visible,
                path_visible: state.path_visible,
                selected: self.selected.as_ref() == Some(key),
            })
            .collect();
        rows.sort_by(|a, b| {
            a.competition_id
                .cmp(&b.competition_id)
                .then_with(|| a.key.cmp(&b.key))
        });
        rows
    }

    /// Barogram series of every aircraft whose marker is shown.
    pub fn barograms(&self) -> BTreeMap<AircraftKey, Vec<BarogramPoint>> {
        self.aircraft
            .iter()
            .filter(|(_, state)| state.marker_visible)
            .map(|(key, state)| (key.clone(), state.barogram.clone()))
            .collect()
    }

    /// The info panel for the selected aircraft. `receiver_position` resolves
    /// the receiving station for the distance readout.
    pub fn details(
        &self,
        units: Units,
        receiver_position: impl Fn(&str) -> Option<Coordinate>,
    ) -> Option<AircraftDetails> {
        let key = self.selected.as_ref()?;
        let state = self.aircraft.get(key)?;
        let fix = &state.fix;
        let climb = units.vertical_speed(fix.vz_ms);
        Some(AircraftDetails {
            key: key.clone(),
            competition_id: fix.competition_id.clone(),
            registration: fix.registration.clone(),
            aircraft_type: fix.aircraft_type.label(),
            flarm_id: fix.flarm_id.to_string(),
            time: fix.time.clone(),
            latitude: fix.latitude,
            longitude: fix.longitude,
            altitude: format!(
                "{:.0} {}",
                units.altitude(fix.altitude_m),
                units.altitude_unit()
            ),
            speed: format!("{:.0} {}", units.speed(fix.speed_kmh), units.speed_unit()),
            track: format!("{:.0}", fix.track_deg),
            climb: format!(
                "{}{:.1} {}",
                if climb >= 0.0 { "+" } else { "-" },
                climb.abs(),
                units.vertical_speed_unit()
            ),
            receiver: fix.receiver.clone(),
            receiver_distance_km: receiver_position(&fix.receiver)
                .map(|station| ogn_geo::sphere::haversine_m(state.position(), station) / 1000.0),
            info: state.info.clone(),
            full_track: state.full_track,
        })
    }
}
