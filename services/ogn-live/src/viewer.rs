//! The live viewer actor: tracked aircraft, receivers and tasks, the map view
//! and the position poll with its watchdog.

use actix::{
    Actor, ActorFutureExt, AsyncContext, Context, Handler, Message, MessageResult, SpawnHandle,
};
use ogn_core::{AircraftFix, AircraftKey, DeviceTypes, OgnResult, Receiver, ReceiverName, Units};
use ogn_geo::{BoundingBox, Coordinate};
use ogn_map::{FragmentGuard, LayerSnapshot, MapView, VectorLayer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::api::{AircraftQuery, ApiError, LiveApi};
use crate::feed::{DeviceInfo, TrackReply};
use crate::hash;
use crate::options::{
    self, LiveOptions, LiveOverlay, PathLength, BASE_MAPS, WEATHER_MAX_ZOOM,
};
use crate::poll::PollGate;
use crate::receivers::ReceiverRegistry;
use crate::settings::LiveSettings;
use crate::task::{self, Task};
use crate::tracker::{AircraftDetails, AircraftRow, BarogramPoint, Fleet, InfoState};

/// Replaces the options from a URL fragment. Returns false when the fragment
/// is the one this viewer last wrote.
#[derive(Debug, Message)]
#[rtype(result = "bool")]
pub struct ApplyFragment(pub String);

#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct MoveView {
    pub center: Coordinate,
    pub zoom: u8,
    pub size: Option<(u32, u32)>,
}

#[derive(Debug, Message)]
#[rtype(result = "LiveClick")]
pub struct Click {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LiveClick {
    Aircraft(AircraftKey),
    Receiver(ReceiverName),
    Nothing,
}

/// Settings panel changes. Only the fields that are present are applied.
#[derive(Debug, Default, Message)]
#[rtype(result = "()")]
pub struct UpdateOptions {
    pub base_map: Option<u8>,
    pub show_offline: Option<bool>,
    pub bounds: Option<BoundingBox>,
    pub auto_bounds: Option<bool>,
    pub overlays: Vec<(LiveOverlay, bool)>,
    pub warning_hidden: Option<bool>,
    pub path_length: Option<PathLength>,
    pub units: Option<Units>,
    pub list_hidden: Option<bool>,
    pub device_types: Option<DeviceTypes>,
    pub sticks: Option<bool>,
    pub barogram: Option<bool>,
    pub hide_new: Option<bool>,
}

#[derive(Debug, Message)]
#[rtype(result = "LiveSnapshot")]
pub struct GetState;

#[derive(Debug, Message)]
#[rtype(result = "LiveScene")]
pub struct GetScene;

#[derive(Debug, Message)]
#[rtype(result = "Vec<AircraftRow>")]
pub struct ListAircraft;

/// Selects an aircraft for the info panel. `None` when it is not tracked.
#[derive(Debug, Message)]
#[rtype(result = "Option<AircraftDetails>")]
pub struct SelectAircraft(pub AircraftKey);

/// Requests the flight history of a tracked aircraft.
#[derive(Debug, Message)]
#[rtype(result = "bool")]
pub struct LoadTrack(pub AircraftKey);

/// Per-aircraft list controls.
#[derive(Debug, Message)]
#[rtype(result = "Option<AircraftRow>")]
pub struct UpdateAircraft {
    pub key: AircraftKey,
    pub marker_visible: Option<bool>,
    pub path_visible: Option<bool>,
    pub cycle_colour: bool,
}

/// Imports task file content. Returns the number of tasks read.
#[derive(Debug, Message)]
#[rtype(result = "OgnResult<usize>")]
pub struct ImportTask(pub String);

/// Downloads a task file and imports it.
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct FetchTask(pub String);

#[derive(Debug, Clone, Serialize)]
pub struct TaskSummary {
    pub name: String,
    pub turnpoints: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveSnapshot {
    pub fragment: String,
    pub options: LiveOptions,
    pub view: MapView,
    pub aircraft: usize,
    pub receivers: usize,
    pub selected: Option<AircraftDetails>,
    pub tasks: Vec<TaskSummary>,
    pub whitelist: usize,
    pub polling: bool,
    pub notice: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveScene {
    pub view: MapView,
    pub layers: Vec<LayerSnapshot>,
    pub barograms: Option<BTreeMap<AircraftKey, Vec<BarogramPoint>>>,
}

pub struct LiveViewer {
    api: Arc<dyn LiveApi>,
    settings: LiveSettings,
    options: LiveOptions,
    view: MapView,
    guard: FragmentGuard,
    fragment: String,
    fleet: Fleet,
    receivers: ReceiverRegistry,
    tasks: Vec<Task>,
    task_layer: VectorLayer<String>,
    /// Polling waits while a task named by the fragment is downloading.
    task_pending: bool,
    notice: Option<String>,
    poll: PollGate,
    poll_timer: Option<SpawnHandle>,
    receivers_timer: Option<SpawnHandle>,
}

impl LiveViewer {
    pub fn new(api: Arc<dyn LiveApi>, settings: LiveSettings, fragment: &str) -> Self {
        let view = MapView::new(
            settings.default_center,
            settings.default_zoom,
            settings.viewport_width,
            settings.viewport_height,
        );
        let mut options = LiveOptions::new(settings.default_center);
        options.hide_new = settings.hide_new_aircraft;
        let mut viewer = Self {
            api,
            options,
            settings,
            view,
            guard: FragmentGuard::new(),
            fragment: String::new(),
            fleet: Fleet::new(),
            receivers: ReceiverRegistry::new(false),
            tasks: Vec::new(),
            task_layer: VectorLayer::new("task", 25, false),
            task_pending: false,
            notice: None,
            poll: PollGate::new(),
            poll_timer: None,
            receivers_timer: None,
        };
        viewer.apply_fragment(fragment);
        viewer
    }

    fn apply_fragment(&mut self, fragment: &str) -> bool {
        if self.guard.is_own(fragment) {
            tracing::debug!(fragment = %fragment, "ignoring own fragment");
            return false;
        }
        self.guard.begin_apply(fragment);

        let mut options = hash::decode(fragment, self.settings.default_center);
        options.hide_new = self.options.hide_new;
        self.view.set_center(options.center);
        if let Some(zoom) = options.zoom {
            self.view.set_zoom(zoom);
        }
        self.options = options;
        self.cap_view_zoom();
        self.sync_layers();
        self.fragment = FragmentGuard::normalize(fragment).to_string();

        self.guard.end_apply();
        tracing::debug!(fragment = %self.fragment, "applied fragment");
        true
    }

    fn write_fragment(&mut self) {
        if let Some(fragment) = self.guard.write(hash::encode(&self.options)) {
            self.fragment = fragment;
        }
    }

    /// Weather tiles stop at a fixed zoom, so the map may not go deeper
    /// while one is shown.
    fn cap_view_zoom(&mut self) {
        let weather = self.options.overlays.iter().any(LiveOverlay::is_weather);
        if weather && self.view.zoom > WEATHER_MAX_ZOOM {
            self.view.set_zoom(WEATHER_MAX_ZOOM);
            self.options.zoom = Some(WEATHER_MAX_ZOOM);
        }
    }

    fn sync_layers(&mut self) {
        self.receivers
            .set_visible(self.options.has_overlay(LiveOverlay::Receivers));
        self.fleet.trim_paths(self.options.path_length.points());
        self.fleet.redraw(&self.options);
    }

    /// The parts of the options the backend filters on.
    fn filter(&self) -> (bool, Option<BoundingBox>, bool, DeviceTypes) {
        (
            self.options.show_offline,
            self.options.bounds,
            self.options.auto_bounds,
            self.options.device_types,
        )
    }

    fn aircraft_query(&self) -> AircraftQuery {
        let bounds = match self.options.bounds {
            Some(bounds) => Some(bounds),
            None if self.options.auto_bounds => Some(options::normalize_bounds(self.view.bounds())),
            None => None,
        };
        AircraftQuery {
            include_offline: self.options.show_offline,
            bounds,
            utc_offset_hours: self.settings.utc_offset_hours,
            device_types: self.options.device_types,
        }
    }

    fn cancel_poll_timer(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.poll_timer.take() {
            ctx.cancel_future(handle);
        }
    }

    fn schedule_poll(&mut self, ctx: &mut Context<Self>) {
        self.cancel_poll_timer(ctx);
        self.poll_timer = Some(ctx.run_later(self.settings.poll_interval, |actor, ctx| {
            actor.poll_timer = None;
            actor.poll(ctx);
        }));
    }

    fn poll(&mut self, ctx: &mut Context<Self>) {
        if self.task_pending {
            return;
        }
        match self.poll.try_begin() {
            Some(generation) => self.fetch_aircraft(ctx, generation),
            None => tracing::debug!("position poll already in flight"),
        }
    }

    /// Starts a poll now, superseding any request made with the old filter.
    fn restart_poll(&mut self, ctx: &mut Context<Self>) {
        if self.task_pending {
            return;
        }
        self.cancel_poll_timer(ctx);
        let generation = self.poll.restart();
        self.fetch_aircraft(ctx, generation);
    }

    fn watchdog(&mut self, ctx: &mut Context<Self>) {
        if self.task_pending {
            return;
        }
        if let Some(generation) = self.poll.watchdog() {
            tracing::warn!(generation, "no position answer since the last check, polling again");
            self.cancel_poll_timer(ctx);
            self.fetch_aircraft(ctx, generation);
        }
    }

    fn fetch_aircraft(&mut self, ctx: &mut Context<Self>, generation: u64) {
        let api = self.api.clone();
        let query = self.aircraft_query();
        tracing::debug!(generation, ?query, "polling positions");
        let fut = async move { api.aircraft(query).await };
        ctx.spawn(actix::fut::wrap_future(fut).map(
            move |result: Result<Vec<AircraftFix>, ApiError>, actor: &mut Self, ctx| {
                actor.aircraft_loaded(ctx, generation, result)
            },
        ));
    }

    fn aircraft_loaded(
        &mut self,
        ctx: &mut Context<Self>,
        generation: u64,
        result: Result<Vec<AircraftFix>, ApiError>,
    ) {
        match result {
            Ok(fixes) => {
                if !self.poll.finish(generation) {
                    tracing::debug!(generation, "dropping superseded position answer");
                    return;
                }
                let update = self.fleet.apply(fixes, &self.options);
                tracing::debug!(
                    added = update.added,
                    updated = update.updated,
                    removed = update.removed,
                    tracked = self.fleet.len(),
                    "positions applied"
                );
                self.schedule_poll(ctx);
            }
            // The watchdog picks polling up again after a failure.
            Err(err) => {
                if self.poll.fail(generation) {
                    tracing::warn!(error = %err, "position poll failed");
                    ogn_observability::record_poll_failure("aircraft");
                }
            }
        }
    }

    fn refresh_receivers(&mut self, ctx: &mut Context<Self>) {
        if let Some(handle) = self.receivers_timer.take() {
            ctx.cancel_future(handle);
        }
        let api = self.api.clone();
        let fut = async move { api.receivers().await };
        ctx.spawn(actix::fut::wrap_future(fut).map(
            move |result: Result<Vec<Receiver>, ApiError>, actor: &mut Self, ctx| {
                let delay = match result {
                    Ok(receivers) => {
                        actor.receivers.replace(receivers);
                        tracing::info!(receivers = actor.receivers.len(), "receiver list refreshed");
                        actor.settings.receivers_refresh
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "receiver list request failed");
                        ogn_observability::record_poll_failure("receivers");
                        actor.settings.receivers_retry
                    }
                };
                actor.receivers_timer = Some(
                    ctx.run_later(delay, |actor, ctx| actor.refresh_receivers(ctx)),
                );
            },
        ));
    }

    fn move_view(&mut self, msg: MoveView) {
        self.view.set_center(msg.center);
        self.view.set_zoom(msg.zoom);
        if let Some((width, height)) = msg.size {
            self.view.set_size(width, height);
        }
        self.options.center = msg.center.rounded(5);
        self.options.zoom = Some(self.view.zoom);
        self.cap_view_zoom();
        self.write_fragment();
    }

    fn click(&mut self, ctx: &mut Context<Self>, x: f64, y: f64) -> LiveClick {
        if let Some(key) = self.fleet.hit(&self.view, (x, y)) {
            self.select_aircraft(ctx, key.clone());
            return LiveClick::Aircraft(key);
        }
        if let Some(name) = self.receivers.hit(&self.view, (x, y)) {
            return LiveClick::Receiver(name);
        }
        LiveClick::Nothing
    }

    fn select_aircraft(
        &mut self,
        ctx: &mut Context<Self>,
        key: AircraftKey,
    ) -> Option<AircraftDetails> {
        let fetch = self.fleet.select(&key)?;
        if fetch {
            if let Some(state) = self.fleet.get(&key) {
                let flarm_id = state.fix.flarm_id.clone();
                let api = self.api.clone();
                let request = key.clone();
                let fut = async move { api.device_info(request, flarm_id).await };
                ctx.spawn(actix::fut::wrap_future(fut).map(
                    move |result: Result<DeviceInfo, ApiError>, actor: &mut Self, _ctx| {
                        let info = match result {
                            Ok(info) => InfoState::Available(info),
                            Err(err) if err.not_found => InfoState::Unavailable,
                            // Asked again on the next selection.
                            Err(err) => {
                                tracing::warn!(aircraft = %key, error = %err, "device info request failed");
                                ogn_observability::record_poll_failure("device_info");
                                InfoState::NotRequested
                            }
                        };
                        if !actor.fleet.info_loaded(&key, info) {
                            tracing::debug!(aircraft = %key, "aircraft gone before its device info arrived");
                        }
                    },
                ));
            }
        }
        self.details()
    }

    fn load_track(&mut self, ctx: &mut Context<Self>, key: AircraftKey) -> bool {
        let Some(longitude) = self.fleet.get(&key).map(|state| state.fix.longitude) else {
            return false;
        };
        let api = self.api.clone();
        let request = key.clone();
        let fut = async move { api.track(request, longitude).await };
        ctx.spawn(actix::fut::wrap_future(fut).map(
            move |result: Result<TrackReply, ApiError>, actor: &mut Self, _ctx| match result {
                Ok(reply) => {
                    let points = reply.points.len();
                    if actor.fleet.track_loaded(&key, reply.points, &actor.options) {
                        tracing::debug!(aircraft = %key, points, "flight history loaded");
                    } else {
                        tracing::debug!(aircraft = %key, "aircraft gone before its history arrived");
                    }
                }
                Err(err) => {
                    tracing::warn!(aircraft = %key, error = %err, "flight history request failed");
                    ogn_observability::record_poll_failure("track");
                }
            },
        ));
        true
    }

    fn update_aircraft(&mut self, msg: UpdateAircraft) -> Option<AircraftRow> {
        if msg.marker_visible.is_some() || msg.path_visible.is_some() {
            self.fleet.set_visibility(
                &msg.key,
                msg.marker_visible,
                msg.path_visible,
                &self.options,
            );
        }
        if msg.cycle_colour {
            self.fleet.cycle_colour(&msg.key, &self.options);
        }
        self.fleet
            .rows(self.options.units)
            .into_iter()
            .find(|row| row.key == msg.key)
    }

    /// Parses and draws tasks, replacing earlier ones. Returns the task count
    /// and whether the whitelist now restricts the fleet.
    fn load_tasks(&mut self, content: &str) -> OgnResult<(usize, bool)> {
        let tasks = task::parse_tasks(content).inspect_err(|err| {
            tracing::warn!(error = %err, "task import failed");
            self.notice = Some(err.message.clone());
        })?;
        task::render(&tasks, &mut self.task_layer);
        self.task_layer.set_visible(true);
        let ids: Vec<String> = tasks
            .iter()
            .flat_map(|task| task.whitelist.iter().cloned())
            .collect();
        let restricted = self.fleet.extend_whitelist(ids);
        let count = tasks.len();
        self.tasks = tasks;
        self.notice = None;
        tracing::info!(
            tasks = count,
            whitelist = self.fleet.whitelist().len(),
            "task imported"
        );
        Ok((count, restricted))
    }

    fn fetch_task(&mut self, ctx: &mut Context<Self>, url: String) {
        self.task_pending = true;
        self.cancel_poll_timer(ctx);
        let api = self.api.clone();
        let fut = async move { api.task(url).await };
        ctx.spawn(actix::fut::wrap_future(fut).map(
            move |result: Result<String, ApiError>, actor: &mut Self, ctx| {
                actor.task_pending = false;
                match result {
                    Ok(content) => {
                        if let Err(err) = actor.load_tasks(&content) {
                            tracing::debug!(error = %err, "downloaded task left as notice");
                        }
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "task download failed");
                        ogn_observability::record_poll_failure("task");
                        actor.notice = Some(format!("task download failed: {err}"));
                    }
                }
                actor.restart_poll(ctx);
            },
        ));
    }

    fn update_options(&mut self, ctx: &mut Context<Self>, update: UpdateOptions) {
        let before = self.filter();

        if let Some(base_map) = update.base_map {
            if base_map < BASE_MAPS {
                self.options.base_map = Some(base_map);
            } else {
                tracing::debug!(base_map, "ignoring unknown base map");
            }
        }
        if let Some(show_offline) = update.show_offline {
            self.options.show_offline = show_offline;
        }
        if let Some(bounds) = update.bounds {
            self.options.set_bounds(Some(bounds));
        } else if let Some(auto_bounds) = update.auto_bounds {
            self.options.set_auto_bounds(auto_bounds);
        }
        for (overlay, enabled) in update.overlays {
            self.options.set_overlay(overlay, enabled);
        }
        if let Some(hidden) = update.warning_hidden {
            self.options.warning_hidden = hidden;
        }
        if let Some(path_length) = update.path_length {
            self.options.path_length = path_length;
        }
        if let Some(units) = update.units {
            self.options.units = units;
        }
        if let Some(hidden) = update.list_hidden {
            self.options.list_hidden = hidden;
        }
        if let Some(device_types) = update.device_types {
            self.options.device_types = device_types;
        }
        if let Some(sticks) = update.sticks {
            self.options.sticks = sticks;
        }
        if let Some(barogram) = update.barogram {
            self.options.barogram = barogram;
        }
        if let Some(hide_new) = update.hide_new {
            self.options.hide_new = hide_new;
        }

        self.cap_view_zoom();
        self.sync_layers();
        self.write_fragment();

        if self.filter() != before {
            tracing::info!("aircraft filter changed, restarting tracking");
            self.fleet.reset();
            self.restart_poll(ctx);
        }
    }

    fn details(&self) -> Option<AircraftDetails> {
        self.fleet
            .details(self.options.units, |name| self.receivers.position(name))
    }

    fn snapshot(&self) -> LiveSnapshot {
        LiveSnapshot {
            fragment: self.fragment.clone(),
            options: self.options.clone(),
            view: self.view,
            aircraft: self.fleet.len(),
            receivers: self.receivers.len(),
            selected: self.details(),
            tasks: self
                .tasks
                .iter()
                .enumerate()
                .map(|(index, task)| TaskSummary {
                    name: task
                        .name
                        .clone()
                        .unwrap_or_else(|| format!("task {}", index + 1)),
                    turnpoints: task.turnpoints.len(),
                })
                .collect(),
            whitelist: self.fleet.whitelist().len(),
            polling: self.poll.in_flight(),
            notice: self.notice.clone(),
        }
    }

    fn scene(&self) -> LiveScene {
        LiveScene {
            view: self.view,
            layers: vec![
                self.fleet.paths().snapshot(),
                self.task_layer.snapshot(),
                self.fleet.sticks().snapshot(),
                self.receivers.layer().snapshot(),
                self.fleet.markers().snapshot(),
            ],
            barograms: self.options.barogram.then(|| self.fleet.barograms()),
        }
    }
}

impl Actor for LiveViewer {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(fragment = %self.fragment, "live viewer started");
        match self.options.task_url.clone() {
            Some(url) => self.fetch_task(ctx, url),
            None => self.poll(ctx),
        }
        self.refresh_receivers(ctx);
        ctx.run_interval(self.settings.watchdog_interval, |actor, ctx| {
            actor.watchdog(ctx)
        });
    }
}

impl Handler<ApplyFragment> for LiveViewer {
    type Result = MessageResult<ApplyFragment>;

    fn handle(&mut self, msg: ApplyFragment, ctx: &mut Self::Context) -> Self::Result {
        let before = self.filter();
        let task_url = self.options.task_url.clone();
        let applied = self.apply_fragment(&msg.0);
        if applied {
            match self.options.task_url.clone() {
                Some(url) if Some(&url) != task_url.as_ref() => self.fetch_task(ctx, url),
                _ if self.filter() != before => {
                    self.fleet.reset();
                    self.restart_poll(ctx);
                }
                _ => {}
            }
        }
        MessageResult(applied)
    }
}

impl Handler<MoveView> for LiveViewer {
    type Result = ();

    fn handle(&mut self, msg: MoveView, _ctx: &mut Self::Context) {
        self.move_view(msg);
    }
}

impl Handler<Click> for LiveViewer {
    type Result = MessageResult<Click>;

    fn handle(&mut self, msg: Click, ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.click(ctx, msg.x, msg.y))
    }
}

impl Handler<UpdateOptions> for LiveViewer {
    type Result = ();

    fn handle(&mut self, msg: UpdateOptions, ctx: &mut Self::Context) {
        self.update_options(ctx, msg);
    }
}

impl Handler<GetState> for LiveViewer {
    type Result = MessageResult<GetState>;

    fn handle(&mut self, _msg: GetState, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.snapshot())
    }
}

impl Handler<GetScene> for LiveViewer {
    type Result = MessageResult<GetScene>;

    fn handle(&mut self, _msg: GetScene, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.scene())
    }
}

impl Handler<ListAircraft> for LiveViewer {
    type Result = MessageResult<ListAircraft>;

    fn handle(&mut self, _msg: ListAircraft, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.fleet.rows(self.options.units))
    }
}

impl Handler<SelectAircraft> for LiveViewer {
    type Result = MessageResult<SelectAircraft>;

    fn handle(&mut self, msg: SelectAircraft, ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.select_aircraft(ctx, msg.0))
    }
}

impl Handler<LoadTrack> for LiveViewer {
    type Result = MessageResult<LoadTrack>;

    fn handle(&mut self, msg: LoadTrack, ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.load_track(ctx, msg.0))
    }
}

impl Handler<UpdateAircraft> for LiveViewer {
    type Result = MessageResult<UpdateAircraft>;

    fn handle(&mut self, msg: UpdateAircraft, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.update_aircraft(msg))
    }
}

impl Handler<ImportTask> for LiveViewer {
    type Result = MessageResult<ImportTask>;

    fn handle(&mut self, msg: ImportTask, ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.load_tasks(&msg.0).map(|(count, restricted)| {
            if restricted {
                self.restart_poll(ctx);
            }
            count
        }))
    }
}

impl Handler<FetchTask> for LiveViewer {
    type Result = ();

    fn handle(&mut self, msg: FetchTask, ctx: &mut Self::Context) {
        self.fetch_task(ctx, msg.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::tests::fix;
    use actix::Addr;
    use actix_web::rt::time::sleep;
    use async_trait::async_trait;
    use ogn_core::FlarmId;
    use std::sync::Mutex;
    use std::time::Duration;

    const TASK: &str = r#"{"tasks":[{"name":"Day 1","legs":[[46.0,7.0],[46.2,7.2]],"wlist":["CDID"]}]}"#;

    #[derive(Default)]
    struct FakeApi {
        queries: Mutex<Vec<AircraftQuery>>,
        receiver_calls: Mutex<usize>,
        info_calls: Mutex<Vec<AircraftKey>>,
        task_calls: Mutex<Vec<String>>,
        /// The first position poll answers after this long with `stale` fixes.
        first_poll_delay: Duration,
        fail_first_receivers: bool,
    }

    impl FakeApi {
        fn polls(&self) -> usize {
            self.queries.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LiveApi for FakeApi {
        async fn aircraft(&self, query: AircraftQuery) -> Result<Vec<AircraftFix>, ApiError> {
            let call = {
                let mut queries = self.queries.lock().unwrap();
                queries.push(query);
                queries.len()
            };
            if call == 1 && !self.first_poll_delay.is_zero() {
                sleep(self.first_poll_delay).await;
                return Ok(vec![fix("OLD", 46.0, 5)]);
            }
            Ok(vec![fix("AB", 46.0, 5), fix("CD", 46.1, 5)])
        }

        async fn receivers(&self) -> Result<Vec<Receiver>, ApiError> {
            let call = {
                let mut calls = self.receiver_calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if call == 1 && self.fail_first_receivers {
                return Err(ApiError::new("no receivers"));
            }
            Ok(vec![Receiver {
                name: ReceiverName::new("LSGS"),
                latitude: 46.2,
                longitude: 7.3,
                offline: false,
            }])
        }

        async fn device_info(
            &self,
            key: AircraftKey,
            _flarm_id: FlarmId,
        ) -> Result<DeviceInfo, ApiError> {
            self.info_calls.lock().unwrap().push(key.clone());
            Ok(DeviceInfo {
                key: key.to_string(),
                model: "Discus 2".to_string(),
            })
        }

        async fn track(&self, key: AircraftKey, _longitude: f64) -> Result<TrackReply, ApiError> {
            Ok(TrackReply {
                id: key.to_string(),
                points: (0..40)
                    .map(|n| Coordinate::new(45.5 + f64::from(n) * 0.01, 7.0))
                    .collect(),
            })
        }

        async fn task(&self, url: String) -> Result<String, ApiError> {
            let content = if url.ends_with(".tsk") { "not a task" } else { TASK };
            self.task_calls.lock().unwrap().push(url);
            Ok(content.to_string())
        }
    }

    fn settings() -> LiveSettings {
        LiveSettings {
            default_center: Coordinate::new(46.0, 7.0),
            viewport_width: 400,
            viewport_height: 300,
            ..LiveSettings::default()
        }
    }

    fn start_with(api: Arc<FakeApi>, settings: LiveSettings, fragment: &str) -> Addr<LiveViewer> {
        LiveViewer::new(api, settings, fragment).start()
    }

    fn start(api: Arc<FakeApi>, fragment: &str) -> Addr<LiveViewer> {
        start_with(api, settings(), fragment)
    }

    async fn settle() {
        sleep(Duration::from_millis(60)).await;
    }

    #[actix_web::test]
    async fn first_poll_tracks_aircraft_in_view() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), "c=46.00000,7.00000&z=9&l=r&y=2");
        settle().await;

        let rows = viewer.send(ListAircraft).await.unwrap();
        let names: Vec<_> = rows.iter().map(|row| row.competition_id.as_str()).collect();
        assert_eq!(names, ["AB", "CD"]);

        let queries = api.queries.lock().unwrap().clone();
        assert_eq!(queries.len(), 1);
        let query = &queries[0];
        let bounds = query.bounds.unwrap();
        assert!(bounds.contains(Coordinate::new(46.0, 7.0)));
        assert_eq!(query.device_types, DeviceTypes::from_bits(DeviceTypes::FLARM));

        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.receivers, 1);
        assert_eq!(state.view.zoom, 9);
        let scene = viewer.send(GetScene).await.unwrap();
        let receivers = scene
            .layers
            .iter()
            .find(|layer| layer.name == "receivers")
            .unwrap();
        assert!(receivers.visible);
        assert!(scene.barograms.is_none());
    }

    #[actix_web::test]
    async fn watchdog_replaces_a_silent_poll() {
        let api = Arc::new(FakeApi {
            first_poll_delay: Duration::from_millis(250),
            ..FakeApi::default()
        });
        let settings = LiveSettings {
            watchdog_interval: Duration::from_millis(40),
            ..settings()
        };
        let viewer = start_with(api.clone(), settings, "");
        sleep(Duration::from_millis(100)).await;
        assert!(api.polls() >= 2);
        assert_eq!(viewer.send(ListAircraft).await.unwrap().len(), 2);

        // The stalled first answer arrives late and is ignored.
        sleep(Duration::from_millis(250)).await;
        let rows = viewer.send(ListAircraft).await.unwrap();
        assert!(rows.iter().all(|row| row.competition_id != "OLD"));
    }

    #[actix_web::test]
    async fn receiver_errors_retry_sooner() {
        let api = Arc::new(FakeApi {
            fail_first_receivers: true,
            ..FakeApi::default()
        });
        let settings = LiveSettings {
            receivers_retry: Duration::from_millis(30),
            ..settings()
        };
        let viewer = start_with(api.clone(), settings, "");
        settle().await;
        sleep(Duration::from_millis(40)).await;
        assert_eq!(*api.receiver_calls.lock().unwrap(), 2);
        assert_eq!(viewer.send(GetState).await.unwrap().receivers, 1);
    }

    #[actix_web::test]
    async fn selecting_fetches_device_info_once() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), "");
        settle().await;

        let key = AircraftKey::new("AB");
        let details = viewer.send(SelectAircraft(key.clone())).await.unwrap().unwrap();
        assert_eq!(details.info, InfoState::Pending);
        settle().await;
        let details = viewer.send(SelectAircraft(key.clone())).await.unwrap().unwrap();
        assert_eq!(
            details.info,
            InfoState::Available(DeviceInfo {
                key: "AB".to_string(),
                model: "Discus 2".to_string(),
            })
        );
        assert_eq!(api.info_calls.lock().unwrap().len(), 1);
        assert!(
            viewer
                .send(SelectAircraft(AircraftKey::new("ZZ")))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[actix_web::test]
    async fn clicking_a_marker_selects_the_aircraft() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, "c=46.00000,7.00000&z=9");
        settle().await;

        let state = viewer.send(GetState).await.unwrap();
        let (x, y) = state.view.pixel_of(Coordinate::new(46.0, 7.0));
        let outcome = viewer.send(Click { x, y: y - 5.0 }).await.unwrap();
        assert_eq!(outcome, LiveClick::Aircraft(AircraftKey::new("AB")));
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.selected.unwrap().competition_id, "AB");

        let outcome = viewer.send(Click { x: 2.0, y: 2.0 }).await.unwrap();
        assert_eq!(outcome, LiveClick::Nothing);
    }

    #[actix_web::test]
    async fn loaded_track_replaces_the_path() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, "");
        settle().await;

        assert!(viewer.send(LoadTrack(AircraftKey::new("CD"))).await.unwrap());
        assert!(!viewer.send(LoadTrack(AircraftKey::new("ZZ"))).await.unwrap());
        settle().await;

        viewer
            .send(SelectAircraft(AircraftKey::new("CD")))
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert!(state.selected.unwrap().full_track);
        let scene = viewer.send(GetScene).await.unwrap();
        let paths = scene.layers.iter().find(|layer| layer.name == "paths").unwrap();
        assert_eq!(paths.features.len(), 2);
    }

    #[actix_web::test]
    async fn imported_task_whitelists_competitors() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), "");
        settle().await;
        assert_eq!(viewer.send(ListAircraft).await.unwrap().len(), 2);

        assert_eq!(viewer.send(ImportTask(TASK.to_string())).await.unwrap().unwrap(), 1);
        settle().await;
        let rows = viewer.send(ListAircraft).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].competition_id, "CD");

        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.tasks[0].name, "Day 1");
        assert_eq!(state.whitelist, 1);
        let scene = viewer.send(GetScene).await.unwrap();
        let task = scene.layers.iter().find(|layer| layer.name == "task").unwrap();
        assert!(task.visible);

        assert!(viewer.send(ImportTask("garbage".to_string())).await.unwrap().is_err());
        assert!(viewer.send(GetState).await.unwrap().notice.is_some());
    }

    #[actix_web::test]
    async fn unreadable_fragment_task_still_starts_polling() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), "c=46.00000,7.00000&t=tasks/broken.tsk");
        settle().await;

        assert_eq!(api.polls(), 1);
        let state = viewer.send(GetState).await.unwrap();
        assert!(state.notice.is_some());
        assert!(state.tasks.is_empty());
        assert_eq!(viewer.send(ListAircraft).await.unwrap().len(), 2);
    }

    #[actix_web::test]
    async fn fragment_task_is_loaded_before_polling() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), "c=46.00000,7.00000&t=tasks/day1.json");
        settle().await;

        assert_eq!(*api.task_calls.lock().unwrap(), ["tasks/day1.json"]);
        assert_eq!(api.polls(), 1);
        let rows = viewer.send(ListAircraft).await.unwrap();
        assert_eq!(rows.len(), 1);
        // The task URL is never written back.
        viewer
            .send(MoveView {
                center: Coordinate::new(46.0, 7.0),
                zoom: 8,
                size: None,
            })
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.fragment, "c=46.00000,7.00000&z=8&s=1");
    }

    #[actix_web::test]
    async fn own_fragment_is_not_reapplied() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, "");
        viewer
            .send(MoveView {
                center: Coordinate::new(46.0, 7.0),
                zoom: 10,
                size: Some((800, 600)),
            })
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.fragment, "c=46.00000,7.00000&z=10&s=1");
        assert_eq!(state.view.width, 800);

        let own = format!("#{}", state.fragment);
        assert!(!viewer.send(ApplyFragment(own)).await.unwrap());
        assert!(
            viewer
                .send(ApplyFragment("c=45.00000,6.00000&z=9&u=i".to_string()))
                .await
                .unwrap()
        );
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.options.units, Units::Imperial);
        assert_eq!(state.view.center, Coordinate::new(45.0, 6.0));
    }

    #[actix_web::test]
    async fn settings_rewrite_the_fragment_and_refilter() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), "c=46.00000,7.00000&z=10");
        settle().await;
        assert_eq!(api.polls(), 1);

        viewer
            .send(UpdateOptions {
                overlays: vec![(LiveOverlay::Rain, true)],
                barogram: Some(true),
                ..UpdateOptions::default()
            })
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.view.zoom, WEATHER_MAX_ZOOM);
        assert_eq!(state.fragment, "c=46.00000,7.00000&z=7&s=1&l=n&g=1");
        // Display-only changes keep the current poll cycle.
        assert_eq!(api.polls(), 1);
        let scene = viewer.send(GetScene).await.unwrap();
        assert_eq!(scene.barograms.unwrap().len(), 2);

        let bounds = BoundingBox {
            north: 47.0,
            south: 45.0,
            east: 8.0,
            west: 6.0,
        };
        viewer
            .send(UpdateOptions {
                bounds: Some(bounds),
                ..UpdateOptions::default()
            })
            .await
            .unwrap();
        settle().await;
        assert_eq!(api.polls(), 2);
        let last = api.queries.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.bounds, Some(bounds));
        let state = viewer.send(GetState).await.unwrap();
        assert!(!state.options.auto_bounds);
        assert!(state.fragment.contains("&b=47.0000,45.0000,8.0000,6.0000"));
    }

    #[actix_web::test]
    async fn list_controls_hide_and_recolour() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, "");
        settle().await;

        let row = viewer
            .send(UpdateAircraft {
                key: AircraftKey::new("AB"),
                marker_visible: Some(false),
                path_visible: None,
                cycle_colour: true,
            })
            .await
            .unwrap()
            .unwrap();
        assert!(!row.marker_visible);
        assert!(row.path_visible);
        assert_eq!(row.colour, "#FF0000");
    }
}
