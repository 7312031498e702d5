//! The range viewer actor. It owns the selection, the map adapter (view,
//! vector layers, canvas compositors) and every pending timer or request, so
//! all state changes happen on its single thread of control.

use actix::{
    Actor, ActorFutureExt, AsyncContext, Context, Handler, Message, MessageResult, SpawnHandle,
};
use ogn_core::{DatePreset, OgnResult, StationName};
use ogn_geo::{mgrs, Coordinate};
use ogn_map::{FragmentGuard, FrameGeometry, LayerSnapshot, MapView, Rgba, VectorLayer};
use serde::Serialize;
use std::sync::Arc;

use crate::ambiguity::AmbiguityGrid;
use crate::api::{DetailsResponse, RangeApi, StationList, TileResponse};
use crate::coverage::{CoverageCompositor, CoverageQuery, TileKey};
use crate::details::{self, Details};
use crate::hash;
use crate::palette::Gradient;
use crate::selection::{ColourScheme, Overlay, Overlays, Selection, Source};
use crate::settings::RangeSettings;
use crate::stations::{self, RingKey, StationRegistry, PIN_SIZE};

/// Replaces the selection from a URL fragment. Returns false when the
/// fragment is the one this viewer last wrote.
#[derive(Debug, Message)]
#[rtype(result = "bool")]
pub struct ApplyFragment(pub String);

/// The map finished moving (or was resized).
#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct MoveView {
    pub center: Coordinate,
    pub zoom: u8,
    pub size: Option<(u32, u32)>,
}

/// A single click at a viewport pixel.
#[derive(Debug, Message)]
#[rtype(result = "ClickOutcome")]
pub struct Click {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "station", rename_all = "snake_case")]
pub enum ClickOutcome {
    Station(StationName),
    Details,
}

/// Menu and search changes. Every field is optional; whatever is present is
/// applied before the coverage layer is redrawn.
#[derive(Debug, Default, Message)]
#[rtype(result = "()")]
pub struct Adjust {
    pub source: Option<Source>,
    pub when: Option<DatePreset>,
    pub station: Option<String>,
    pub colour: Option<ColourScheme>,
    pub min_colour: Option<Rgba>,
    pub max_colour: Option<Rgba>,
}

#[derive(Debug, Message)]
#[rtype(result = "bool")]
pub struct ToggleOverlay(pub Overlay);

#[derive(Debug, Message)]
#[rtype(result = "()")]
pub struct RefreshStations;

#[derive(Debug, Message)]
#[rtype(result = "Vec<StationName>")]
pub struct SearchStations {
    pub query: String,
    pub limit: usize,
}

#[derive(Debug, Message)]
#[rtype(result = "RangeSnapshot")]
pub struct GetState;

#[derive(Debug, Message)]
#[rtype(result = "RangeScene")]
pub struct GetScene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanvasLayer {
    Coverage,
    Ambiguity,
}

#[derive(Debug, Message)]
#[rtype(result = "OgnResult<Vec<u8>>")]
pub struct RenderCanvas(pub CanvasLayer);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoomHint {
    ZoomIn,
    ZoomOut,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeSnapshot {
    pub fragment: String,
    pub title: String,
    pub description: String,
    pub selection: Selection,
    pub view: MapView,
    pub frame: Option<FrameGeometry>,
    pub zoom_hint: Option<ZoomHint>,
    pub details: Details,
    pub search_input: String,
    pub stations: usize,
    pub pending_tiles: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RangeScene {
    pub view: MapView,
    pub overlays: Overlays,
    pub layers: Vec<LayerSnapshot>,
}

pub struct RangeViewer {
    api: Arc<dyn RangeApi>,
    settings: RangeSettings,
    selection: Selection,
    view: MapView,
    guard: FragmentGuard,
    fragment: String,
    registry: StationRegistry,
    markers: VectorLayer<StationName>,
    circles: VectorLayer<RingKey>,
    labels: VectorLayer<StationName>,
    coverage: CoverageCompositor,
    ambiguity: AmbiguityGrid,
    details: Details,
    /// Last answered listing, shown again when a click repeats its square.
    settled_details: Details,
    search_input: String,
    click_position: Option<Coordinate>,
    last_details_position: Option<Coordinate>,
    details_timer: Option<SpawnHandle>,
    station_timer: Option<SpawnHandle>,
}

impl RangeViewer {
    pub fn new(api: Arc<dyn RangeApi>, settings: RangeSettings, fragment: &str) -> Self {
        let view = MapView::new(
            settings.default_center,
            settings.default_zoom,
            settings.viewport_width,
            settings.viewport_height,
        );
        let mut viewer = Self {
            api,
            coverage: CoverageCompositor::new(&settings),
            ambiguity: AmbiguityGrid::new(settings.ambiguity_min_zoom),
            settings,
            selection: Selection::default(),
            view,
            guard: FragmentGuard::new(),
            fragment: String::new(),
            registry: StationRegistry::default(),
            markers: VectorLayer::new("stations", 30, true),
            circles: VectorLayer::new("circles", 10, true),
            labels: VectorLayer::new("labels", 40, true),
            details: Details::default(),
            settled_details: Details::default(),
            search_input: String::new(),
            click_position: None,
            last_details_position: None,
            details_timer: None,
            station_timer: None,
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

        let mut selection = hash::decode(fragment);
        match selection.center {
            Some(center) => self.view.set_center(center),
            None => selection.center = self.selection.center,
        }
        match selection.zoom {
            Some(zoom) => self.view.set_zoom(zoom),
            None => selection.zoom = self.selection.zoom,
        }
        self.coverage
            .set_gradient(Gradient::from_scheme(&selection.colour).unwrap_or_default());
        self.search_input = selection.station.to_string();
        self.selection = selection;
        self.sync_overlays();
        self.fragment = FragmentGuard::normalize(fragment).to_string();

        self.guard.end_apply();
        tracing::debug!(fragment = %self.fragment, "applied fragment");
        true
    }

    fn write_fragment(&mut self) {
        if let Some(fragment) = self.guard.write(hash::encode(&self.selection)) {
            self.fragment = fragment;
        }
    }

    fn sync_overlays(&mut self) {
        self.circles.set_visible(self.selection.overlays.circles);
    }

    fn coverage_query(&self) -> CoverageQuery {
        CoverageQuery {
            source: self.selection.source.clone(),
            station: self.selection.station_filter().to_string(),
            range: self.selection.when.current_range(),
        }
    }

    /// Re-frames both canvases for the current view and requests the
    /// coverage tiles that are not already in flight.
    fn redraw_overlays(&mut self, ctx: &mut Context<Self>) {
        let query = self.coverage_query();
        let requests = self.coverage.redraw(&self.view, &query);
        if let Some(frame) = self.coverage.frame().copied() {
            self.ambiguity
                .redraw(&frame, self.view.zoom, self.selection.overlays.ambiguity);
        }
        for key in requests {
            self.fetch_tile(ctx, key);
        }
    }

    fn fetch_tile(&mut self, ctx: &mut Context<Self>, key: TileKey) {
        let api = self.api.clone();
        let request = key.clone();
        let fut = async move { api.tile(request).await };
        ctx.spawn(actix::fut::wrap_future(fut).map(
            move |result: Result<TileResponse, _>, actor: &mut Self, _ctx| match result {
                Ok(response) => {
                    let painted = actor.coverage.deliver(&key, &response);
                    tracing::debug!(tile = %key.tile, ?painted, "coverage tile painted");
                }
                Err(err) => {
                    tracing::warn!(tile = %key.tile, error = %err, "coverage tile request failed");
                    ogn_observability::record_poll_failure("tile");
                    actor.coverage.fail(&key);
                }
            },
        ));
    }

    fn display_stations(&mut self, ctx: &mut Context<Self>, first: bool) {
        if let Some(handle) = self.station_timer.take() {
            ctx.cancel_future(handle);
        }

        let api = self.api.clone();
        let range = self.selection.when.current_range();
        let fut = async move { api.stations(range).await };
        ctx.spawn(actix::fut::wrap_future(fut).map(
            move |result: Result<StationList, _>, actor: &mut Self, _ctx| match result {
                Ok(list) => actor.stations_loaded(list, first),
                Err(err) => {
                    tracing::warn!(error = %err, "station list request failed");
                    ogn_observability::record_poll_failure("stations");
                }
            },
        ));

        self.station_timer = Some(ctx.run_later(
            self.settings.station_refresh,
            |actor, ctx| actor.display_stations(ctx, false),
        ));
    }

    fn stations_loaded(&mut self, list: StationList, first: bool) {
        self.registry.replace(list.stations);
        stations::populate(&self.registry, &mut self.markers, &mut self.circles);
        self.labels.clear();
        tracing::info!(stations = self.registry.len(), "station list refreshed");

        if !first || self.selection.station.is_empty() {
            return;
        }
        if let Some(station) = self.registry.match_name(self.selection.station.as_str()) {
            let name = station.name.clone();
            let position = stations::position(station);
            self.selection.station = name.clone();
            self.search_input = name.to_string();
            self.selection.set_center(position);
            self.view.set_center(position);
            self.write_fragment();
        }
    }

    fn adjust(&mut self, ctx: &mut Context<Self>, adjust: Adjust) {
        let mut station = adjust.station;

        if let Some(source) = adjust.source {
            if source.ignores_station() {
                station = Some(String::new());
            }
            self.selection.source = source;
            self.write_fragment();
        }

        if let Some(when) = adjust.when {
            self.selection.when = when;
            self.write_fragment();
        }

        if let Some(wanted) = station {
            self.select_station(&wanted);
        }

        let mut colour = adjust.colour;
        if let Some(min) = adjust.min_colour {
            colour = Some(colour.unwrap_or_else(|| self.selection.colour.clone()).with_min(min));
        }
        if let Some(max) = adjust.max_colour {
            colour = Some(colour.unwrap_or_else(|| self.selection.colour.clone()).with_max(max));
        }
        if let Some(colour) = colour.filter(|colour| *colour != self.selection.colour) {
            match Gradient::from_scheme(&colour) {
                Some(gradient) => {
                    self.coverage.set_gradient(gradient);
                    self.selection.colour = colour;
                    self.write_fragment();
                }
                None => tracing::warn!(colour = %colour.as_str(), "ignoring invalid colour scheme"),
            }
        }

        self.redraw_overlays(ctx);
    }

    fn select_station(&mut self, wanted: &str) {
        if wanted.is_empty() || wanted.contains('%') {
            self.selection.station = StationName::new(wanted);
            self.search_input = wanted.to_string();
            self.write_fragment();
            return;
        }

        let Some(station) = self.registry.match_name(wanted) else {
            tracing::debug!(station = %wanted, "unknown station");
            self.search_input.clear();
            return;
        };
        let name = station.name.clone();
        let position = stations::position(station);
        if self.view.zoom < self.settings.min_zoom {
            self.view.set_zoom(self.settings.min_zoom);
            self.selection.zoom = Some(self.view.zoom);
        }
        self.selection.set_center(position);
        self.view.set_center(position);
        self.search_input = name.to_string();
        self.selection.station = name;
        self.write_fragment();
    }

    fn click(&mut self, ctx: &mut Context<Self>, x: f64, y: f64) -> ClickOutcome {
        if let Some(name) = self.markers.hit_icon(&self.view, (x, y), PIN_SIZE).cloned() {
            self.labels.clear();
            self.details = Details::Hidden;
            self.adjust(
                ctx,
                Adjust {
                    station: Some(name.to_string()),
                    ..Adjust::default()
                },
            );
            return ClickOutcome::Station(name);
        }

        self.details = Details::Loading;
        if let Some(handle) = self.details_timer.take() {
            ctx.cancel_future(handle);
        }
        self.click_position = Some(self.view.coordinate_at(x, y));
        self.details_timer = Some(ctx.run_later(self.settings.details_debounce, |actor, ctx| {
            actor.display_details(ctx)
        }));
        ClickOutcome::Details
    }

    fn display_details(&mut self, ctx: &mut Context<Self>) {
        self.details_timer = None;
        let Some(position) = self.click_position else {
            return;
        };
        if self.last_details_position == Some(position) {
            self.details = self.settled_details.clone();
            return;
        }
        let reference = match mgrs::forward(position, 2) {
            Ok(reference) => reference,
            Err(err) => {
                tracing::debug!(error = %err, "click outside MGRS coverage");
                self.details = self.settled_details.clone();
                return;
            }
        };
        self.last_details_position = Some(position);

        let api = self.api.clone();
        let range = self.selection.when.current_range();
        let fut = async move { api.details(range, reference).await };
        ctx.spawn(actix::fut::wrap_future(fut).map(
            |result: Result<DetailsResponse, _>, actor: &mut Self, _ctx| match result {
                Ok(response) => actor.details_loaded(&response),
                Err(err) => {
                    tracing::warn!(error = %err, "details request failed");
                    ogn_observability::record_poll_failure("details");
                    if actor.details.is_loading() {
                        actor.details = actor.settled_details.clone();
                    }
                }
            },
        ));
    }

    fn details_loaded(&mut self, response: &DetailsResponse) {
        let lines = details::build_lines(response, &self.registry, &self.selection.station);
        details::label(&lines, &self.registry, &mut self.labels);
        self.details = Details::Nearby {
            reference: response.query.reference.clone(),
            lines,
        };
        self.settled_details = self.details.clone();
    }

    fn move_view(&mut self, ctx: &mut Context<Self>, msg: MoveView) {
        if let Some((width, height)) = msg.size {
            self.view.set_size(width, height);
        }
        let mut changed = false;
        if self.selection.zoom != Some(msg.zoom) {
            self.view.set_zoom(msg.zoom);
            self.selection.zoom = Some(self.view.zoom);
            changed = true;
        }
        if msg.center.rounded(6) != self.view.center.rounded(6) {
            self.selection.set_center(msg.center);
            changed = true;
        }
        self.view.set_center(msg.center);
        if changed {
            self.write_fragment();
        }
        self.redraw_overlays(ctx);
    }

    fn toggle_overlay(&mut self, ctx: &mut Context<Self>, overlay: Overlay) -> bool {
        let enabled = !self.selection.overlays.get(overlay);
        self.selection.overlays.set(overlay, enabled);
        self.sync_overlays();
        self.write_fragment();
        if overlay == Overlay::Ambiguity {
            self.redraw_overlays(ctx);
        }
        enabled
    }

    fn zoom_hint(&self) -> Option<ZoomHint> {
        if self.view.zoom > self.settings.max_zoom {
            Some(ZoomHint::ZoomOut)
        } else if self.view.zoom < self.settings.min_zoom {
            Some(ZoomHint::ZoomIn)
        } else {
            None
        }
    }

    fn snapshot(&self) -> RangeSnapshot {
        RangeSnapshot {
            fragment: self.fragment.clone(),
            title: self.selection.title(),
            description: self.selection.description(),
            selection: self.selection.clone(),
            view: self.view,
            frame: self.coverage.frame().copied(),
            zoom_hint: self.zoom_hint(),
            details: self.details.clone(),
            search_input: self.search_input.clone(),
            stations: self.registry.len(),
            pending_tiles: self.coverage.pending_tiles(),
        }
    }

    fn scene(&self) -> RangeScene {
        RangeScene {
            view: self.view,
            overlays: self.selection.overlays,
            layers: vec![
                self.circles.snapshot(),
                self.markers.snapshot(),
                self.labels.snapshot(),
            ],
        }
    }
}

impl Actor for RangeViewer {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(fragment = %self.fragment, "range viewer started");
        self.display_stations(ctx, true);
        self.redraw_overlays(ctx);
    }
}

impl Handler<ApplyFragment> for RangeViewer {
    type Result = MessageResult<ApplyFragment>;

    fn handle(&mut self, msg: ApplyFragment, ctx: &mut Self::Context) -> Self::Result {
        let applied = self.apply_fragment(&msg.0);
        if applied {
            self.redraw_overlays(ctx);
        }
        MessageResult(applied)
    }
}

impl Handler<MoveView> for RangeViewer {
    type Result = ();

    fn handle(&mut self, msg: MoveView, ctx: &mut Self::Context) {
        self.move_view(ctx, msg);
    }
}

impl Handler<Click> for RangeViewer {
    type Result = MessageResult<Click>;

    fn handle(&mut self, msg: Click, ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.click(ctx, msg.x, msg.y))
    }
}

impl Handler<Adjust> for RangeViewer {
    type Result = ();

    fn handle(&mut self, msg: Adjust, ctx: &mut Self::Context) {
        self.adjust(ctx, msg);
    }
}

impl Handler<ToggleOverlay> for RangeViewer {
    type Result = MessageResult<ToggleOverlay>;

    fn handle(&mut self, msg: ToggleOverlay, ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.toggle_overlay(ctx, msg.0))
    }
}

impl Handler<RefreshStations> for RangeViewer {
    type Result = ();

    fn handle(&mut self, _msg: RefreshStations, ctx: &mut Self::Context) {
        self.display_stations(ctx, false);
    }
}

impl Handler<SearchStations> for RangeViewer {
    type Result = MessageResult<SearchStations>;

    fn handle(&mut self, msg: SearchStations, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.registry.search(&msg.query, msg.limit))
    }
}

impl Handler<GetState> for RangeViewer {
    type Result = MessageResult<GetState>;

    fn handle(&mut self, _msg: GetState, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.snapshot())
    }
}

impl Handler<GetScene> for RangeViewer {
    type Result = MessageResult<GetScene>;

    fn handle(&mut self, _msg: GetScene, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(self.scene())
    }
}

impl Handler<RenderCanvas> for RangeViewer {
    type Result = MessageResult<RenderCanvas>;

    fn handle(&mut self, msg: RenderCanvas, _ctx: &mut Self::Context) -> Self::Result {
        MessageResult(match msg.0 {
            CanvasLayer::Coverage => self.coverage.encode_png(),
            CanvasLayer::Ambiguity => self.ambiguity.encode_png(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, DetailsQuery, NearbyStation};
    use crate::stations::tests::station;
    use actix::Addr;
    use actix_web::rt::time::sleep;
    use async_trait::async_trait;
    use ogn_core::DateRange;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeApi {
        tile_calls: Mutex<Vec<String>>,
        details_calls: Mutex<Vec<String>>,
        station_calls: Mutex<usize>,
        tile_delay: Duration,
        fail_tiles: bool,
    }

    #[async_trait]
    impl RangeApi for FakeApi {
        async fn stations(&self, _range: DateRange) -> Result<StationList, ApiError> {
            *self.station_calls.lock().unwrap() += 1;
            Ok(StationList {
                stations: vec![station("LFLE", 45.56, 5.97), station("BERN", 46.9, 7.4)],
            })
        }

        async fn tile(&self, key: TileKey) -> Result<TileResponse, ApiError> {
            self.tile_calls.lock().unwrap().push(key.tile.clone());
            sleep(self.tile_delay).await;
            if self.fail_tiles {
                return Err(ApiError::new("backend down"));
            }
            Ok(TileResponse {
                t: key.tile,
                p: vec!["/250".to_string()],
            })
        }

        async fn details(
            &self,
            _range: DateRange,
            position: String,
        ) -> Result<DetailsResponse, ApiError> {
            self.details_calls.lock().unwrap().push(position.clone());
            Ok(DetailsResponse {
                query: DetailsQuery {
                    reference: position,
                },
                position: vec![NearbyStation {
                    s: StationName::new("LFLE"),
                    l: 900.0,
                    h: 2500.0,
                    a: 300.0,
                    c: 4,
                    g: 1,
                    first: "2024-05-01".to_string(),
                    last: "2024-05-01".to_string(),
                }],
            })
        }
    }

    fn settings() -> RangeSettings {
        RangeSettings {
            details_debounce: Duration::from_millis(30),
            viewport_width: 400,
            viewport_height: 300,
            ..RangeSettings::default()
        }
    }

    fn start(api: Arc<FakeApi>, fragment: &str) -> Addr<RangeViewer> {
        RangeViewer::new(api, settings(), fragment).start()
    }

    async fn settle() {
        sleep(Duration::from_millis(60)).await;
    }

    #[actix_web::test]
    async fn first_station_load_matches_and_centres() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), "lfle,max,lastweek,,9,,circles;");
        settle().await;

        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.selection.station.as_str(), "LFLE");
        assert_eq!(state.selection.center, Some(Coordinate::new(45.56, 5.97)));
        assert_eq!(state.view.center, Coordinate::new(45.56, 5.97));
        assert_eq!(state.stations, 2);
        assert!(state.fragment.starts_with("LFLE,max,lastweek,45.56000_5.97000,9,"));
        assert_eq!(*api.station_calls.lock().unwrap(), 1);

        let scene = viewer.send(GetScene).await.unwrap();
        assert_eq!(scene.layers[0].features.len(), 6);
        assert_eq!(scene.layers[1].features.len(), 2);
        assert!(scene.layers[0].visible);
    }

    #[actix_web::test]
    async fn own_fragment_is_not_reapplied() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, "");
        viewer
            .send(MoveView {
                center: Coordinate::new(46.0, 7.0),
                zoom: 9,
                size: None,
            })
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.fragment, ",max,lastweek,46.00000_7.00000,9,#80000040:#008000ff,circles;");

        let own = format!("#{}", state.fragment);
        assert!(!viewer.send(ApplyFragment(own)).await.unwrap());
        assert!(
            viewer
                .send(ApplyFragment("BERN,count,today,,,,".to_string()))
                .await
                .unwrap()
        );
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.selection.source.as_str(), "count");
        assert_eq!(state.selection.zoom, Some(9));
        assert!(!state.selection.overlays.circles);
        assert_eq!(state.title, "Onglide Range - Sample Count - BERN - Today");
    }

    #[actix_web::test]
    async fn coalesced_redraws_share_tile_requests() {
        let api = Arc::new(FakeApi {
            tile_delay: Duration::from_millis(40),
            ..FakeApi::default()
        });
        let viewer = start(api.clone(), ",max,lastweek,45.50000_6.50000,9,,,");
        assert!(viewer.send(ToggleOverlay(Overlay::Ambiguity)).await.unwrap());
        sleep(Duration::from_millis(10)).await;
        let requested = api.tile_calls.lock().unwrap().len();
        assert!(requested > 0);

        sleep(Duration::from_millis(120)).await;
        assert_eq!(api.tile_calls.lock().unwrap().len(), requested);
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.pending_tiles, 0);

        let png = viewer
            .send(RenderCanvas(CanvasLayer::Coverage))
            .await
            .unwrap()
            .unwrap();
        assert!(png.starts_with(&[0x89, b'P', b'N', b'G']));
    }

    #[actix_web::test]
    async fn failed_tiles_are_retried_on_the_next_redraw() {
        let api = Arc::new(FakeApi {
            fail_tiles: true,
            ..FakeApi::default()
        });
        let viewer = start(api.clone(), ",max,lastweek,45.50000_6.50000,9,,,");
        settle().await;
        let first = api.tile_calls.lock().unwrap().len();
        assert_eq!(viewer.send(GetState).await.unwrap().pending_tiles, 0);

        viewer.send(Adjust::default()).await.unwrap();
        settle().await;
        assert_eq!(api.tile_calls.lock().unwrap().len(), first * 2);
    }

    #[actix_web::test]
    async fn click_debounces_the_details_request() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api.clone(), ",max,lastweek,45.50000_6.50000,9,,,");
        settle().await;

        let outcome = viewer.send(Click { x: 10.0, y: 10.0 }).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Details);
        viewer.send(Click { x: 12.0, y: 12.0 }).await.unwrap();
        assert!(viewer.send(GetState).await.unwrap().details.is_loading());

        settle().await;
        assert_eq!(api.details_calls.lock().unwrap().len(), 1);
        let state = viewer.send(GetState).await.unwrap();
        let Details::Nearby { lines, .. } = state.details else {
            panic!("expected a listing, got {:?}", state.details);
        };
        assert_eq!(lines.len(), 1);
        assert!(lines[0].text.starts_with("1:LFLE: "));
        assert!(lines[0].text.ends_with("(2024-05-01)"));

        let scene = viewer.send(GetScene).await.unwrap();
        assert_eq!(scene.layers[2].features.len(), 1);

        viewer.send(Click { x: 12.0, y: 12.0 }).await.unwrap();
        settle().await;
        assert_eq!(api.details_calls.lock().unwrap().len(), 1);
        let state = viewer.send(GetState).await.unwrap();
        assert!(matches!(state.details, Details::Nearby { .. }));
    }

    #[actix_web::test]
    async fn clicking_a_pin_selects_the_station() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, ",max,lastweek,46.90000_7.40000,7,,,");
        settle().await;

        let state = viewer.send(GetState).await.unwrap();
        let (x, y) = state.view.pixel_of(Coordinate::new(46.9, 7.4));
        let outcome = viewer.send(Click { x, y: y - 10.0 }).await.unwrap();
        assert_eq!(outcome, ClickOutcome::Station(StationName::new("BERN")));

        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.selection.station.as_str(), "BERN");
        assert_eq!(state.view.zoom, 8);
        assert_eq!(state.details, Details::Hidden);
        assert_eq!(state.search_input, "BERN");
    }

    #[actix_web::test]
    async fn adjust_applies_source_station_and_colour() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, "LFLE,max,lastweek,45.56000_5.97000,9,,,");
        settle().await;

        viewer
            .send(Adjust {
                source: Some(Source::new("coverage")),
                ..Adjust::default()
            })
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert!(state.selection.station.is_empty());

        viewer
            .send(Adjust {
                station: Some("nowhere".to_string()),
                max_colour: Some(Rgba::RED),
                ..Adjust::default()
            })
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert!(state.search_input.is_empty());
        assert_eq!(state.selection.colour.as_str(), "#80000040:#ff0000ff");
        assert!(state.fragment.contains(",#80000040:#ff0000ff,"));

        viewer
            .send(Adjust {
                station: Some("LF%".to_string()),
                ..Adjust::default()
            })
            .await
            .unwrap();
        let state = viewer.send(GetState).await.unwrap();
        assert_eq!(state.selection.station.as_str(), "LF%");
    }

    #[actix_web::test]
    async fn search_lists_matching_stations() {
        let api = Arc::new(FakeApi::default());
        let viewer = start(api, "");
        settle().await;
        let found = viewer
            .send(SearchStations {
                query: "r".to_string(),
                limit: 10,
            })
            .await
            .unwrap();
        assert_eq!(found, vec![StationName::new("BERN")]);
    }
}
