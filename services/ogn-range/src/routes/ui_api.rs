use actix_web::{
    error::{ErrorBadRequest, ErrorInternalServerError},
    get, post, web, Error, HttpResponse,
};
use ogn_core::DatePreset;
use ogn_geo::Coordinate;
use ogn_map::{Rgba, MAX_VIEWPORT};
use serde::{Deserialize, Serialize};

use crate::selection::{ColourScheme, Overlay, Source};
use crate::state::AppState;
use crate::viewer::{
    Adjust, ApplyFragment, CanvasLayer, Click, GetScene, GetState, MoveView, RangeSnapshot,
    RefreshStations, RenderCanvas, SearchStations, ToggleOverlay,
};

const DEFAULT_SEARCH_LIMIT: usize = 10;

#[derive(Debug, Deserialize)]
pub struct HashRequest {
    pub fragment: String,
}

#[derive(Debug, Serialize)]
struct HashResponse {
    applied: bool,
    state: RangeSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct ViewRequest {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ClickRequest {
    pub x: f64,
    pub y: f64,
}

/// Menu selections. Empty strings count as absent except for `station`,
/// where an empty value selects every station.
#[derive(Debug, Default, Deserialize)]
pub struct AdjustRequest {
    pub what: Option<String>,
    pub when: Option<String>,
    pub station: Option<String>,
    pub colour: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ToggleResponse {
    overlay: &'static str,
    enabled: bool,
}

async fn current_state(state: &AppState) -> Result<RangeSnapshot, Error> {
    state
        .viewer
        .send(GetState)
        .await
        .map_err(ErrorInternalServerError)
}

#[get("/ui/state")]
pub async fn ui_state(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    Ok(HttpResponse::Ok().json(current_state(&state).await?))
}

#[post("/ui/hash")]
pub async fn apply_hash(
    state: web::Data<AppState>,
    body: web::Json<HashRequest>,
) -> Result<HttpResponse, Error> {
    let applied = state
        .viewer
        .send(ApplyFragment(body.into_inner().fragment))
        .await
        .map_err(ErrorInternalServerError)?;
    let snapshot = current_state(&state).await?;
    Ok(HttpResponse::Ok().json(HashResponse {
        applied,
        state: snapshot,
    }))
}

fn parse_view(request: ViewRequest) -> Result<MoveView, Error> {
    let center = Coordinate::new(request.lat, request.lon);
    if !center.is_valid() {
        return Err(ErrorBadRequest(
            "view centre must be a latitude within ±90 and a longitude within ±180",
        ));
    }
    let side = 1..=MAX_VIEWPORT;
    let size = match request.width.zip(request.height) {
        Some((width, height)) if !side.contains(&width) || !side.contains(&height) => {
            return Err(ErrorBadRequest(format!(
                "viewport must be 1 to {MAX_VIEWPORT} pixels per side"
            )));
        }
        size => size,
    };
    Ok(MoveView {
        center,
        zoom: request.zoom,
        size,
    })
}

#[post("/ui/view")]
pub async fn move_view(
    state: web::Data<AppState>,
    body: web::Json<ViewRequest>,
) -> Result<HttpResponse, Error> {
    let update = parse_view(body.into_inner())?;
    state
        .viewer
        .send(update)
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(current_state(&state).await?))
}

#[post("/ui/click")]
pub async fn click(
    state: web::Data<AppState>,
    body: web::Json<ClickRequest>,
) -> Result<HttpResponse, Error> {
    let outcome = state
        .viewer
        .send(Click {
            x: body.x,
            y: body.y,
        })
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[get("/ui/scene")]
pub async fn ui_scene(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let scene = state
        .viewer
        .send(GetScene)
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(scene))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn parse_adjust(request: AdjustRequest) -> Result<Adjust, Error> {
    let when = non_empty(request.when)
        .map(|token| DatePreset::parse(&token))
        .transpose()
        .map_err(ErrorBadRequest)?;
    let colour = non_empty(request.colour)
        .map(|value| ColourScheme::parse(&value))
        .transpose()
        .map_err(ErrorBadRequest)?;
    let min_colour = non_empty(request.min)
        .map(|value| Rgba::parse(&value))
        .transpose()
        .map_err(ErrorBadRequest)?;
    let max_colour = non_empty(request.max)
        .map(|value| Rgba::parse(&value))
        .transpose()
        .map_err(ErrorBadRequest)?;
    Ok(Adjust {
        source: non_empty(request.what).map(Source::new),
        when,
        station: request.station.map(|station| station.trim().to_string()),
        colour,
        min_colour,
        max_colour,
    })
}

#[post("/ui/adjust")]
pub async fn ui_adjust(
    state: web::Data<AppState>,
    body: web::Json<AdjustRequest>,
) -> Result<HttpResponse, Error> {
    let adjust = parse_adjust(body.into_inner())?;
    state
        .viewer
        .send(adjust)
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(current_state(&state).await?))
}

#[post("/ui/overlays/{name}/toggle")]
pub async fn toggle_overlay(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let name = path.into_inner();
    let overlay = Overlay::parse(&name)
        .ok_or_else(|| ErrorBadRequest(format!("unknown overlay {name}")))?;
    let enabled = state
        .viewer
        .send(ToggleOverlay(overlay))
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(ToggleResponse {
        overlay: overlay.name(),
        enabled,
    }))
}

#[post("/ui/stations/refresh")]
pub async fn refresh_stations(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    state
        .viewer
        .send(RefreshStations)
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Accepted().finish())
}

#[get("/ui/stations/search")]
pub async fn search_stations(
    state: web::Data<AppState>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, Error> {
    let query = query.into_inner();
    let names = state
        .viewer
        .send(SearchStations {
            query: query.q,
            limit: query.limit.unwrap_or(DEFAULT_SEARCH_LIMIT),
        })
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(names))
}

async fn canvas_png(state: &AppState, layer: CanvasLayer) -> Result<HttpResponse, Error> {
    let png = state
        .viewer
        .send(RenderCanvas(layer))
        .await
        .map_err(ErrorInternalServerError)?
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok()
        .content_type("image/png")
        .insert_header(("Cache-Control", "no-store"))
        .body(png))
}

#[get("/ui/coverage.png")]
pub async fn coverage_png(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    canvas_png(&state, CanvasLayer::Coverage).await
}

#[get("/ui/ambiguity.png")]
pub async fn ambiguity_png(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    canvas_png(&state, CanvasLayer::Ambiguity).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view_request(lat: f64, lon: f64, size: Option<(u32, u32)>) -> ViewRequest {
        ViewRequest {
            lat,
            lon,
            zoom: 9,
            width: size.map(|(width, _)| width),
            height: size.map(|(_, height)| height),
        }
    }

    #[test]
    fn view_request_is_bounded() {
        let update = parse_view(view_request(45.0, 6.0, Some((800, 600)))).unwrap();
        assert_eq!(update.size, Some((800, 600)));
        assert!(parse_view(view_request(-90.0, 180.0, None)).is_ok());

        assert!(parse_view(view_request(45.0, 1e17, None)).is_err());
        assert!(parse_view(view_request(95.0, 6.0, None)).is_err());
        assert!(parse_view(view_request(45.0, f64::INFINITY, None)).is_err());
        assert!(parse_view(view_request(45.0, 6.0, Some((u32::MAX, u32::MAX)))).is_err());
        assert!(parse_view(view_request(45.0, 6.0, Some((MAX_VIEWPORT + 1, 600)))).is_err());
        assert!(parse_view(view_request(45.0, 6.0, Some((800, 0)))).is_err());
    }

    #[test]
    fn adjust_request_treats_blank_menus_as_absent() {
        let adjust = parse_adjust(AdjustRequest {
            what: Some(String::new()),
            when: Some("yesterday".to_string()),
            station: Some(" ".to_string()),
            max: Some("#ff0000".to_string()),
            ..AdjustRequest::default()
        })
        .unwrap();
        assert!(adjust.source.is_none());
        assert_eq!(adjust.when, Some(DatePreset::Yesterday));
        assert_eq!(adjust.station.as_deref(), Some(""));
        assert_eq!(adjust.max_colour, Some(Rgba::RED));
        assert!(adjust.colour.is_none());
    }

    #[test]
    fn adjust_request_rejects_bad_values() {
        let request = AdjustRequest {
            when: Some("fortnight".to_string()),
            ..AdjustRequest::default()
        };
        assert!(parse_adjust(request).is_err());
        let request = AdjustRequest {
            colour: Some("red".to_string()),
            ..AdjustRequest::default()
        };
        assert!(parse_adjust(request).is_err());
    }
}
