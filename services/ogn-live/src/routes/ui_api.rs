use actix_web::{
    error::{ErrorBadRequest, ErrorInternalServerError, ErrorNotFound},
    get, post, web, Error, HttpResponse,
};
use ogn_core::{AircraftKey, DeviceTypes, Units};
use ogn_geo::{BoundingBox, Coordinate};
use ogn_map::MAX_VIEWPORT;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::options::{LiveOverlay, PathLength};
use crate::state::AppState;
use crate::viewer::{
    ApplyFragment, Click, FetchTask, GetScene, GetState, ImportTask, ListAircraft, LiveSnapshot,
    LoadTrack, MoveView, SelectAircraft, UpdateAircraft, UpdateOptions,
};

#[derive(Debug, Deserialize)]
pub struct HashRequest {
    pub fragment: String,
}

#[derive(Debug, Serialize)]
struct HashResponse {
    applied: bool,
    state: LiveSnapshot,
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

/// Settings panel changes; absent fields are left alone. `bounds` is
/// `[north, south, east, west]`.
#[derive(Debug, Default, Deserialize)]
pub struct SettingsRequest {
    pub base_map: Option<u8>,
    pub show_offline: Option<bool>,
    pub bounds: Option<[f64; 4]>,
    pub auto_bounds: Option<bool>,
    #[serde(default)]
    pub overlays: BTreeMap<String, bool>,
    pub warning_hidden: Option<bool>,
    pub path_length: Option<PathLength>,
    pub units: Option<Units>,
    pub list_hidden: Option<bool>,
    pub device_types: Option<u8>,
    pub sticks: Option<bool>,
    pub barogram: Option<bool>,
    pub hide_new: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AircraftRequest {
    pub marker: Option<bool>,
    pub path: Option<bool>,
    #[serde(default)]
    pub cycle_colour: bool,
}

/// Either the task file itself or a URL to fetch it from.
#[derive(Debug, Default, Deserialize)]
pub struct TaskRequest {
    pub content: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Serialize)]
struct TaskResponse {
    tasks: usize,
}

async fn current_state(state: &AppState) -> Result<LiveSnapshot, Error> {
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

fn parse_settings(request: SettingsRequest) -> Result<UpdateOptions, Error> {
    let bounds = match request.bounds {
        Some(values) if values.iter().any(|value| !value.is_finite()) => {
            return Err(ErrorBadRequest("bounds must be finite"));
        }
        Some([north, south, east, west]) => Some(BoundingBox {
            north,
            south,
            east,
            west,
        }),
        None => None,
    };
    let overlays = request
        .overlays
        .into_iter()
        .map(|(name, enabled)| {
            LiveOverlay::parse(&name)
                .map(|overlay| (overlay, enabled))
                .ok_or_else(|| ErrorBadRequest(format!("unknown overlay {name}")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let device_types = match request.device_types {
        Some(bits) if bits == 0 || bits > DeviceTypes::all().bits() => {
            return Err(ErrorBadRequest(format!("invalid device type mask {bits}")));
        }
        bits => bits.map(DeviceTypes::from_bits),
    };
    Ok(UpdateOptions {
        base_map: request.base_map,
        show_offline: request.show_offline,
        bounds,
        auto_bounds: request.auto_bounds,
        overlays,
        warning_hidden: request.warning_hidden,
        path_length: request.path_length,
        units: request.units,
        list_hidden: request.list_hidden,
        device_types,
        sticks: request.sticks,
        barogram: request.barogram,
        hide_new: request.hide_new,
    })
}

#[post("/ui/settings")]
pub async fn settings(
    state: web::Data<AppState>,
    body: web::Json<SettingsRequest>,
) -> Result<HttpResponse, Error> {
    let update = parse_settings(body.into_inner())?;
    state
        .viewer
        .send(update)
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(current_state(&state).await?))
}

#[get("/ui/aircraft")]
pub async fn list_aircraft(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let rows = state
        .viewer
        .send(ListAircraft)
        .await
        .map_err(ErrorInternalServerError)?;
    Ok(HttpResponse::Ok().json(rows))
}

#[post("/ui/aircraft/{key}/select")]
pub async fn select_aircraft(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let key = AircraftKey::new(path.into_inner());
    let details = state
        .viewer
        .send(SelectAircraft(key.clone()))
        .await
        .map_err(ErrorInternalServerError)?
        .ok_or_else(|| ErrorNotFound(format!("aircraft {key} is not tracked")))?;
    Ok(HttpResponse::Ok().json(details))
}

#[post("/ui/aircraft/{key}/track")]
pub async fn load_track(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, Error> {
    let key = AircraftKey::new(path.into_inner());
    let requested = state
        .viewer
        .send(LoadTrack(key.clone()))
        .await
        .map_err(ErrorInternalServerError)?;
    if !requested {
        return Err(ErrorNotFound(format!("aircraft {key} is not tracked")));
    }
    Ok(HttpResponse::Accepted().finish())
}

#[post("/ui/aircraft/{key}")]
pub async fn update_aircraft(
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<AircraftRequest>,
) -> Result<HttpResponse, Error> {
    let key = AircraftKey::new(path.into_inner());
    let request = body.into_inner();
    let row = state
        .viewer
        .send(UpdateAircraft {
            key: key.clone(),
            marker_visible: request.marker,
            path_visible: request.path,
            cycle_colour: request.cycle_colour,
        })
        .await
        .map_err(ErrorInternalServerError)?
        .ok_or_else(|| ErrorNotFound(format!("aircraft {key} is not tracked")))?;
    Ok(HttpResponse::Ok().json(row))
}

#[post("/ui/task")]
pub async fn import_task(
    state: web::Data<AppState>,
    body: web::Json<TaskRequest>,
) -> Result<HttpResponse, Error> {
    match body.into_inner() {
        TaskRequest {
            content: Some(content),
            ..
        } => {
            let tasks = state
                .viewer
                .send(ImportTask(content))
                .await
                .map_err(ErrorInternalServerError)?
                .map_err(|err| ErrorBadRequest(err.message))?;
            Ok(HttpResponse::Ok().json(TaskResponse { tasks }))
        }
        TaskRequest { url: Some(url), .. } if !url.trim().is_empty() => {
            state
                .viewer
                .send(FetchTask(url.trim().to_string()))
                .await
                .map_err(ErrorInternalServerError)?;
            Ok(HttpResponse::Accepted().finish())
        }
        _ => Err(ErrorBadRequest("task content or url required")),
    }
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
    fn settings_request_maps_to_an_update() {
        let request: SettingsRequest = serde_json::from_str(
            r#"{"bounds":[45.0,47.0,6.0,8.0],"overlays":{"rain":true,"receivers":false},
                "path_length":"long","units":"imperial","device_types":3}"#,
        )
        .unwrap();
        let update = parse_settings(request).unwrap();
        assert_eq!(update.bounds.unwrap().north, 45.0);
        assert_eq!(
            update.overlays,
            vec![(LiveOverlay::Rain, true), (LiveOverlay::Receivers, false)]
        );
        assert_eq!(update.path_length, Some(PathLength::Long));
        assert_eq!(update.units, Some(Units::Imperial));
        assert_eq!(update.device_types.unwrap().bits(), 3);
        assert!(update.show_offline.is_none());
    }

    #[test]
    fn settings_request_rejects_bad_values() {
        let request = SettingsRequest {
            overlays: BTreeMap::from([("clouds".to_string(), true)]),
            ..SettingsRequest::default()
        };
        assert!(parse_settings(request).is_err());
        let request = SettingsRequest {
            device_types: Some(0),
            ..SettingsRequest::default()
        };
        assert!(parse_settings(request).is_err());
        let request = SettingsRequest {
            bounds: Some([f64::NAN, 45.0, 8.0, 6.0]),
            ..SettingsRequest::default()
        };
        assert!(parse_settings(request).is_err());
    }
}
