use actix_web::{error::ErrorInternalServerError, get, web, Error, HttpResponse};

use crate::render::{build_context, UiTemplateData};
use crate::state::AppState;
use crate::viewer::GetState;

#[get("/")]
pub async fn index(state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let snapshot = state
        .viewer
        .send(GetState)
        .await
        .map_err(ErrorInternalServerError)?;
    let data = UiTemplateData::from_state(&state, snapshot);

    let body = state
        .tera
        .render("index.html", &build_context(&data))
        .map_err(ErrorInternalServerError)?;

    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}
