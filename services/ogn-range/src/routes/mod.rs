pub mod health;
pub mod ui;
pub mod ui_api;

use actix_web::web;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(ui::index)
        .service(ui_api::ui_state)
        .service(ui_api::apply_hash)
        .service(ui_api::move_view)
        .service(ui_api::click)
        .service(ui_api::ui_scene)
        .service(ui_api::ui_adjust)
        .service(ui_api::toggle_overlay)
        .service(ui_api::refresh_stations)
        .service(ui_api::search_stations)
        .service(ui_api::coverage_png)
        .service(ui_api::ambiguity_png);
}
