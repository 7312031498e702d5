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
        .service(ui_api::settings)
        .service(ui_api::list_aircraft)
        .service(ui_api::select_aircraft)
        .service(ui_api::load_track)
        .service(ui_api::update_aircraft)
        .service(ui_api::import_task);
}
