mod api;
mod feed;
mod hash;
mod options;
mod poll;
mod receivers;
mod render;
mod routes;
mod settings;
mod state;
mod task;
mod tracker;
mod viewer;

use actix::Actor;
use actix_web::{web, App, HttpServer};
use api::ApiClient;
use ogn_config::{env_var, ServiceConfig};
use ogn_observability::{init, log_startup, ObservabilityConfig};
use settings::LiveSettings;
use state::AppState;
use std::io;
use std::sync::Arc;
use tera::Tera;
use viewer::LiveViewer;

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = ServiceConfig::from_env("ogn-live");
    let obs_config = ObservabilityConfig {
        service_name: config.service_name.clone(),
        environment: config.environment.to_string(),
        log_level: config.log_level.clone(),
        metrics_addr: config.metrics_addr.clone(),
    };
    let handle = init(&obs_config);
    log_startup(&handle, &obs_config.environment, &config.bind_addr);

    let template_glob = format!("{}/**/*", config.templates_dir);
    let tera = Tera::new(&template_glob)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.to_string()))?;

    let settings = LiveSettings::from_env();
    let api = ApiClient::new(&settings)
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err.message))?;
    let fragment = env_var("OGN_LIVE_INITIAL_FRAGMENT", String::new());
    tracing::info!(
        api = %settings.api_base_url,
        poll_secs = settings.poll_interval.as_secs(),
        "live backend configured"
    );

    let viewer = LiveViewer::new(Arc::new(api), settings, &fragment).start();
    let bind_addr = config.bind_addr.clone();
    let state = web::Data::new(AppState {
        config,
        tera,
        viewer,
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
