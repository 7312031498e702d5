use actix::Addr;
use ogn_config::ServiceConfig;
use tera::Tera;

use crate::viewer::LiveViewer;

pub struct AppState {
    pub config: ServiceConfig,
    pub tera: Tera,
    pub viewer: Addr<LiveViewer>,
}
