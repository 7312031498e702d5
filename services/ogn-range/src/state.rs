use actix::Addr;
use ogn_config::ServiceConfig;
use tera::Tera;

use crate::viewer::RangeViewer;

pub struct AppState {
    pub config: ServiceConfig,
    pub tera: Tera,
    pub viewer: Addr<RangeViewer>,
}
