use tera::Context;

use crate::state::AppState;
use crate::tracker::AircraftRow;
use crate::viewer::LiveSnapshot;

#[derive(Debug, Clone)]
pub struct UiTemplateData {
    pub service_name: String,
    pub environment: String,
    pub snapshot: LiveSnapshot,
    pub aircraft: Vec<AircraftRow>,
}

impl UiTemplateData {
    pub fn from_state(state: &AppState, snapshot: LiveSnapshot, aircraft: Vec<AircraftRow>) -> Self {
        Self {
            service_name: state.config.service_name.clone(),
            environment: state.config.environment.to_string(),
            snapshot,
            aircraft,
        }
    }
}

pub fn build_context(data: &UiTemplateData) -> Context {
    let options = &data.snapshot.options;
    let mut context = Context::new();
    context.insert("service_name", &data.service_name);
    context.insert("environment", &data.environment);
    context.insert("fragment", &data.snapshot.fragment);
    context.insert("show_warning", &!options.warning_hidden);
    context.insert("show_list", &!options.list_hidden);
    context.insert("altitude_unit", options.units.altitude_unit());
    context.insert("aircraft", &data.aircraft);
    context.insert("selected", &data.snapshot.selected);
    context.insert("notice", &data.snapshot.notice);
    context.insert("snapshot", &data.snapshot);
    context
}
