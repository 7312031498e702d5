use tera::Context;

use crate::state::AppState;
use crate::viewer::RangeSnapshot;

#[derive(Debug, Clone)]
pub struct UiTemplateData {
    pub service_name: String,
    pub environment: String,
    pub snapshot: RangeSnapshot,
}

impl UiTemplateData {
    pub fn from_state(state: &AppState, snapshot: RangeSnapshot) -> Self {
        Self {
            service_name: state.config.service_name.clone(),
            environment: state.config.environment.to_string(),
            snapshot,
        }
    }
}

pub fn build_context(data: &UiTemplateData) -> Context {
    let mut context = Context::new();
    context.insert("service_name", &data.service_name);
    context.insert("environment", &data.environment);
    context.insert("title", &data.snapshot.title);
    context.insert("description", &data.snapshot.description);
    context.insert("fragment", &data.snapshot.fragment);
    context.insert("details", &data.snapshot.details);
    context.insert("zoom_hint", &data.snapshot.zoom_hint);
    context.insert("snapshot", &data.snapshot);
    context
}
