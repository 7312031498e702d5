use ogn_core::{Receiver, ReceiverName};
use ogn_geo::Coordinate;
use ogn_map::{Feature, Geometry, MapView, Style, VectorLayer};
use std::collections::BTreeMap;

pub const ICON_SIZE: (f64, f64) = (20.0, 20.0);

/// Receiving stations reported by the live backend, replaced wholesale on
/// every successful refresh.
pub struct ReceiverRegistry {
    receivers: BTreeMap<ReceiverName, Receiver>,
    layer: VectorLayer<ReceiverName>,
}

impl ReceiverRegistry {
    pub fn new(visible: bool) -> Self {
        Self {
            receivers: BTreeMap::new(),
            layer: VectorLayer::new("receivers", 40, visible),
        }
    }

    pub fn replace(&mut self, receivers: Vec<Receiver>) {
        self.receivers.clear();
        self.layer.clear();
        for receiver in receivers {
            let feature = Feature::new(
                Geometry::Point(Coordinate::new(receiver.latitude, receiver.longitude)),
                Style::icon(format!("pict/{}", receiver.icon()), 1.0),
            )
            .with_title(receiver.name.to_string());
            self.layer.insert(receiver.name.clone(), feature);
            self.receivers.insert(receiver.name.clone(), receiver);
        }
    }

    pub fn position(&self, name: &str) -> Option<Coordinate> {
        self.receivers
            .get(&ReceiverName::new(name))
            .map(|receiver| Coordinate::new(receiver.latitude, receiver.longitude))
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.layer.set_visible(visible);
    }

    pub fn hit(&self, view: &MapView, pixel: (f64, f64)) -> Option<ReceiverName> {
        self.layer.hit_icon(view, pixel, ICON_SIZE).cloned()
    }

    pub fn layer(&self) -> &VectorLayer<ReceiverName> {
        &self.layer
    }
}
