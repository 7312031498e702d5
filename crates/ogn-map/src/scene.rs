use ogn_geo::Coordinate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Display;

use crate::colour::Rgba;
use crate::view::MapView;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    Polygon(Vec<Coordinate>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stroke {
    pub colour: Rgba,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Icon {
    pub src: String,
    /// Fractional anchor within the icon, `(0.5, 1.0)` is bottom-centre.
    pub anchor: (f64, f64),
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    pub text: String,
    pub offset_y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Style {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgba>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<Text>,
}

impl Style {
    pub fn stroke(colour: Rgba, width: f64) -> Self {
        Self {
            stroke: Some(Stroke { colour, width }),
            ..Self::default()
        }
    }

    pub fn icon(src: impl Into<String>, opacity: f64) -> Self {
        Self {
            icon: Some(Icon {
                src: src.into(),
                anchor: (0.5, 1.0),
                opacity,
            }),
            ..Self::default()
        }
    }

    pub fn text(text: impl Into<String>, offset_y: f64) -> Self {
        Self {
            text: Some(Text {
                text: text.into(),
                offset_y,
            }),
            ..Self::default()
        }
    }

    pub fn with_fill(mut self, fill: Rgba) -> Self {
        self.fill = Some(fill);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub geometry: Geometry,
    pub style: Style,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Feature {
    pub fn new(geometry: Geometry, style: Style) -> Self {
        Self {
            geometry,
            style,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A named, toggleable set of features keyed by the entity they draw.
#[derive(Debug, Clone)]
pub struct VectorLayer<K: Ord> {
    name: &'static str,
    visible: bool,
    z_index: i32,
    features: BTreeMap<K, Feature>,
}

impl<K: Ord + Clone + Display> VectorLayer<K> {
    pub fn new(name: &'static str, z_index: i32, visible: bool) -> Self {
        Self {
            name,
            visible,
            z_index,
            features: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn insert(&mut self, key: K, feature: Feature) {
        self.features.insert(key, feature);
    }

    pub fn remove(&mut self, key: &K) -> Option<Feature> {
        self.features.remove(key)
    }

    pub fn get(&self, key: &K) -> Option<&Feature> {
        self.features.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut Feature> {
        self.features.get_mut(key)
    }

    pub fn clear(&mut self) {
        self.features.clear();
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) {
        self.features.retain(|key, _| keep(key));
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Feature)> {
        self.features.iter()
    }

    /// Finds the point feature whose icon of `size` (CSS pixels, anchored at
    /// its bottom-centre) covers the viewport pixel.
    pub fn hit_icon(&self, view: &MapView, pixel: (f64, f64), size: (f64, f64)) -> Option<&K> {
        if !self.visible {
            return None;
        }
        let (width, height) = size;
        self.features
            .iter()
            .rev()
            .find(|(_, feature)| match feature.geometry {
                Geometry::Point(coord) => {
                    let (x, y) = view.pixel_of(coord);
                    pixel.0 >= x - width / 2.0
                        && pixel.0 <= x + width / 2.0
                        && pixel.1 >= y - height
                        && pixel.1 <= y
                }
                _ => false,
            })
            .map(|(key, _)| key)
    }

    pub fn snapshot(&self) -> LayerSnapshot {
        LayerSnapshot {
            name: self.name,
            visible: self.visible,
            z_index: self.z_index,
            features: self
                .features
                .iter()
                .map(|(key, feature)| FeatureSnapshot {
                    id: key.to_string(),
                    feature: feature.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeatureSnapshot {
    pub id: String,
    #[serde(flatten)]
    pub feature: Feature,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerSnapshot {
    pub name: &'static str,
    pub visible: bool,
    pub z_index: i32,
    pub features: Vec<FeatureSnapshot>,
}
