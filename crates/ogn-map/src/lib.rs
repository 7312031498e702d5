pub mod canvas;
pub mod coalesce;
pub mod colour;
pub mod fragment;
pub mod scene;
pub mod view;

pub use canvas::Canvas;
pub use coalesce::RequestCoalescer;
pub use colour::Rgba;
pub use fragment::FragmentGuard;
pub use scene::{
    Feature, FeatureSnapshot, Geometry, Icon, LayerSnapshot, Stroke, Style, Text, VectorLayer,
};
pub use view::{Extent, FrameGeometry, MapView, MAX_VIEWPORT};
