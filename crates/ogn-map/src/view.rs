use ogn_geo::mercator::{self, Projected};
use ogn_geo::{BoundingBox, Coordinate};
use serde::{Deserialize, Serialize};

/// Metres per pixel at zoom 0 for 256 px Web Mercator tiles.
pub const RESOLUTION_AT_ZOOM_0: f64 = 156_543.033_928_040_97;
pub const MAX_ZOOM: u8 = 20;
/// Largest viewport side in CSS pixels.
pub const MAX_VIEWPORT: u32 = 4096;

fn viewport_side(pixels: u32) -> u32 {
    pixels.clamp(1, MAX_VIEWPORT)
}

/// Projected rectangle in EPSG:3857 metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::from_corners(
            mercator::unproject(Projected {
                x: self.min_x,
                y: self.min_y,
            }),
            mercator::unproject(Projected {
                x: self.max_x,
                y: self.max_y,
            }),
        )
    }
}

/// The visible map: centre, integral zoom level and viewport size in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapView {
    pub center: Coordinate,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
}

impl MapView {
    pub fn new(center: Coordinate, zoom: u8, width: u32, height: u32) -> Self {
        Self {
            center,
            zoom: zoom.min(MAX_ZOOM),
            width: viewport_side(width),
            height: viewport_side(height),
        }
    }

    pub fn set_size(&mut self, width: u32, height: u32) {
        self.width = viewport_side(width);
        self.height = viewport_side(height);
    }

    pub fn resolution(&self) -> f64 {
        RESOLUTION_AT_ZOOM_0 / 2f64.powi(i32::from(self.zoom))
    }

    pub fn set_zoom(&mut self, zoom: u8) {
        self.zoom = zoom.min(MAX_ZOOM);
    }

    pub fn set_center(&mut self, center: Coordinate) {
        self.center = center;
    }

    pub fn extent(&self) -> Extent {
        self.scaled_extent(1.0)
    }

    pub fn bounds(&self) -> BoundingBox {
        self.extent().bounds()
    }

    /// Viewport pixel (origin top-left) to geographic position.
    pub fn coordinate_at(&self, x: f64, y: f64) -> Coordinate {
        let extent = self.extent();
        let resolution = self.resolution();
        mercator::unproject(Projected {
            x: extent.min_x + x * resolution,
            y: extent.max_y - y * resolution,
        })
    }

    pub fn pixel_of(&self, coord: Coordinate) -> (f64, f64) {
        let extent = self.extent();
        let resolution = self.resolution();
        let point = mercator::project(coord);
        (
            (point.x - extent.min_x) / resolution,
            (extent.max_y - point.y) / resolution,
        )
    }

    /// Geometry of an image overlay rendered `ratio` times larger than the viewport.
    pub fn frame(&self, ratio: f64, pixel_ratio: f64) -> FrameGeometry {
        let extent = self.scaled_extent(ratio);
        let resolution = self.resolution();
        FrameGeometry {
            extent,
            resolution,
            pixel_ratio,
            width: (extent.width() / resolution * pixel_ratio).round() as u32,
            height: (extent.height() / resolution * pixel_ratio).round() as u32,
        }
    }

    fn scaled_extent(&self, ratio: f64) -> Extent {
        let center = mercator::project(self.center);
        let resolution = self.resolution();
        let half_width = f64::from(self.width) * resolution * ratio / 2.0;
        let half_height = f64::from(self.height) * resolution * ratio / 2.0;
        Extent {
            min_x: center.x - half_width,
            min_y: center.y - half_height,
            max_x: center.x + half_width,
            max_y: center.y + half_height,
        }
    }
}

/// The frame an overlay canvas was drawn for. Work queued against one frame
/// must be discarded once the canvas is re-framed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    pub extent: Extent,
    pub resolution: f64,
    pub pixel_ratio: f64,
    pub width: u32,
    pub height: u32,
}

impl FrameGeometry {
    pub fn to_pixel(&self, coord: Coordinate) -> (f64, f64) {
        let point = mercator::project(coord);
        let scale = self.pixel_ratio / self.resolution;
        (
            (point.x - self.extent.min_x) * scale,
            (self.extent.max_y - point.y) * scale,
        )
    }

    pub fn bounds(&self) -> BoundingBox {
        self.extent.bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewport_is_clamped() {
        let mut view = MapView::new(Coordinate::new(45.0, 6.0), 9, u32::MAX, 0);
        assert_eq!((view.width, view.height), (MAX_VIEWPORT, 1));
        view.set_size(800, 600);
        assert_eq!((view.width, view.height), (800, 600));
        view.set_size(0, u32::MAX);
        assert_eq!((view.width, view.height), (1, MAX_VIEWPORT));
    }

    #[test]
    fn resolution_halves_per_zoom_level() {
        let view = MapView::new(Coordinate::new(0.0, 0.0), 1, 512, 512);
        assert!((view.resolution() - RESOLUTION_AT_ZOOM_0 / 2.0).abs() < 1e-9);
    }

    #[test]
    fn pixel_round_trip_through_view() {
        let view = MapView::new(Coordinate::new(46.0, 7.0), 9, 800, 600);
        let (x, y) = view.pixel_of(view.center);
        assert!((x - 400.0).abs() < 1e-6 && (y - 300.0).abs() < 1e-6);
        let coord = view.coordinate_at(123.0, 456.0);
        let (x, y) = view.pixel_of(coord);
        assert!((x - 123.0).abs() < 1e-6 && (y - 456.0).abs() < 1e-6);
    }

    #[test]
    fn frame_is_larger_than_viewport() {
        let view = MapView::new(Coordinate::new(46.0, 7.0), 9, 800, 600);
        let frame = view.frame(1.2, 1.0);
        assert_eq!((frame.width, frame.height), (960, 720));
        let (x, y) = frame.to_pixel(view.center);
        assert!((x - 480.0).abs() < 1e-6 && (y - 360.0).abs() < 1e-6);
        assert!(frame.bounds().contains(view.bounds().north_east()));
    }
}
