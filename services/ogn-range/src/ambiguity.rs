//! Position ambiguity grid: the lattice of positions a compressed
//! (shifted and truncated) latitude/longitude can take.

use ogn_geo::{Coordinate, LATITUDE_LIMIT, LONGITUDE_LIMIT};
use ogn_map::{Canvas, FrameGeometry, Rgba};

const SHIFT_BITS: u32 = 7;
const LATITUDE_TRUNC_BITS: u32 = 19;
const LONGITUDE_TRUNC_BITS: u32 = 20;

fn scale(trunc_bits: u32) -> f64 {
    1e7 / (1u64 << (SHIFT_BITS + trunc_bits)) as f64
}

#[derive(Debug)]
pub struct AmbiguityGrid {
    canvas: Canvas,
    min_zoom: u8,
}

impl AmbiguityGrid {
    pub fn new(min_zoom: u8) -> Self {
        Self {
            canvas: Canvas::new(0, 0),
            min_zoom,
        }
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Redraws the grid for `frame` and returns the number of lines drawn.
    /// Below the minimum zoom, or when not `enabled`, the canvas is left empty.
    pub fn redraw(&mut self, frame: &FrameGeometry, zoom: u8, enabled: bool) -> usize {
        self.canvas.reset(frame.width, frame.height);
        if !enabled || zoom < self.min_zoom {
            return 0;
        }

        let bounds = frame.bounds().normalized(LATITUDE_LIMIT, LONGITUDE_LIMIT);
        if !bounds.is_finite() {
            return 0;
        }
        let mut lines = 0;

        let lat_scale = scale(LATITUDE_TRUNC_BITS);
        let last = (bounds.north * lat_scale) as i64 + 1;
        for t in (bounds.south * lat_scale) as i64..=last {
            let latitude = t as f64 / lat_scale;
            let (x0, y0) = frame.to_pixel(Coordinate::new(latitude, bounds.west));
            let (x1, y1) = frame.to_pixel(Coordinate::new(latitude, bounds.east));
            self.canvas.stroke_line(x0, y0, x1, y1, Rgba::RED);
            lines += 1;
        }

        let lon_scale = scale(LONGITUDE_TRUNC_BITS);
        let last = (bounds.east * lon_scale) as i64 + 1;
        for t in (bounds.west * lon_scale) as i64..=last {
            let longitude = t as f64 / lon_scale;
            let (x0, y0) = frame.to_pixel(Coordinate::new(bounds.north, longitude));
            let (x1, y1) = frame.to_pixel(Coordinate::new(bounds.south, longitude));
            self.canvas.stroke_line(x0, y0, x1, y1, Rgba::RED);
            lines += 1;
        }

        tracing::trace!(lines, zoom, "ambiguity grid drawn");
        lines
    }

    pub fn encode_png(&self) -> ogn_core::OgnResult<Vec<u8>> {
        self.canvas.encode_png()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ogn_map::MapView;

    #[test]
    fn nothing_below_min_zoom_or_when_disabled() {
        let view = MapView::new(Coordinate::new(47.0, 8.0), 6, 400, 300);
        let frame = view.frame(1.2, 1.0);
        let mut grid = AmbiguityGrid::new(7);
        assert_eq!(grid.redraw(&frame, 6, true), 0);
        assert_eq!(grid.canvas().painted_pixels(), 0);

        let view = MapView::new(Coordinate::new(47.0, 8.0), 9, 400, 300);
        assert_eq!(grid.redraw(&view.frame(1.2, 1.0), 9, false), 0);
        assert_eq!(grid.canvas().width(), 480);
    }

    #[test]
    fn lattice_lines_fall_on_multiples_of_the_step() {
        let lat_scale = scale(LATITUDE_TRUNC_BITS);
        let latitude = 7.0 / lat_scale;
        let view = MapView::new(Coordinate::new(latitude, 8.0), 9, 400, 300);
        let frame = view.frame(1.2, 1.0);
        let mut grid = AmbiguityGrid::new(7);

        assert!(grid.redraw(&frame, 9, true) >= 4);
        let (_, y) = frame.to_pixel(Coordinate::new(latitude, 8.0));
        let pixel = grid.canvas().pixel(frame.width / 2, y.floor() as u32);
        assert_eq!(pixel, Some(Rgba::RED));
    }

    #[test]
    fn off_globe_frames_draw_a_bounded_grid() {
        let mut grid = AmbiguityGrid::new(7);
        for longitude in [1e17, f64::INFINITY] {
            let view = MapView::new(Coordinate::new(47.0, longitude), 9, 400, 300);
            assert!(grid.redraw(&view.frame(1.2, 1.0), 9, true) < 100);
        }
    }
}
