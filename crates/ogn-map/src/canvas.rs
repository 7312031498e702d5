use image::{ImageFormat, Rgba as Pixel, RgbaImage};
use ogn_core::{OgnError, OgnResult};
use std::io::Cursor;

use crate::colour::Rgba;

/// Raster target for the overlay compositors. Drawing uses source-over blending.
#[derive(Debug, Clone)]
pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Replaces the raster with a cleared one of the given size.
    pub fn reset(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    pub fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Pixel([0, 0, 0, 0]);
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let Pixel([r, g, b, a]) = *self.image.get_pixel(x, y);
        Some(Rgba::new(r, g, b, a))
    }

    /// Fills the rectangle spanned by two corners in any order. Rectangles
    /// narrower than a pixel still cover one pixel.
    pub fn fill_rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, colour: Rgba) {
        let (left, right) = (x0.min(x1), x0.max(x1));
        let (top, bottom) = (y0.min(y1), y0.max(y1));
        let Some((start_x, end_x)) = self.span(left, right, self.width()) else {
            return;
        };
        let Some((start_y, end_y)) = self.span(top, bottom, self.height()) else {
            return;
        };
        for y in start_y..end_y {
            for x in start_x..end_x {
                self.blend(x, y, colour);
            }
        }
    }

    pub fn stroke_line(&mut self, x0: f64, y0: f64, x1: f64, y1: f64, colour: Rgba) {
        let Some((x0, y0, x1, y1)) = self.clip(x0, y0, x1, y1) else {
            return;
        };
        let dx = x1 - x0;
        let dy = y1 - y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        let mut last = None;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let x = (x0 + dx * t).floor();
            let y = (y0 + dy * t).floor();
            if x < 0.0 || y < 0.0 || x >= f64::from(self.width()) || y >= f64::from(self.height()) {
                continue;
            }
            let point = (x as u32, y as u32);
            if last == Some(point) {
                continue;
            }
            last = Some(point);
            self.blend(point.0, point.1, colour);
        }
    }

    pub fn encode_png(&self) -> OgnResult<Vec<u8>> {
        let mut bytes = Cursor::new(Vec::new());
        self.image
            .write_to(&mut bytes, ImageFormat::Png)
            .map_err(|err| OgnError::new(ogn_core::ErrorCode::Internal, err.to_string()))?;
        Ok(bytes.into_inner())
    }

    pub fn painted_pixels(&self) -> usize {
        self.image.pixels().filter(|pixel| pixel.0[3] > 0).count()
    }

    /// Liang-Barsky clip of a segment to the raster rectangle.
    fn clip(&self, x0: f64, y0: f64, x1: f64, y1: f64) -> Option<(f64, f64, f64, f64)> {
        let dx = x1 - x0;
        let dy = y1 - y0;
        if ![x0, y0, dx, dy].iter().all(|value| value.is_finite()) {
            return None;
        }
        let width = f64::from(self.width());
        let height = f64::from(self.height());
        let (mut enter, mut exit) = (0.0_f64, 1.0_f64);
        for (p, q) in [(-dx, x0), (dx, width - x0), (-dy, y0), (dy, height - y0)] {
            if p == 0.0 {
                if q < 0.0 {
                    return None;
                }
            } else if p < 0.0 {
                enter = enter.max(q / p);
            } else {
                exit = exit.min(q / p);
            }
        }
        if enter > exit {
            return None;
        }
        Some((x0 + dx * enter, y0 + dy * enter, x0 + dx * exit, y0 + dy * exit))
    }

    fn span(&self, from: f64, to: f64, limit: u32) -> Option<(u32, u32)> {
        if !from.is_finite() || !to.is_finite() {
            return None;
        }
        let start = from.round();
        let end = to.round().max(start + 1.0);
        let start = start.max(0.0);
        let end = end.min(f64::from(limit));
        if start >= end {
            return None;
        }
        Some((start as u32, end as u32))
    }

    fn blend(&mut self, x: u32, y: u32, colour: Rgba) {
        let pixel = self.image.get_pixel_mut(x, y);
        let src_a = f64::from(colour.a) / 255.0;
        let dst_a = f64::from(pixel.0[3]) / 255.0;
        let out_a = src_a + dst_a * (1.0 - src_a);
        if out_a <= 0.0 {
            *pixel = Pixel([0, 0, 0, 0]);
            return;
        }
        let channel = |src: u8, dst: u8| {
            let value =
                (f64::from(src) * src_a + f64::from(dst) * dst_a * (1.0 - src_a)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };
        *pixel = Pixel([
            channel(colour.r, pixel.0[0]),
            channel(colour.g, pixel.0[1]),
            channel(colour.b, pixel.0[2]),
            (out_a * 255.0).round() as u8,
        ]);
    }
}
