//! Coverage heatmap compositor.
//!
//! The canvas is re-framed on every redraw. Each visible 100 km MGRS square
//! is fetched once per key while in flight; paint jobs queued against the
//! request carry the frame they were created for and are dropped if the
//! canvas has since been re-framed.

use ogn_core::{DateRange, OgnResult};
use ogn_geo::{mgrs, BoundingBox, Coordinate, LATITUDE_LIMIT, LONGITUDE_LIMIT};
use ogn_map::{Canvas, FrameGeometry, MapView, RequestCoalescer};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use crate::api::TileResponse;
use crate::palette::{band_of, Gradient, STOPS};
use crate::selection::Source;
use crate::settings::RangeSettings;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TileKey {
    pub tile: String,
    pub source: Source,
    pub station: String,
    pub range: DateRange,
}

/// What the coverage layer should show.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageQuery {
    pub source: Source,
    pub station: String,
    pub range: DateRange,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaintJob {
    frame: FrameGeometry,
}

#[derive(Debug)]
pub struct CoverageCompositor {
    canvas: Canvas,
    frame: Option<FrameGeometry>,
    gradient: Gradient,
    pending: RequestCoalescer<TileKey, PaintJob>,
    squares: HashMap<String, BoundingBox>,
    min_zoom: u8,
    max_zoom: u8,
    canvas_ratio: f64,
    pixel_ratio: f64,
    tile_step_deg: f64,
}

impl CoverageCompositor {
    pub fn new(settings: &RangeSettings) -> Self {
        Self {
            canvas: Canvas::new(0, 0),
            frame: None,
            gradient: Gradient::default(),
            pending: RequestCoalescer::new(),
            squares: HashMap::new(),
            min_zoom: settings.min_zoom,
            max_zoom: settings.max_zoom,
            canvas_ratio: settings.canvas_ratio,
            pixel_ratio: settings.pixel_ratio,
            tile_step_deg: settings.tile_step_deg,
        }
    }

    pub fn set_gradient(&mut self, gradient: Gradient) {
        self.gradient = gradient;
    }

    pub fn frame(&self) -> Option<&FrameGeometry> {
        self.frame.as_ref()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn pending_tiles(&self) -> usize {
        self.pending.len()
    }

    pub fn zoom_allowed(&self, zoom: u8, source: &Source) -> bool {
        (zoom >= self.min_zoom || source.is_lowres()) && zoom <= self.max_zoom
    }

    /// Clears and re-frames the canvas for `view`, queues a paint job per
    /// visible tile and returns the keys that need a request.
    pub fn redraw(&mut self, view: &MapView, query: &CoverageQuery) -> Vec<TileKey> {
        let frame = view.frame(self.canvas_ratio, self.pixel_ratio);
        self.canvas.reset(frame.width, frame.height);
        self.frame = Some(frame);

        if !self.zoom_allowed(view.zoom, &query.source) {
            tracing::trace!(zoom = view.zoom, source = %query.source, "coverage hidden at this zoom");
            return Vec::new();
        }

        let mut requests = Vec::new();
        for tile in tiles_for(&frame.bounds(), self.tile_step_deg) {
            let key = TileKey {
                tile,
                source: query.source.clone(),
                station: query.station.clone(),
                range: query.range,
            };
            let leader = self.pending.register(key.clone(), PaintJob { frame });
            ogn_observability::record_tile_request(!leader);
            if leader {
                requests.push(key);
            }
        }
        tracing::debug!(
            requested = requests.len(),
            pending = self.pending.len(),
            "coverage redraw"
        );
        requests
    }

    /// Runs every job queued for `key` in registration order and returns the
    /// number of boxes each one painted.
    pub fn deliver(&mut self, key: &TileKey, response: &TileResponse) -> Vec<usize> {
        let jobs = self.pending.take(key);
        if jobs.is_empty() {
            return Vec::new();
        }
        let points = self.decode_points(response);
        jobs.iter()
            .map(|job| {
                if self.frame.as_ref() != Some(&job.frame) {
                    tracing::trace!(tile = %key.tile, "dropping paint job for a stale frame");
                    return 0;
                }
                self.paint(&job.frame, &points)
            })
            .collect()
    }

    /// Forgets a failed request so a later redraw can retry it.
    pub fn fail(&mut self, key: &TileKey) -> usize {
        self.pending.take(key).len()
    }

    pub fn encode_png(&self) -> OgnResult<Vec<u8>> {
        self.canvas.encode_png()
    }

    fn decode_points(&mut self, response: &TileResponse) -> Vec<(BoundingBox, f64)> {
        let mut points = Vec::with_capacity(response.p.len());
        for entry in &response.p {
            let Some((offset, value)) = entry.split_once('/') else {
                tracing::debug!(entry = %entry, "malformed coverage sample");
                continue;
            };
            let Ok(value) = value.trim().parse::<f64>() else {
                tracing::debug!(entry = %entry, "non-numeric coverage value");
                continue;
            };
            let reference = format!("{}{}", response.t, offset);
            let square = match self.squares.get(&reference) {
                Some(square) => *square,
                None => match mgrs::inverse(&reference) {
                    Ok(square) => {
                        self.squares.insert(reference, square);
                        square
                    }
                    Err(err) => {
                        tracing::debug!(reference = %reference, error = %err, "undecodable square");
                        continue;
                    }
                },
            };
            points.push((square, value));
        }
        points
    }

    fn paint(&mut self, frame: &FrameGeometry, points: &[(BoundingBox, f64)]) -> usize {
        let mut painted = 0;
        for band in (0..STOPS).rev() {
            let colour = self.gradient.stop(band);
            for (square, value) in points {
                if band_of(*value) != Some(band) {
                    continue;
                }
                let (x0, y0) = frame.to_pixel(square.south_west());
                let (x1, y1) = frame.to_pixel(square.north_east());
                self.canvas.fill_rect(x0, y0, x1, y1, colour);
                painted += 1;
            }
        }
        painted
    }
}

/// 100 km squares touched by a `step_deg` sampling grid over `bounds`, sorted.
/// The bounds are clamped to the globe first.
pub fn tiles_for(bounds: &BoundingBox, step_deg: f64) -> BTreeSet<String> {
    let mut tiles = BTreeSet::new();
    let bounds = bounds.normalized(LATITUDE_LIMIT, LONGITUDE_LIMIT);
    if !bounds.is_finite() {
        return tiles;
    }
    let step = step_deg.max(0.01);
    let columns = ((bounds.east - bounds.west) / step).floor() as usize;
    let rows = ((bounds.north - bounds.south) / step).floor() as usize;
    for column in 0..=columns {
        let lon = bounds.west + column as f64 * step;
        for row in 0..=rows {
            let lat = bounds.south + row as f64 * step;
            if (mgrs::MIN_LATITUDE..=mgrs::MAX_LATITUDE).contains(&lat) {
                if let Ok(tile) = mgrs::forward(Coordinate::new(lat, lon), 0) {
                    tiles.insert(tile);
                }
            }
        }
    }
    tiles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::ColourScheme;
    use chrono::NaiveDate;
    use ogn_map::Rgba;

    fn query(source: &str) -> CoverageQuery {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        CoverageQuery {
            source: Source::new(source),
            station: "LFLE".to_string(),
            range: ogn_core::DatePreset::LastWeek.range(today),
        }
    }

    fn compositor() -> CoverageCompositor {
        let mut compositor = CoverageCompositor::new(&RangeSettings::default());
        let scheme = ColourScheme::parse("ff0000ff:00ff00ff").unwrap();
        compositor.set_gradient(Gradient::from_scheme(&scheme).unwrap());
        compositor
    }

    fn view(zoom: u8) -> MapView {
        MapView::new(Coordinate::new(45.55, 6.55), zoom, 1024, 768)
    }

    #[test]
    fn tiles_are_unique_sorted_square_ids() {
        let bounds = BoundingBox {
            north: 46.0,
            south: 45.0,
            east: 7.0,
            west: 6.0,
        };
        let tiles = tiles_for(&bounds, 0.1);
        assert!(!tiles.is_empty());
        assert!(tiles.iter().all(|tile| tile.len() == 5));
        let centre = mgrs::forward(Coordinate::new(45.5, 6.5), 0).unwrap();
        assert!(tiles.contains(&centre));
    }

    #[test]
    fn polar_samples_are_skipped() {
        let bounds = BoundingBox {
            north: 89.0,
            south: 86.0,
            east: 1.0,
            west: 0.0,
        };
        assert!(tiles_for(&bounds, 0.5).is_empty());
    }

    #[test]
    fn off_globe_bounds_are_clamped() {
        let bounds = BoundingBox {
            north: 46.0,
            south: 45.0,
            east: 1e17,
            west: 1e17 - 1.0,
        };
        let tiles = tiles_for(&bounds, 0.1);
        let edge = mgrs::forward(Coordinate::new(45.0, 180.0), 0).unwrap();
        assert!(tiles.contains(&edge));

        let unbounded = BoundingBox {
            north: 46.0,
            south: 45.0,
            east: f64::INFINITY,
            west: f64::NEG_INFINITY,
        };
        assert!(!tiles_for(&unbounded, 0.1).is_empty());
        let undefined = BoundingBox {
            east: f64::NAN,
            ..bounds
        };
        assert!(tiles_for(&undefined, 0.1).is_empty());
    }

    #[test]
    fn redraw_returns_for_centres_off_the_globe() {
        let mut compositor = compositor();
        for longitude in [1e17, f64::INFINITY] {
            let view = MapView::new(Coordinate::new(45.0, longitude), 9, 400, 300);
            compositor.redraw(&view, &query("max"));
        }
    }

    #[test]
    fn redraw_caps_the_canvas_for_huge_viewports() {
        let mut compositor = compositor();
        let view = MapView::new(Coordinate::new(45.0, 6.0), 9, u32::MAX, u32::MAX);
        compositor.redraw(&view, &query("max"));
        let frame = compositor.frame().unwrap();
        assert!(frame.width <= 2 * ogn_map::MAX_VIEWPORT);
        assert!(frame.height <= 2 * ogn_map::MAX_VIEWPORT);
    }

    #[test]
    fn zoom_gate() {
        let mut compositor = compositor();
        assert!(compositor.redraw(&view(7), &query("max")).is_empty());
        assert_eq!(compositor.pending_tiles(), 0);
        assert!(compositor.redraw(&view(12), &query("max")).is_empty());
        assert!(!compositor.redraw(&view(8), &query("max")).is_empty());
        assert!(compositor.zoom_allowed(5, &Source::new("lowres-coverage")));
        assert!(!compositor.zoom_allowed(12, &Source::new("lowres-coverage")));
    }

    #[test]
    fn coalesced_jobs_each_paint_the_strongest_band() {
        let mut compositor = compositor();
        let view = view(8);
        let first = compositor.redraw(&view, &query("max"));
        let second = compositor.redraw(&view, &query("max"));
        assert!(second.is_empty());

        let tile = mgrs::forward(view.center, 0).unwrap();
        let key = first.iter().find(|key| key.tile == tile).unwrap().clone();
        let response = TileResponse {
            t: tile.clone(),
            p: vec!["/250".to_string()],
        };
        assert_eq!(compositor.deliver(&key, &response), vec![1, 1]);

        let square = mgrs::inverse(&tile).unwrap();
        let (x, y) = compositor.frame().unwrap().to_pixel(square.center());
        let pixel = compositor.canvas().pixel(x as u32, y as u32).unwrap();
        assert_eq!(pixel, Rgba::opaque(0, 255, 0));
        assert!(compositor.deliver(&key, &response).is_empty());
    }

    #[test]
    fn stale_frames_are_skipped() {
        let mut compositor = compositor();
        let first = compositor.redraw(&view(8), &query("max"));
        let tile = mgrs::forward(view(8).center, 0).unwrap();
        let key = first.iter().find(|key| key.tile == tile).unwrap().clone();

        let mut moved = view(8);
        moved.set_center(Coordinate::new(45.6, 6.6));
        compositor.redraw(&moved, &query("max"));

        let response = TileResponse {
            t: tile,
            p: vec!["/250".to_string(), "55/120".to_string()],
        };
        assert_eq!(compositor.deliver(&key, &response), vec![0, 2]);
    }

    #[test]
    fn weak_saturated_and_malformed_samples_are_ignored() {
        let mut compositor = compositor();
        let view = view(9);
        let keys = compositor.redraw(&view, &query("max"));
        let key = keys[0].clone();
        let response = TileResponse {
            t: key.tile.clone(),
            p: vec![
                "12/5".to_string(),
                "garbage".to_string(),
                "1/abc".to_string(),
                "123/50".to_string(),
                "34/1000000".to_string(),
            ],
        };
        assert_eq!(compositor.deliver(&key, &response), vec![0]);
    }

    #[test]
    fn failed_requests_release_the_key() {
        let mut compositor = compositor();
        let keys = compositor.redraw(&view(8), &query("max"));
        let key = keys[0].clone();
        compositor.redraw(&view(8), &query("max"));
        assert_eq!(compositor.fail(&key), 2);
        assert!(compositor.redraw(&view(8), &query("max")).contains(&key));
    }
}
