use ogn_config::{env_var, env_var_f64, env_var_u32, env_var_u64, env_var_u8};
use ogn_geo::Coordinate;
use std::time::Duration;

/// Sources whose data is coarse enough to draw below the minimum zoom.
pub const LOWRES_SOURCE: &str = "lowres-coverage";

#[derive(Debug, Clone)]
pub struct RangeSettings {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub ambiguity_min_zoom: u8,
    pub default_center: Coordinate,
    pub default_zoom: u8,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub pixel_ratio: f64,
    pub canvas_ratio: f64,
    pub tile_step_deg: f64,
    pub station_refresh: Duration,
    pub details_debounce: Duration,
}

impl Default for RangeSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8081".to_string(),
            request_timeout: Duration::from_secs(20),
            min_zoom: 8,
            max_zoom: 11,
            ambiguity_min_zoom: 7,
            default_center: Coordinate::new(47.0, 8.0),
            default_zoom: 8,
            viewport_width: 1024,
            viewport_height: 768,
            pixel_ratio: 1.0,
            canvas_ratio: 1.2,
            tile_step_deg: 0.1,
            station_refresh: Duration::from_secs(5 * 60),
            details_debounce: Duration::from_millis(500),
        }
    }
}

impl RangeSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_var("OGN_RANGE_API_BASE_URL", defaults.api_base_url),
            request_timeout: Duration::from_millis(env_var_u64(
                "OGN_RANGE_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )),
            min_zoom: env_var_u8("OGN_RANGE_MIN_ZOOM", defaults.min_zoom),
            max_zoom: env_var_u8("OGN_RANGE_MAX_ZOOM", defaults.max_zoom),
            ambiguity_min_zoom: env_var_u8(
                "OGN_RANGE_AMBIGUITY_MIN_ZOOM",
                defaults.ambiguity_min_zoom,
            ),
            default_center: Coordinate::new(
                env_var_f64("OGN_RANGE_DEFAULT_LAT", defaults.default_center.latitude),
                env_var_f64("OGN_RANGE_DEFAULT_LON", defaults.default_center.longitude),
            ),
            default_zoom: env_var_u8("OGN_RANGE_DEFAULT_ZOOM", defaults.default_zoom),
            viewport_width: env_var_u32("OGN_RANGE_VIEWPORT_WIDTH", defaults.viewport_width),
            viewport_height: env_var_u32("OGN_RANGE_VIEWPORT_HEIGHT", defaults.viewport_height),
            pixel_ratio: env_var_f64("OGN_RANGE_PIXEL_RATIO", defaults.pixel_ratio).max(0.1),
            canvas_ratio: env_var_f64("OGN_RANGE_CANVAS_RATIO", defaults.canvas_ratio).max(1.0),
            tile_step_deg: defaults.tile_step_deg,
            station_refresh: Duration::from_secs(env_var_u64(
                "OGN_RANGE_STATION_REFRESH_SECS",
                defaults.station_refresh.as_secs(),
            )),
            details_debounce: Duration::from_millis(env_var_u64(
                "OGN_RANGE_DETAILS_DEBOUNCE_MS",
                defaults.details_debounce.as_millis() as u64,
            )),
        }
    }
}
