use ogn_config::{env_var, env_var_bool, env_var_f64, env_var_i32, env_var_u32, env_var_u64, env_var_u8};
use ogn_geo::Coordinate;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LiveSettings {
    pub api_base_url: String,
    pub positions_path: String,
    pub receivers_path: String,
    pub device_info_path: String,
    pub track_path: String,
    pub request_timeout: Duration,
    pub default_center: Coordinate,
    pub default_zoom: u8,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Sent as `z` so report times come back in local time.
    pub utc_offset_hours: i32,
    pub poll_interval: Duration,
    pub watchdog_interval: Duration,
    pub receivers_refresh: Duration,
    pub receivers_retry: Duration,
    /// Initial state of the hide-new-aircraft switch.
    pub hide_new_aircraft: bool,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8082".to_string(),
            positions_path: "lxml.php".to_string(),
            receivers_path: "rec.php".to_string(),
            device_info_path: "getinfo.php".to_string(),
            track_path: "livetrack.php".to_string(),
            request_timeout: Duration::from_secs(20),
            default_center: Coordinate::new(46.5, 6.5),
            default_zoom: 8,
            viewport_width: 1024,
            viewport_height: 768,
            utc_offset_hours: 0,
            poll_interval: Duration::from_secs(10),
            watchdog_interval: Duration::from_secs(30),
            receivers_refresh: Duration::from_secs(120),
            receivers_retry: Duration::from_secs(20),
            hide_new_aircraft: false,
        }
    }
}

impl LiveSettings {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: env_var("OGN_LIVE_API_BASE_URL", defaults.api_base_url),
            positions_path: env_var("OGN_LIVE_POSITIONS_PATH", defaults.positions_path),
            receivers_path: env_var("OGN_LIVE_RECEIVERS_PATH", defaults.receivers_path),
            device_info_path: env_var("OGN_LIVE_DEVICE_INFO_PATH", defaults.device_info_path),
            track_path: env_var("OGN_LIVE_TRACK_PATH", defaults.track_path),
            request_timeout: Duration::from_millis(env_var_u64(
                "OGN_LIVE_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )),
            default_center: Coordinate::new(
                env_var_f64("OGN_LIVE_DEFAULT_LAT", defaults.default_center.latitude),
                env_var_f64("OGN_LIVE_DEFAULT_LON", defaults.default_center.longitude),
            ),
            default_zoom: env_var_u8("OGN_LIVE_DEFAULT_ZOOM", defaults.default_zoom),
            viewport_width: env_var_u32("OGN_LIVE_VIEWPORT_WIDTH", defaults.viewport_width),
            viewport_height: env_var_u32("OGN_LIVE_VIEWPORT_HEIGHT", defaults.viewport_height),
            utc_offset_hours: env_var_i32("OGN_LIVE_UTC_OFFSET_HOURS", defaults.utc_offset_hours),
            poll_interval: Duration::from_secs(env_var_u64(
                "OGN_LIVE_POLL_SECS",
                defaults.poll_interval.as_secs(),
            )),
            watchdog_interval: Duration::from_secs(env_var_u64(
                "OGN_LIVE_WATCHDOG_SECS",
                defaults.watchdog_interval.as_secs(),
            )),
            receivers_refresh: Duration::from_secs(env_var_u64(
                "OGN_LIVE_RECEIVERS_REFRESH_SECS",
                defaults.receivers_refresh.as_secs(),
            )),
            receivers_retry: Duration::from_secs(env_var_u64(
                "OGN_LIVE_RECEIVERS_RETRY_SECS",
                defaults.receivers_retry.as_secs(),
            )),
            hide_new_aircraft: env_var_bool("OGN_LIVE_HIDE_NEW", defaults.hide_new_aircraft),
        }
    }
}
