use async_trait::async_trait;
use ogn_core::{AircraftFix, AircraftKey, DeviceTypes, FlarmId, OgnError, Receiver};
use ogn_geo::BoundingBox;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::feed::{self, DeviceInfo, TrackReply};
use crate::settings::LiveSettings;

#[derive(Debug)]
pub struct ApiError {
    pub message: String,
    /// The backend answered but had nothing for the request.
    pub not_found: bool,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            not_found: false,
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(error: reqwest::Error) -> Self {
        Self::new(error.to_string())
    }
}

impl From<OgnError> for ApiError {
    fn from(error: OgnError) -> Self {
        Self {
            not_found: error.code == ogn_core::ErrorCode::NotFound,
            message: error.to_string(),
        }
    }
}

/// Parameters of one position poll.
#[derive(Debug, Clone, PartialEq)]
pub struct AircraftQuery {
    pub include_offline: bool,
    pub bounds: Option<BoundingBox>,
    pub utc_offset_hours: i32,
    pub device_types: DeviceTypes,
}

impl AircraftQuery {
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("a", u8::from(self.include_offline).to_string())];
        if let Some(bounds) = self.bounds {
            params.push(("b", bounds.north.to_string()));
            params.push(("c", bounds.south.to_string()));
            params.push(("d", bounds.east.to_string()));
            params.push(("e", bounds.west.to_string()));
        }
        params.push(("z", self.utc_offset_hours.to_string()));
        if !self.device_types.is_all() {
            params.push(("y", self.device_types.bits().to_string()));
        }
        params
    }
}

#[async_trait]
pub trait LiveApi: Send + Sync {
    async fn aircraft(&self, query: AircraftQuery) -> Result<Vec<AircraftFix>, ApiError>;
    async fn receivers(&self) -> Result<Vec<Receiver>, ApiError>;
    async fn device_info(&self, key: AircraftKey, flarm_id: FlarmId)
    -> Result<DeviceInfo, ApiError>;
    async fn track(&self, key: AircraftKey, longitude: f64) -> Result<TrackReply, ApiError>;
    /// Raw task file, JSON or XCSoar XML.
    async fn task(&self, url: String) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    positions_path: String,
    receivers_path: String,
    device_info_path: String,
    track_path: String,
}

impl ApiClient {
    pub fn new(settings: &LiveSettings) -> Result<Self, ApiError> {
        let base = format!("{}/", settings.api_base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|err| ApiError::new(err.to_string()))?;
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            positions_path: settings.positions_path.clone(),
            receivers_path: settings.receivers_path.clone(),
            device_info_path: settings.device_info_path.clone(),
            track_path: settings.track_path.clone(),
        })
    }

    async fn get_text(&self, url: Url, query: &[(&str, String)]) -> Result<String, ApiError> {
        let response = self.client.get(url.clone()).query(query).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::new(format!(
                "{} request failed with {}",
                url.path(),
                response.status()
            )));
        }
        Ok(response.text().await?)
    }

    async fn get_path(&self, path: &str, query: &[(&str, String)]) -> Result<String, ApiError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| ApiError::new(err.to_string()))?;
        self.get_text(url, query).await
    }
}

#[async_trait]
impl LiveApi for ApiClient {
    async fn aircraft(&self, query: AircraftQuery) -> Result<Vec<AircraftFix>, ApiError> {
        let body = self.get_path(&self.positions_path, &query.params()).await?;
        Ok(feed::parse_aircraft(&body)?)
    }

    async fn receivers(&self) -> Result<Vec<Receiver>, ApiError> {
        let body = self.get_path(&self.receivers_path, &[]).await?;
        Ok(feed::parse_receivers(&body)?)
    }

    async fn device_info(
        &self,
        key: AircraftKey,
        flarm_id: FlarmId,
    ) -> Result<DeviceInfo, ApiError> {
        tracing::debug!(aircraft = %key, "requesting device info");
        let body = self
            .get_path(
                &self.device_info_path,
                &[("i", key.to_string()), ("f", flarm_id.to_string())],
            )
            .await?;
        Ok(feed::parse_device_info(&body)?)
    }

    async fn track(&self, key: AircraftKey, longitude: f64) -> Result<TrackReply, ApiError> {
        let body = self
            .get_path(
                &self.track_path,
                &[("id", key.to_string()), ("l", longitude.to_string())],
            )
            .await?;
        Ok(feed::parse_track(&body)?)
    }

    async fn task(&self, url: String) -> Result<String, ApiError> {
        // Relative task URLs resolve against the live backend.
        let url = Url::parse(&url)
            .or_else(|_| self.base_url.join(&url))
            .map_err(|err| ApiError::new(format!("bad task url {url}: {err}")))?;
        self.get_text(url, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aircraft_query_parameters() {
        let mut query = AircraftQuery {
            include_offline: false,
            bounds: None,
            utc_offset_hours: 2,
            device_types: DeviceTypes::all(),
        };
        assert_eq!(
            query.params(),
            vec![("a", "0".to_string()), ("z", "2".to_string())]
        );

        query.include_offline = true;
        query.device_types = DeviceTypes::from_bits(DeviceTypes::FLARM);
        query.bounds = Some(BoundingBox {
            north: 47.5,
            south: 45.0,
            east: 8.0,
            west: -1.25,
        });
        let params = query.params();
        let keys: Vec<_> = params.iter().map(|(key, _)| *key).collect();
        assert_eq!(keys, ["a", "b", "c", "d", "e", "z", "y"]);
        assert_eq!(params[0].1, "1");
        assert_eq!(params[4].1, "-1.25");
        assert_eq!(params[6].1, "2");
    }

    #[test]
    fn not_found_is_kept_from_feed_errors() {
        let error = ApiError::from(OgnError::new(ogn_core::ErrorCode::NotFound, "no track"));
        assert!(error.not_found);
        assert!(!ApiError::new("timeout").not_found);
    }
}
