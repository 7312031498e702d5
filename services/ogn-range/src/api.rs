use async_trait::async_trait;
use ogn_core::{DateRange, Station, StationName};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::coverage::TileKey;

#[derive(Debug)]
pub struct ApiError {
    pub message: String,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
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

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationList {
    #[serde(default)]
    pub stations: Vec<Station>,
}

/// Coverage samples for one 100 km square: `p` holds `"<offset>/<value>"`
/// pairs where the offset extends the square reference `t`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct TileResponse {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub p: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailsQuery {
    #[serde(rename = "ref")]
    pub reference: String,
}

/// One station that received signals from the clicked square.
#[derive(Debug, Clone, Deserialize)]
pub struct NearbyStation {
    pub s: StationName,
    #[serde(default)]
    pub l: f64,
    #[serde(default)]
    pub h: f64,
    #[serde(default)]
    pub a: f64,
    #[serde(default)]
    pub c: u64,
    #[serde(default)]
    pub g: u64,
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub last: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailsResponse {
    pub query: DetailsQuery,
    #[serde(default)]
    pub position: Vec<NearbyStation>,
}

#[async_trait]
pub trait RangeApi: Send + Sync {
    async fn stations(&self, range: DateRange) -> Result<StationList, ApiError>;
    async fn tile(&self, key: TileKey) -> Result<TileResponse, ApiError>;
    async fn details(&self, range: DateRange, position: String)
    -> Result<DetailsResponse, ApiError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|err| ApiError::new(err.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|err| ApiError::new(err.to_string()))?;
        let response = self.client.get(url).query(query).send().await?;
        if !response.status().is_success() {
            return Err(ApiError::new(format!(
                "{path} request failed with {}",
                response.status()
            )));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RangeApi for ApiClient {
    async fn stations(&self, range: DateRange) -> Result<StationList, ApiError> {
        let start = range.start_param();
        let end = range.end_param();
        self.get_json(
            "perl/stations2-filtered.pl",
            &[("start", start.as_str()), ("end", end.as_str())],
        )
        .await
    }

    async fn tile(&self, key: TileKey) -> Result<TileResponse, ApiError> {
        let start = key.range.start_param();
        let end = key.range.end_param();
        let path = format!("perl/{}-tile-mgrs.pl", key.source.as_str());
        tracing::debug!(tile = %key.tile, source = %key.source, "requesting coverage tile");
        self.get_json(
            &path,
            &[
                ("station", key.station.as_str()),
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("squares", key.tile.as_str()),
            ],
        )
        .await
    }

    async fn details(
        &self,
        range: DateRange,
        position: String,
    ) -> Result<DetailsResponse, ApiError> {
        let start = range.start_param();
        let end = range.end_param();
        self.get_json(
            "perl/details-mgrs.pl",
            &[
                ("start", start.as_str()),
                ("end", end.as_str()),
                ("position", position.as_str()),
            ],
        )
        .await
    }
}
