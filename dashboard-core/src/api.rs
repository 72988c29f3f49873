use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    error::ApiError,
    model::{CsvExport, Forecast, NewWeatherRecord, WeatherRecord, WeatherSnapshot},
};

pub mod http;

pub use http::HttpDashboardApi;

/// One method per endpoint of the weather dashboard REST API.
#[async_trait]
pub trait DashboardApi: Send + Sync + Debug {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherSnapshot, ApiError>;

    async fn fetch_forecast(&self, location: &str) -> Result<Forecast, ApiError>;

    async fn fetch_records(&self) -> Result<Vec<WeatherRecord>, ApiError>;

    /// A 404 from the server means "no matches" and yields an empty list.
    async fn filter_records(&self, location: &str) -> Result<Vec<WeatherRecord>, ApiError>;

    async fn fetch_record(&self, id: i64) -> Result<WeatherRecord, ApiError>;

    async fn save_record(&self, record: &NewWeatherRecord) -> Result<WeatherRecord, ApiError>;

    async fn delete_record(&self, id: i64) -> Result<(), ApiError>;

    /// CSV of all records, or of the single record `id`.
    async fn export_records(&self, id: Option<i64>) -> Result<CsvExport, ApiError>;
}

/// Construct the HTTP client from the configured base URL.
pub fn api_from_config(config: &Config) -> Result<HttpDashboardApi, ApiError> {
    HttpDashboardApi::new(config.api_url())
}
