//! Error types shared by the API client, the location resolver and the save workflow.

use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to the dashboard REST API.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-2xx response. `message` is already user-facing.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("{0}")]
    Export(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Text stored in a container's `error` field and shown in notifications.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status, .. } if *status == StatusCode::NOT_FOUND)
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Network(e) => e.status(),
            _ => None,
        }
    }
}

/// Device positioning failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    #[error("GPS access denied")]
    PermissionDenied,
    #[error("GPS position unavailable")]
    Unavailable,
    #[error("GPS request timed out")]
    Timeout,
}

impl PositionError {
    pub fn is_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Geocoding or IP lookup failure. Never escapes the location resolver.
#[derive(Error, Debug)]
pub enum GeoError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Lookup service returned status {0}")]
    Status(StatusCode),
    #[error("{0}")]
    NotFound(String),
}

/// Reasons a save request is rejected before or during the API call.
#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Location information is missing")]
    MissingLocation,

    #[error(
        "Please wait {} more minutes before saving data for {location} again",
        minutes_rounded_up(.remaining)
    )]
    CoolingDown { location: String, remaining: Duration },

    #[error("Missing weather data")]
    MissingWeatherData,

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl SaveError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

pub(crate) fn minutes_rounded_up(d: &Duration) -> u64 {
    d.as_millis().div_ceil(60_000) as u64
}
