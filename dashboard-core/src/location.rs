//! Location detection with a three-tier fallback: device position, then IP
//! geolocation, then a caller-supplied default. Resolution never fails.

use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{
    error::PositionError,
    geo::{Geocoder, IpLocator},
    model::{Coordinates, Location},
    notify::Notifier,
};

pub const DEFAULT_LOCATION: &str = "London";
pub const POSITION_TIMEOUT: Duration = Duration::from_secs(10);

/// Device positioning (coarse accuracy is enough).
#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, PositionError>;
}

/// A position known up front, e.g. from `--coords` or the config file.
#[derive(Debug, Clone)]
pub struct StaticPosition {
    result: Result<Coordinates, PositionError>,
}

impl StaticPosition {
    pub fn at(coords: Coordinates) -> Self {
        Self { result: Ok(coords) }
    }

    pub fn unavailable() -> Self {
        Self { result: Err(PositionError::Unavailable) }
    }

    pub fn denied() -> Self {
        Self { result: Err(PositionError::PermissionDenied) }
    }

    pub fn from_option(coords: Option<Coordinates>) -> Self {
        coords.map_or_else(Self::unavailable, Self::at)
    }
}

#[async_trait]
impl PositionSource for StaticPosition {
    async fn current_position(&self) -> Result<Coordinates, PositionError> {
        self.result.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationTier {
    Gps,
    Ip,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub location: Location,
    pub tier: LocationTier,
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    position: Arc<dyn PositionSource>,
    geocoder: Arc<dyn Geocoder>,
    ip: Arc<dyn IpLocator>,
    notifier: Arc<dyn Notifier>,
    position_timeout: Duration,
}

impl LocationResolver {
    pub fn new(
        position: Arc<dyn PositionSource>,
        geocoder: Arc<dyn Geocoder>,
        ip: Arc<dyn IpLocator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self { position, geocoder, ip, notifier, position_timeout: POSITION_TIMEOUT }
    }

    pub fn with_position_timeout(mut self, timeout: Duration) -> Self {
        self.position_timeout = timeout;
        self
    }

    pub async fn resolve(&self, default_location: &str) -> Location {
        self.resolve_detailed(default_location).await.location
    }

    /// Like [`resolve`](Self::resolve) but also reports which tier answered.
    /// Emits at most one notification, and only when a fallback was used.
    pub async fn resolve_detailed(&self, default_location: &str) -> ResolvedLocation {
        let gps_error = match self.gps_location().await {
            Ok(location) => {
                return ResolvedLocation { location, tier: LocationTier::Gps };
            }
            Err(e) => e,
        };
        tracing::warn!("GPS location failed: {gps_error}");

        match self.ip.locate().await {
            Ok(city) => {
                let advisory =
                    if gps_error.is_denied() { "GPS access denied." } else { "GPS unavailable." };
                self.notifier.info(advisory);
                tracing::info!(location = %city, "location from IP lookup");
                ResolvedLocation { location: city, tier: LocationTier::Ip }
            }
            Err(ip_error) => {
                tracing::warn!("IP location failed: {ip_error}");
                self.notifier.warning(&format!(
                    "Could not detect location. Using {default_location} as default."
                ));
                ResolvedLocation { location: default_location.to_string(), tier: LocationTier::Default }
            }
        }
    }

    /// Succeeds whenever a position is obtained; the place name is best effort.
    async fn gps_location(&self) -> Result<Location, PositionError> {
        let coords = tokio::time::timeout(self.position_timeout, self.position.current_position())
            .await
            .map_err(|_| PositionError::Timeout)??;

        match self.geocoder.reverse(coords).await {
            Ok(place) => Ok(place),
            Err(e) => {
                tracing::debug!("Reverse geocoding failed, using raw coordinates: {e}");
                Ok(coords.to_location())
            }
        }
    }
}
