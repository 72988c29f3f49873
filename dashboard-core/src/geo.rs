//! Third-party location services: Nominatim (OpenStreetMap) geocoding and
//! ipapi.co IP geolocation. Both are free, keyless and rate limited, so
//! forward lookups go through [`GeocodeCache`].

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;
use std::{collections::HashMap, fmt::Debug, time::Duration};

use crate::{Config, error::GeoError, model::Coordinates};

const REQUEST_TIMEOUT_SECS: u64 = 10;

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Coordinates to a place name.
    async fn reverse(&self, coords: Coordinates) -> Result<String, GeoError>;

    /// Free-text query to the best matching coordinates.
    async fn search(&self, query: &str) -> Result<Coordinates, GeoError>;
}

#[async_trait]
pub trait IpLocator: Send + Sync + Debug {
    /// City of the caller's public IP address.
    async fn locate(&self) -> Result<String, GeoError>;
}

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    http: Client,
}

impl NominatimGeocoder {
    pub fn new(base_url: &str, user_agent: &str) -> Result<Self, GeoError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { base_url: base_url.trim_end_matches('/').to_string(), http })
    }

    pub fn from_config(config: &Config) -> Result<Self, GeoError> {
        Self::new(config.geocoder_url(), config.user_agent())
    }
}

#[derive(Debug, Deserialize)]
struct NominatimReverse {
    address: Option<NominatimAddress>,
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    county: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn reverse(&self, coords: Coordinates) -> Result<String, GeoError> {
        let res = self
            .http
            .get(format!("{}/reverse", self.base_url))
            .query(&[
                ("format", "json".to_string()),
                ("lat", coords.lat.to_string()),
                ("lon", coords.lon.to_string()),
                ("zoom", "10".to_string()),
            ])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(GeoError::Status(res.status()));
        }

        let body: NominatimReverse = res.json().await?;

        // Prefer city > town > village > county, then the feature name.
        // Blank values count as absent.
        let address = body.address.unwrap_or_default();
        let place = [address.city, address.town, address.village, address.county, body.name]
            .into_iter()
            .flatten()
            .find(|p| !p.trim().is_empty())
            .ok_or_else(|| GeoError::NotFound("Could not determine city name".into()))?;

        tracing::info!("Reverse geocoded to: {place}");
        Ok(place)
    }

    async fn search(&self, query: &str) -> Result<Coordinates, GeoError> {
        let res = self
            .http
            .get(format!("{}/search", self.base_url))
            .query(&[("format", "json"), ("q", query), ("limit", "1")])
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(GeoError::Status(res.status()));
        }

        let places: Vec<NominatimPlace> = res.json().await?;
        let first = places
            .into_iter()
            .next()
            .ok_or_else(|| GeoError::NotFound("Location not found".into()))?;

        let lat = first.lat.parse::<f64>();
        let lon = first.lon.parse::<f64>();
        match (lat, lon) {
            (Ok(lat), Ok(lon)) => Ok(Coordinates { lat, lon }),
            _ => Err(GeoError::NotFound(format!("Unparseable coordinates for '{query}'"))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IpApiLocator {
    url: String,
    http: Client,
}

impl IpApiLocator {
    pub fn new(url: &str, user_agent: &str) -> Result<Self, GeoError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(user_agent)
            .build()?;

        Ok(Self { url: url.to_string(), http })
    }

    pub fn from_config(config: &Config) -> Result<Self, GeoError> {
        Self::new(config.ip_locator_url(), config.user_agent())
    }
}

#[derive(Debug, Deserialize)]
struct IpLocationResponse {
    city: Option<String>,
}

#[async_trait]
impl IpLocator for IpApiLocator {
    async fn locate(&self) -> Result<String, GeoError> {
        let res = self.http.get(&self.url).send().await?;

        if !res.status().is_success() {
            return Err(GeoError::Status(res.status()));
        }

        let body: IpLocationResponse = res.json().await?;

        body.city
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| GeoError::NotFound("Could not determine location from IP".into()))
    }
}

/// Forward-geocode results for the current session, keyed by query text.
#[derive(Debug, Default)]
pub struct GeocodeCache {
    entries: Mutex<HashMap<String, Coordinates>>,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cache_key(location: &str, country: &str) -> String {
        if country.is_empty() { location.to_string() } else { format!("{location}, {country}") }
    }

    pub fn get(&self, query: &str) -> Option<Coordinates> {
        self.entries.lock().get(query).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached coordinates for `query`, looking them up on a miss.
    /// Failures are not cached so a later call can retry.
    pub async fn lookup(
        &self,
        geocoder: &dyn Geocoder,
        query: &str,
    ) -> Result<Coordinates, GeoError> {
        if let Some(hit) = self.get(query) {
            tracing::debug!(query, "geocode cache hit");
            return Ok(hit);
        }

        let coords = geocoder.search(query).await?;
        self.entries.lock().insert(query.to_string(), coords);
        Ok(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingGeocoder {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn reverse(&self, _coords: Coordinates) -> Result<String, GeoError> {
            Err(GeoError::NotFound("unused".into()))
        }

        async fn search(&self, _query: &str) -> Result<Coordinates, GeoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(GeoError::NotFound("Location not found".into()))
            } else {
                Ok(Coordinates { lat: 5.6037, lon: -0.187 })
            }
        }
    }

    #[test]
    fn cache_key_includes_country_when_present() {
        assert_eq!(GeocodeCache::cache_key("Accra", "GH"), "Accra, GH");
        assert_eq!(GeocodeCache::cache_key("Accra", ""), "Accra");
    }

    #[tokio::test]
    async fn lookup_hits_service_once_per_query() {
        let geocoder = CountingGeocoder::default();
        let cache = GeocodeCache::new();

        let a = cache.lookup(&geocoder, "Accra, GH").await.unwrap();
        let b = cache.lookup(&geocoder, "Accra, GH").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn failed_lookups_are_not_cached() {
        let geocoder = CountingGeocoder { fail: true, ..Default::default() };
        let cache = GeocodeCache::new();

        assert!(cache.lookup(&geocoder, "Atlantis").await.is_err());
        assert!(cache.lookup(&geocoder, "Atlantis").await.is_err());

        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }
}
