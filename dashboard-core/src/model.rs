use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Free-text place name or a "lat,lon" pair. Passed to the API as-is.
pub type Location = String;

/// The API sends `null` for text it has no value for (e.g. `country` over
/// open sea). Treated the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainWeatherInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub main: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    /// Pre-formatted by the server, e.g. "29.2 °C".
    #[serde(default, deserialize_with = "null_as_default")]
    pub temp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SunriseAndSunset {
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodaysInsight {
    #[serde(deserialize_with = "null_as_default")]
    pub humidity: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pressure: String,
    #[serde(deserialize_with = "null_as_default")]
    pub wind_status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub visibility: String,
    #[serde(deserialize_with = "null_as_default")]
    pub air_quality: String,
    #[serde(deserialize_with = "null_as_default")]
    pub sunrise_and_sunset: SunriseAndSunset,
}

/// Current conditions for one location, replaced wholesale on every fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    pub main: MainWeatherInfo,
    #[serde(default, deserialize_with = "null_as_default")]
    pub todays_insight: TodaysInsight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    pub day: String,
    pub temp_min: f64,
    pub temp_max: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub main: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icon: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    /// Chronological, as returned by the API.
    pub forecast: Vec<ForecastDay>,
}

/// A snapshot persisted server-side. Ids are assigned by the server; every
/// other column may be null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub main: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub humidity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pressure: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub wind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub saved_on: String,
}

impl WeatherRecord {
    /// Parses `saved_on`, which the server sends either with an offset or as naive UTC.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.saved_on) {
            return Some(dt.with_timezone(&Utc));
        }

        NaiveDateTime::parse_from_str(&self.saved_on, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|ndt| ndt.and_utc())
    }
}

/// Body of `POST /records/save`: a record without the server-owned fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewWeatherRecord {
    pub location: String,
    pub country: String,
    pub main: String,
    pub description: String,
    pub temp: String,
    pub humidity: String,
    pub pressure: String,
    pub wind: String,
}

impl NewWeatherRecord {
    pub fn from_snapshot(snapshot: &WeatherSnapshot) -> Self {
        Self {
            location: snapshot.location.clone(),
            country: snapshot.country.clone(),
            main: snapshot.main.main.clone(),
            description: snapshot.main.description.clone(),
            temp: snapshot.main.temp.clone(),
            humidity: snapshot.todays_insight.humidity.clone(),
            pressure: snapshot.todays_insight.pressure.clone(),
            wind: snapshot.todays_insight.wind_status.clone(),
        }
    }
}

/// CSV payload returned by the export endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl CsvExport {
    pub fn file_name_for(id: Option<i64>) -> String {
        match id {
            Some(id) => format!("weather_record_{id}.csv"),
            None => "weather_records.csv".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    /// The raw "lat,lon" form used when no place name is available.
    pub fn to_location(&self) -> Location {
        format!("{},{}", self.lat, self.lon)
    }

    pub fn osm_url(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lon}#map=12/{lat}/{lon}",
            lat = self.lat,
            lon = self.lon
        )
    }
}

impl std::str::FromStr for Coordinates {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| anyhow::anyhow!("Expected coordinates as 'lat,lon', got '{s}'"))?;

        let lat: f64 = lat.trim().parse()?;
        let lon: f64 = lon.trim().parse()?;

        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(anyhow::anyhow!("Coordinates out of range: {s}"));
        }

        Ok(Self { lat, lon })
    }
}
