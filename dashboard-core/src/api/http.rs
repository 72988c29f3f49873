use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url, header};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::ApiError,
    model::{CsvExport, Forecast, NewWeatherRecord, WeatherRecord, WeatherSnapshot},
};

use super::DashboardApi;

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    base_url: String,
    http: Client,
}

impl HttpDashboardApi {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let base_url = base_url.trim().trim_end_matches('/');
        Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;

        Ok(Self { base_url: base_url.to_string(), http: Client::new() })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// `/records/save` wraps the created record in `data`; older deployments return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaybeEnvelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeEnvelope<T> {
    fn into_inner(self) -> T {
        match self {
            MaybeEnvelope::Wrapped { data } => data,
            MaybeEnvelope::Bare(v) => v,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    detail: Option<String>,
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn fetch_weather(&self, location: &str) -> Result<WeatherSnapshot, ApiError> {
        tracing::debug!(location, "POST /weather");

        let res = self
            .http
            .post(self.url("/weather"))
            .json(&serde_json::json!({ "location": location }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(status_error(res.status(), "Failed to fetch weather data".into()));
        }

        read_json(res, "weather").await
    }

    async fn fetch_forecast(&self, location: &str) -> Result<Forecast, ApiError> {
        tracing::debug!(location, "POST /forecast");

        let res = self
            .http
            .post(self.url("/forecast"))
            .json(&serde_json::json!({ "location": location }))
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(status_error(res.status(), "Failed to fetch forecast data".into()));
        }

        read_json(res, "forecast").await
    }

    async fn fetch_records(&self) -> Result<Vec<WeatherRecord>, ApiError> {
        tracing::debug!("GET /records");

        let res = self.http.get(self.url("/records")).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(status_error(
                status,
                format!("Failed to fetch records: {}", status_text(status)),
            ));
        }

        let envelope: DataEnvelope<Vec<WeatherRecord>> = read_json(res, "records").await?;
        Ok(envelope.data)
    }

    async fn filter_records(&self, location: &str) -> Result<Vec<WeatherRecord>, ApiError> {
        tracing::debug!(location, "GET /records/filter");

        let res = self
            .http
            .get(self.url("/records/filter"))
            .query(&[("location", location)])
            .send()
            .await?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(
                status,
                format!("Failed to filter records: {}", status_text(status)),
            ));
        }

        let envelope: DataEnvelope<Vec<WeatherRecord>> = read_json(res, "filtered records").await?;
        Ok(envelope.data)
    }

    async fn fetch_record(&self, id: i64) -> Result<WeatherRecord, ApiError> {
        tracing::debug!(id, "GET /records/{{id}}");

        let res = self.http.get(self.url(&format!("/records/{id}"))).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(status_error(
                status,
                format!("Failed to fetch record {id}: {}", status_text(status)),
            ));
        }

        let envelope: DataEnvelope<WeatherRecord> = read_json(res, "record").await?;
        Ok(envelope.data)
    }

    async fn save_record(&self, record: &NewWeatherRecord) -> Result<WeatherRecord, ApiError> {
        tracing::debug!(location = %record.location, "POST /records/save");

        let res = self.http.post(self.url("/records/save")).json(record).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(status_error(
                status,
                format!("Failed to save record: {}", status_text(status)),
            ));
        }

        let saved: MaybeEnvelope<WeatherRecord> = read_json(res, "saved record").await?;
        Ok(saved.into_inner())
    }

    async fn delete_record(&self, id: i64) -> Result<(), ApiError> {
        tracing::debug!(id, "DELETE /records/{{id}}");

        let res = self.http.delete(self.url(&format!("/records/{id}"))).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(status_error(
                status,
                format!("Failed to delete record {id}: {}", status_text(status)),
            ));
        }

        Ok(())
    }

    async fn export_records(&self, id: Option<i64>) -> Result<CsvExport, ApiError> {
        tracing::debug!(?id, "GET /records/export");

        let mut req = self
            .http
            .get(self.url("/records/export"))
            .header(header::ACCEPT, "application/json");
        if let Some(id) = id {
            req = req.query(&[("id", id)]);
        }

        let res = req.send().await?;
        let status = res.status();

        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(ApiError::Export(export_error_message(status, &body)));
        }

        // The server reports "nothing to export" as JSON even on some 200 responses.
        if is_json(&res) {
            let body = res.text().await?;
            let message =
                error_detail(&body).unwrap_or_else(|| "Invalid export data received".to_string());
            return Err(ApiError::Export(message));
        }

        let content = res.bytes().await?.to_vec();

        Ok(CsvExport { file_name: CsvExport::file_name_for(id), content })
    }
}

fn status_error(status: StatusCode, message: String) -> ApiError {
    tracing::warn!(%status, "{message}");
    ApiError::Status { status, message }
}

fn status_text(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown status")
}

fn is_json(res: &Response) -> bool {
    res.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}

/// A JSON body speaks for itself (its `detail`, else the generic message);
/// only a non-JSON body falls back to the status text.
fn export_error_message(status: StatusCode, body: &str) -> String {
    const FALLBACK: &str = "Failed to export data";

    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => json
            .get("detail")
            .and_then(|d| d.as_str())
            .filter(|d| !d.is_empty())
            .unwrap_or(FALLBACK)
            .to_string(),
        Err(_) => status.canonical_reason().unwrap_or(FALLBACK).to_string(),
    }
}

fn error_detail(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorDetail>(body).ok()?.detail.filter(|d| !d.is_empty())
}

async fn read_json<T: DeserializeOwned>(res: Response, what: &str) -> Result<T, ApiError> {
    let body = res.text().await?;

    serde_json::from_str(&body).map_err(|e| {
        ApiError::Decode(format!("Failed to parse {what} JSON: {e}: {}", truncate_body(&body)))
    })
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let api = HttpDashboardApi::new("https://example.com/api/").unwrap();
        assert_eq!(api.url("/records"), "https://example.com/api/records");
    }

    #[test]
    fn error_detail_extracts_non_empty_detail() {
        assert_eq!(
            error_detail(r#"{"detail":"No records found for export."}"#).as_deref(),
            Some("No records found for export.")
        );
        assert!(error_detail(r#"{"detail":""}"#).is_none());
        assert!(error_detail("<html>").is_none());
    }

    #[test]
    fn export_error_prefers_json_over_status_text() {
        let status = StatusCode::SERVICE_UNAVAILABLE;

        assert_eq!(
            export_error_message(status, r#"{"detail":"No records found for export."}"#),
            "No records found for export."
        );
        assert_eq!(export_error_message(status, r#"{"error":"busy"}"#), "Failed to export data");
        assert_eq!(export_error_message(status, r#"{"detail":""}"#), "Failed to export data");
        assert_eq!(export_error_message(status, "upstream down"), "Service Unavailable");
        assert_eq!(
            export_error_message(StatusCode::from_u16(599).unwrap(), ""),
            "Failed to export data"
        );
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "°".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn envelope_accepts_wrapped_and_bare_records() {
        let record = serde_json::json!({
            "id": 9, "location": "Accra", "country": "GH", "main": "Clouds",
            "description": "Overcast", "temp": "28", "humidity": "80",
            "pressure": "1010", "wind": "3.2", "saved_on": "2025-01-01T00:00:00"
        });

        let wrapped: MaybeEnvelope<WeatherRecord> =
            serde_json::from_value(serde_json::json!({ "success": true, "data": record.clone() }))
                .unwrap();
        assert_eq!(wrapped.into_inner().id, 9);

        let bare: MaybeEnvelope<WeatherRecord> = serde_json::from_value(record).unwrap();
        assert_eq!(bare.into_inner().id, 9);
    }
}
