//! Plain-text rendering of the dashboard views.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use dashboard_core::{
    Forecast, WeatherRecord, WeatherSnapshot,
    location::{LocationTier, ResolvedLocation},
    model::{Coordinates, TodaysInsight},
    notify::{Notification, NotificationLevel, Notifier},
};

/// Prints notifications to stderr, one line each, and traces them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        tracing::debug!(level = %notification.level, "{}", notification.message);

        let tag = match notification.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Error => "error",
            NotificationLevel::Loading => "..",
            NotificationLevel::Info => "info",
            NotificationLevel::Warning => "warn",
        };
        eprintln!("[{tag}] {}", notification.message);
    }
}

pub fn weather_card(snapshot: &WeatherSnapshot) -> String {
    let mut out = String::new();
    let place = place_name(&snapshot.location, &snapshot.country);

    let _ = writeln!(out, "{place}");
    let _ = writeln!(out, "  {}  {}", snapshot.main.temp, snapshot.main.main);
    let _ = writeln!(out, "  {}", snapshot.main.description);
    out
}

pub fn highlights(insight: &TodaysInsight) -> String {
    let mut out = String::from("Today's Highlights\n");
    let sun = &insight.sunrise_and_sunset;

    let rows = [
        ("Humidity", metric(&insight.humidity, "%")),
        ("Wind Status", metric(&insight.wind_status, "km/h")),
        ("Visibility", metric(&insight.visibility, "km")),
        ("Pressure", metric(&insight.pressure, "hPa")),
        ("Air Quality", metric(&insight.air_quality, "")),
        ("Sunrise", sun.sunrise.clone().unwrap_or_else(|| "N/A".into())),
        ("Sunset", sun.sunset.clone().unwrap_or_else(|| "N/A".into())),
    ];

    for (title, value) in rows {
        let _ = writeln!(out, "  {title:<12} {value}");
    }
    out
}

pub fn forecast_table(forecast: &Forecast) -> String {
    if forecast.forecast.is_empty() {
        return "No forecast available\n".to_string();
    }

    let mut out = String::from("Forecast\n");
    for day in &forecast.forecast {
        let _ = writeln!(
            out,
            "  {:<4} {:>4}°C {:>4}°C  {}",
            day.day,
            day.temp_max.round() as i64,
            day.temp_min.round() as i64,
            day.description
        );
    }
    out
}

pub fn records_table(records: &[WeatherRecord]) -> String {
    if records.is_empty() {
        return "No records found\n".to_string();
    }

    let mut out = String::new();
    for record in records {
        let _ = writeln!(
            out,
            "#{:<5} {:<28} {:>9}  {:<22} {} - {}",
            record.id,
            place_name(&record.location, &record.country),
            record.temp,
            saved_on(record),
            record.main,
            record.description
        );
    }
    out
}

/// Metric grid plus a map line. `map` is `None` when the location could not
/// be geocoded.
pub fn record_detail(record: &WeatherRecord, map: Option<Coordinates>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", place_name(&record.location, &record.country));
    let _ = writeln!(out, "Saved {}", saved_on(record));
    let _ = writeln!(out);

    let rows = [
        ("Temperature", metric(&record.temp, "°C")),
        ("Humidity", metric(&record.humidity, "%")),
        ("Wind Speed", metric(&record.wind, "m/s")),
        ("Pressure", metric(&record.pressure, "hPa")),
        ("Conditions", record.description.clone()),
    ];
    for (title, value) in rows {
        let _ = writeln!(out, "  {title:<12} {value}");
    }

    let _ = writeln!(out);
    match map {
        Some(coords) => {
            let _ = writeln!(out, "Map: {}", coords.osm_url());
        }
        None => {
            let _ = writeln!(out, "Map unavailable");
        }
    }
    out
}

pub fn resolved_location(resolved: &ResolvedLocation) -> String {
    let source = match resolved.tier {
        LocationTier::Gps => "device position",
        LocationTier::Ip => "IP lookup",
        LocationTier::Default => "default",
    };
    format!("{} (from {source})\n", resolved.location)
}

/// Human-readable save time, or the raw server value when it doesn't parse.
pub fn saved_on(record: &WeatherRecord) -> String {
    record
        .saved_at()
        .map(format_timestamp)
        .unwrap_or_else(|| record.saved_on.clone())
}

fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.format("%b %-d, %Y %H:%M UTC").to_string()
}

fn place_name(location: &str, country: &str) -> String {
    if country.is_empty() { location.to_string() } else { format!("{location}, {country}") }
}

/// Appends `unit` unless the server already did.
fn metric(value: &str, unit: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        return "N/A".to_string();
    }
    if unit.is_empty() || value.ends_with(unit) {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashboard_core::{ForecastDay, model::MainWeatherInfo};

    fn record() -> WeatherRecord {
        WeatherRecord {
            id: 12,
            location: "Accra".into(),
            country: "GH".into(),
            main: "Clouds".into(),
            description: "Broken Clouds".into(),
            temp: "29.2 °C".into(),
            humidity: "78".into(),
            pressure: "1011".into(),
            wind: "4.1".into(),
            saved_on: "2025-03-01T10:15:30".into(),
        }
    }

    #[test]
    fn detail_shows_units_and_map_link() {
        let out = record_detail(&record(), Some(Coordinates { lat: 5.56, lon: -0.2057 }));

        assert!(out.starts_with("Accra, GH\n"));
        assert!(out.contains("Saved Mar 1, 2025 10:15"));
        assert!(out.contains("Temperature  29.2 °C\n"));
        assert!(out.contains("Humidity     78 %\n"));
        assert!(out.contains("Wind Speed   4.1 m/s\n"));
        assert!(out.contains("Conditions   Broken Clouds\n"));
        assert!(out.contains("https://www.openstreetmap.org/?mlat=5.56&mlon=-0.2057"));
    }

    #[test]
    fn detail_without_coordinates_says_map_unavailable() {
        let out = record_detail(&record(), None);
        assert!(out.ends_with("Map unavailable\n"));
    }

    #[test]
    fn unparsable_saved_on_is_shown_verbatim() {
        let mut r = record();
        r.saved_on = "yesterday".into();
        assert_eq!(saved_on(&r), "yesterday");
    }

    #[test]
    fn forecast_rounds_temperatures() {
        let forecast = Forecast {
            location: "Accra".into(),
            country: "GH".into(),
            forecast: vec![ForecastDay {
                date: "2025-03-02".into(),
                day: "SUN".into(),
                temp_min: 23.6,
                temp_max: 31.4,
                description: "Light Rain".into(),
                main: "Rain".into(),
                icon: "10d".into(),
            }],
        };

        let out = forecast_table(&forecast);
        assert!(out.contains("SUN    31°C   24°C  Light Rain"));
        assert_eq!(forecast_table(&Forecast::default()), "No forecast available\n");
    }

    #[test]
    fn card_and_highlights_fill_missing_values() {
        let snapshot = WeatherSnapshot {
            location: "London".into(),
            country: "GB".into(),
            main: MainWeatherInfo {
                main: "Rain".into(),
                description: "Light Rain".into(),
                temp: "11.0 °C".into(),
                icon: "10d".into(),
            },
            todays_insight: TodaysInsight { humidity: "90".into(), ..Default::default() },
        };

        assert!(weather_card(&snapshot).starts_with("London, GB\n  11.0 °C  Rain\n"));
        let h = highlights(&snapshot.todays_insight);
        assert!(h.contains("Humidity     90 %"));
        assert!(h.contains("Sunrise      N/A"));
        assert!(h.contains("Pressure     N/A"));
    }
}
