//! Location detection against mocked Nominatim and IP lookup services.

use std::sync::Arc;

use dashboard_core::{
    LocationResolver, StaticPosition,
    geo::{GeocodeCache, Geocoder, IpApiLocator, IpLocator, NominatimGeocoder},
    location::LocationTier,
    model::Coordinates,
    notify::{MemoryNotifier, NotificationLevel},
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const UA: &str = "WeatherApp/1.0";
const ACCRA: Coordinates = Coordinates { lat: 5.6037, lon: -0.187 };

fn resolver_for(
    server: &MockServer,
    position: StaticPosition,
) -> (LocationResolver, Arc<MemoryNotifier>) {
    let geocoder = NominatimGeocoder::new(&server.uri(), UA).unwrap();
    let ip = IpApiLocator::new(&format!("{}/json/", server.uri()), UA).unwrap();
    let notifier = Arc::new(MemoryNotifier::new());

    let resolver = LocationResolver::new(
        Arc::new(position),
        Arc::new(geocoder),
        Arc::new(ip),
        notifier.clone(),
    );
    (resolver, notifier)
}

#[tokio::test]
async fn reverse_geocode_prefers_city_then_town() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("format", "json"))
        .and(query_param("zoom", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Osu",
            "address": { "town": "Osu", "city": "Accra", "county": "Greater Accra" }
        })))
        .mount(&mock_server)
        .await;

    let geocoder = NominatimGeocoder::new(&mock_server.uri(), UA).unwrap();
    let place = geocoder.reverse(ACCRA).await.unwrap();

    assert_eq!(place, "Accra");
}

#[tokio::test]
async fn reverse_geocode_falls_back_to_name() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Lake Volta",
            "address": {}
        })))
        .mount(&mock_server)
        .await;

    let geocoder = NominatimGeocoder::new(&mock_server.uri(), UA).unwrap();
    assert_eq!(geocoder.reverse(ACCRA).await.unwrap(), "Lake Volta");
}

#[tokio::test]
async fn reverse_geocode_skips_blank_candidates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "Volta Lake",
            "address": { "city": "", "town": "  ", "village": "Yeji", "county": "Pru" }
        })))
        .mount(&mock_server)
        .await;

    let geocoder = NominatimGeocoder::new(&mock_server.uri(), UA).unwrap();
    assert_eq!(geocoder.reverse(ACCRA).await.unwrap(), "Yeji");
}

#[tokio::test]
async fn reverse_geocode_with_only_blank_values_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "",
            "address": { "city": "" }
        })))
        .mount(&mock_server)
        .await;

    let geocoder = NominatimGeocoder::new(&mock_server.uri(), UA).unwrap();
    let err = geocoder.reverse(ACCRA).await.unwrap_err();

    assert!(err.to_string().contains("Could not determine city name"));
}

#[tokio::test]
async fn forward_search_parses_string_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "Accra, GH"))
        .and(query_param("limit", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "lat": "5.5600", "lon": "-0.2057", "display_name": "Accra, Ghana" }
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let geocoder = NominatimGeocoder::new(&mock_server.uri(), UA).unwrap();
    let cache = GeocodeCache::new();

    let first = cache.lookup(&geocoder, "Accra, GH").await.unwrap();
    let second = cache.lookup(&geocoder, "Accra, GH").await.unwrap();

    assert_eq!(first, Coordinates { lat: 5.56, lon: -0.2057 });
    assert_eq!(first, second);
}

#[tokio::test]
async fn forward_search_without_results_fails() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let geocoder = NominatimGeocoder::new(&mock_server.uri(), UA).unwrap();
    let err = geocoder.search("Atlantis").await.unwrap_err();

    assert!(err.to_string().contains("Location not found"));
}

#[tokio::test]
async fn ip_lookup_requires_city() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "country": "GH",
            "loc": "5.6,-0.19"
        })))
        .mount(&mock_server)
        .await;

    let ip = IpApiLocator::new(&format!("{}/json/", mock_server.uri()), UA).unwrap();
    let err = ip.locate().await.unwrap_err();

    assert!(err.to_string().contains("Could not determine location from IP"));
}

#[tokio::test]
async fn gps_with_failed_reverse_lookup_returns_coordinates() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let (resolver, notifier) = resolver_for(&mock_server, StaticPosition::at(ACCRA));
    let resolved = resolver.resolve_detailed("London").await;

    assert_eq!(resolved.location, "5.6037,-0.187");
    assert_eq!(resolved.tier, LocationTier::Gps);
    assert!(notifier.notifications().is_empty());
}

#[tokio::test]
async fn denied_gps_uses_ip_city() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "city": "Kumasi",
            "country": "GH"
        })))
        .mount(&mock_server)
        .await;

    let (resolver, notifier) = resolver_for(&mock_server, StaticPosition::denied());
    let location = resolver.resolve("London").await;

    assert_eq!(location, "Kumasi");
    assert_eq!(notifier.messages(NotificationLevel::Info), vec!["GPS access denied."]);
}

#[tokio::test]
async fn all_tiers_failing_returns_default() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json/"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let (resolver, notifier) = resolver_for(&mock_server, StaticPosition::unavailable());
    let location = resolver.resolve("London").await;

    assert_eq!(location, "London");
    assert_eq!(
        notifier.messages(NotificationLevel::Warning),
        vec!["Could not detect location. Using London as default."]
    );
}
