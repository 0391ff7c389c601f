//! Integration tests for the weatherapi.com provider and the forecast workflow
//! against a wiremock server.

use std::sync::Arc;

use citycast_core::{
    CitySuggestion, FileStore, ForecastRequest, ForecastState, ForecastWorkflow, LoadOutcome,
    Lookup, PreferenceStore, WeatherError, WeatherProvider, WorkflowSettings,
    provider::weatherapi::WeatherApiProvider,
};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to create a forecast.json body for `city` with `days` entries.
fn forecast_body(city: &str, country: &str, days: usize) -> serde_json::Value {
    let forecastday: Vec<serde_json::Value> = (0..days)
        .map(|i| {
            serde_json::json!({
                "date": format!("2026-10-{:02}", 18 + i),
                "date_epoch": 1_792_281_600 + i * 86_400,
                "day": {
                    "maxtemp_c": 31.0,
                    "mintemp_c": 23.5,
                    "avgtemp_c": 27.1,
                    "condition": {
                        "text": "Patchy rain nearby",
                        "icon": "//cdn/176.png",
                        "code": 1063
                    }
                },
                "astro": {
                    "sunrise": "05:42 AM",
                    "sunset": "05:39 PM",
                    "moonrise": "11:02 PM",
                    "moonset": "11:31 AM"
                },
                "hour": []
            })
        })
        .collect();

    serde_json::json!({
        "location": {
            "name": city,
            "region": "",
            "country": country,
            "lat": 8.48,
            "lon": 124.65,
            "tz_id": "Asia/Manila",
            "localtime": "2026-10-18 09:30"
        },
        "current": {
            "last_updated": "2026-10-18 09:15",
            "temp_c": 29.2,
            "feelslike_c": 33.8,
            "condition": {"text": "Partly cloudy", "icon": "//cdn/116.png", "code": 1003},
            "wind_kph": 9.4,
            "humidity": 74
        },
        "forecast": {"forecastday": forecastday}
    })
}

fn search_body() -> serde_json::Value {
    serde_json::json!([
        {"id": 2801268, "name": "London", "region": "City of London, Greater London",
         "country": "United Kingdom", "lat": 51.52, "lon": -0.11,
         "url": "london-city-of-london-greater-london-united-kingdom"},
        {"id": 315398, "name": "London", "region": "Ontario",
         "country": "Canada", "lat": 42.98, "lon": -81.25, "url": "london-ontario-canada"}
    ])
}

fn provider(server: &MockServer) -> WeatherApiProvider {
    WeatherApiProvider::new("TEST_KEY".to_string()).with_base_url(server.uri())
}

#[tokio::test]
async fn test_search_cities_success() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .and(query_param("key", "TEST_KEY"))
        .and(query_param("q", "Lond"))
        .respond_with(ResponseTemplate::new(200).set_body_json(search_body()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cities = provider(&mock_server).search_cities("Lond").await.unwrap();

    assert_eq!(cities.len(), 2);
    assert_eq!(cities[0].name, "London");
    assert_eq!(cities[0].country, "United Kingdom");
    assert_eq!(cities[1].region.as_deref(), Some("Ontario"));
    assert!(cities[1].coordinates.is_some());
}

#[tokio::test]
async fn test_search_cities_empty() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
        .mount(&mock_server)
        .await;

    let cities = provider(&mock_server).search_cities("Qqqx").await.unwrap();
    assert!(cities.is_empty());
}

#[tokio::test]
async fn test_get_forecast_requests_fourteen_days() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("q", "Cagayan de Oro City"))
        .and(query_param("days", "14"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body("Cagayan De Oro", "Philippines", 14)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let bundle = provider(&mock_server)
        .get_forecast(&ForecastRequest::new("Cagayan de Oro City"))
        .await
        .unwrap();

    assert_eq!(bundle.location.name, "Cagayan De Oro");
    assert_eq!(bundle.location.region, None);
    assert_eq!(bundle.current.temp_c, 29.2);
    assert_eq!(bundle.current.wind_kph, 9.4);
    assert_eq!(bundle.forecast_days.len(), 14);
    assert_eq!(bundle.today_sunrise(), Some("05:42 AM"));
    assert!(bundle.forecast_days.windows(2).all(|w| w[0].date < w[1].date));
}

#[tokio::test]
async fn test_unknown_city_maps_to_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": {"code": 1006, "message": "No matching location found."}
        })))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .get_forecast(&ForecastRequest::new("Atlantis"))
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::NotFound(ref c) if c == "Atlantis"));
}

#[tokio::test]
async fn test_bad_key_reports_status_and_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/search.json"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"code": 2006, "message": "API key is invalid."}
        })))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server).search_cities("Paris").await.unwrap_err();

    match err {
        WeatherError::Status { status, body } => {
            assert_eq!(status.as_u16(), 401);
            assert!(body.contains("API key is invalid"));
        }
        other => panic!("expected Status error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{\"location\": 1}"))
        .mount(&mock_server)
        .await;

    let err = provider(&mock_server)
        .get_forecast(&ForecastRequest::new("Paris"))
        .await
        .unwrap_err();

    assert!(matches!(err, WeatherError::Decode(_)));
}

fn file_workflow(server: &MockServer, store_path: &std::path::Path) -> ForecastWorkflow {
    ForecastWorkflow::new(
        Arc::new(provider(server)),
        PreferenceStore::new(Arc::new(FileStore::new(store_path))),
        WorkflowSettings::default(),
    )
}

#[tokio::test]
async fn test_selected_city_is_restored_on_next_start() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("preferences.json");

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("q", "Cagayan de Oro City"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_body("Cagayan De Oro", "Philippines", 14)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .and(query_param("q", "London"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(forecast_body("London", "United Kingdom", 14)),
        )
        .expect(2)
        .mount(&mock_server)
        .await;

    let first = file_workflow(&mock_server, &store_path);
    assert_eq!(first.initialize().await, LoadOutcome::Ready);
    assert_eq!(
        first.select_city(&CitySuggestion::new("London", "United Kingdom")).await,
        LoadOutcome::Ready
    );

    let prefs = PreferenceStore::new(Arc::new(FileStore::new(&store_path)));
    assert!(matches!(prefs.last_city().await, Lookup::Found(ref c) if c == "London"));

    let second = file_workflow(&mock_server, &store_path);
    assert_eq!(second.initialize().await, LoadOutcome::Ready);
    assert_eq!(second.snapshot().bundle().unwrap().location.name, "London");
}

#[tokio::test]
async fn test_server_error_then_retry() {
    let mock_server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join("preferences.json");

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/forecast.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body("Tokyo", "Japan", 14)))
        .mount(&mock_server)
        .await;

    let wf = file_workflow(&mock_server, &store_path);
    let tokyo = CitySuggestion::new("Tokyo", "Japan");

    assert_eq!(wf.select_city(&tokyo).await, LoadOutcome::Failed);
    match wf.snapshot().forecast {
        ForecastState::Failed(f) => assert!(f.message.contains("bad gateway")),
        other => panic!("expected Failed, got {other:?}"),
    }
    assert!(!store_path.exists());

    assert_eq!(wf.retry().await, Some(LoadOutcome::Ready));
    let prefs = PreferenceStore::new(Arc::new(FileStore::new(&store_path)));
    assert_eq!(prefs.last_city().await.into_option().as_deref(), Some("Tokyo"));
}
