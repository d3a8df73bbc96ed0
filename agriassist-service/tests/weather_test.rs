mod common;

use agriassist_service::config::WeatherSettings;
use agriassist_service::models::{MockReason, WeatherReading, WeatherSnapshot};
use agriassist_service::services::providers::mock::MockProvider;
use agriassist_service::services::WeatherService;
use axum::{extract::Query, http::StatusCode, routing::get, Json, Router};
use common::{image_part, png_bytes, spawn_stub, TestApp};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

async fn openweather(Query(params): Query<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    if params.get("appid").map(String::as_str) != Some("test-weather-key")
        || params.get("units").map(String::as_str) != Some("metric")
    {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "cod": 401 })));
    }

    let city = params.get("q").cloned().unwrap_or_default();
    (
        StatusCode::OK,
        Json(json!({
            "name": city,
            "weather": [{ "main": "Rain", "description": "moderate rain" }],
            "main": { "temp": 18.4, "humidity": 88 },
            "wind": { "speed": 2.6 }
        })),
    )
}

fn settings(api_url: String, api_key: &str) -> WeatherSettings {
    WeatherSettings {
        api_key: Some(SecretString::new(api_key.to_string())),
        api_url,
        timeout: Duration::from_secs(2),
        surface_degraded: false,
    }
}

#[tokio::test]
async fn live_reading_maps_provider_fields() {
    let base = spawn_stub(Router::new().route("/weather", get(openweather))).await;
    let service =
        WeatherService::new(&settings(format!("{}/weather", base), "test-weather-key")).unwrap();

    let reading = service.get_weather("Eldoret").await;

    assert_eq!(
        reading,
        WeatherReading::Live(WeatherSnapshot {
            temperature: 18.4,
            humidity: 88.0,
            description: "moderate rain".to_string(),
            wind_speed: 2.6,
        })
    );
    let body = serde_json::to_value(&reading).unwrap();
    assert!(body.get("note").is_none());
}

#[tokio::test]
async fn provider_error_status_falls_back_to_mock() {
    let base = spawn_stub(Router::new().route("/weather", get(openweather))).await;
    let service = WeatherService::new(&settings(format!("{}/weather", base), "wrong-key")).unwrap();

    let reading = service.get_weather("Eldoret").await;

    assert_eq!(reading, WeatherReading::mock(MockReason::ProviderFailure));
    let body = serde_json::to_value(&reading).unwrap();
    assert_eq!(body["note"], "Mock data - configure WEATHER_API_KEY for live data");
}

#[tokio::test]
async fn malformed_body_falls_back_to_mock() {
    let base = spawn_stub(Router::new().route(
        "/weather",
        get(|| async { Json(json!({ "message": "city not found" })) }),
    ))
    .await;
    let service =
        WeatherService::new(&settings(format!("{}/weather", base), "test-weather-key")).unwrap();

    assert!(service.get_weather("Atlantis").await.is_mock());
}

#[tokio::test]
async fn slow_provider_hits_timeout() {
    let base = spawn_stub(Router::new().route(
        "/weather",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Json(json!({}))
        }),
    ))
    .await;
    let mut settings = settings(format!("{}/weather", base), "test-weather-key");
    settings.timeout = Duration::from_millis(200);
    let service = WeatherService::new(&settings).unwrap();

    assert_eq!(
        service.get_weather("Kitale").await,
        WeatherReading::mock(MockReason::ProviderFailure)
    );
}

#[tokio::test]
async fn live_weather_flows_into_crop_analysis() {
    let base = spawn_stub(Router::new().route("/weather", get(openweather))).await;
    let app = TestApp::spawn_with(MockProvider::new(), |config| {
        config.weather = settings(format!("{}/weather", base), "test-weather-key");
        config.weather.surface_degraded = true;
    })
    .await;

    let form = reqwest::multipart::Form::new()
        .part("image", image_part(png_bytes()))
        .text("location", "Eldoret");
    let response = app.post_form("/api/analyze-crop", form).await;

    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["weather"]["description"], "moderate rain");
    assert_eq!(body["weather_source"], "live");

    let requests = app.provider.requests();
    let prompt = match &requests[0].contents[0].parts[0] {
        agriassist_service::services::providers::Part::Text(text) => text.clone(),
        _ => panic!("prompt should lead with text"),
    };
    assert!(prompt.contains("Current weather in Eldoret:"));
    assert!(prompt.contains("- Temperature: 18.4°C"));
}
