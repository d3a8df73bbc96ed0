#![allow(dead_code)]

use agriassist_service::config::{
    AgriConfig, GeminiSettings, HttpSettings, SessionSettings, WeatherSettings,
};
use agriassist_service::services::providers::mock::MockProvider;
use agriassist_service::services::InMemorySessionStore;
use agriassist_service::startup::{AppState, Application};
use axum::Router;
use image::{DynamicImage, ImageFormat, RgbImage};
use secrecy::SecretString;
use service_core::config::{Config, Environment};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub provider: Arc<MockProvider>,
    pub sessions: Arc<InMemorySessionStore>,
}

pub fn test_config() -> AgriConfig {
    AgriConfig {
        common: Config {
            port: 0, // Random port
            environment: Environment::Development,
        },
        gemini: GeminiSettings {
            api_key: Some(SecretString::new("test-gemini-key".to_string())),
            model: "gemini-2.0-flash".to_string(),
            api_base: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(5),
        },
        weather: WeatherSettings {
            api_key: None,
            api_url: "http://127.0.0.1:9/data/2.5/weather".to_string(),
            timeout: Duration::from_secs(2),
            surface_degraded: false,
        },
        sessions: SessionSettings {
            redis_url: None,
            ttl_seconds: 60,
        },
        http: HttpSettings {
            max_upload_bytes: 1024 * 1024,
        },
        otlp_endpoint: None,
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(MockProvider::new(), |_| {}).await
    }

    pub async fn spawn_with_provider(provider: MockProvider) -> Self {
        Self::spawn_with(provider, |_| {}).await
    }

    pub async fn spawn_with<F>(provider: MockProvider, configure: F) -> Self
    where
        F: FnOnce(&mut AgriConfig),
    {
        let mut config = test_config();
        configure(&mut config);

        let provider = Arc::new(provider);
        let sessions = Arc::new(InMemorySessionStore::new());

        let state = AppState::new(config, provider.clone(), sessions.clone())
            .expect("Failed to build application state");
        let app = Application::with_state(state)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/api/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        TestApp {
            address,
            port,
            client,
            provider,
            sessions,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(&self, path: &str, body: &serde_json::Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_form(&self, path: &str, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::from_pixel(8, 8, image::Rgb([40, 160, 60])))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode test image");
    bytes
}

pub fn image_part(bytes: Vec<u8>) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(bytes)
        .file_name("leaf.png")
        .mime_str("image/png")
        .expect("Invalid MIME type")
}

/// Serve `router` on a random local port, returning its base URL.
pub async fn spawn_stub(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind stub server");
    let port = listener.local_addr().expect("No local address").port();

    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    format!("http://127.0.0.1:{}", port)
}
