//! Application startup and lifecycle management.

use crate::config::AgriConfig;
use crate::handlers;
use crate::services::providers::gemini::{GeminiConfig, GeminiProvider};
use crate::services::providers::GenerativeProvider;
use crate::services::{
    Advisor, ImageAnalyzer, InMemorySessionStore, RedisSessionStore, SessionStore, WeatherService,
};
use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    metrics_middleware, request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AgriConfig,
    pub advisor: Advisor,
    pub image_analyzer: ImageAnalyzer,
    pub weather: WeatherService,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Wire the services around an already-built provider and store.
    pub fn new(
        config: AgriConfig,
        provider: Arc<dyn GenerativeProvider>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, AppError> {
        let weather = WeatherService::new(&config.weather).map_err(|e| {
            tracing::error!("Failed to create weather client: {}", e);
            AppError::InternalError(e.into())
        })?;
        let advisor = Advisor::new(provider);

        Ok(Self {
            image_analyzer: ImageAnalyzer::new(advisor.clone()),
            advisor,
            weather,
            sessions,
            config,
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.http.max_upload_bytes;

    let api = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/analyze-crop", post(handlers::analyze_crop))
        .route("/chat", post(handlers::chat))
        .route("/farming-tips", get(handlers::farming_tips))
        .route("/market-prices", get(handlers::market_prices))
        .route("/diagnose", post(handlers::diagnose))
        .route("/compare-crops", post(handlers::compare_crops));

    Router::new()
        .nest("/api", api)
        .route("/metrics", get(handlers::metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(from_fn(metrics_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .with_state(state)
}

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the production provider and session store.
    pub async fn build(config: AgriConfig) -> Result<Self, AppError> {
        let provider = GeminiProvider::new(GeminiConfig {
            api_key: config.gemini.api_key.clone(),
            model: config.gemini.model.clone(),
            api_base: config.gemini.api_base.clone(),
            timeout: config.gemini.timeout,
        })
        .map_err(|e| {
            tracing::error!("Failed to initialize Gemini provider: {}", e);
            AppError::InternalError(e.into())
        })?;

        if provider.health_check().is_err() {
            tracing::warn!("GEMINI_API_KEY not configured - AI endpoints will fail");
        }
        tracing::info!(model = %config.gemini.model, "Initialized Gemini provider");

        let sessions: Arc<dyn SessionStore> = match &config.sessions.redis_url {
            Some(url) => Arc::new(
                RedisSessionStore::connect(url, config.sessions.ttl_seconds)
                    .await
                    .map_err(|e| AppError::InternalError(e.into()))?,
            ),
            None => {
                tracing::info!("REDIS_URL not set - chat sessions are kept in memory");
                Arc::new(InMemorySessionStore::new())
            }
        };

        let state = AppState::new(config, Arc::new(provider), sessions)?;
        Self::with_state(state).await
    }

    /// Bind a listener for an assembled state. Port 0 picks a random port.
    pub async fn with_state(state: AppState) -> Result<Self, AppError> {
        if !state.weather.is_configured() {
            tracing::warn!("WEATHER_API_KEY not configured - serving mock weather");
        }

        let addr = SocketAddr::from(([0, 0, 0, 0], state.config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind HTTP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!(
            environment = ?state.config.common.environment,
            "AgriAssist listening on port {}",
            port
        );

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until SIGINT/SIGTERM, then drain in-flight requests.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| {
                tracing::error!("HTTP server error: {}", e);
                e
            })
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
