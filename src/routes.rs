use axum::{
    extract::{ws::WebSocketUpgrade, Query, State},
    http::StatusCode,
    response::{Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::services::{ServeDir, ServeFile};

use crate::{
    broadcast::{Broadcaster, WebSocketSink},
    call_log::{CallLog, CallLogSnapshot},
    config::Config,
    database::{Database, WeatherLogRecord},
    weather::{types::WeatherReading, WeatherService},
};

const DEFAULT_HISTORY_LIMIT: i64 = 100;

// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub database: Arc<Database>,
    pub weather: Arc<WeatherService>,
    pub call_log: Arc<CallLog>,
    /// Parent of every push session's token; cancelled on shutdown.
    pub shutdown: CancellationToken,
}

// Request/Response types
#[derive(Debug, Deserialize)]
pub struct CoordsQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub total: usize,
    pub data: Vec<WeatherLogRecord>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub database: String,
    pub persist_failures: u64,
}

// Route handlers
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match state.database.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy", "ok".to_string()),
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", e.to_string())
        }
    };

    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            timestamp: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            database,
            persist_failures: state.weather.persist_failures(),
        }),
    )
}

/// One-shot reading for a map click. Always answers 200 once the query parses.
pub async fn get_weather(
    State(state): State<AppState>,
    Query(params): Query<CoordsQuery>,
) -> Json<WeatherReading> {
    // Recorded as a success even when the reading turns out to be a fallback.
    state.call_log.record(
        &format!("/weather?lat={:.2}&lon={:.2}", params.lat, params.lon),
        "GET",
        "success",
    );

    let reading = state.weather.current_by_coords(params.lat, params.lon).await;
    if reading.is_fallback() {
        tracing::debug!("Serving fallback reading for ({}, {})", params.lat, params.lon);
    }
    Json(reading)
}

pub async fn weather_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| async move {
        tracing::info!("WebSocket client connected");
        let broadcaster = Broadcaster::new(state.weather.clone(), state.config.update_interval);
        let mut sink = WebSocketSink::new(socket);
        broadcaster.run(&mut sink, state.shutdown.child_token()).await;
    })
}

pub async fn get_logs(State(state): State<AppState>) -> Json<CallLogSnapshot> {
    Json(state.call_log.snapshot())
}

pub async fn get_weather_history(
    State(state): State<AppState>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);

    match state.database.recent(limit).await {
        Ok(data) => Ok(Json(HistoryResponse {
            total: data.len(),
            data,
        })),
        Err(e) => {
            tracing::error!("Failed to load weather history: {}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            ))
        }
    }
}

// Create the router
pub fn create_router(state: AppState) -> Router {
    let router = Router::new()
        .route_service("/", ServeFile::new(&state.config.template_path))
        .route("/health", get(health))
        .route("/weather", get(get_weather))
        .route("/ws", get(weather_socket))
        .route("/api/logs", get(get_logs))
        .route("/api/weather-history", get(get_weather_history));

    let router = if state.config.read_only_deployment {
        tracing::info!("Read-only deployment, /static is not mounted");
        router
    } else {
        router.nest_service("/static", ServeDir::new(&state.config.static_dir))
    };

    router.with_state(state)
}
