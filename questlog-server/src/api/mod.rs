//! HTTP/JSON API Layer
//!
//! ## Architecture
//! ```text
//! Web client
//!       ↓ HTTP POST, JSON body carrying user_id
//! Axum Router (default port 8080)
//!       ↓
//! Handlers (stats, quests, dailies, skills, profile, calendar, chat, events)
//!       ↓
//! Services → StorageManager (PostgreSQL or memory) + TextGenerator
//! ```
//!
//! ## Response Convention
//! Successful calls answer `200` with `{"success": true, ...}`. Failures
//! carry `{"success": false, "error": <code>, "failure_reason": <text>}`
//! with the status from [`crate::error::ServiceError::status`]. A business rejection such
//! as spending a point you do not have is still a `200`.
//! `POST /api/chat` keeps its own `{response}` / `{error}` shape.

pub mod calendar;
pub mod chat;
pub mod dailies;
pub mod events;
pub mod profile;
pub mod quests;
pub mod skills;
pub mod stats;

use axum::{extract::State, middleware, routing::get, Json, Router};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::ai::TextGenerator;
use crate::config::ServiceSettings;
use crate::events::EventBus;
use crate::inflight::InFlight;
use crate::metrics::ServerMetrics;
use crate::services::{AppContext, Services};
use crate::storage::repository::StorageManager;

/// Shared state available to all API handlers
#[derive(Clone)]
pub struct ApiState {
    pub services: Arc<Services>,
    /// Used directly by the chat endpoint
    pub generator: Arc<dyn TextGenerator>,
    /// Level-up broadcast, subscribed to by the SSE endpoint
    pub events: EventBus,
    /// Server-wide metrics (lock-free atomics)
    pub metrics: Arc<ServerMetrics>,
    pub backend: &'static str,
}

/// Wire services around a storage backend and a generator
pub fn build_state(
    storage: StorageManager,
    generator: Arc<dyn TextGenerator>,
    settings: ServiceSettings,
) -> ApiState {
    let backend = storage.backend;
    let events = EventBus::default();
    let metrics = ServerMetrics::new();
    let ctx = Arc::new(AppContext {
        storage,
        generator: generator.clone(),
        events: events.clone(),
        inflight: InFlight::new(),
        metrics: metrics.clone(),
        settings,
    });
    ApiState {
        services: Arc::new(Services::new(ctx)),
        generator,
        events,
        metrics,
        backend,
    }
}

// ============================================================================
// Shared Request/Response Types
// ============================================================================

/// Body of every endpoint that only needs to know who is asking
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user_id: Uuid,
}

/// Success envelope; `data` fields are inlined next to `success`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { success: true, data })
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`)
pub fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    storage: &'static str,
    generator: &'static str,
}

async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        storage: state.backend,
        generator: state.generator.name(),
    })
}

/// Build the full API router with all service endpoints
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(crate::metrics::prometheus_handler))
        .route("/metrics/json", get(crate::metrics::json_metrics_handler))
        .merge(chat::routes())
        .merge(stats::routes())
        .merge(quests::routes())
        .merge(dailies::routes())
        .merge(skills::routes())
        .merge(profile::routes())
        .merge(calendar::routes())
        .merge(events::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            crate::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API on the given port until `shutdown` resolves
pub async fn start_api_server<F>(
    state: ApiState,
    port: u16,
    shutdown: F,
) -> Result<(), std::io::Error>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}
