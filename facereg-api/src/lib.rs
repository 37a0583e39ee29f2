//! facereg-api library interface
//!
//! Exposes the router and state for the binary and for integration tests.

pub mod api;
pub mod cli;
pub mod db;
pub mod error;
pub mod push;
pub mod services;

pub use crate::error::{ApiError, ApiResult, RelayError};

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::services::{ChatLink, InferenceClient};

/// Frames arrive as base64 data URIs
pub const BODY_LIMIT_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Encoding record store
    pub db: SqlitePool,
    /// Face inference collaborator
    pub inference: InferenceClient,
    /// Chat collaborator; `None` when chat is disabled or unreachable at start
    pub chat: Option<ChatLink>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, inference: InferenceClient, chat: Option<ChatLink>) -> Self {
        Self {
            db,
            inference,
            chat,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router without CORS
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/face/register", post(api::register_face))
        .route("/api/face/registered", get(api::list_registrations))
        .route("/api/face/allUsers", get(api::all_users))
        .route("/api/recognition/recognize", post(api::recognize_faces))
        .route("/ws", get(api::ws_handler))
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// CORS restricted to the front-end origin
///
/// An origin that is not a valid header value falls back to allowing any
/// origin, with a warning.
pub fn cors_layer(frontend_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(e) => {
            warn!(frontend_url, "Invalid CORS origin ({}), allowing any origin", e);
            layer.allow_origin(Any)
        }
    }
}
