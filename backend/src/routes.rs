//! HTTP route handlers for the webui backend.
//!
//! - `GET /webui/{*path}` - Handle a component request, answer its state
//! - `GET /health` - Health check endpoint
//!
//! # Architecture
//!
//! All routes share [`AppState`]: the component [`Manager`] behind a mutex
//! and the server start time for uptime reporting. Requests are handled one
//! at a time, in arrival order.
//!
//! # Example
//!
//! ```rust,no_run
//! use webui_backend::com::Manager;
//! use webui_backend::controls::Label;
//! use webui_backend::routes::{create_router, AppState};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut manager = Manager::new();
//!     manager.root().add_com("ok", Label::new("Open"));
//!     let app = create_router(AppState::new(manager));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use crate::com::{Input, Manager};
use crate::error::ServerError;

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all route handlers.
#[derive(Clone)]
pub struct AppState {
    /// Component tree answering `webui/` requests.
    pub manager: Arc<Mutex<Manager>>,

    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    #[must_use]
    pub fn new(manager: Manager) -> Self {
        Self {
            manager: Arc::new(Mutex::new(manager)),
            start_time: Instant::now(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("manager", &"<Manager>")
            .field("start_time", &self.start_time)
            .finish()
    }
}

// ============================================================================
// Router
// ============================================================================

/// Creates the application router with all routes configured.
///
/// Requests are traced and CORS is permissive, so a page served from
/// elsewhere can drive the components.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/webui/{*path}", get(get_webui))
        .route("/health", get(get_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Error Response Types
// ============================================================================

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let body = ErrorResponse::new(self.to_string()).with_code(self.code());
        (self.status_code(), Json(body)).into_response()
    }
}

// ============================================================================
// GET /webui/{*path} - Component Requests
// ============================================================================

/// GET /webui/{*path} - Handle a component request.
///
/// The path names the component (`reports/daily`), the query carries
/// `action` and its parameters. Answers the component's published state.
///
/// # Responses
///
/// - `200 OK` - JSON object with `type`, `name`, optional `notification`
///   and the component's attributes
/// - `404 Not Found` - Unknown component, or an action it does not handle
async fn get_webui(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Value>, ServerError> {
    let input = Input::new(params);
    debug!(path = %path, action = %input.action(), "Component request");

    let mut manager = state.manager.lock().await;
    match manager.handle_input(&path, &input) {
        Ok(out) => Ok(Json(Value::Object(out))),
        Err(err) => {
            warn!(path = %path, error = %err, "Component request failed");
            Err(err)
        }
    }
}

// ============================================================================
// GET /health - Health Check
// ============================================================================

/// Response body for health check endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Server status (always "ok" if responding).
    pub status: String,

    /// Number of registered components.
    pub components: usize,

    /// Server uptime in seconds.
    pub uptime_seconds: u64,
}

/// GET /health - Health check endpoint.
///
/// # Response
///
/// ```json
/// {
///   "status": "ok",
///   "components": 4,
///   "uptime_seconds": 3600
/// }
/// ```
async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = state.start_time.elapsed();
    let components = state.manager.lock().await.com_count();

    Json(HealthResponse {
        status: "ok".to_string(),
        components,
        uptime_seconds: uptime.as_secs(),
    })
}

// ============================================================================
// Tests
// ============================================================================
