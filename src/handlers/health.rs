//! Health check and service description.
//!
//! # Endpoints
//!
//! - `GET /health` - Liveness check for the hosting platform
//! - `GET /` - Machine-readable list of endpoints
//!
//! Neither route passes through the Access Gate or the Admission Limiter.

use axum::Json;
use axum::extract::State;
use tracing::instrument;

use crate::models::{EndpointInfo, HealthResponse, ServiceInfo};
use crate::state::AppState;

/// Health check endpoint. Always 200.
///
/// # Response Body
///
/// ```json
/// {
///   "status": "healthy",
///   "message": "Voice agent backend is running!",
///   "version": "0.1.0",
///   "uptime_seconds": 42
/// }
/// ```
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        message: "Voice agent backend is running!".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
    })
}

/// Service description.
pub async fn index() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            EndpointInfo {
                method: "GET",
                path: "/health",
                description: "Health check",
                requires_api_key: false,
            },
            EndpointInfo {
                method: "POST",
                path: "/search",
                description: "Search the web and read back the top results",
                requires_api_key: true,
            },
            EndpointInfo {
                method: "POST",
                path: "/weather",
                description: "Current weather for a location",
                requires_api_key: true,
            },
            EndpointInfo {
                method: "POST",
                path: "/time",
                description: "Current local time for a location",
                requires_api_key: true,
            },
        ],
    })
}
