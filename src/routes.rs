//! Application routing configuration with middleware stack.
//!
//! # Middleware Stack
//!
//! ```text
//! Request
//!    │
//!    ▼
//! ┌──────────────────┐
//! │   Request ID     │ ← Sets and echoes X-Request-Id
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │     Tracing      │ ← HTTP request/response logging
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   CORS / Limit   │ ← Cross-origin headers, body size cap
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │   Access Gate    │ ← 401 if key missing or unknown (protected routes)
//! └────────┬─────────┘
//!          ▼
//! ┌──────────────────┐
//! │ Admission Limiter│ ← 429 if window quota spent (protected routes)
//! └────────┬─────────┘
//!          ▼
//!      Handler
//! ```
//!
//! # Route Groups
//!
//! - `/`, `/health` - Public
//! - `/search`, `/weather`, `/time` - Protected

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers;
use crate::middleware::{ApiKeyAuth, RateLimitLayer};
use crate::state::AppState;

/// Build the application router with all routes and middleware configured.
///
/// The Access Gate and the Admission Limiter are attached with
/// `route_layer`, so unmatched paths answer 404 without touching either
/// and the public routes bypass both.
pub fn build_router(state: AppState) -> Router {
    let config = &state.config;

    let mut protected = Router::new()
        .route("/search", post(handlers::search))
        .route("/weather", post(handlers::weather))
        .route("/time", post(handlers::world_clock));

    // route_layer wraps outside-in: the layer added last runs first
    match &state.limiter {
        Some(limiter) => {
            info!(
                limit = limiter.limit(),
                window_secs = limiter.window().as_secs(),
                proxy_headers_trusted = state.trusted_proxies.is_enabled(),
                "Rate limiting enabled"
            );
            protected = protected.route_layer(RateLimitLayer::new(
                limiter.clone(),
                state.trusted_proxies.clone(),
            ));
        }
        None => info!("Rate limiting disabled (RATE_LIMIT_REQUESTS=0)"),
    }

    info!(keys = state.registry.len(), "API key authentication enabled");
    protected = protected.route_layer(ApiKeyAuth::new(
        state.registry.clone(),
        state.trusted_proxies.clone(),
    ));

    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health_check))
        .merge(protected);

    info!(
        max_size_kb = config.max_request_body_size / 1024,
        "Request body size limit configured"
    );
    router = router.layer(DefaultBodyLimit::max(config.max_request_body_size));
    router = router.layer(build_cors_layer(&config.cors_allowed_origins));
    router = router.layer(TraceLayer::new_for_http());
    router = router.layer(PropagateRequestIdLayer::x_request_id());
    router = router.layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    router.with_state(state)
}

/// Build CORS layer from configuration.
///
/// `*` anywhere in the list allows any origin. Entries that are not valid
/// header values are skipped.
fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allow_any = allowed_origins.iter().any(|o| o == "*");

    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allow_any {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<_> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::net::SocketAddr;

    use axum::body::Body;
    use axum::extract::ConnectInfo;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::config::Config;

    fn request(method: &str, uri: &str, key: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 40000))));
        if let Some(key) = key {
            builder = builder.header("x-api-key", key);
        }
        builder.body(Body::from(r#"{"location":"Tokyo"}"#)).unwrap()
    }

    fn state() -> AppState {
        AppState::new(Config {
            api_keys: vec!["abc123".to_string()],
            ..Config::default()
        })
        .unwrap()
    }

    #[test]
    fn test_build_cors_layer_specific() {
        let origins = vec![
            "https://example.com".to_string(),
            "not a header\u{7f}".to_string(),
        ];
        let _layer = build_cors_layer(&origins);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let app = build_router(state());
        let response = app.oneshot(request("GET", "/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_time_requires_key() {
        let app = build_router(state());
        let response = app.oneshot(request("POST", "/time", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_time_with_key() {
        let app = build_router(state());
        let response = app
            .oneshot(request("POST", "/time", Some("abc123")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-remaining"], "19");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = build_router(state());
        let response = app.oneshot(request("GET", "/nope", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
