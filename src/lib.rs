//! # Voice Agent Backend
//!
//! Tool endpoints for a voice assistant (web search, current weather and
//! world clock) behind an API-key Access Gate and a per-identity
//! fixed-window Admission Limiter.
//!
//! - **Security**: constant-time API key matching, proxy-aware client addressing
//! - **Fairness**: one shared request quota per credential (or address)
//! - **Observability**: request IDs, structured logging, Prometheus metrics
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum HTTP Server                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Middleware (Request ID → Trace → CORS → Gate → Limiter)    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Handlers (health, search, weather, time)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Services (SearchService, WeatherService, TimeService)      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Upstream providers (MediaWiki, OpenWeatherMap, tz database)│
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::net::SocketAddr;
//!
//! use voice_agent_backend::{AppState, Config, build_router};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let addr = config.server_addr();
//!     let state = AppState::new(config)?;
//!     let app = build_router(state);
//!
//!     let listener = tokio::net::TcpListener::bind(addr).await?;
//!     axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Security Configuration
//!
//! ```bash
//! API_KEYS=abc123,def456 RATE_LIMIT_REQUESTS=20 RATE_LIMIT_WINDOW_SECS=60 cargo run
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod limiter;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;
pub mod validation;

// Re-exports for convenience
pub use config::Config;
pub use error::{AppError, AppResult};
pub use limiter::{Admission, AdmissionLimiter};
pub use routes::build_router;
pub use state::AppState;
