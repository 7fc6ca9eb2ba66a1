//! Application configuration loaded from environment variables.
//!
//! All configuration is loaded from environment variables with sensible defaults
//! for development. In production, configure via environment variables or a `.env` file.
//!
//! # Security Configuration
//!
//! - `API_KEYS`: Comma-separated allow-list of client keys for the protected routes
//! - `TRUSTED_PROXIES`: CIDR ranges whose `X-Forwarded-For` headers are believed
//! - `CORS_ALLOWED_ORIGINS`: Comma-separated list of allowed origins (default: `*`)
//!
//! # Rate Limiting
//!
//! - `RATE_LIMIT_REQUESTS`: Requests per window per client (default: 20, 0 = disabled)
//! - `RATE_LIMIT_WINDOW_SECS`: Window length in seconds (default: 60)
//!
//! # Upstream Providers
//!
//! - `OPENWEATHER_API_KEY`: Server-side key for the weather provider
//! - `SEARCH_API_URL`, `WEATHER_API_URL`: Provider endpoints
//! - `UPSTREAM_TIMEOUT_SECS`: Timeout for each provider call (default: 10)
//!
//! # Observability
//!
//! - `RUST_LOG`, else `LOG_LEVEL`: Log filter directive (default: `info`)
//! - `LOG_FORMAT`: `pretty` or `json`
//! - `METRICS_PORT`: Prometheus listener port (default: 0 = disabled)

use std::env;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// Default MediaWiki search endpoint.
pub const DEFAULT_SEARCH_API_URL: &str = "https://en.wikipedia.org/w/api.php";

/// Default OpenWeatherMap current-weather endpoint.
pub const DEFAULT_WEATHER_API_URL: &str = "https://api.openweathermap.org/data/2.5/weather";

/// Default requests admitted per client per window.
pub const DEFAULT_RATE_LIMIT_REQUESTS: u32 = 20;

/// Default rate limit window.
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 60;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Application configuration loaded from environment variables.
///
/// # Example
///
/// ```rust,ignore
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.server_addr());
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Server host address (default: "0.0.0.0")
    pub host: String,

    /// Server port (default: 5000)
    pub port: u16,

    /// Maximum request body size in bytes (default: 64 KiB)
    pub max_request_body_size: usize,

    // =========================================================================
    // Access Gate
    // =========================================================================
    /// Allow-list of client API keys, presented via `X-API-Key`.
    /// An empty list denies every protected request.
    pub api_keys: Vec<String>,

    /// Comma-separated list of allowed CORS origins
    pub cors_allowed_origins: Vec<String>,

    /// Trusted proxy CIDR ranges. Forwarding headers are only honoured when
    /// the TCP peer falls inside one of these networks.
    pub trusted_proxies: Vec<String>,

    // =========================================================================
    // Admission Limiter
    // =========================================================================
    /// Requests admitted per identity per window (0 = limiter disabled)
    pub rate_limit_requests: u32,

    /// Length of the fixed rate limit window
    pub rate_limit_window: Duration,

    /// Interval for the background sweep of expired windows
    pub rate_limit_sweep_interval: Duration,

    // =========================================================================
    // Upstream Providers
    // =========================================================================
    pub search_api_url: String,

    pub weather_api_url: String,

    /// Server-side weather provider credential (never sent by clients)
    pub openweather_api_key: Option<String>,

    /// Timeout applied to every upstream call
    pub upstream_timeout: Duration,

    // =========================================================================
    // Observability
    // =========================================================================
    /// Filter directive for the log subscriber (e.g., "info", "voice_agent_backend=debug")
    pub log_level: String,

    pub log_format: LogFormat,

    /// Port for Prometheus metrics endpoint (0 = disabled)
    pub metrics_port: u16,
}

impl Config {
    /// Load configuration from environment variables with sensible defaults.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if any value fails to parse or validate.
    pub fn from_env() -> AppResult<Self> {
        // Load an .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: Self::parse_env("PORT", 5000)?,
            max_request_body_size: Self::parse_env("MAX_REQUEST_BODY_SIZE", 64 * 1024)?,

            api_keys: parse_list(env::var("API_KEYS").ok().as_deref()),
            cors_allowed_origins: parse_list(Some(
                env::var("CORS_ALLOWED_ORIGINS")
                    .unwrap_or_else(|_| "*".to_string())
                    .as_str(),
            )),
            trusted_proxies: parse_list(env::var("TRUSTED_PROXIES").ok().as_deref()),

            rate_limit_requests: Self::parse_env(
                "RATE_LIMIT_REQUESTS",
                DEFAULT_RATE_LIMIT_REQUESTS,
            )?,
            rate_limit_window: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_WINDOW_SECS",
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            )?),
            rate_limit_sweep_interval: Duration::from_secs(Self::parse_env(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS",
                60,
            )?),

            search_api_url: env::var("SEARCH_API_URL")
                .unwrap_or_else(|_| DEFAULT_SEARCH_API_URL.to_string()),
            weather_api_url: env::var("WEATHER_API_URL")
                .unwrap_or_else(|_| DEFAULT_WEATHER_API_URL.to_string()),
            openweather_api_key: env::var("OPENWEATHER_API_KEY")
                .ok()
                .filter(|k| !k.is_empty()),
            upstream_timeout: Duration::from_secs(Self::parse_env("UPSTREAM_TIMEOUT_SECS", 10)?),

            log_level: env::var("RUST_LOG")
                .or_else(|_| env::var("LOG_LEVEL"))
                .unwrap_or_else(|_| "info".to_string()),
            log_format: Self::parse_log_format(env::var("LOG_FORMAT").ok().as_deref())?,
            metrics_port: Self::parse_env("METRICS_PORT", 0)?,
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values for consistency and correctness.
    fn validate(&self) -> AppResult<()> {
        if self.rate_limit_window.is_zero() {
            return Err(AppError::Config(
                "RATE_LIMIT_WINDOW_SECS must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit_sweep_interval.is_zero() {
            return Err(AppError::Config(
                "RATE_LIMIT_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.upstream_timeout.is_zero() {
            return Err(AppError::Config(
                "UPSTREAM_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.max_request_body_size == 0 {
            return Err(AppError::Config(
                "MAX_REQUEST_BODY_SIZE must be greater than 0".to_string(),
            ));
        }

        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.log_level) {
            return Err(AppError::Config(format!(
                "Invalid log level '{}': {e}",
                self.log_level
            )));
        }

        for (name, url) in [
            ("SEARCH_API_URL", &self.search_api_url),
            ("WEATHER_API_URL", &self.weather_api_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "{name} must be an http(s) URL, got '{url}'"
                )));
            }
        }

        Ok(())
    }

    /// Get the full server address for binding.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if the Admission Limiter is enabled.
    pub fn rate_limiting_enabled(&self) -> bool {
        self.rate_limit_requests > 0
    }

    /// Check if Prometheus metrics export is enabled.
    pub fn metrics_enabled(&self) -> bool {
        self.metrics_port > 0
    }

    /// Get the metrics endpoint address.
    ///
    /// Returns `None` if metrics are disabled (port = 0).
    pub fn metrics_addr(&self) -> Option<std::net::SocketAddr> {
        self.metrics_enabled()
            .then(|| std::net::SocketAddr::from(([0, 0, 0, 0], self.metrics_port)))
    }

    /// Parse an environment variable into the specified type with a default value.
    fn parse_env<T>(name: &str, default: T) -> AppResult<T>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match env::var(name) {
            Ok(val) => val
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("Invalid {name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    fn parse_log_format(value: Option<&str>) -> AppResult<LogFormat> {
        match value.map(str::trim) {
            None | Some("") | Some("pretty") => Ok(LogFormat::Pretty),
            Some("json") => Ok(LogFormat::Json),
            Some(other) => Err(AppError::Config(format!(
                "Invalid LOG_FORMAT: '{other}' (expected 'pretty' or 'json')"
            ))),
        }
    }
}

/// Split a comma-separated value, trimming entries and dropping empty ones.
pub fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Default configuration for testing and development.
///
/// Production deployments should use `Config::from_env()` instead.
impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_request_body_size: 64 * 1024,
            api_keys: vec![],
            cors_allowed_origins: vec!["*".to_string()],
            trusted_proxies: vec![],
            rate_limit_requests: DEFAULT_RATE_LIMIT_REQUESTS,
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECS),
            rate_limit_sweep_interval: Duration::from_secs(60),
            search_api_url: DEFAULT_SEARCH_API_URL.to_string(),
            weather_api_url: DEFAULT_WEATHER_API_URL.to_string(),
            openweather_api_key: None,
            upstream_timeout: Duration::from_secs(10),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_port: 0,
        }
    }
}
