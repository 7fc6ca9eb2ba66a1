//! Shared application state for Axum handlers.
//!
//! - **Access Gate**: the immutable credential registry
//! - **Admission Limiter**: the single shared rate-limit map (optional)
//! - **Services**: search, weather and time collaborators
//! - **Configuration**: runtime configuration access
//!
//! # Structured Concurrency
//!
//! The background sweep of expired rate-limit windows is managed with
//! `tokio_util::task::TaskTracker` and `CancellationToken`. Call `shutdown()`
//! to stop it before application exit.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::limiter::{AdmissionLimiter, Clock, MonotonicClock};
use crate::metrics;
use crate::middleware::{CredentialRegistry, TrustedProxyConfig};
use crate::services::{SearchService, TimeService, WeatherService, build_http_client};

/// Shared application state, cloned per request. Internals are `Arc`-backed.
///
/// Must be created inside a Tokio runtime: construction spawns the sweep task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Allow-list consulted by the Access Gate
    pub registry: Arc<CredentialRegistry>,
    /// `None` when rate limiting is disabled
    pub limiter: Option<Arc<AdmissionLimiter>>,
    pub trusted_proxies: Arc<TrustedProxyConfig>,
    pub search: SearchService,
    pub weather: WeatherService,
    pub time: TimeService,
    pub started_at: Instant,
    task_tracker: TaskTracker,
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create application state on the real monotonic clock.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the limiter parameters are invalid or
    /// the HTTP client cannot be built.
    pub fn new(config: Config) -> AppResult<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock))
    }

    /// Create application state with a caller-supplied limiter clock.
    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> AppResult<Self> {
        let registry = Arc::new(CredentialRegistry::new(config.api_keys.iter().cloned()));
        if registry.is_empty() {
            warn!("API_KEYS is empty: every request to a protected route will be denied");
        }

        let limiter = if config.rate_limiting_enabled() {
            let limiter = AdmissionLimiter::with_clock(
                config.rate_limit_requests,
                config.rate_limit_window,
                clock,
            )
            .map_err(|e| AppError::Config(format!("Invalid rate limit: {e}")))?;
            Some(Arc::new(limiter))
        } else {
            None
        };

        let client = build_http_client(config.upstream_timeout)
            .map_err(|e| AppError::Config(format!("Failed to build HTTP client: {e}")))?;

        let state = Self {
            registry,
            limiter,
            trusted_proxies: Arc::new(TrustedProxyConfig::new(&config.trusted_proxies)),
            search: SearchService::new(client.clone(), config.search_api_url.clone()),
            weather: WeatherService::new(
                client,
                config.weather_api_url.clone(),
                config.openweather_api_key.clone(),
            ),
            time: TimeService::new(),
            started_at: Instant::now(),
            config: Arc::new(config),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_sweep_task();

        Ok(state)
    }

    /// Replace the time service, e.g. with a fixed clock.
    pub fn with_time_service(mut self, time: TimeService) -> Self {
        self.time = time;
        self
    }

    /// Periodically drop expired rate-limit windows so an idle server does
    /// not keep identities from a traffic burst.
    fn spawn_sweep_task(&self) {
        let Some(limiter) = self.limiter.clone() else {
            return;
        };
        let every = self.config.rate_limit_sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(every);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased;

                    _ = cancel.cancelled() => {
                        debug!("Rate limit sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        let tracked = limiter.tracked_identities();
                        metrics::set_tracked_identities(tracked);
                        trace!(removed, tracked, "Swept expired rate limit windows");
                    }
                }
            }

            debug!("Rate limit sweep task shutting down");
        });
    }

    /// Stop background tasks and wait for them to finish.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");
        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;
        info!("All background tasks have completed");
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::limiter::ManualClock;

    #[tokio::test]
    async fn test_limiter_disabled_when_limit_zero() {
        let config = Config {
            rate_limit_requests: 0,
            ..Config::default()
        };
        let state = AppState::new(config).unwrap();
        assert!(state.limiter.is_none());
        state.shutdown().await;
    }

    #[tokio::test]
    async fn test_registry_loaded_from_config() {
        let config = Config {
            api_keys: vec!["abc123".to_string()],
            ..Config::default()
        };
        let state = AppState::new(config).unwrap();
        assert!(state.registry.contains("abc123"));
        state.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_sweep_releases_idle_windows() {
        let clock = ManualClock::new();
        let config = Config {
            rate_limit_sweep_interval: Duration::from_secs(5),
            ..Config::default()
        };
        let state = AppState::with_clock(config, Arc::new(clock.clone())).unwrap();
        let limiter = state.limiter.clone().unwrap();

        limiter.check_and_record("addr:10.0.0.1");
        assert_eq!(limiter.tracked_identities(), 1);

        clock.advance(Duration::from_secs(61));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(limiter.tracked_identities(), 0);

        state.shutdown().await;
    }
}
