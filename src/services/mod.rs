//! Upstream collaborators behind the protected endpoints.
//!
//! Each service makes at most one outbound call and turns the reply into a
//! single sentence for speech synthesis. None of them touch the Access Gate
//! or the Admission Limiter.

mod search;
mod time;
mod weather;

use std::time::{Duration, Instant};

pub use search::{SearchService, format_search_results, strip_markup};
pub use time::{TimeService, format_local_time, resolve_timezone};
pub use weather::{WeatherService, format_weather};

use crate::error::UpstreamError;
use crate::metrics;

/// `User-Agent` sent to every provider.
pub const USER_AGENT: &str = "VoiceAgentDemo/1.0";

/// Build the HTTP client shared by all providers.
///
/// # Errors
///
/// Fails only if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .build()
}

/// Send a prepared request, map the status, and decode the JSON body.
///
/// Any status other than 200 is an error, matching what the providers
/// document as success.
async fn fetch_json<T>(provider: &'static str, request: reqwest::RequestBuilder) -> Result<T, UpstreamError>
where
    T: serde::de::DeserializeOwned,
{
    let started = Instant::now();
    let elapsed = || started.elapsed().as_secs_f64();

    let response = match request.send().await {
        Ok(response) => response,
        Err(source) => {
            metrics::record_upstream_request(provider, "error", elapsed());
            return Err(UpstreamError::Transport { provider, source });
        }
    };

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        metrics::record_upstream_request(provider, "status", elapsed());
        return Err(UpstreamError::Status {
            provider,
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(|source| {
        metrics::record_upstream_request(provider, "error", elapsed());
        UpstreamError::Transport { provider, source }
    })?;

    let parsed = serde_json::from_slice(&body).map_err(|e| {
        metrics::record_upstream_request(provider, "error", elapsed());
        UpstreamError::Decode {
            provider,
            detail: e.to_string(),
        }
    })?;

    metrics::record_upstream_request(provider, "success", elapsed());
    Ok(parsed)
}
