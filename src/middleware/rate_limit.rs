//! Rate limiting middleware backed by the [`AdmissionLimiter`].
//!
//! Runs after the Access Gate on protected routes. The identity is taken
//! from the gate's request extension when present, otherwise derived from
//! the request (credential, else network address).
//!
//! # Response Headers
//!
//! Admitted responses carry:
//! - `X-RateLimit-Limit`: Configured requests per window
//! - `X-RateLimit-Remaining`: Requests left in the current window
//!
//! Rejected responses (429) additionally carry:
//! - `Retry-After`: Seconds until the window rolls over

use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{HeaderValue, Request, Response};
use axum::response::IntoResponse;
use tower::{Layer, Service};
use tracing::warn;

use super::identity::{ClientIdentity, TrustedProxyConfig, resolve_identity};
use crate::error::AppError;
use crate::limiter::{Admission, AdmissionLimiter};
use crate::metrics;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Rate limiting layer for Tower middleware stack.
///
/// # Example
///
/// ```rust,ignore
/// let limiter = Arc::new(AdmissionLimiter::new(20, Duration::from_secs(60))?);
/// let app = Router::new()
///     .route("/search", post(handler))
///     .route_layer(RateLimitLayer::new(limiter, Arc::default()));
/// ```
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<AdmissionLimiter>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl RateLimitLayer {
    pub fn new(limiter: Arc<AdmissionLimiter>, trusted_proxies: Arc<TrustedProxyConfig>) -> Self {
        Self {
            limiter,
            trusted_proxies,
        }
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            limiter: self.limiter.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }
    }
}

/// Rate limiting service wrapper.
#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    limiter: Arc<AdmissionLimiter>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl<S> Service<Request<Body>> for RateLimitService<S>
where
    S: Service<Request<Body>, Response = Response<Body>> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let identity = req
            .extensions()
            .get::<ClientIdentity>()
            .cloned()
            .unwrap_or_else(|| resolve_identity(&req, &self.trusted_proxies));

        // Decided synchronously, before any await point
        let admission = self.limiter.check_and_record(&identity.limiter_key());
        let limit = self.limiter.limit();
        metrics::record_rate_limit_decision(admission.is_allowed());

        match admission {
            Admission::Allowed { remaining, .. } => {
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);

                Box::pin(async move {
                    let mut response = inner.call(req).await?;
                    let headers = response.headers_mut();
                    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
                    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(remaining));
                    Ok(response)
                })
            }
            Admission::Denied { retry_after } => {
                // Round up so clients never retry inside the same window
                let retry_after_secs = retry_after
                    .as_secs()
                    .saturating_add(u64::from(retry_after.subsec_nanos() > 0))
                    .max(1);

                warn!(
                    client = %identity,
                    path = %req.uri().path(),
                    retry_after_secs,
                    "Rate limit exceeded"
                );

                let mut response = AppError::QuotaExceeded { retry_after_secs }.into_response();
                let headers = response.headers_mut();
                headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(limit));
                headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(0u32));

                Box::pin(async move { Ok(response) })
            }
        }
    }
}
