//! Access Gate: API key authentication for the protected routes.
//!
//! # Security Features
//!
//! - **Static allow-list**: keys are loaded once from `API_KEYS` and never mutated
//! - **Constant-time comparison**: every registered key is compared in full, so
//!   response timing reveals neither which key matched nor how much of it
//! - **Uniform denial**: missing and invalid keys produce the same 401 body
//!
//! # Usage
//!
//! ```bash
//! API_KEYS=abc123,def456 cargo run
//! curl -X POST -H "X-API-Key: abc123" -H "Content-Type: application/json" \
//!      -d '{"query":"rust"}' http://localhost:5000/search
//! ```
//!
//! The gate is attached with `route_layer` to the protected routes only, so
//! `/` and `/health` never see it.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{Request, Response};
use axum::response::IntoResponse;
use subtle::{Choice, ConstantTimeEq};
use tower::{Layer, Service};
use tracing::{debug, warn};

use super::identity::{ClientIdentity, TrustedProxyConfig, client_address, presented_api_key};
use crate::error::AppError;
use crate::metrics;

/// Outcome of an Access Gate check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allowed,
    Denied(DenialReason),
}

/// Why a request was denied. Logged only; never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    MissingKey,
    UnknownKey,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::MissingKey => "missing_key",
            DenialReason::UnknownKey => "unknown_key",
        }
    }
}

/// Immutable allow-list of client API keys.
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    keys: Vec<String>,
}

impl CredentialRegistry {
    /// Build a registry, dropping empty and duplicate keys.
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: BTreeSet<String> = keys
            .into_iter()
            .map(Into::into)
            .filter(|k| !k.is_empty())
            .collect();

        Self {
            keys: keys.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Exact-match membership test, constant time in the matched position.
    pub fn contains(&self, presented: &str) -> bool {
        let presented = presented.as_bytes();
        self.keys
            .iter()
            .fold(Choice::from(0), |found, key| {
                found | key.as_bytes().ct_eq(presented)
            })
            .into()
    }

    /// Decide whether a presented credential may pass.
    pub fn authorize(&self, presented: Option<&str>) -> AccessDecision {
        match presented {
            None | Some("") => AccessDecision::Denied(DenialReason::MissingKey),
            Some(key) if self.contains(key) => AccessDecision::Allowed,
            Some(_) => AccessDecision::Denied(DenialReason::UnknownKey),
        }
    }
}

/// Access Gate layer.
///
/// On success the request continues with a [`ClientIdentity::Credential`]
/// in its extensions for the limiter to bucket on.
#[derive(Clone)]
pub struct ApiKeyAuth {
    registry: Arc<CredentialRegistry>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl ApiKeyAuth {
    pub fn new(registry: Arc<CredentialRegistry>, trusted_proxies: Arc<TrustedProxyConfig>) -> Self {
        Self {
            registry,
            trusted_proxies,
        }
    }
}

impl<S> Layer<S> for ApiKeyAuth {
    type Service = ApiKeyAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        ApiKeyAuthService {
            inner,
            registry: self.registry.clone(),
            trusted_proxies: self.trusted_proxies.clone(),
        }
    }
}

/// Access Gate service wrapper.
#[derive(Clone)]
pub struct ApiKeyAuthService<S> {
    inner: S,
    registry: Arc<CredentialRegistry>,
    trusted_proxies: Arc<TrustedProxyConfig>,
}

impl<S> Service<Request<Body>> for ApiKeyAuthService<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let decision = self.registry.authorize(presented_api_key(&req));

        match decision {
            AccessDecision::Allowed => {
                if let Some(key) = presented_api_key(&req).map(str::to_string) {
                    req.extensions_mut().insert(ClientIdentity::Credential(key));
                }
                debug!(path = %req.uri().path(), "API key accepted");

                // Drive the clone that was polled ready, leave a fresh one behind
                let clone = self.inner.clone();
                let mut inner = std::mem::replace(&mut self.inner, clone);
                Box::pin(async move { inner.call(req).await })
            }
            AccessDecision::Denied(reason) => {
                let client = client_address(&req, &self.trusted_proxies);
                warn!(
                    path = %req.uri().path(),
                    client = %client,
                    reason = reason.as_str(),
                    "Access denied"
                );
                metrics::record_auth_denied(reason.as_str());

                Box::pin(async move { Ok(AppError::Unauthorized.into_response()) })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn registry() -> CredentialRegistry {
        CredentialRegistry::new(["abc123", "def456"])
    }

    #[test]
    fn test_absent_key_denied() {
        assert_eq!(
            registry().authorize(None),
            AccessDecision::Denied(DenialReason::MissingKey)
        );
    }

    #[test]
    fn test_empty_key_denied() {
        assert_eq!(
            registry().authorize(Some("")),
            AccessDecision::Denied(DenialReason::MissingKey)
        );
    }

    #[test]
    fn test_unknown_key_denied() {
        assert_eq!(
            registry().authorize(Some("nope")),
            AccessDecision::Denied(DenialReason::UnknownKey)
        );
    }

    #[test]
    fn test_registered_keys_allowed() {
        let registry = registry();
        assert_eq!(registry.authorize(Some("abc123")), AccessDecision::Allowed);
        assert_eq!(registry.authorize(Some("def456")), AccessDecision::Allowed);
    }

    #[test]
    fn test_match_is_exact() {
        let registry = registry();
        assert!(!registry.contains("ABC123"));
        assert!(!registry.contains(" abc123"));
        assert!(!registry.contains("abc12"));
        assert!(!registry.contains("abc1234"));
    }

    #[test]
    fn test_empty_registry_denies_everything() {
        let registry = CredentialRegistry::default();
        assert!(registry.is_empty());
        assert_eq!(
            registry.authorize(Some("abc123")),
            AccessDecision::Denied(DenialReason::UnknownKey)
        );
    }

    #[test]
    fn test_registry_drops_empty_and_duplicate_keys() {
        let registry = CredentialRegistry::new(["a", "", "a", "b"]);
        assert_eq!(registry.len(), 2);
    }
}
