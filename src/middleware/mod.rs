//! HTTP middleware for the protected routes.
//!
//! - **Access Gate** ([`ApiKeyAuth`]): constant-time API key check, 401 on failure
//! - **Admission Limiter** ([`RateLimitLayer`]): fixed-window quota per identity, 429 on overflow
//! - **Client identity**: credential or network address, with CIDR-based proxy trust
//!
//! # Architecture
//!
//! ```text
//! Request → Access Gate → Admission Limiter → Handler → Response
//!               ↓                ↓
//!          401 Unauth     429 Too Many Requests
//! ```
//!
//! A request rejected by the gate never reaches the limiter and is not
//! counted against any quota.

pub mod auth;
pub mod identity;
pub mod rate_limit;

pub use auth::{AccessDecision, ApiKeyAuth, CredentialRegistry, DenialReason};
pub use identity::{
    API_KEY_HEADER, ClientIdentity, TrustedProxyConfig, UNKNOWN_ADDRESS, client_address,
    resolve_identity,
};
pub use rate_limit::{RATE_LIMIT_LIMIT_HEADER, RATE_LIMIT_REMAINING_HEADER, RateLimitLayer};
