//! Client identity resolution shared by the Access Gate and the Admission Limiter.
//!
//! A request is bucketed by the credential it presents, or by the caller's
//! network address when no credential was sent. Two unauthenticated callers
//! behind the same address therefore share one quota.
//!
//! # Network Address
//!
//! The address is the TCP peer recorded by Axum's `ConnectInfo`. Forwarding
//! headers are only honoured when the peer itself is a trusted proxy:
//!
//! ```text
//!   peer in TRUSTED_PROXIES?
//!        │
//!        ├── yes ─► X-Forwarded-For (first entry) ─► X-Real-IP ─► peer
//!        │
//!        └── no ──► peer
//! ```
//!
//! With no `TRUSTED_PROXIES` configured, client-supplied forwarding headers
//! are ignored entirely, so a caller cannot rotate spoofed addresses to
//! escape its quota.

use std::borrow::Cow;
use std::fmt;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use tracing::{debug, warn};

/// Header carrying the client credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Fallback address when none can be determined.
///
/// All such requests share one bucket.
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Identity used to bucket rate-limit counters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClientIdentity {
    /// The credential presented in `X-API-Key`.
    Credential(String),
    /// The caller's network address.
    Address(String),
}

impl ClientIdentity {
    /// Key used in the limiter's map.
    ///
    /// Prefixed so a credential can never collide with an address.
    pub fn limiter_key(&self) -> String {
        match self {
            ClientIdentity::Credential(key) => format!("key:{key}"),
            ClientIdentity::Address(addr) => format!("addr:{addr}"),
        }
    }
}

/// Log-safe rendering: credentials are shown as a fixed-width fingerprint
/// that reveals neither their content nor their length.
impl fmt::Display for ClientIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientIdentity::Credential(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                write!(f, "key#{:08x}", hasher.finish() >> 32)
            }
            ClientIdentity::Address(addr) => write!(f, "addr:{addr}"),
        }
    }
}

// =============================================================================
// Trusted Proxy CIDR Matching
// =============================================================================

/// Parsed CIDR network range for trusted proxy validation.
#[derive(Debug, Clone)]
pub struct CidrRange {
    network: IpAddr,
    prefix_len: u8,
}

impl CidrRange {
    /// Parse a CIDR notation string (e.g., "10.0.0.0/8" or "::1/128").
    ///
    /// A bare address is treated as a single-host range.
    pub fn parse(cidr: &str) -> Option<Self> {
        let cidr = cidr.trim();
        let (addr, prefix) = match cidr.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (cidr, None),
        };

        let network: IpAddr = addr.parse().ok()?;
        let max_prefix = match network {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        };

        let prefix_len = match prefix {
            Some(p) => p.parse().ok()?,
            None => max_prefix,
        };
        if prefix_len > max_prefix {
            return None;
        }

        Some(Self {
            network,
            prefix_len,
        })
    }

    /// Check if an IP address is contained within this CIDR range.
    pub fn contains(&self, ip: &IpAddr) -> bool {
        match (&self.network, ip) {
            (IpAddr::V4(net), IpAddr::V4(addr)) => {
                let mask = u32::MAX
                    .checked_shl(32 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u32::from(*net) & mask) == (u32::from(*addr) & mask)
            }
            (IpAddr::V6(net), IpAddr::V6(addr)) => {
                let mask = u128::MAX
                    .checked_shl(128 - u32::from(self.prefix_len))
                    .unwrap_or(0);
                (u128::from(*net) & mask) == (u128::from(*addr) & mask)
            }
            _ => false,
        }
    }
}

/// Proxies whose forwarding headers are believed.
#[derive(Debug, Clone, Default)]
pub struct TrustedProxyConfig {
    ranges: Vec<CidrRange>,
}

impl TrustedProxyConfig {
    /// Build from CIDR strings. Invalid entries are logged and skipped.
    pub fn new(cidrs: &[String]) -> Self {
        let ranges: Vec<CidrRange> = cidrs
            .iter()
            .filter_map(|cidr| {
                let parsed = CidrRange::parse(cidr);
                if parsed.is_none() {
                    warn!(cidr = %cidr, "Invalid CIDR range in TRUSTED_PROXIES, skipping");
                }
                parsed
            })
            .collect();

        Self { ranges }
    }

    pub fn is_enabled(&self) -> bool {
        !self.ranges.is_empty()
    }

    /// Whether `ip` is one of the configured proxies.
    ///
    /// Always false when no ranges are configured.
    pub fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(ip))
    }
}

// =============================================================================
// Extraction
// =============================================================================

/// Where a forwarded address was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ForwardedIp<'a> {
    FromXff(&'a str),
    FromRealIp(&'a str),
    NotFound,
}

fn forwarded_ip<B>(req: &Request<B>) -> ForwardedIp<'_> {
    // "client, proxy1, proxy2" - the first entry is the client
    if let Some(value) = req.headers().get("x-forwarded-for")
        && let Ok(value) = value.to_str()
        && let Some(first) = value.split(',').next().map(str::trim)
        && !first.is_empty()
    {
        return ForwardedIp::FromXff(first);
    }

    if let Some(value) = req.headers().get("x-real-ip")
        && let Ok(value) = value.to_str()
        && !value.trim().is_empty()
    {
        return ForwardedIp::FromRealIp(value.trim());
    }

    ForwardedIp::NotFound
}

fn peer_ip<B>(req: &Request<B>) -> Option<IpAddr> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
}

/// Resolve the caller's network address.
///
/// Returns `Cow::Borrowed(UNKNOWN_ADDRESS)` when the request carries no
/// connection info.
pub fn client_address<B>(req: &Request<B>, trusted_proxies: &TrustedProxyConfig) -> Cow<'static, str> {
    let Some(peer) = peer_ip(req) else {
        return Cow::Borrowed(UNKNOWN_ADDRESS);
    };

    if !trusted_proxies.is_trusted(&peer) {
        return Cow::Owned(peer.to_string());
    }

    match forwarded_ip(req) {
        ForwardedIp::FromXff(ip) => {
            debug!(client_ip = %ip, proxy = %peer, "Client address from X-Forwarded-For");
            Cow::Owned(ip.to_string())
        }
        ForwardedIp::FromRealIp(ip) => {
            debug!(client_ip = %ip, proxy = %peer, "Client address from X-Real-IP");
            Cow::Owned(ip.to_string())
        }
        ForwardedIp::NotFound => Cow::Owned(peer.to_string()),
    }
}

/// The credential presented in `X-API-Key`, if any.
///
/// Empty and non-UTF-8 values count as absent. No trimming or case folding
/// is applied.
pub fn presented_api_key<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Derive the rate-limit identity: the credential if presented, else the address.
pub fn resolve_identity<B>(req: &Request<B>, trusted_proxies: &TrustedProxyConfig) -> ClientIdentity {
    match presented_api_key(req) {
        Some(key) => ClientIdentity::Credential(key.to_string()),
        None => ClientIdentity::Address(client_address(req, trusted_proxies).into_owned()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(peer: &str) -> axum::http::request::Builder {
        let addr: SocketAddr = peer.parse().unwrap();
        Request::builder().extension(ConnectInfo(addr))
    }

    #[test]
    fn test_cidr_parse() {
        assert_eq!(CidrRange::parse("10.0.0.0/8").unwrap().prefix_len, 8);
        assert_eq!(CidrRange::parse("::1/128").unwrap().prefix_len, 128);
        assert_eq!(CidrRange::parse("192.168.1.1").unwrap().prefix_len, 32);
        assert!(CidrRange::parse("not-an-ip").is_none());
        assert!(CidrRange::parse("10.0.0.0/33").is_none());
    }

    #[test]
    fn test_cidr_contains() {
        let cidr = CidrRange::parse("10.0.0.0/8").unwrap();
        assert!(cidr.contains(&"10.255.0.1".parse().unwrap()));
        assert!(!cidr.contains(&"11.0.0.1".parse().unwrap()));
        assert!(!cidr.contains(&"::1".parse().unwrap()));

        let any = CidrRange::parse("0.0.0.0/0").unwrap();
        assert!(any.contains(&"203.0.113.9".parse().unwrap()));
    }

    #[test]
    fn test_empty_trusted_config_trusts_nobody() {
        let config = TrustedProxyConfig::new(&[]);
        assert!(!config.is_enabled());
        assert!(!config.is_trusted(&"127.0.0.1".parse().unwrap()));
    }

    #[test]
    fn test_address_from_peer() {
        let req = request_from("198.51.100.7:5555").body(Body::empty()).unwrap();
        let addr = client_address(&req, &TrustedProxyConfig::default());
        assert_eq!(addr, "198.51.100.7");
    }

    #[test]
    fn test_forwarded_header_ignored_from_untrusted_peer() {
        let req = request_from("198.51.100.7:5555")
            .header("x-forwarded-for", "1.2.3.4")
            .body(Body::empty())
            .unwrap();
        let trusted = TrustedProxyConfig::new(&["10.0.0.0/8".to_string()]);

        assert_eq!(client_address(&req, &trusted), "198.51.100.7");
    }

    #[test]
    fn test_forwarded_header_used_from_trusted_peer() {
        let req = request_from("10.0.0.2:5555")
            .header("x-forwarded-for", " 203.0.113.50 , 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        let trusted = TrustedProxyConfig::new(&["10.0.0.0/8".to_string()]);

        assert_eq!(client_address(&req, &trusted), "203.0.113.50");
    }

    #[test]
    fn test_real_ip_used_from_trusted_peer() {
        let req = request_from("10.0.0.2:5555")
            .header("x-real-ip", "203.0.113.51")
            .body(Body::empty())
            .unwrap();
        let trusted = TrustedProxyConfig::new(&["10.0.0.0/8".to_string()]);

        assert_eq!(client_address(&req, &trusted), "203.0.113.51");
    }

    #[test]
    fn test_unknown_without_connect_info() {
        let req = Request::builder().body(Body::empty()).unwrap();
        let addr = client_address(&req, &TrustedProxyConfig::default());
        assert_eq!(addr, UNKNOWN_ADDRESS);
        assert!(matches!(addr, Cow::Borrowed(_)));
    }

    #[test]
    fn test_identity_prefers_credential() {
        let req = request_from("198.51.100.7:5555")
            .header("x-api-key", "abc123")
            .body(Body::empty())
            .unwrap();

        let identity = resolve_identity(&req, &TrustedProxyConfig::default());
        assert_eq!(identity, ClientIdentity::Credential("abc123".to_string()));
    }

    #[test]
    fn test_identity_falls_back_to_address() {
        let req = request_from("198.51.100.7:5555")
            .header("x-api-key", "")
            .body(Body::empty())
            .unwrap();

        let identity = resolve_identity(&req, &TrustedProxyConfig::default());
        assert_eq!(identity, ClientIdentity::Address("198.51.100.7".to_string()));
    }

    #[test]
    fn test_limiter_keys_are_namespaced() {
        let key = ClientIdentity::Credential("1.2.3.4".to_string());
        let addr = ClientIdentity::Address("1.2.3.4".to_string());
        assert_ne!(key.limiter_key(), addr.limiter_key());
    }

    #[test]
    fn test_display_never_reveals_credential() {
        let short = ClientIdentity::Credential("ab1".to_string()).to_string();
        let long = ClientIdentity::Credential("supersecretkey".to_string()).to_string();

        assert!(!short.contains("ab1"));
        assert!(!long.contains("supe"));
        assert_eq!(short.len(), long.len());
        assert_eq!(short.len(), "key#".len() + 8);
        assert_ne!(short, long);
        assert_eq!(
            short,
            ClientIdentity::Credential("ab1".to_string()).to_string()
        );
    }
}
