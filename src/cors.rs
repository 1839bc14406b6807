//! CORS policy for the HTTP API
//!
//! Loopback origins (`localhost`, `127.0.0.1`, `[::1]`, any port, http or
//! https) are always allowed. Further origins can be allowed explicitly with
//! `--allow-origin`; those are compared exactly after normalization.
//!
//! - **Allowed Methods**: GET, POST, OPTIONS (preflight)
//! - **Allowed Headers**: Content-Type
//! - **Max Age**: 3600 seconds for preflight caching

use http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::{debug, warn};
use url::{Host, Url};

/// Methods the API answers cross-origin
pub const ALLOWED_METHODS: [Method; 3] = [Method::GET, Method::POST, Method::OPTIONS];

/// Request headers accepted cross-origin
pub const ALLOWED_HEADERS: [HeaderName; 1] = [CONTENT_TYPE];

/// Preflight cache lifetime (1 hour)
pub const DEFAULT_MAX_AGE_SECS: u64 = 3600;

/// Origins accepted by the API
#[derive(Debug, Clone, Default)]
pub struct OriginPolicy {
    extra: Vec<String>,
}

impl OriginPolicy {
    /// Loopback origins plus each entry of `origins`.
    ///
    /// Entries that are not `scheme://host[:port]` origins are skipped with
    /// a warning.
    pub fn new<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extra = origins
            .into_iter()
            .filter_map(|origin| {
                let origin = origin.as_ref();
                let normalized = normalize_origin(origin);
                if normalized.is_none() {
                    warn!("Ignoring malformed allowed origin {:?}", origin);
                }
                normalized
            })
            .collect();
        Self { extra }
    }

    /// Whether a request carrying `Origin: origin` may be answered
    pub fn allows(&self, origin: &str) -> bool {
        let Some(url) = parse_origin(origin) else {
            return false;
        };
        if is_loopback(&url) {
            return true;
        }
        let serialized = url.origin().ascii_serialization();
        self.extra.iter().any(|allowed| *allowed == serialized)
    }

    /// Explicitly configured origins, normalized
    pub fn extra_origins(&self) -> &[String] {
        &self.extra
    }
}

fn parse_origin(origin: &str) -> Option<Url> {
    let url = Url::parse(origin).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host().is_none() {
        return None;
    }
    // An Origin header never carries credentials, a query or a fragment.
    if !url.username().is_empty() || url.password().is_some() {
        return None;
    }
    if url.query().is_some() || url.fragment().is_some() {
        return None;
    }
    Some(url)
}

fn normalize_origin(origin: &str) -> Option<String> {
    parse_origin(origin.trim()).map(|url| url.origin().ascii_serialization())
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        Some(Host::Ipv4(addr)) => addr == std::net::Ipv4Addr::LOCALHOST,
        Some(Host::Ipv6(addr)) => addr == std::net::Ipv6Addr::LOCALHOST,
        None => false,
    }
}

/// Whether `origin` is a loopback origin
///
/// ```rust
/// use http::header::HeaderValue;
/// use pagelens_web::cors::is_localhost_origin;
///
/// assert!(is_localhost_origin(&HeaderValue::from_static("http://localhost:3000")));
/// assert!(!is_localhost_origin(&HeaderValue::from_static("http://localhost.evil.com")));
/// ```
pub fn is_localhost_origin(origin: &HeaderValue) -> bool {
    origin
        .to_str()
        .ok()
        .and_then(parse_origin)
        .is_some_and(|url| is_loopback(&url))
}

/// CORS layer enforcing `policy`
pub fn cors_layer(policy: OriginPolicy) -> CorsLayer {
    let policy = Arc::new(policy);
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin: &HeaderValue, _| {
            let allowed = origin.to_str().is_ok_and(|o| policy.allows(o));
            if !allowed {
                debug!("Rejected cross-origin request from {:?}", origin);
            }
            allowed
        }))
        .allow_methods(ALLOWED_METHODS)
        .allow_headers(ALLOWED_HEADERS)
        .max_age(Duration::from_secs(DEFAULT_MAX_AGE_SECS))
}
