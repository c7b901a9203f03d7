//! Host network proxy policy.
//!
//! This module provides the [`ProxyOracle`] seam the resolver delegates to
//! when system proxies are enabled, an oracle backed by the conventional
//! proxy environment variables, and the process-wide "use system proxies"
//! toggle.
//!
//! ## Candidate Ordering
//!
//! Oracles return candidates least specific first. For [`EnvProxyOracle`]
//! that means `ALL_PROXY` before the scheme variable (`http_proxy`,
//! `HTTPS_PROXY`, `FTP_PROXY`), so the last candidate is the most specific
//! match for the endpoint.
//!
//! Plain http endpoints only honor lower case `http_proxy`. CGI servers
//! expose the request's `Proxy:` header as `HTTP_PROXY`, so the upper case
//! form cannot be trusted.

use crate::endpoint::{Endpoint, EndpointKind};
use crate::proxy::ResolvedProxy;
use http::Uri;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::env;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Environment variable holding the OS-level "use system proxies" flag.
pub const USE_SYSTEM_PROXIES_ENV: &str = "USE_SYSTEM_PROXIES";

/// Default port for a proxy URL without one.
const DEFAULT_PROXY_PORT: u16 = 80;

/// Queries the host's proxy policy for an endpoint.
pub trait ProxyOracle: Send + Sync {
    /// Returns the candidate proxies for `endpoint`, least specific first.
    ///
    /// A well-behaved oracle answers `[NoProxy]` rather than nothing when no
    /// proxy applies.
    fn select(&self, endpoint: &Endpoint) -> Vec<ResolvedProxy>;
}

static GLOBAL_TOGGLE: Lazy<SystemProxyToggle> = Lazy::new(|| {
    let enabled = env::var(USE_SYSTEM_PROXIES_ENV)
        .map(|value| parse_flag(&value))
        .unwrap_or(false);
    SystemProxyToggle::new(enabled)
});

/// Whether system proxy awareness is turned on.
///
/// Clones share state. The process-wide instance starts from
/// [`USE_SYSTEM_PROXIES_ENV`] and can only be switched on.
#[derive(Debug, Clone)]
pub struct SystemProxyToggle {
    flag: Arc<AtomicBool>,
}

impl SystemProxyToggle {
    /// Creates a toggle independent of the process-wide one.
    pub fn new(enabled: bool) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(enabled)),
        }
    }

    /// The process-wide toggle.
    pub fn global() -> Self {
        GLOBAL_TOGGLE.clone()
    }

    pub fn is_enabled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Turns system proxy awareness on. Returns true if it was off before.
    pub fn enable(&self) -> bool {
        !self.flag.swap(true, Ordering::AcqRel)
    }
}

/// Reads the process-wide "use system proxies" flag.
pub fn use_system_proxies() -> bool {
    SystemProxyToggle::global().is_enabled()
}

/// Durably enables system proxy awareness for the whole process.
///
/// Meant to be called once during startup; repeated calls are no-ops.
pub fn enable_system_proxies() {
    if SystemProxyToggle::global().enable() {
        info!("System proxy awareness enabled");
    }
}

/// Parses a boolean flag the way the OS-level setting is read: only `true`
/// (any case) is true.
pub fn parse_flag(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

/// Hosts that must never be proxied, from a `NO_PROXY` style list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoProxyList {
    patterns: Vec<String>,
}

impl NoProxyList {
    /// Parses a comma separated list such as `localhost,.internal,10.0.0.1`.
    pub fn parse(list: &str) -> Self {
        let patterns = list
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { patterns }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Checks if a host should bypass proxies.
    pub fn should_bypass(&self, host: &str) -> bool {
        let host_lower = host.to_lowercase();

        self.patterns.iter().any(|pattern| {
            if pattern == "*" || host_lower == *pattern {
                return true;
            }

            // .local matches foo.local
            if pattern.starts_with('.') {
                return host_lower.ends_with(pattern.as_str());
            }

            // local also matches foo.local
            host_lower.ends_with(&format!(".{}", pattern))
        })
    }
}

/// Oracle backed by `ALL_PROXY`, `http_proxy`, `HTTPS_PROXY`, `FTP_PROXY`
/// and `NO_PROXY` (upper case first, then lower case, except `http_proxy`
/// which is only read in lower case).
///
/// Variables are read on every query, so changes to the environment are
/// picked up without rebuilding the oracle.
#[derive(Debug, Clone)]
pub struct EnvProxyOracle {
    vars: Option<HashMap<String, String>>,
    toggle: SystemProxyToggle,
}

impl Default for EnvProxyOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl EnvProxyOracle {
    /// Oracle over the process environment, gated by the process-wide toggle.
    pub fn new() -> Self {
        Self {
            vars: None,
            toggle: SystemProxyToggle::global(),
        }
    }

    /// Reads variables from `vars` instead of the process environment.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    /// Gates the oracle on `toggle` instead of the process-wide one.
    pub fn with_toggle(mut self, toggle: SystemProxyToggle) -> Self {
        self.toggle = toggle;
        self
    }

    fn var(&self, name: &str) -> Option<String> {
        let lookup = |key: &str| match &self.vars {
            Some(vars) => vars.get(key).cloned(),
            None => env::var(key).ok(),
        };

        let value = if name.eq_ignore_ascii_case("HTTP_PROXY") {
            lookup("http_proxy")
        } else {
            lookup(&name.to_uppercase()).or_else(|| lookup(&name.to_lowercase()))
        };

        value.filter(|value| !value.trim().is_empty())
    }

    fn proxy_from_var(&self, name: &str) -> Option<ResolvedProxy> {
        let value = self.var(name)?;
        match parse_proxy_url(&value) {
            Some(proxy) => Some(proxy),
            None => {
                debug!(variable = name, value = %value, "Ignoring unusable proxy setting");
                None
            }
        }
    }
}

impl ProxyOracle for EnvProxyOracle {
    fn select(&self, endpoint: &Endpoint) -> Vec<ResolvedProxy> {
        if !self.toggle.is_enabled() {
            trace!(endpoint = %endpoint, "System proxies disabled");
            return vec![ResolvedProxy::NoProxy];
        }

        let no_proxy = self
            .var("NO_PROXY")
            .map(|list| NoProxyList::parse(&list))
            .unwrap_or_default();
        if no_proxy.should_bypass(endpoint.host()) {
            trace!(host = %endpoint.host(), "Bypassing proxy (in NO_PROXY)");
            return vec![ResolvedProxy::NoProxy];
        }

        let scheme_var = match endpoint.kind() {
            EndpointKind::Http => Some("http_proxy"),
            EndpointKind::Https => Some("HTTPS_PROXY"),
            EndpointKind::Ftp => Some("FTP_PROXY"),
            EndpointKind::Socket => None,
        };

        let candidates: Vec<ResolvedProxy> = std::iter::once("ALL_PROXY")
            .chain(scheme_var)
            .filter_map(|name| self.proxy_from_var(name))
            .collect();

        if candidates.is_empty() {
            vec![ResolvedProxy::NoProxy]
        } else {
            candidates
        }
    }
}

/// Parses `http://[user:pass@]host[:port]` or a bare `host[:port]`.
///
/// Proxies with any other scheme are not usable as HTTP proxies.
fn parse_proxy_url(value: &str) -> Option<ResolvedProxy> {
    let value = value.trim();
    let uri: Uri = if value.contains("://") {
        value.parse().ok()?
    } else {
        format!("http://{}", value).parse().ok()?
    };

    if !uri.scheme_str()?.eq_ignore_ascii_case("http") {
        return None;
    }

    let host = uri.host()?;
    let port = uri.port_u16().unwrap_or(DEFAULT_PROXY_PORT);
    ResolvedProxy::http(host, port).ok()
}
