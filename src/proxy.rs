//! The outcome of resolving an endpoint.
//!
//! A [`ResolvedProxy`] is either a direct connection or a single HTTP proxy.
//! The networking layer routes the connection accordingly: a plain socket for
//! [`ResolvedProxy::NoProxy`], a proxy tunnel (CONNECT) or forwarded request
//! for [`ResolvedProxy::HttpProxy`].

use crate::error::{ProxyError, Result};
use std::fmt;
use std::net::Ipv6Addr;

/// Unresolved `host:port` address of a proxy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyAddress {
    host: String,
    port: u16,
}

impl ProxyAddress {
    /// Builds an address from a bare hostname or IP literal.
    ///
    /// IPv6 literals may be given with or without brackets.
    pub fn new(host: &str, port: u16) -> Result<Self> {
        let host = normalize_host(host)?;
        Ok(Self { host, port })
    }

    /// Hostname or IP literal, without IPv6 brackets.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Proxy port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Proxy selected for one endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolvedProxy {
    /// Connect directly.
    NoProxy,
    /// Route through an HTTP proxy.
    HttpProxy(ProxyAddress),
}

impl ResolvedProxy {
    /// Shorthand for an HTTP proxy at `host:port`.
    pub fn http(host: &str, port: u16) -> Result<Self> {
        ProxyAddress::new(host, port).map(Self::HttpProxy)
    }

    /// Returns true for a direct connection.
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::NoProxy)
    }

    /// The proxy address, if any.
    pub fn address(&self) -> Option<&ProxyAddress> {
        match self {
            Self::NoProxy => None,
            Self::HttpProxy(addr) => Some(addr),
        }
    }
}

impl fmt::Display for ResolvedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoProxy => f.write_str("DIRECT"),
            Self::HttpProxy(addr) => write!(f, "PROXY {}", addr),
        }
    }
}

fn normalize_host(raw: &str) -> Result<String> {
    let host = raw.trim();

    if host.is_empty() {
        return Err(ProxyError::invalid_proxy_host(raw, "host is empty"));
    }

    if host.contains("://") {
        return Err(ProxyError::invalid_proxy_host(
            raw,
            "expected a bare hostname, not a URL",
        ));
    }

    if let Some(inner) = host.strip_prefix('[') {
        let literal = inner
            .strip_suffix(']')
            .ok_or_else(|| ProxyError::invalid_proxy_host(raw, "unbalanced brackets"))?;
        literal
            .parse::<Ipv6Addr>()
            .map_err(|_| ProxyError::invalid_proxy_host(raw, "invalid IPv6 literal"))?;
        return Ok(literal.to_string());
    }

    if host.contains(':') {
        // Only an IPv6 literal may contain colons; "host:port" is not a host.
        return match host.parse::<Ipv6Addr>() {
            Ok(_) => Ok(host.to_string()),
            Err(_) => Err(ProxyError::invalid_proxy_host(
                raw,
                "port must be configured separately",
            )),
        };
    }

    if let Some(bad) = host
        .chars()
        .find(|c| c.is_whitespace() || matches!(c, '/' | '@' | '?' | '#' | '[' | ']'))
    {
        return Err(ProxyError::invalid_proxy_host(
            raw,
            format!("unexpected character '{}'", bad.escape_default()),
        ));
    }

    Ok(host.to_string())
}
