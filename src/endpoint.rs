//! Outbound endpoints handed to the resolver.
//!
//! An endpoint is one of:
//! - an `http` URI for http connections
//! - an `https` URI for https connections
//! - an `ftp` URI for ftp connections
//! - `socket://host:port` for raw TCP client sockets

use crate::error::{ProxyError, Result};
use http::Uri;
use std::fmt;
use std::str::FromStr;

/// The kind of connection an endpoint describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Http,
    Https,
    Ftp,
    /// Raw TCP socket, written as `socket://host:port`.
    Socket,
}

impl EndpointKind {
    fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            "ftp" => Some(Self::Ftp),
            "socket" => Some(Self::Socket),
            _ => None,
        }
    }

    /// The scheme name as written in an endpoint URI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
            Self::Ftp => "ftp",
            Self::Socket => "socket",
        }
    }

    /// Port implied by the scheme when the URI has none.
    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::Http => Some(80),
            Self::Https => Some(443),
            Self::Ftp => Some(21),
            Self::Socket => None,
        }
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated outbound endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    uri: Uri,
    kind: EndpointKind,
    port: u16,
}

impl Endpoint {
    /// Parses an endpoint string such as `https://api.example.com/v1` or
    /// `socket://db.internal:5432`.
    pub fn parse(input: &str) -> Result<Self> {
        let uri: Uri = input
            .trim()
            .parse()
            .map_err(|e: http::uri::InvalidUri| ProxyError::invalid_endpoint(input, e.to_string()))?;
        Self::from_uri(uri)
    }

    /// Validates an already parsed URI as an endpoint.
    pub fn from_uri(uri: Uri) -> Result<Self> {
        let scheme = uri
            .scheme_str()
            .ok_or_else(|| ProxyError::invalid_endpoint(uri.to_string(), "missing scheme"))?;

        let kind = EndpointKind::from_scheme(scheme).ok_or_else(|| {
            ProxyError::invalid_endpoint(uri.to_string(), format!("unsupported scheme '{scheme}'"))
        })?;

        match uri.host() {
            Some(host) if !host.is_empty() => {}
            _ => return Err(ProxyError::invalid_endpoint(uri.to_string(), "missing host")),
        }

        let port = uri
            .port_u16()
            .or_else(|| kind.default_port())
            .ok_or_else(|| {
                ProxyError::invalid_endpoint(uri.to_string(), "socket endpoints need an explicit port")
            })?;

        Ok(Self { uri, kind, port })
    }

    /// The connection kind.
    pub fn kind(&self) -> EndpointKind {
        self.kind
    }

    /// Hostname or IP literal, without IPv6 brackets.
    pub fn host(&self) -> &str {
        self.uri
            .host()
            .unwrap_or_default()
            .trim_start_matches('[')
            .trim_end_matches(']')
    }

    /// Explicit port, or the scheme default.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The underlying URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }
}

impl FromStr for Endpoint {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<Uri> for Endpoint {
    type Error = ProxyError;

    fn try_from(uri: Uri) -> Result<Self> {
        Self::from_uri(uri)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kinds() {
        let endpoint = Endpoint::parse("http://example.com/path").unwrap();
        assert_eq!(endpoint.kind(), EndpointKind::Http);
        assert_eq!(endpoint.host(), "example.com");
        assert_eq!(endpoint.port(), 80);

        let endpoint = Endpoint::parse("https://example.com").unwrap();
        assert_eq!(endpoint.kind(), EndpointKind::Https);
        assert_eq!(endpoint.port(), 443);

        let endpoint = Endpoint::parse("ftp://files.example.com/pub").unwrap();
        assert_eq!(endpoint.kind(), EndpointKind::Ftp);
        assert_eq!(endpoint.port(), 21);

        let endpoint = Endpoint::parse("socket://db.internal:5432").unwrap();
        assert_eq!(endpoint.kind(), EndpointKind::Socket);
        assert_eq!(endpoint.host(), "db.internal");
        assert_eq!(endpoint.port(), 5432);
    }

    #[test]
    fn test_explicit_port_and_ipv6() {
        let endpoint = Endpoint::parse("https://example.com:8443/").unwrap();
        assert_eq!(endpoint.port(), 8443);

        let endpoint = Endpoint::parse("http://[::1]:8080/").unwrap();
        assert_eq!(endpoint.host(), "::1");
        assert_eq!(endpoint.port(), 8080);
    }

    #[test]
    fn test_rejects_bad_endpoints() {
        assert!(matches!(
            Endpoint::parse("gopher://example.com"),
            Err(ProxyError::InvalidEndpoint { .. })
        ));
        assert!(Endpoint::parse("socket://db.internal").is_err());
        assert!(Endpoint::parse("/relative/path").is_err());
        assert!(Endpoint::parse("not a uri").is_err());
    }

    #[test]
    fn test_from_str_and_display() {
        let endpoint: Endpoint = "HTTPS://Example.com/".parse().unwrap();
        assert_eq!(endpoint.kind(), EndpointKind::Https);
        assert!(endpoint.to_string().contains("Example.com"));
    }
}
