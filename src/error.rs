//! Error types for proxy resolution.
//!
//! Configuration problems (a static proxy host without a port, a malformed
//! host) and resolution problems (the system oracle offering no candidate)
//! are both reported synchronously from `resolve()`; nothing here is retried.

use thiserror::Error;

/// Main error type for the proxy resolver.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// Configuration file could not be found.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}")]
    ConfigValidation { message: String },

    /// A static proxy host was configured without a port.
    #[error("Proxy host '{host}' is configured without a port")]
    MissingProxyPort { host: String },

    /// The configured static proxy host is not a bare hostname or IP literal.
    #[error("Invalid proxy host '{host}': {reason}")]
    InvalidProxyHost { host: String, reason: String },

    /// System proxy delegation produced no candidate for the endpoint.
    #[error("System proxy selection returned no candidates for {endpoint}")]
    NoProxyCandidates { endpoint: String },

    /// The endpoint is not an http, https, ftp or socket address.
    #[error("Invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },

    /// I/O error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProxyError {
    /// Creates a new configuration parse error.
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
        }
    }

    /// Creates a new configuration validation error.
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Creates a new invalid proxy host error.
    pub fn invalid_proxy_host(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProxyHost {
            host: host.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new invalid endpoint error.
    pub fn invalid_endpoint(endpoint: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidEndpoint {
            endpoint: endpoint.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors caused by the proxy settings themselves.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigValidation { .. }
                | Self::MissingProxyPort { .. }
                | Self::InvalidProxyHost { .. }
        )
    }

    /// Returns true when system proxy selection had nothing usable to offer.
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::NoProxyCandidates { .. })
    }
}

/// Result type alias using ProxyError.
pub type Result<T> = std::result::Result<T, ProxyError>;
