//! # Proxy Resolver
//!
//! This crate decides, for one outbound endpoint (`http`, `https`, `ftp` or
//! `socket://host:port`), which proxy an HTTP client should connect through,
//! and registers the credentials that answer the proxy's authentication
//! challenges.
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading, overlays and eager defaulting
//! - [`credentials`]: Proxy credentials and the challenge registry
//! - [`endpoint`]: Endpoint parsing and classification
//! - [`error`]: Error types and handling
//! - [`logging`]: Logging setup and configuration
//! - [`proxy`]: The resolved proxy type
//! - [`resolver`]: Proxy resolution logic
//! - [`system`]: System proxy policy and the process-wide toggle
//!
//! ## Example
//!
//! ```
//! use proxy_resolver::{Endpoint, ProxyResolver, ProxySettings, ResolvedProxy};
//!
//! let settings = ProxySettings::static_proxy("proxy.example.org", 3128);
//! let resolver = ProxyResolver::with_system_defaults(settings);
//!
//! let endpoint: Endpoint = "https://api.example.com/v1".parse()?;
//! let proxy = resolver.resolve(&endpoint)?;
//! assert_eq!(proxy, ResolvedProxy::http("proxy.example.org", 3128)?);
//! # Ok::<(), proxy_resolver::ProxyError>(())
//! ```
//!
//! ## Resolution Priority
//!
//! 1. **System proxies**: If enabled, the last candidate of the system policy
//! 2. **Static proxy**: If a proxy host is configured
//! 3. **Direct**: No proxy

pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod proxy;
pub mod resolver;
pub mod system;

pub use config::{AppConfig, ProxyConfig, ProxySettings};
pub use credentials::{AuthChallenge, Authenticator, CredentialRegistry, ProxyCredentials};
pub use endpoint::{Endpoint, EndpointKind};
pub use error::{ProxyError, Result};
pub use proxy::{ProxyAddress, ResolvedProxy};
pub use resolver::{ProxyResolver, Resolution};
pub use system::{EnvProxyOracle, ProxyOracle};
