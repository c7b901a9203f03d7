//! Proxy resolution for outbound endpoints.
//!
//! This module implements the resolution priority:
//! 1. System proxies (if enabled): the last candidate the oracle offers
//! 2. Static proxy (if a host is configured), installing credentials
//! 3. Direct connection

use crate::config::ProxySettings;
use crate::credentials::{CredentialRegistry, ProxyCredentials};
use crate::endpoint::Endpoint;
use crate::error::{ProxyError, Result};
use crate::proxy::ResolvedProxy;
use crate::system::{self, EnvProxyOracle, ProxyOracle};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A resolved proxy together with the credentials that belong to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub proxy: ResolvedProxy,
    /// Present only for a static proxy with both user and password set.
    pub credentials: Option<ProxyCredentials>,
}

/// Resolves the proxy to use for each outbound endpoint.
///
/// Settings are fixed at construction. A resolver is meant to be shared by
/// every request-handling thread.
#[derive(Clone)]
pub struct ProxyResolver {
    settings: ProxySettings,
    oracle: Arc<dyn ProxyOracle>,
    registry: CredentialRegistry,
}

impl ProxyResolver {
    /// Creates a resolver over an explicit oracle and registry.
    ///
    /// With system proxies enabled this also turns on the process-wide
    /// system proxy toggle, once, so every oracle in the process observes
    /// the same policy.
    pub fn new(
        settings: ProxySettings,
        oracle: Arc<dyn ProxyOracle>,
        registry: CredentialRegistry,
    ) -> Self {
        if settings.use_system_proxies {
            system::enable_system_proxies();
        }

        debug!(settings = ?settings, "Proxy resolver created");

        Self {
            settings,
            oracle,
            registry,
        }
    }

    /// Creates a resolver using the environment oracle and the process-wide
    /// credential registry.
    pub fn with_system_defaults(settings: ProxySettings) -> Self {
        Self::new(
            settings,
            Arc::new(EnvProxyOracle::new()),
            CredentialRegistry::global(),
        )
    }

    pub fn settings(&self) -> &ProxySettings {
        &self.settings
    }

    /// The registry credentials are installed into by [`resolve`](Self::resolve).
    pub fn registry(&self) -> &CredentialRegistry {
        &self.registry
    }

    /// Resolves the proxy for `endpoint`.
    ///
    /// When a static proxy with credentials is selected, the credentials are
    /// installed into the registry, replacing whatever was there. Concurrent
    /// callers with different credentials race; the last write wins.
    pub fn resolve(&self, endpoint: &Endpoint) -> Result<ResolvedProxy> {
        let Resolution { proxy, credentials } = self.resolve_scoped(endpoint)?;

        if let Some(credentials) = credentials {
            self.registry.install_credentials(credentials);
        }

        Ok(proxy)
    }

    /// Resolves the proxy for `endpoint` without touching the registry.
    ///
    /// The credentials come back with the proxy so the caller can attach
    /// them to the connection that needs them.
    pub fn resolve_scoped(&self, endpoint: &Endpoint) -> Result<Resolution> {
        // 1. Defer to the system proxy policy
        if self.settings.use_system_proxies {
            let proxy = self.select_system_proxy(endpoint)?;
            return Ok(Resolution {
                proxy,
                credentials: None,
            });
        }

        // 2. Static proxy from settings
        if let Some(address) = self.settings.static_address()? {
            let credentials = self.settings.credentials();
            let partial = self.settings.user.is_some() || self.settings.password.is_some();
            if credentials.is_none() && partial {
                debug!("Partial proxy credentials configured, not registering");
            }

            debug!(
                endpoint = %endpoint,
                proxy = %address,
                authenticated = credentials.is_some(),
                "Using static proxy"
            );

            return Ok(Resolution {
                proxy: ResolvedProxy::HttpProxy(address),
                credentials,
            });
        }

        // 3. Direct connection
        debug!(endpoint = %endpoint, "No proxy configured, connecting directly");
        Ok(Resolution {
            proxy: ResolvedProxy::NoProxy,
            credentials: None,
        })
    }

    fn select_system_proxy(&self, endpoint: &Endpoint) -> Result<ResolvedProxy> {
        let mut candidates = self.oracle.select(endpoint);
        let count = candidates.len();

        // The last candidate is the most specific one.
        let proxy = candidates
            .pop()
            .ok_or_else(|| ProxyError::NoProxyCandidates {
                endpoint: endpoint.to_string(),
            })?;

        debug!(
            endpoint = %endpoint,
            candidates = count,
            proxy = %proxy,
            "Resolved via system proxies"
        );

        Ok(proxy)
    }
}

impl fmt::Debug for ProxyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyResolver")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
