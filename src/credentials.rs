//! Proxy credentials and the registry consulted on authentication challenges.
//!
//! When a proxy answers with `407 Proxy Authentication Required`, the
//! networking layer builds an [`AuthChallenge`] and asks the
//! [`CredentialRegistry`] for credentials. The registry holds at most one
//! [`Authenticator`]; installing a new one replaces the previous one with no
//! versioning, so concurrent installers race and the last write wins.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, trace};

/// A user/password pair for proxy authentication.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    user: String,
    password: String,
}

impl ProxyCredentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Value for a `Proxy-Authorization` header using the Basic scheme.
    pub fn basic_authorization(&self) -> String {
        let token = STANDARD.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {}", token)
    }
}

impl fmt::Debug for ProxyCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyCredentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Who issued an authentication challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeTarget {
    /// A proxy (HTTP 407).
    Proxy,
    /// The origin server (HTTP 401).
    Server,
}

/// Details of an authentication challenge, as seen by the networking layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChallenge {
    pub target: ChallengeTarget,
    /// Host of the party issuing the challenge.
    pub host: String,
    pub port: u16,
    /// Authentication scheme offered, e.g. `Basic`.
    pub scheme: String,
    pub realm: Option<String>,
}

impl AuthChallenge {
    /// A Basic challenge from a proxy.
    pub fn proxy(host: impl Into<String>, port: u16) -> Self {
        Self {
            target: ChallengeTarget::Proxy,
            host: host.into(),
            port,
            scheme: "Basic".to_string(),
            realm: None,
        }
    }

    /// A Basic challenge from an origin server.
    pub fn server(host: impl Into<String>, port: u16) -> Self {
        Self {
            target: ChallengeTarget::Server,
            ..Self::proxy(host, port)
        }
    }

    pub fn with_realm(mut self, realm: impl Into<String>) -> Self {
        self.realm = Some(realm.into());
        self
    }
}

/// Answers authentication challenges.
pub trait Authenticator: Send + Sync {
    /// Returns credentials for the challenge, or `None` to decline it.
    fn credentials_for(&self, challenge: &AuthChallenge) -> Option<ProxyCredentials>;
}

/// Answers every proxy challenge with one fixed pair.
#[derive(Debug, Clone)]
pub struct StaticAuthenticator {
    credentials: ProxyCredentials,
}

impl StaticAuthenticator {
    pub fn new(credentials: ProxyCredentials) -> Self {
        Self { credentials }
    }
}

impl Authenticator for StaticAuthenticator {
    fn credentials_for(&self, challenge: &AuthChallenge) -> Option<ProxyCredentials> {
        match challenge.target {
            ChallengeTarget::Proxy => Some(self.credentials.clone()),
            ChallengeTarget::Server => None,
        }
    }
}

type Slot = Arc<RwLock<Option<Arc<dyn Authenticator>>>>;

static GLOBAL_REGISTRY: Lazy<CredentialRegistry> = Lazy::new(CredentialRegistry::new);

/// Shared handle to the authenticator used for proxy challenges.
///
/// Clones share the same slot.
#[derive(Clone, Default)]
pub struct CredentialRegistry {
    slot: Slot,
}

impl CredentialRegistry {
    /// Creates an empty registry, independent of the process-wide one.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Self {
        GLOBAL_REGISTRY.clone()
    }

    /// Installs `authenticator`, replacing whatever was installed before.
    pub fn install(&self, authenticator: Arc<dyn Authenticator>) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            trace!("Replacing installed proxy authenticator");
        }
        *slot = Some(authenticator);
    }

    /// Installs a [`StaticAuthenticator`] for `credentials`.
    pub fn install_credentials(&self, credentials: ProxyCredentials) {
        debug!(user = %credentials.user(), "Installing proxy credentials");
        self.install(Arc::new(StaticAuthenticator::new(credentials)));
    }

    /// Removes the installed authenticator.
    pub fn clear(&self) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_installed(&self) -> bool {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Asks the installed authenticator to answer `challenge`.
    pub fn answer(&self, challenge: &AuthChallenge) -> Option<ProxyCredentials> {
        let authenticator = self
            .slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()?;
        authenticator.credentials_for(challenge)
    }
}

impl fmt::Debug for CredentialRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRegistry")
            .field("installed", &self.is_installed())
            .finish()
    }
}
