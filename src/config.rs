//! Configuration for the proxy resolver.
//!
//! Settings are read once at startup from an optional YAML file, overlaid
//! with environment/CLI values, and resolved eagerly into [`ProxySettings`].
//! Nothing here is re-read after startup.

use crate::credentials::ProxyCredentials;
use crate::error::{ProxyError, Result};
use crate::proxy::ProxyAddress;
use crate::system;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::warn;

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable pretty format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
    /// JSON format for structured logging.
    Json,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    pub level: String,

    /// Output destination: stdout, stderr, or file path.
    pub output: String,

    /// Log format.
    pub format: LogFormat,

    /// Include target (module path) in logs.
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            output: "stderr".to_string(),
            format: LogFormat::Compact,
            include_target: false,
        }
    }
}

/// The `proxy` section as written in the file or given on the command line.
///
/// Every field is optional; [`ProxyConfig::settings`] resolves defaults.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Defer to the system proxy policy. Defaults to the OS-level flag.
    pub system: Option<bool>,

    /// Static proxy hostname.
    pub host: Option<String>,

    /// Static proxy port.
    pub port: Option<u16>,

    /// Static proxy username.
    pub user: Option<String>,

    /// Static proxy password.
    pub password: Option<String>,
}

impl ProxyConfig {
    /// Returns a copy where every value set in `overrides` wins.
    pub fn overlay(self, overrides: ProxyConfig) -> ProxyConfig {
        ProxyConfig {
            system: overrides.system.or(self.system),
            host: overrides.host.or(self.host),
            port: overrides.port.or(self.port),
            user: overrides.user.or(self.user),
            password: overrides.password.or(self.password),
        }
    }

    /// Resolves defaults into the settings the resolver runs with.
    ///
    /// An unset `system` takes the value of the OS-level flag
    /// (see [`system::use_system_proxies`]).
    pub fn settings(&self) -> ProxySettings {
        ProxySettings {
            use_system_proxies: self.system.unwrap_or_else(system::use_system_proxies),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
        }
    }

    /// Validates the section against the settings it resolves to.
    pub fn validate(&self) -> Result<()> {
        self.settings().validate()
    }
}

impl fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("system", &self.system)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

/// Resolved settings governing proxy resolution.
///
/// When `use_system_proxies` is set the static fields are ignored.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct ProxySettings {
    pub use_system_proxies: bool,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ProxySettings {
    /// Settings that always connect directly.
    pub fn direct() -> Self {
        Self::default()
    }

    /// Settings that delegate to the system proxy policy.
    pub fn system() -> Self {
        Self {
            use_system_proxies: true,
            ..Self::default()
        }
    }

    /// Settings for a static HTTP proxy without credentials.
    pub fn static_proxy(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port: Some(port),
            ..Self::default()
        }
    }

    pub fn with_credentials(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self.password = Some(password.into());
        self
    }

    /// Credentials to install, present only when both user and password are.
    pub fn credentials(&self) -> Option<ProxyCredentials> {
        match (&self.user, &self.password) {
            (Some(user), Some(password)) => Some(ProxyCredentials::new(user, password)),
            _ => None,
        }
    }

    /// Builds the static proxy address, if a host is configured.
    pub fn static_address(&self) -> Result<Option<ProxyAddress>> {
        let Some(host) = &self.host else {
            return Ok(None);
        };
        let port = self
            .port
            .ok_or_else(|| ProxyError::MissingProxyPort { host: host.clone() })?;
        ProxyAddress::new(host, port).map(Some)
    }

    /// Checks the static proxy fields unless system proxies take over.
    pub fn validate(&self) -> Result<()> {
        if self.use_system_proxies {
            return Ok(());
        }

        self.static_address()?;

        if self.user.is_some() != self.password.is_some() {
            warn!("Proxy user and password must both be set; credentials will not be used");
        }

        Ok(())
    }
}

impl fmt::Debug for ProxySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxySettings")
            .field("use_system_proxies", &self.use_system_proxies)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &redacted(&self.password))
            .finish()
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Proxy configuration.
    pub proxy: ProxyConfig,
}

impl AppConfig {
    /// Loads configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ProxyError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Parses configuration from YAML text.
    ///
    /// Only the logging section is validated here. The proxy section may
    /// still receive overrides, so [`validate`](Self::validate) runs once
    /// the final values are in place.
    pub fn from_yaml(contents: &str) -> Result<Self> {
        let config: AppConfig =
            serde_yaml::from_str(contents).map_err(|e| ProxyError::config_parse(e.to_string()))?;

        config.validate_logging()?;

        Ok(config)
    }

    /// Applies proxy overrides (environment, command line) over the file.
    pub fn with_proxy_overrides(mut self, overrides: ProxyConfig) -> Self {
        self.proxy = self.proxy.overlay(overrides);
        self
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        self.validate_logging()?;
        self.proxy.validate()
    }

    fn validate_logging(&self) -> Result<()> {
        // Validate logging level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ProxyError::config_validation(format!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level, valid_levels
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert_eq!(config.proxy, ProxyConfig::default());
        assert!(config.proxy.host.is_none());
    }

    #[test]
    fn test_load_config() {
        let yaml = r#"
logging:
  level: "debug"
  output: "stdout"
proxy:
  system: false
  host: "proxy.example.org"
  port: 3128
  user: "alice"
  password: "s3cr3t"
"#;
        let file = create_temp_config(yaml);
        let config = AppConfig::load(file.path()).unwrap();

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.output, "stdout");
        assert_eq!(config.proxy.system, Some(false));
        assert_eq!(config.proxy.host.as_deref(), Some("proxy.example.org"));
        assert_eq!(config.proxy.port, Some(3128));

        let settings = config.proxy.settings();
        assert!(!settings.use_system_proxies);
        assert_eq!(
            settings.credentials(),
            Some(ProxyCredentials::new("alice", "s3cr3t"))
        );
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::load("/nonexistent/proxy-resolver.yaml");
        assert!(matches!(result, Err(ProxyError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_invalid_log_level() {
        let yaml = r#"
logging:
  level: "invalid"
"#;
        assert!(AppConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_host_without_port_rejected() {
        let yaml = r#"
proxy:
  system: false
  host: "proxy.example.org"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ProxyError::MissingProxyPort { .. }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_malformed_host_rejected() {
        let yaml = r#"
proxy:
  system: false
  host: "http://proxy.example.org"
  port: 3128
"#;
        let err = AppConfig::from_yaml(yaml)
            .and_then(|config| config.validate())
            .unwrap_err();
        assert!(matches!(err, ProxyError::InvalidProxyHost { .. }));
    }

    #[test]
    fn test_system_ignores_static_fields() {
        let yaml = r#"
proxy:
  system: true
  host: "proxy.example.org"
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert!(config.proxy.settings().use_system_proxies);
    }

    #[test]
    fn test_port_out_of_range() {
        let yaml = r#"
proxy:
  host: "proxy.example.org"
  port: 70000
"#;
        assert!(matches!(
            AppConfig::from_yaml(yaml),
            Err(ProxyError::ConfigParse { .. })
        ));
    }

    #[test]
    fn test_port_from_overrides() {
        let yaml = r#"
proxy:
  system: false
  host: "proxy.corp"
"#;
        let file = create_temp_config(yaml);
        let config = AppConfig::load(file.path()).unwrap();

        let config = config.with_proxy_overrides(ProxyConfig {
            port: Some(3128),
            ..Default::default()
        });
        assert!(config.validate().is_ok());

        let settings = config.proxy.settings();
        assert_eq!(settings.host.as_deref(), Some("proxy.corp"));
        assert_eq!(settings.port, Some(3128));
    }

    #[test]
    fn test_overlay() {
        let file = ProxyConfig {
            system: Some(false),
            host: Some("file-proxy".to_string()),
            port: Some(3128),
            ..Default::default()
        };
        let cli = ProxyConfig {
            host: Some("cli-proxy".to_string()),
            user: Some("bob".to_string()),
            ..Default::default()
        };

        let merged = file.overlay(cli);
        assert_eq!(merged.system, Some(false));
        assert_eq!(merged.host.as_deref(), Some("cli-proxy"));
        assert_eq!(merged.port, Some(3128));
        assert_eq!(merged.user.as_deref(), Some("bob"));
        assert!(merged.password.is_none());
    }

    #[test]
    fn test_partial_credentials() {
        let settings = ProxySettings {
            user: Some("alice".to_string()),
            ..ProxySettings::static_proxy("proxy", 3128)
        };
        assert!(settings.credentials().is_none());
        assert!(settings.validate().is_ok());

        let settings = ProxySettings {
            password: Some("s3cr3t".to_string()),
            ..ProxySettings::static_proxy("proxy", 3128)
        };
        assert!(settings.credentials().is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let settings = ProxySettings::static_proxy("proxy", 3128).with_credentials("alice", "s3cr3t");
        let debug = format!("{:?}", settings);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("s3cr3t"));

        let config = ProxyConfig {
            password: Some("s3cr3t".to_string()),
            ..Default::default()
        };
        assert!(!format!("{:?}", config).contains("s3cr3t"));
    }
}
