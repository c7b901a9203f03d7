//! # Proxy Resolver
//!
//! Prints the proxy an HTTP client would use for each endpoint.
//!
//! ## Usage
//!
//! ```bash
//! # Static proxy from the command line
//! proxy-resolver --proxy-host proxy.corp --proxy-port 3128 https://example.com
//!
//! # Defer to the system proxy environment
//! HTTPS_PROXY=http://proxy.corp:3128 proxy-resolver --system https://example.com
//!
//! # Force static resolution even if the config file enables the system policy
//! proxy-resolver --system=false --proxy-host proxy.corp --proxy-port 3128 http://example.com
//!
//! # Custom config, debug logging
//! proxy-resolver -c /path/to/proxy.yaml -vv ftp://files.example.com socket://db:5432
//! ```
//!
//! Each endpoint prints as `<endpoint> DIRECT` or `<endpoint> PROXY host:port`.

use clap::Parser;
use proxy_resolver::config::{AppConfig, ProxyConfig};
use proxy_resolver::{logging, Endpoint, ProxyResolver};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Resolves the proxy to use for outbound endpoints.
#[derive(Parser, Debug)]
#[command(name = "proxy-resolver")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Endpoints to resolve (http://, https://, ftp:// or socket://host:port)
    #[arg(required = true)]
    endpoints: Vec<String>,

    /// Path to the configuration file
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Defer to the system proxy policy (overrides config; `--system=false` turns it off)
    #[arg(
        long,
        env = "PROXY_SYSTEM",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    system: Option<bool>,

    /// Static proxy hostname (overrides config)
    #[arg(long, env = "PROXY_HOST")]
    proxy_host: Option<String>,

    /// Static proxy port (overrides config)
    #[arg(long, env = "PROXY_PORT")]
    proxy_port: Option<u16>,

    /// Static proxy username (overrides config)
    #[arg(long, env = "PROXY_USER")]
    proxy_user: Option<String>,

    /// Static proxy password (overrides config)
    #[arg(long, env = "PROXY_PASSWORD", hide_env_values = true)]
    proxy_password: Option<String>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace, -vvvv trace+deps)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    /// Converts verbosity count to log level string
    fn log_level(&self) -> Option<String> {
        if self.quiet {
            return Some("error".to_string());
        }
        match self.verbose {
            0 => None, // Use config default
            1 => Some("info".to_string()),
            2 => Some("debug".to_string()),
            _ => Some("trace".to_string()),
        }
    }

    /// Whether to include verbose dependency logging
    fn trace_deps(&self) -> bool {
        self.verbose >= 4
    }

    fn proxy_overrides(&self) -> ProxyConfig {
        ProxyConfig {
            system: self.system,
            host: self.proxy_host.clone(),
            port: self.proxy_port,
            user: self.proxy_user.clone(),
            password: self.proxy_password.clone(),
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    // CLI and environment values win over the file; validated after logging
    // is up so configuration warnings reach the subscriber.
    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init_logging(&config.logging, args.log_level(), args.trace_deps()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    let settings = config.proxy.settings();
    info!(
        version = env!("CARGO_PKG_VERSION"),
        system = settings.use_system_proxies,
        "Starting proxy-resolver"
    );

    let resolver = ProxyResolver::with_system_defaults(settings);

    let stdout = io::stdout();
    match resolve_all(&resolver, &args.endpoints, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

/// Loads the file configuration and applies the proxy overrides from `args`.
///
/// The result is not validated yet.
fn build_config(args: &Args) -> proxy_resolver::Result<AppConfig> {
    Ok(load_config(args)?.with_proxy_overrides(args.proxy_overrides()))
}

/// Resolves each endpoint in order and writes one line per endpoint.
///
/// Stops at the first endpoint that fails to parse or resolve.
fn resolve_all<W: Write>(
    resolver: &ProxyResolver,
    endpoints: &[String],
    out: &mut W,
) -> proxy_resolver::Result<()> {
    for raw in endpoints {
        let proxy = raw
            .parse::<Endpoint>()
            .and_then(|endpoint| resolver.resolve(&endpoint))
            .map_err(|e| {
                error!(endpoint = %raw, error = %e, "Resolution failed");
                e
            })?;

        writeln!(out, "{} {}", raw, proxy)?;
    }

    out.flush()?;
    Ok(())
}

/// Load configuration from file or use defaults
fn load_config(args: &Args) -> proxy_resolver::Result<AppConfig> {
    if let Some(ref path) = args.config {
        return AppConfig::load(path);
    }

    let defaults = ["./proxy.yaml", "./proxy.yml", "/etc/proxy-resolver/config.yaml"];
    match defaults.iter().map(PathBuf::from).find(|p| p.exists()) {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_resolver::{CredentialRegistry, EnvProxyOracle, ProxyError, ProxySettings};
    use std::sync::Arc;
    use tempfile::NamedTempFile;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn static_resolver(settings: ProxySettings) -> ProxyResolver {
        let oracle = EnvProxyOracle::new().with_vars(Vec::<(String, String)>::new());
        ProxyResolver::new(settings, Arc::new(oracle), CredentialRegistry::new())
    }

    fn resolve_to_string(resolver: &ProxyResolver, endpoints: &[&str]) -> proxy_resolver::Result<String> {
        let endpoints: Vec<String> = endpoints.iter().map(|e| e.to_string()).collect();
        let mut out = Vec::new();
        resolve_all(resolver, &endpoints, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_system_flag_before_endpoint() {
        let args = parse(&["proxy-resolver", "--system", "https://example.com"]);

        assert_eq!(args.system, Some(true));
        assert_eq!(args.endpoints, vec!["https://example.com".to_string()]);
    }

    #[test]
    fn test_system_flag_explicit_value() {
        let args = parse(&["proxy-resolver", "--system=false", "http://example.com"]);
        assert_eq!(args.system, Some(false));
        assert_eq!(args.endpoints.len(), 1);

        let args = parse(&["proxy-resolver", "http://example.com"]);
        assert_eq!(args.system, None);
    }

    #[test]
    fn test_endpoints_required() {
        assert!(Args::try_parse_from(["proxy-resolver", "--system"]).is_err());
    }

    #[test]
    fn test_log_levels() {
        assert_eq!(parse(&["proxy-resolver", "x"]).log_level(), None);
        assert_eq!(parse(&["proxy-resolver", "-v", "x"]).log_level().as_deref(), Some("info"));
        assert_eq!(parse(&["proxy-resolver", "-vv", "x"]).log_level().as_deref(), Some("debug"));
        assert_eq!(parse(&["proxy-resolver", "-vvv", "x"]).log_level().as_deref(), Some("trace"));
        assert_eq!(parse(&["proxy-resolver", "-q", "x"]).log_level().as_deref(), Some("error"));
        assert_eq!(parse(&["proxy-resolver", "-q", "-vv", "x"]).log_level().as_deref(), Some("error"));

        assert!(!parse(&["proxy-resolver", "-vvv", "x"]).trace_deps());
        assert!(parse(&["proxy-resolver", "-vvvv", "x"]).trace_deps());
    }

    #[test]
    fn test_quiet_filter_silences_dependencies() {
        let args = parse(&["proxy-resolver", "-q", "x"]);
        let level = args.log_level().unwrap();

        assert_eq!(
            logging::filter_directive(&level, args.trace_deps()),
            "error,proxy_resolver=error"
        );
    }

    #[test]
    fn test_file_port_supplied_on_command_line() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
proxy:
  system: false
  host: "proxy.corp"
  user: "alice"
  password: "s3cr3t"
"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let args = parse(&["proxy-resolver", "-c", path, "--proxy-port", "3128", "http://example.com"]);
        let config = build_config(&args).unwrap();

        assert!(config.validate().is_ok());
        let settings = config.proxy.settings();
        assert_eq!(settings.host.as_deref(), Some("proxy.corp"));
        assert_eq!(settings.port, Some(3128));
        assert_eq!(settings.user.as_deref(), Some("alice"));
    }

    #[test]
    fn test_file_without_port_fails_validation() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(
            br#"
proxy:
  system: false
  host: "proxy.corp"
"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let args = parse(&["proxy-resolver", "-c", path, "http://example.com"]);
        let config = build_config(&args).unwrap();

        assert!(matches!(config.validate(), Err(ProxyError::MissingProxyPort { .. })));
    }

    #[test]
    fn test_missing_config_file() {
        let args = parse(&["proxy-resolver", "-c", "/nonexistent/proxy.yaml", "http://example.com"]);
        assert!(matches!(build_config(&args), Err(ProxyError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_output_lines() {
        let direct = static_resolver(ProxySettings::direct());
        assert_eq!(
            resolve_to_string(&direct, &["http://example.com"]).unwrap(),
            "http://example.com DIRECT\n"
        );

        let fixed = static_resolver(ProxySettings::static_proxy("proxy.corp", 3128));
        assert_eq!(
            resolve_to_string(&fixed, &["https://example.com", "socket://db:5432"]).unwrap(),
            "https://example.com PROXY proxy.corp:3128\nsocket://db:5432 PROXY proxy.corp:3128\n"
        );
    }

    #[test]
    fn test_invalid_endpoint_stops_output() {
        let resolver = static_resolver(ProxySettings::direct());
        let endpoints = vec!["http://example.com".to_string(), "socket://db".to_string()];
        let mut out = Vec::new();

        let result = resolve_all(&resolver, &endpoints, &mut out);

        assert!(matches!(result, Err(ProxyError::InvalidEndpoint { .. })));
        assert_eq!(String::from_utf8(out).unwrap(), "http://example.com DIRECT\n");
    }
}
