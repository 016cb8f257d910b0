//! Process settings read from environment variables
//!
//! Variables describing this service (`SERVICE_ID`, `APPLICATION_NAME`,
//! `ASPNETCORE_PORT`, `ASPNETCORE_URLS`) never fail to load: unusable values
//! fall back to defaults. Variables describing the registry connection are
//! validated here so a malformed registry address stops the process at startup.

use crate::{DiscoveryError, LoadBalancingStrategy, Result};
use std::collections::HashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;
use url::{Host, Url};

pub const DEFAULT_SERVICE_NAME: &str = "ecp-service";
pub const DEFAULT_ADVERTISE_ADDRESS: &str = "host.docker.internal";
pub const DEFAULT_SERVICE_PORT: u16 = 80;
pub const DEFAULT_REGISTRY_HOST: &str = "localhost";
pub const DEFAULT_REGISTRY_PORT: u16 = 8500;
pub const HEALTH_PATH: &str = "/health";

/// Which registry implementation the process talks to
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistryBackend {
    /// Consul-compatible agent HTTP API
    #[default]
    Consul,
    /// Process-local registry, for single-node development
    Memory,
}

impl FromStr for RegistryBackend {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "consul" => Ok(RegistryBackend::Consul),
            "memory" | "in-memory" => Ok(RegistryBackend::Memory),
            other => Err(DiscoveryError::InvalidConfiguration(format!(
                "unknown REGISTRY_BACKEND '{}'",
                other
            ))),
        }
    }
}

/// URL scheme used to reach the registry
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistryScheme {
    #[default]
    Http,
    Https,
}

impl fmt::Display for RegistryScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryScheme::Http => write!(f, "http"),
            RegistryScheme::Https => write!(f, "https"),
        }
    }
}

impl FromStr for RegistryScheme {
    type Err = DiscoveryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http" => Ok(RegistryScheme::Http),
            "https" => Ok(RegistryScheme::Https),
            other => Err(DiscoveryError::InvalidConfiguration(format!(
                "unknown CONSUL_SCHEME '{}'",
                other
            ))),
        }
    }
}

/// Connection details for the registry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistrySettings {
    pub scheme: RegistryScheme,
    pub host: String,
    pub port: u16,
    /// ACL token sent with every request
    pub token: Option<String>,
    /// Upper bound for a single registry call
    pub request_timeout: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            scheme: RegistryScheme::Http,
            host: DEFAULT_REGISTRY_HOST.to_string(),
            port: DEFAULT_REGISTRY_PORT,
            token: None,
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Everything the registration and discovery components read from the environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub service_id: Option<String>,
    pub application_name: Option<String>,
    /// Port override, takes precedence over the listen URL
    pub explicit_port: Option<u16>,
    /// `ASPNETCORE_URLS`, split on `;`
    pub listen_urls: Vec<String>,
    /// Address the registry uses to reach this process
    pub advertise_address: String,
    pub service_tags: Vec<String>,
    pub registry: RegistrySettings,
    pub backend: RegistryBackend,
    pub load_balancing: LoadBalancingStrategy,
    pub check_interval: Duration,
    pub check_timeout: Duration,
    pub deregister_critical_after: Duration,
    /// Bound on the shutdown-time deregistration call
    pub deregister_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_id: None,
            application_name: None,
            explicit_port: None,
            listen_urls: Vec::new(),
            advertise_address: DEFAULT_ADVERTISE_ADDRESS.to_string(),
            service_tags: Vec::new(),
            registry: RegistrySettings::default(),
            backend: RegistryBackend::default(),
            load_balancing: LoadBalancingStrategy::default(),
            check_interval: Duration::from_secs(10),
            check_timeout: Duration::from_secs(5),
            deregister_critical_after: Duration::from_secs(60),
            deregister_timeout: Duration::from_secs(5),
        }
    }
}

impl Settings {
    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_vars(std::env::vars())
    }

    /// Load settings from an explicit set of variables
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let get = |key: &str| {
            vars.get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Settings::default();

        let explicit_port = get("ASPNETCORE_PORT").and_then(|raw| match raw.parse::<u16>() {
            Ok(port) => Some(port),
            Err(_) => {
                warn!("Ignoring invalid ASPNETCORE_PORT '{}'", raw);
                None
            }
        });

        let listen_urls = get("ASPNETCORE_URLS")
            .map(|raw| split_list(&raw, ';'))
            .unwrap_or_default();

        let registry = RegistrySettings {
            scheme: get("CONSUL_SCHEME")
                .map(|s| s.parse::<RegistryScheme>())
                .transpose()?
                .unwrap_or_default(),
            host: get("CONSUL_HOST").unwrap_or(defaults.registry.host),
            port: get("CONSUL_PORT")
                .map(|raw| {
                    raw.parse::<u16>().map_err(|_| {
                        DiscoveryError::InvalidConfiguration(format!(
                            "CONSUL_PORT must be a port number, got '{}'",
                            raw
                        ))
                    })
                })
                .transpose()?
                .unwrap_or(defaults.registry.port),
            token: get("CONSUL_TOKEN"),
            request_timeout: secs(&get, "REGISTRY_TIMEOUT_SECS")?
                .unwrap_or(defaults.registry.request_timeout),
        };

        if registry.host.contains('/') || registry.host.contains(' ') {
            return Err(DiscoveryError::InvalidConfiguration(format!(
                "CONSUL_HOST must be a bare host name, got '{}'",
                registry.host
            )));
        }

        Ok(Self {
            service_id: get("SERVICE_ID"),
            application_name: get("APPLICATION_NAME"),
            explicit_port,
            listen_urls,
            advertise_address: get("SERVICE_ADDRESS").unwrap_or(defaults.advertise_address),
            service_tags: get("SERVICE_TAGS")
                .map(|raw| split_list(&raw, ','))
                .unwrap_or_default(),
            registry,
            backend: get("REGISTRY_BACKEND")
                .map(|s| s.parse::<RegistryBackend>())
                .transpose()?
                .unwrap_or_default(),
            load_balancing: get("LOAD_BALANCER")
                .map(|s| s.parse::<LoadBalancingStrategy>())
                .transpose()?
                .unwrap_or_default(),
            check_interval: secs(&get, "HEALTH_CHECK_INTERVAL_SECS")?
                .unwrap_or(defaults.check_interval),
            check_timeout: secs(&get, "HEALTH_CHECK_TIMEOUT_SECS")?
                .unwrap_or(defaults.check_timeout),
            deregister_critical_after: secs(&get, "DEREGISTER_CRITICAL_AFTER_SECS")?
                .unwrap_or(defaults.deregister_critical_after),
            deregister_timeout: secs(&get, "DEREGISTER_TIMEOUT_SECS")?
                .unwrap_or(defaults.deregister_timeout),
        })
    }

    /// `https://` when the first listen URL is HTTPS, otherwise `http://`
    pub fn protocol(&self) -> &'static str {
        let is_https = self
            .listen_urls
            .first()
            .and_then(|url| url.get(..8))
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("https://"));

        if is_https {
            "https://"
        } else {
            "http://"
        }
    }

    /// Port to advertise: explicit override, then the listen URL, then 80
    pub fn port(&self) -> u16 {
        self.explicit_port
            .or_else(|| {
                self.first_listen_url()
                    .and_then(|url| url.port_or_known_default())
            })
            .unwrap_or(DEFAULT_SERVICE_PORT)
    }

    /// Local socket address the HTTP server binds to
    pub fn bind_addr(&self) -> SocketAddr {
        let ip = self
            .first_listen_url()
            .and_then(|url| match url.host() {
                Some(Host::Ipv4(ip)) => Some(IpAddr::V4(ip)),
                Some(Host::Ipv6(ip)) => Some(IpAddr::V6(ip)),
                Some(Host::Domain(domain)) if domain.eq_ignore_ascii_case("localhost") => {
                    Some(IpAddr::V4(Ipv4Addr::LOCALHOST))
                }
                _ => None,
            })
            .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED));

        SocketAddr::new(ip, self.port())
    }

    /// Base URL of the registry HTTP API
    pub fn registry_base_url(&self) -> String {
        format!(
            "{}://{}:{}",
            self.registry.scheme, self.registry.host, self.registry.port
        )
    }

    /// Parse the first listen URL, accepting the `+` and `*` wildcard hosts
    fn first_listen_url(&self) -> Option<Url> {
        let raw = self.listen_urls.first()?;
        let normalized = raw.replacen("://+", "://0.0.0.0", 1).replacen("://*", "://0.0.0.0", 1);
        match Url::parse(&normalized) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Ignoring unparsable listen URL '{}': {}", raw, e);
                None
            }
        }
    }
}

fn split_list(raw: &str, separator: char) -> Vec<String> {
    raw.split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn secs<F>(get: &F, key: &str) -> Result<Option<Duration>>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                DiscoveryError::InvalidConfiguration(format!(
                    "{} must be a whole number of seconds, got '{}'",
                    key, raw
                ))
            })
        })
        .transpose()
}
