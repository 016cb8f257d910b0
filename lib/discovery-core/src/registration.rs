//! Registration descriptor advertised to the registry

use crate::ServiceInstance;
use std::time::Duration;

/// How the registry probes an instance and when it gives up on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HealthCheck {
    /// URL the registry calls; must be reachable from the registry's network
    pub http: String,
    /// Interval between probes
    pub interval: Duration,
    /// Timeout for a single probe
    pub timeout: Duration,
    /// How long an instance may stay critical before the registry removes it
    pub deregister_critical_service_after: Duration,
}

impl HealthCheck {
    pub fn new(http: impl Into<String>) -> Self {
        Self {
            http: http.into(),
            ..Self::default()
        }
    }
}

impl Default for HealthCheck {
    fn default() -> Self {
        Self {
            http: String::new(),
            interval: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            deregister_critical_service_after: Duration::from_secs(60),
        }
    }
}

/// Immutable description of how this process is advertised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceRegistration {
    id: String,
    name: String,
    address: String,
    port: u16,
    tags: Vec<String>,
    check: HealthCheck,
}

impl ServiceRegistration {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
        check: HealthCheck,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            address: address.into(),
            port,
            tags: Vec::new(),
            check,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn check(&self) -> &HealthCheck {
        &self.check
    }

    /// The instance a registry would report for this registration.
    pub fn to_instance(&self) -> ServiceInstance {
        ServiceInstance::new(&self.id, &self.name, &self.address, self.port)
            .with_tags(self.tags.clone())
    }
}
