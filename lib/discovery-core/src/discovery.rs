//! Resolves logical service names to endpoint URLs

use crate::{LoadBalancer, LoadBalancingStrategy, RegistryClient, Result, ServiceInstance};
use std::sync::Arc;
use tracing::debug;

/// DiscoveryClient queries the registry and picks one instance per call.
///
/// `Ok(None)` means the registry answered but knows no instance of the
/// service; an `Err` means the registry itself could not be queried. Callers
/// own any retry or fallback policy.
pub struct DiscoveryClient {
    registry: Arc<dyn RegistryClient>,
    protocol: String,
    load_balancer: LoadBalancer,
}

impl DiscoveryClient {
    /// Create a discovery client that composes URLs with `protocol` (e.g. `http://`)
    pub fn new(registry: Arc<dyn RegistryClient>, protocol: impl Into<String>) -> Self {
        Self {
            registry,
            protocol: protocol.into(),
            load_balancer: LoadBalancer::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: LoadBalancingStrategy) -> Self {
        self.load_balancer = LoadBalancer::new(strategy);
        self
    }

    /// Pick one instance of `service_name`, matched case-insensitively
    pub async fn resolve_instance(&self, service_name: &str) -> Result<Option<ServiceInstance>> {
        let instances: Vec<ServiceInstance> = self
            .registry
            .services()
            .await?
            .into_iter()
            .filter(|instance| instance.matches_name(service_name))
            .collect();

        debug!("Found {} instances of {}", instances.len(), service_name);

        Ok(self.load_balancer.select(&instances).cloned())
    }

    /// Resolve `service_name` to `{protocol}{address}:{port}/{endpoint}`
    pub async fn resolve(&self, service_name: &str, endpoint: &str) -> Result<Option<String>> {
        let Some(instance) = self.resolve_instance(service_name).await? else {
            debug!("No instance registered for {}", service_name);
            return Ok(None);
        };

        let url = format!(
            "{}{}:{}/{}",
            self.protocol.trim(),
            instance.address.trim(),
            instance.port,
            endpoint.trim()
        );
        debug!("Resolved {} to {}", service_name, url);

        Ok(Some(url))
    }
}
