//! Registry client boundary and an in-memory registry

use crate::{Result, ServiceInstance, ServiceRegistration};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Client side of an external service registry.
///
/// Implementations hold no per-call state and are shared read-only between
/// every lifecycle and discovery client in the process. `register` and
/// `deregister` must be idempotent: repeating either call leaves the registry
/// in the same state.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Register or replace the instance described by `registration`
    async fn register(&self, registration: &ServiceRegistration) -> Result<()>;

    /// Remove the instance with `service_id`; unknown IDs are not an error
    async fn deregister(&self, service_id: &str) -> Result<()>;

    /// List every instance known to the registry
    async fn services(&self) -> Result<Vec<ServiceInstance>>;
}

/// InMemoryRegistry keeps registrations in process memory
pub struct InMemoryRegistry {
    // Map of service_id to registration
    services: Arc<RwLock<HashMap<String, ServiceRegistration>>>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self {
            services: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get a registration by ID
    pub async fn get(&self, service_id: &str) -> Option<ServiceRegistration> {
        let services = self.services.read().await;
        services.get(service_id).cloned()
    }

    /// Get count of registered instances
    pub async fn service_count(&self) -> usize {
        let services = self.services.read().await;
        services.len()
    }
}

impl Default for InMemoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        let mut services = self.services.write().await;
        services.insert(registration.id().to_string(), registration.clone());

        debug!("Registered service: {}", registration.id());
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        let mut services = self.services.write().await;
        services.remove(service_id);
        debug!("Deregistered service: {}", service_id);
        Ok(())
    }

    async fn services(&self) -> Result<Vec<ServiceInstance>> {
        let services = self.services.read().await;
        Ok(services.values().map(ServiceRegistration::to_instance).collect())
    }
}
