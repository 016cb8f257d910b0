//! Wires agents, lifecycles and discovery together at startup

use crate::agent::ServiceAgent;
use crate::capability::{CapabilityDiscovery, ComponentDescriptor, ComponentTable};
use crate::container::AgentContext;
use crate::host::HostLifetime;
use crate::lifecycle::RegistrationLifecycle;
use discovery_core::{DiscoveryClient, RegistryClient, Result, Settings};
use std::sync::Arc;
use tracing::info;

/// Registration and discovery for one process
pub struct DiscoveryRuntime {
    lifecycles: Vec<Arc<RegistrationLifecycle>>,
    discovery: Arc<DiscoveryClient>,
}

impl DiscoveryRuntime {
    /// The components every service ships with
    pub fn default_components() -> ComponentTable {
        ComponentTable::new().register(ComponentDescriptor::agent(
            ServiceAgent::NAME,
            ServiceAgent::factory,
        ))
    }

    /// Discover agents in `components`, build their lifecycles and the discovery client.
    ///
    /// Fails on wiring errors only; the registry is not contacted here.
    pub fn assemble(
        settings: Arc<Settings>,
        registry: Arc<dyn RegistryClient>,
        components: &ComponentTable,
    ) -> Result<Self> {
        let container = CapabilityDiscovery::scan(components)?;
        let context = AgentContext::new(settings.clone());

        let lifecycles = container
            .resolve_all(&context)?
            .into_iter()
            .map(|agent| {
                Arc::new(
                    RegistrationLifecycle::new(agent, registry.clone()).with_settings(&settings),
                )
            })
            .collect::<Vec<_>>();

        let discovery = Arc::new(
            DiscoveryClient::new(registry, settings.protocol())
                .with_strategy(settings.load_balancing),
        );

        info!(
            "Discovery runtime assembled with agents {:?} ({:?} load balancing)",
            container.names(),
            settings.load_balancing
        );

        Ok(Self {
            lifecycles,
            discovery,
        })
    }

    /// Subscribe every registration lifecycle to the host's events
    pub fn attach(&self, lifetime: &HostLifetime) {
        for lifecycle in &self.lifecycles {
            lifetime.subscribe(lifecycle.clone());
        }
    }

    pub fn discovery(&self) -> Arc<DiscoveryClient> {
        self.discovery.clone()
    }

    pub fn lifecycles(&self) -> &[Arc<RegistrationLifecycle>] {
        &self.lifecycles
    }
}
