//! Startup-time discovery of registrable agents
//!
//! Components are listed explicitly in a `ComponentTable` together with the
//! capabilities they declare. `CapabilityDiscovery::scan` turns every
//! component declaring `Capability::RegistrableAgent` into a singleton slot in
//! an `AgentContainer`. Nothing is constructed or invoked by the scan.

use crate::agent::RegistrableAgent;
use crate::container::{AgentContainer, AgentContext};
use discovery_core::{DiscoveryError, Result};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Constructs an agent from the shared context
pub type AgentFactory =
    Arc<dyn Fn(&AgentContext) -> Result<Arc<dyn RegistrableAgent>> + Send + Sync>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Registers this process with the service registry
    RegistrableAgent,
    /// Application-defined capability
    Custom(String),
}

/// A component known to the application, with its declared capabilities
#[derive(Clone)]
pub struct ComponentDescriptor {
    name: String,
    capabilities: Vec<Capability>,
    agent_factory: Option<AgentFactory>,
}

impl ComponentDescriptor {
    pub fn new(name: impl Into<String>, capabilities: Vec<Capability>) -> Self {
        Self {
            name: name.into(),
            capabilities,
            agent_factory: None,
        }
    }

    /// A component declaring the registrable agent capability, built by `factory`
    pub fn agent<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&AgentContext) -> Result<Arc<dyn RegistrableAgent>> + Send + Sync + 'static,
    {
        Self::new(name, vec![Capability::RegistrableAgent]).with_agent_factory(factory)
    }

    pub fn with_agent_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&AgentContext) -> Result<Arc<dyn RegistrableAgent>> + Send + Sync + 'static,
    {
        self.agent_factory = Some(Arc::new(factory));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capabilities(&self) -> &[Capability] {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: &Capability) -> bool {
        self.capabilities.contains(capability)
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("agent_factory", &self.agent_factory.is_some())
            .finish()
    }
}

/// Explicit list of the application's components
#[derive(Clone, Debug, Default)]
pub struct ComponentTable {
    components: Vec<ComponentDescriptor>,
}

impl ComponentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a component to the table
    pub fn register(mut self, component: ComponentDescriptor) -> Self {
        self.components.push(component);
        self
    }

    pub fn components(&self) -> &[ComponentDescriptor] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

pub struct CapabilityDiscovery;

impl CapabilityDiscovery {
    /// Collect every registrable agent of `table` into a container.
    ///
    /// A component that declares the capability without an agent factory is a
    /// configuration error. A name listed twice is registered once.
    pub fn scan(table: &ComponentTable) -> Result<AgentContainer> {
        let mut container = AgentContainer::new();

        for component in table.components() {
            if !component.has_capability(&Capability::RegistrableAgent) {
                debug!("Skipping component {}: not a registrable agent", component.name());
                continue;
            }

            let factory = component.agent_factory.clone().ok_or_else(|| {
                DiscoveryError::InvalidConfiguration(format!(
                    "component {} declares RegistrableAgent but provides no agent factory",
                    component.name()
                ))
            })?;

            if !container.insert(component.name(), factory) {
                debug!("Component {} already registered", component.name());
            }
        }

        info!("Discovered {} registrable agents", container.len());
        Ok(container)
    }
}
