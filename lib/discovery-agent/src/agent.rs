//! The registrable agent capability

use crate::container::AgentContext;
use discovery_core::{AgentDescriptorBuilder, Result, ServiceRegistration, Settings};
use std::sync::Arc;

/// A component that advertises this process in the registry.
///
/// Agents only describe what to register; `RegistrationLifecycle` decides when.
pub trait RegistrableAgent: Send + Sync {
    fn name(&self) -> &str;

    /// Build the descriptor to register. Called once, on the first start.
    fn describe(&self) -> ServiceRegistration;
}

/// Advertises the running service using its environment settings
pub struct ServiceAgent {
    settings: Arc<Settings>,
}

impl ServiceAgent {
    pub const NAME: &'static str = "service-agent";

    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    /// Container factory
    pub fn factory(context: &AgentContext) -> Result<Arc<dyn RegistrableAgent>> {
        Ok(Arc::new(Self::new(context.settings())))
    }
}

impl RegistrableAgent for ServiceAgent {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn describe(&self) -> ServiceRegistration {
        AgentDescriptorBuilder::new(&self.settings).build()
    }
}
