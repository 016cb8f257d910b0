//! Singleton container for registrable agents

use crate::agent::RegistrableAgent;
use crate::capability::AgentFactory;
use discovery_core::{Result, Settings};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// What factories get to build agents from
#[derive(Clone, Debug)]
pub struct AgentContext {
    settings: Arc<Settings>,
}

impl AgentContext {
    pub fn new(settings: Arc<Settings>) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> Arc<Settings> {
        self.settings.clone()
    }
}

struct AgentSlot {
    name: String,
    factory: AgentFactory,
    instance: Mutex<Option<Arc<dyn RegistrableAgent>>>,
}

/// Holds one lazily built singleton per registered agent, in registration order
pub struct AgentContainer {
    slots: Vec<AgentSlot>,
}

impl AgentContainer {
    pub(crate) fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Returns false when `name` is already present
    pub(crate) fn insert(&mut self, name: &str, factory: AgentFactory) -> bool {
        if self.contains(name) {
            return false;
        }
        self.slots.push(AgentSlot {
            name: name.to_string(),
            factory,
            instance: Mutex::new(None),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.name.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|slot| slot.name == name)
    }

    /// Whether the agent registered under `name` has been built yet
    pub fn is_constructed(&self, name: &str) -> bool {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .is_some_and(|slot| slot.instance.lock().map(|i| i.is_some()).unwrap_or(false))
    }

    /// Resolve one agent, building it on first use
    pub fn resolve(
        &self,
        name: &str,
        context: &AgentContext,
    ) -> Result<Option<Arc<dyn RegistrableAgent>>> {
        match self.slots.iter().find(|slot| slot.name == name) {
            Some(slot) => Self::resolve_slot(slot, context).map(Some),
            None => Ok(None),
        }
    }

    /// Resolve every agent, building those not built yet
    pub fn resolve_all(&self, context: &AgentContext) -> Result<Vec<Arc<dyn RegistrableAgent>>> {
        self.slots
            .iter()
            .map(|slot| Self::resolve_slot(slot, context))
            .collect()
    }

    fn resolve_slot(slot: &AgentSlot, context: &AgentContext) -> Result<Arc<dyn RegistrableAgent>> {
        let mut instance = slot.instance.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(agent) = instance.as_ref() {
            return Ok(agent.clone());
        }

        debug!("Constructing agent {}", slot.name);
        let agent = (slot.factory)(context)?;
        *instance = Some(agent.clone());
        Ok(agent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CapabilityDiscovery, ComponentDescriptor, ComponentTable};
    use crate::test_support::TestAgent;
    use discovery_core::DiscoveryError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn context() -> AgentContext {
        AgentContext::new(Arc::new(Settings::default()))
    }

    #[test]
    fn test_resolve_builds_singleton_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let agent = Arc::new(TestAgent::new("svc-42"));
        let shared = agent.clone();
        let table = ComponentTable::new().register(ComponentDescriptor::agent("primary", move |_ctx| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(shared.clone() as Arc<dyn RegistrableAgent>)
        }));
        let container = CapabilityDiscovery::scan(&table).unwrap();
        let context = context();

        assert!(!container.is_constructed("primary"));
        let first = container.resolve("primary", &context).unwrap().expect("registered");
        let second = container.resolve_all(&context).unwrap();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(container.is_constructed("primary"));
        assert_eq!(second.len(), 1);
        assert!(Arc::ptr_eq(&first, &second[0]));
        // Resolution constructs; it does not ask the agent for a descriptor
        assert_eq!(agent.describes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_unknown_name() {
        let container = CapabilityDiscovery::scan(&ComponentTable::new()).unwrap();
        assert!(container.resolve("missing", &context()).unwrap().is_none());
    }

    #[test]
    fn test_factory_error_propagates() {
        let table = ComponentTable::new().register(ComponentDescriptor::agent("failing", |_ctx| {
            Err(DiscoveryError::InvalidConfiguration("missing settings".to_string()))
        }));
        let container = CapabilityDiscovery::scan(&table).unwrap();

        assert!(container.resolve_all(&context()).is_err());
        assert!(!container.is_constructed("failing"));
    }
}
