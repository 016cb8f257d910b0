//! Process-side registration with a service registry
//!
//! - `HostLifetime`: fire-once started/stopping notifications
//! - `RegistrationLifecycle`: registers on start, deregisters on stop
//! - `CapabilityDiscovery`: wires every registrable agent into an `AgentContainer`
//! - `DiscoveryRuntime`: assembles the above with a shared `DiscoveryClient`

pub mod agent;
pub mod capability;
pub mod container;
pub mod host;
pub mod lifecycle;
pub mod runtime;

#[cfg(test)]
pub(crate) mod test_support;

pub use agent::{RegistrableAgent, ServiceAgent};
pub use capability::{AgentFactory, Capability, CapabilityDiscovery, ComponentDescriptor, ComponentTable};
pub use container::{AgentContainer, AgentContext};
pub use host::{HostLifetime, LifecycleObserver};
pub use lifecycle::{RegistrationLifecycle, RegistrationState};
pub use runtime::DiscoveryRuntime;
