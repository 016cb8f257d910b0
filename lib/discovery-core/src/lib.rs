//! Core service registration and discovery functionality
//!
//! This library provides:
//! - The registration descriptor and discovered instance models
//! - Environment-driven settings and descriptor construction
//! - The registry client boundary with an in-memory implementation
//! - Name-to-URL resolution with load balancing

pub mod descriptor;
pub mod discovery;
pub mod error;
pub mod instance;
pub mod load_balancer;
pub mod registration;
pub mod registry;
pub mod settings;

pub use descriptor::AgentDescriptorBuilder;
pub use discovery::DiscoveryClient;
pub use error::{DiscoveryError, Result};
pub use instance::ServiceInstance;
pub use load_balancer::{LoadBalancer, LoadBalancingStrategy};
pub use registration::{HealthCheck, ServiceRegistration};
pub use registry::{InMemoryRegistry, RegistryClient};
pub use settings::{RegistryBackend, RegistryScheme, Settings};
