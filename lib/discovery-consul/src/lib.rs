//! Consul agent API integration
pub mod client;
pub mod wire;

pub use client::ConsulClient;
