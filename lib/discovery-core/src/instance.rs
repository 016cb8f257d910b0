//! Discovered service instances
use serde::{Deserialize, Serialize};

/// A single instance returned by a registry query.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: String,
    pub service_name: String,
    pub address: String,
    pub port: u16,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ServiceInstance {
    pub fn new(
        id: impl Into<String>,
        service_name: impl Into<String>,
        address: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            id: id.into(),
            service_name: service_name.into(),
            address: address.into(),
            port,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Identity of an instance: two entries with the same key are the same endpoint.
    pub fn key(&self) -> (&str, &str, u16) {
        (&self.service_name, &self.address, self.port)
    }

    /// Case-insensitive exact match on the logical service name.
    pub fn matches_name(&self, service_name: &str) -> bool {
        self.service_name.eq_ignore_ascii_case(service_name)
    }
}
