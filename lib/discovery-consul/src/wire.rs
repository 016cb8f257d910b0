//! JSON bodies exchanged with the Consul agent API

use discovery_core::{ServiceInstance, ServiceRegistration};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body of `PUT /v1/agent/service/register`
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentServiceRegistration<'a> {
    #[serde(rename = "ID")]
    pub id: &'a str,
    pub name: &'a str,
    pub address: &'a str,
    pub port: u16,
    #[serde(skip_serializing_if = "no_tags")]
    pub tags: &'a [String],
    pub check: AgentServiceCheck,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentServiceCheck {
    #[serde(rename = "HTTP")]
    pub http: String,
    pub interval: String,
    pub timeout: String,
    pub deregister_critical_service_after: String,
}

impl<'a> From<&'a ServiceRegistration> for AgentServiceRegistration<'a> {
    fn from(registration: &'a ServiceRegistration) -> Self {
        let check = registration.check();
        Self {
            id: registration.id(),
            name: registration.name(),
            address: registration.address(),
            port: registration.port(),
            tags: registration.tags(),
            check: AgentServiceCheck {
                http: check.http.clone(),
                interval: go_duration(check.interval),
                timeout: go_duration(check.timeout),
                deregister_critical_service_after: go_duration(
                    check.deregister_critical_service_after,
                ),
            },
        }
    }
}

/// One entry of the `GET /v1/agent/services` map
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AgentService {
    #[serde(rename = "ID")]
    pub id: String,
    pub service: String,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub address: String,
    pub port: u16,
}

impl From<AgentService> for ServiceInstance {
    fn from(service: AgentService) -> Self {
        ServiceInstance::new(service.id, service.service, service.address, service.port)
            .with_tags(service.tags.unwrap_or_default())
    }
}

fn no_tags(tags: &&[String]) -> bool {
    tags.is_empty()
}

/// Render a duration the way Consul parses them (`"10s"`, `"250ms"`)
pub fn go_duration(duration: Duration) -> String {
    if duration.subsec_nanos() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}
