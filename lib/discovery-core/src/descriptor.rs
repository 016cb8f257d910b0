//! Builds the registration descriptor for the running process

use crate::settings::{DEFAULT_SERVICE_NAME, HEALTH_PATH};
use crate::{HealthCheck, ServiceRegistration, Settings};
use tracing::{debug, warn};

/// Derives a [`ServiceRegistration`] from [`Settings`].
///
/// Construction never fails. Missing values fall back to defaults:
/// - ID: `SERVICE_ID`, then the machine host name, then `localhost`
/// - name: `APPLICATION_NAME`, then `ecp-service`
/// - port: `ASPNETCORE_PORT`, then the listen URL, then 80
///
/// The advertised address is the configured advertise address, not the bind
/// address: the registry has to reach the instance from its own network.
pub struct AgentDescriptorBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> AgentDescriptorBuilder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn build(&self) -> ServiceRegistration {
        let id = self
            .settings
            .service_id
            .clone()
            .unwrap_or_else(machine_host_name);
        let name = self
            .settings
            .application_name
            .clone()
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let address = self.settings.advertise_address.clone();
        let port = self.settings.port();

        let check = HealthCheck {
            http: format!(
                "{}{}:{}{}",
                self.settings.protocol(),
                address,
                port,
                HEALTH_PATH
            ),
            interval: self.settings.check_interval,
            timeout: self.settings.check_timeout,
            deregister_critical_service_after: self.settings.deregister_critical_after,
        };

        debug!("Built registration descriptor {} ({}) at {}:{}", id, name, address, port);

        ServiceRegistration::new(id, name, address, port, check)
            .with_tags(self.settings.service_tags.clone())
    }
}

fn machine_host_name() -> String {
    match hostname::get() {
        Ok(name) => {
            let name = name.to_string_lossy().trim().to_string();
            if name.is_empty() {
                "localhost".to_string()
            } else {
                name
            }
        }
        Err(e) => {
            warn!("Could not read host name, using localhost: {}", e);
            "localhost".to_string()
        }
    }
}
