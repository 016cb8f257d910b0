use crate::RegistrableAgent;
use async_trait::async_trait;
use discovery_core::{
    DiscoveryError, HealthCheck, RegistryClient, Result, ServiceInstance, ServiceRegistration,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Registry that records every call and can be told to fail or hang
#[derive(Default)]
pub struct RecordingRegistry {
    pub calls: Mutex<Vec<String>>,
    pub fail_register: AtomicBool,
    pub fail_deregister: AtomicBool,
    pub hang: AtomicBool,
}

impl RecordingRegistry {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    async fn maybe_hang(&self) {
        if self.hang.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}

#[async_trait]
impl RegistryClient for RecordingRegistry {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("register:{}", registration.id()));
        self.maybe_hang().await;
        if self.fail_register.load(Ordering::SeqCst) {
            return Err(DiscoveryError::RegistryUnavailable("connection refused".to_string()));
        }
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("deregister:{}", service_id));
        self.maybe_hang().await;
        if self.fail_deregister.load(Ordering::SeqCst) {
            return Err(DiscoveryError::RegistryUnavailable("connection refused".to_string()));
        }
        Ok(())
    }

    async fn services(&self) -> Result<Vec<ServiceInstance>> {
        Ok(Vec::new())
    }
}

/// Agent with a fixed descriptor that counts how often it is asked for it
pub struct TestAgent {
    pub id: String,
    pub describes: AtomicUsize,
}

impl TestAgent {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            describes: AtomicUsize::new(0),
        }
    }
}

impl RegistrableAgent for TestAgent {
    fn name(&self) -> &str {
        "test-agent"
    }

    fn describe(&self) -> ServiceRegistration {
        self.describes.fetch_add(1, Ordering::SeqCst);
        ServiceRegistration::new(
            self.id.clone(),
            "orders",
            "10.0.0.1",
            8080,
            HealthCheck::new("http://10.0.0.1:8080/health"),
        )
    }
}
