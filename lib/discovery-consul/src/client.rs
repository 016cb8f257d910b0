//! HTTP client for the Consul agent API

use crate::wire::{AgentService, AgentServiceRegistration};
use async_trait::async_trait;
use discovery_core::{
    DiscoveryError, RegistryClient, Result, ServiceInstance, ServiceRegistration, Settings,
};
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

const TOKEN_HEADER: &str = "X-Consul-Token";

/// ConsulClient talks to a Consul agent over its HTTP API.
///
/// It keeps no state between calls and can be shared freely.
pub struct ConsulClient {
    http_client: HttpClient,
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl ConsulClient {
    /// Create a client for the registry described by `settings`
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_base_url(
            &settings.registry_base_url(),
            settings.registry.token.clone(),
            settings.registry.request_timeout,
        )
    }

    /// Create a client for an explicit base URL such as `http://localhost:8500`
    pub fn with_base_url(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            DiscoveryError::InvalidConfiguration(format!(
                "invalid registry address '{}': {}",
                base_url, e
            ))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DiscoveryError::InvalidConfiguration(format!(
                "invalid registry address '{}'",
                base_url
            )));
        }

        let http_client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiscoveryError::Internal(format!("failed to build HTTP client: {}", e)))?;

        debug!("Consul client targeting {}", base_url);

        Ok(Self {
            http_client,
            base_url,
            token,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build an API URL from path segments, percent-encoding each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DiscoveryError::Internal(format!("cannot extend {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Attach the ACL token when one is configured
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.header(TOKEN_HEADER, token),
            None => request,
        }
    }

    /// Send a request and turn transport failures and non-2xx answers into errors
    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await.map_err(|e| {
            if e.is_timeout() {
                DiscoveryError::Timeout(self.timeout)
            } else {
                DiscoveryError::RegistryUnavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        Err(DiscoveryError::RegistryRejected {
            status: status.as_u16(),
            message: message.trim().to_string(),
        })
    }
}

#[async_trait]
impl RegistryClient for ConsulClient {
    async fn register(&self, registration: &ServiceRegistration) -> Result<()> {
        let url = self.endpoint(&["v1", "agent", "service", "register"])?;
        let body = AgentServiceRegistration::from(registration);

        debug!("PUT {} for service {}", url, registration.id());
        self.send(self.http_client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn deregister(&self, service_id: &str) -> Result<()> {
        let url = self.endpoint(&["v1", "agent", "service", "deregister", service_id])?;

        debug!("PUT {}", url);
        self.send(self.http_client.put(url)).await?;
        Ok(())
    }

    async fn services(&self) -> Result<Vec<ServiceInstance>> {
        let url = self.endpoint(&["v1", "agent", "services"])?;

        debug!("GET {}", url);
        let response = self.send(self.http_client.get(url)).await?;
        let body = response
            .text()
            .await
            .map_err(|e| DiscoveryError::RegistryUnavailable(e.to_string()))?;
        let services: HashMap<String, AgentService> = serde_json::from_str(&body)?;

        Ok(services.into_values().map(ServiceInstance::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use discovery_core::HealthCheck;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ConsulClient {
        ConsulClient::with_base_url(&server.uri(), None, Duration::from_secs(2)).unwrap()
    }

    fn registration() -> ServiceRegistration {
        ServiceRegistration::new(
            "svc-42",
            "billing",
            "host.docker.internal",
            9090,
            HealthCheck::new("http://host.docker.internal:9090/health"),
        )
    }

    #[test]
    fn test_client_from_settings() {
        let settings = Settings::from_vars([("CONSUL_HOST", "consul"), ("CONSUL_PORT", "8501")])
            .unwrap();
        let client = ConsulClient::new(&settings).unwrap();
        assert_eq!(client.base_url().as_str(), "http://consul:8501/");
    }

    #[tokio::test]
    async fn test_register_sends_descriptor() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .and(body_json(json!({
                "ID": "svc-42",
                "Name": "billing",
                "Address": "host.docker.internal",
                "Port": 9090,
                "Check": {
                    "HTTP": "http://host.docker.internal:9090/health",
                    "Interval": "10s",
                    "Timeout": "5s",
                    "DeregisterCriticalServiceAfter": "60s"
                }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).register(&registration()).await.unwrap();
    }

    #[tokio::test]
    async fn test_deregister_uses_service_id() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/deregister/svc-42"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).deregister("svc-42").await.unwrap();
    }

    #[tokio::test]
    async fn test_token_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/deregister/svc-42"))
            .and(header("X-Consul-Token", "secret"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = ConsulClient::with_base_url(
            &server.uri(),
            Some("secret".to_string()),
            Duration::from_secs(2),
        )
        .unwrap();
        client.deregister("svc-42").await.unwrap();
    }

    #[tokio::test]
    async fn test_services_parses_agent_map() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/agent/services"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "orders-1": {
                    "ID": "orders-1",
                    "Service": "orders",
                    "Tags": ["ready"],
                    "Address": "10.0.0.1",
                    "Port": 8080
                },
                "billing-1": {
                    "ID": "billing-1",
                    "Service": "billing",
                    "Tags": [],
                    "Address": "10.0.1.1",
                    "Port": 9090
                }
            })))
            .mount(&server)
            .await;

        let mut services = client(&server).services().await.unwrap();
        services.sort_by(|a, b| a.id.cmp(&b.id));

        assert_eq!(services.len(), 2);
        assert_eq!(services[0].service_name, "billing");
        assert_eq!(services[1].address, "10.0.0.1");
        assert_eq!(services[1].tags, vec!["ready".to_string()]);
    }

    #[tokio::test]
    async fn test_rejected_request() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/agent/service/register"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid check"))
            .mount(&server)
            .await;

        let result = client(&server).register(&registration()).await;
        match result {
            Err(DiscoveryError::RegistryRejected { status, message }) => {
                assert_eq!(status, 400);
                assert_eq!(message, "Invalid check");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_registry() {
        let client =
            ConsulClient::with_base_url("http://127.0.0.1:1", None, Duration::from_secs(2)).unwrap();
        let result = client.services().await;
        assert!(matches!(
            result,
            Err(DiscoveryError::RegistryUnavailable(_)) | Err(DiscoveryError::Timeout(_))
        ));
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ConsulClient::with_base_url("not a url", None, Duration::from_secs(1));
        assert!(matches!(result, Err(DiscoveryError::InvalidConfiguration(_))));
    }
}
