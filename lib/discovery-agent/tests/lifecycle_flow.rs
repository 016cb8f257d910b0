use discovery_agent::{
    ComponentDescriptor, DiscoveryRuntime, HostLifetime, RegistrableAgent, RegistrationState,
    ServiceAgent,
};
use discovery_core::{InMemoryRegistry, Settings};
use std::sync::Arc;

#[tokio::test]
async fn test_register_discover_deregister() {
    let registry = Arc::new(InMemoryRegistry::new());
    let settings = Arc::new(
        Settings::from_vars([
            ("SERVICE_ID", "billing-1"),
            ("APPLICATION_NAME", "billing"),
            ("ASPNETCORE_PORT", "9090"),
            ("SERVICE_ADDRESS", "10.0.1.1"),
        ])
        .unwrap(),
    );

    let runtime = DiscoveryRuntime::assemble(
        settings,
        registry.clone(),
        &DiscoveryRuntime::default_components(),
    )
    .unwrap();
    let lifetime = HostLifetime::new();
    runtime.attach(&lifetime);

    let discovery = runtime.discovery();
    assert_eq!(discovery.resolve("billing", "invoices").await.unwrap(), None);

    lifetime.notify_started().await;
    assert_eq!(registry.service_count().await, 1);
    assert_eq!(
        discovery.resolve("Billing", "invoices").await.unwrap().as_deref(),
        Some("http://10.0.1.1:9090/invoices")
    );

    lifetime.notify_stopping().await;
    assert_eq!(registry.service_count().await, 0);
    assert_eq!(discovery.resolve("billing", "invoices").await.unwrap(), None);
    assert!(runtime
        .lifecycles()
        .iter()
        .all(|l| l.state() == RegistrationState::Deregistered));
}

#[tokio::test]
async fn test_two_agents_register_independently() {
    let registry = Arc::new(InMemoryRegistry::new());
    let settings = Arc::new(Settings::from_vars([("SERVICE_ID", "primary")]).unwrap());

    let components = DiscoveryRuntime::default_components().register(ComponentDescriptor::agent(
        "sidecar-agent",
        |ctx| {
            let mut settings = Settings::clone(&ctx.settings());
            settings.service_id = Some("sidecar".to_string());
            settings.application_name = Some("sidecar".to_string());
            Ok(Arc::new(ServiceAgent::new(Arc::new(settings))) as Arc<dyn RegistrableAgent>)
        },
    ));

    let runtime = DiscoveryRuntime::assemble(settings, registry.clone(), &components).unwrap();
    let lifetime = HostLifetime::new();
    runtime.attach(&lifetime);
    assert_eq!(lifetime.observer_count(), 2);

    lifetime.notify_started().await;
    assert!(registry.get("primary").await.is_some());
    assert!(registry.get("sidecar").await.is_some());

    lifetime.notify_stopping().await;
    assert_eq!(registry.service_count().await, 0);
}
