use anyhow::{Context, Result};
use discovery_agent::{DiscoveryRuntime, HostLifetime, RegistrationLifecycle, RegistrationState};
use discovery_consul::ConsulClient;
use discovery_core::{InMemoryRegistry, RegistryBackend, RegistryClient, Settings};
use discovery_http::{AppState, HealthCheckResult, HealthChecks, HttpServer};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Starting service-discovery...");

    let settings = Arc::new(Settings::from_env().context("invalid configuration")?);

    let registry: Arc<dyn RegistryClient> = match settings.backend {
        RegistryBackend::Consul => {
            let client = ConsulClient::new(&settings)?;
            info!("Using Consul registry at {}", client.base_url());
            Arc::new(client)
        }
        RegistryBackend::Memory => {
            warn!("Using in-memory registry; other processes will not see this service");
            Arc::new(InMemoryRegistry::new())
        }
    };

    let runtime = DiscoveryRuntime::assemble(
        settings.clone(),
        registry,
        &DiscoveryRuntime::default_components(),
    )?;
    let lifetime = Arc::new(HostLifetime::new());
    runtime.attach(&lifetime);

    let health = registration_health(runtime.lifecycles().to_vec());
    let server = HttpServer::new(AppState::new(runtime.discovery(), health));

    let bind_addr = settings.bind_addr();
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    let server_handle = tokio::spawn({
        let shutdown = lifetime.stopping_token();
        async move { server.serve(listener, shutdown).await }
    });

    lifetime.notify_started().await;

    shutdown_signal().await;
    info!("Shutdown signal received, deregistering...");

    // A second signal during shutdown abandons deregistration
    let forced = tokio::spawn({
        let lifetime = lifetime.clone();
        async move {
            shutdown_signal().await;
            lifetime.abort();
        }
    });

    lifetime.notify_stopping().await;
    forced.abort();

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
    }

    info!("Shutdown complete");
    Ok(())
}

/// `RUST_LOG` filtering, JSON output when `LOG_FORMAT=json`
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

/// Health checks reporting Degraded while this instance is not registered
fn registration_health(lifecycles: Vec<Arc<RegistrationLifecycle>>) -> HealthChecks {
    HealthChecks::new().add_check("registration", &["ready"], move || {
        let unregistered: Vec<&str> = lifecycles
            .iter()
            .filter(|l| l.state() != RegistrationState::Registered)
            .map(|l| l.agent_name())
            .collect();

        if unregistered.is_empty() {
            HealthCheckResult::healthy()
        } else {
            HealthCheckResult::degraded("not registered with the service registry")
                .with_data("agents", unregistered)
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
