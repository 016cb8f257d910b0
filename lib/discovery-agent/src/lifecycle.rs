//! Registration state machine bound to host lifetime events
//!
//! ```text
//! Idle --start--> Registering --ok--> Registered --stop--> Deregistering --> Deregistered
//!                      |
//!                      +--error--> Idle
//! Idle --stop--> Deregistered
//! ```
//!
//! Transitions are serialised by one async mutex per lifecycle, so repeated or
//! concurrent notifications reach the registry at most once per transition.

use crate::agent::RegistrableAgent;
use crate::host::LifecycleObserver;
use async_trait::async_trait;
use discovery_core::{DiscoveryError, RegistryClient, Result, ServiceRegistration, Settings};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegistrationState {
    Idle,
    Registering,
    Registered,
    Deregistering,
    Deregistered,
}

pub struct RegistrationLifecycle {
    agent: Arc<dyn RegistrableAgent>,
    registry: Arc<dyn RegistryClient>,
    register_timeout: Duration,
    deregister_timeout: Duration,
    /// Descriptor, built on first start; also the single-writer guard
    descriptor: Mutex<Option<ServiceRegistration>>,
    state: watch::Sender<RegistrationState>,
}

impl RegistrationLifecycle {
    pub fn new(agent: Arc<dyn RegistrableAgent>, registry: Arc<dyn RegistryClient>) -> Self {
        let (state, _) = watch::channel(RegistrationState::Idle);
        Self {
            agent,
            registry,
            register_timeout: Duration::from_secs(5),
            deregister_timeout: Duration::from_secs(5),
            descriptor: Mutex::new(None),
            state,
        }
    }

    /// Take call timeouts from settings
    pub fn with_settings(self, settings: &Settings) -> Self {
        self.with_timeouts(settings.registry.request_timeout, settings.deregister_timeout)
    }

    pub fn with_timeouts(mut self, register: Duration, deregister: Duration) -> Self {
        self.register_timeout = register;
        self.deregister_timeout = deregister;
        self
    }

    pub fn agent_name(&self) -> &str {
        self.agent.name()
    }

    pub fn state(&self) -> RegistrationState {
        *self.state.borrow()
    }

    /// Observe state transitions
    pub fn watch_state(&self) -> watch::Receiver<RegistrationState> {
        self.state.subscribe()
    }

    /// The descriptor while it is alive (built and not yet deregistered)
    pub async fn registration(&self) -> Option<ServiceRegistration> {
        self.descriptor.lock().await.clone()
    }

    /// Register with the registry if the lifecycle is idle.
    ///
    /// On failure the lifecycle returns to `Idle` and the error is returned;
    /// a later start may try again with the same descriptor.
    pub async fn start(&self, cancel: &CancellationToken) -> Result<()> {
        let mut descriptor = self.descriptor.lock().await;

        let state = self.state();
        if state != RegistrationState::Idle {
            debug!("{}: start ignored in state {:?}", self.agent.name(), state);
            return Ok(());
        }

        let registration = descriptor
            .get_or_insert_with(|| self.agent.describe())
            .clone();
        if registration.id().is_empty() || registration.name().is_empty() {
            error!(
                service_id = %registration.id(),
                service_name = %registration.name(),
                "{}: descriptor has no ID or name, not registering",
                self.agent.name()
            );
            return Err(DiscoveryError::InvalidConfiguration(format!(
                "{} produced a descriptor without ID or name",
                self.agent.name()
            )));
        }

        self.set_state(RegistrationState::Registering);
        info!(
            service_id = %registration.id(),
            "Registering {} at {}:{}",
            registration.name(),
            registration.address(),
            registration.port()
        );

        let outcome = bounded(
            cancel,
            self.register_timeout,
            "registration",
            self.registry.register(&registration),
        )
        .await;

        match outcome {
            Ok(()) => {
                self.set_state(RegistrationState::Registered);
                info!(service_id = %registration.id(), "Registered {}", registration.name());
                Ok(())
            }
            Err(e) => {
                self.set_state(RegistrationState::Idle);
                if e.is_transient() {
                    warn!(
                        service_id = %registration.id(),
                        "Registry not reachable, continuing without being discoverable: {}",
                        e
                    );
                } else {
                    error!(
                        service_id = %registration.id(),
                        "Registration failed, continuing without being discoverable: {}",
                        e
                    );
                }
                Err(e)
            }
        }
    }

    /// Deregister if registered. Best effort: failures are logged once and dropped.
    pub async fn stop(&self, cancel: &CancellationToken) {
        let mut descriptor = self.descriptor.lock().await;

        match self.state() {
            RegistrationState::Registered => {}
            RegistrationState::Idle => {
                debug!("{}: never registered, nothing to deregister", self.agent.name());
                descriptor.take();
                self.set_state(RegistrationState::Deregistered);
                return;
            }
            state => {
                debug!("{}: stop ignored in state {:?}", self.agent.name(), state);
                return;
            }
        }

        let Some(registration) = descriptor.take() else {
            self.set_state(RegistrationState::Deregistered);
            return;
        };

        self.set_state(RegistrationState::Deregistering);
        info!(service_id = %registration.id(), "Deregistering {}", registration.name());

        let outcome = bounded(
            cancel,
            self.deregister_timeout,
            "deregistration",
            self.registry.deregister(registration.id()),
        )
        .await;

        match outcome {
            Ok(()) => info!(service_id = %registration.id(), "Deregistered {}", registration.name()),
            Err(e) => warn!(
                service_id = %registration.id(),
                "Deregistration failed, abandoning: {}",
                e
            ),
        }
        self.set_state(RegistrationState::Deregistered);
    }

    fn set_state(&self, state: RegistrationState) {
        let previous = self.state.send_replace(state);
        debug!("{}: {:?} -> {:?}", self.agent.name(), previous, state);
    }
}

#[async_trait]
impl LifecycleObserver for RegistrationLifecycle {
    fn name(&self) -> &str {
        self.agent.name()
    }

    async fn on_started(&self, cancel: CancellationToken) {
        // start() logs every failure; serving continues either way.
        let _ = self.start(&cancel).await;
    }

    async fn on_stopping(&self, cancel: CancellationToken) {
        self.stop(&cancel).await;
    }
}

/// Run a registry call under a timeout and a cancellation token
async fn bounded<F>(cancel: &CancellationToken, limit: Duration, what: &str, call: F) -> Result<()>
where
    F: Future<Output = Result<()>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DiscoveryError::Cancelled(what.to_string())),
        outcome = tokio::time::timeout(limit, call) => {
            outcome.unwrap_or(Err(DiscoveryError::Timeout(limit)))
        }
    }
}
