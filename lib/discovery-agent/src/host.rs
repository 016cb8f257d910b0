//! Host lifetime notifications
//!
//! `HostLifetime` is a small event bus with two fire-once events, started and
//! stopping. Each notification awaits every subscribed observer before it
//! releases the matching token, so work gated on `started_token()` only runs
//! after registration was attempted, and work gated on `stopping_token()`
//! (such as closing the HTTP listener) only runs after deregistration was
//! attempted.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Observer of host lifetime events
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    fn name(&self) -> &str {
        "UnnamedObserver"
    }

    /// Called once when the host has started. `cancel` fires on forced shutdown.
    async fn on_started(&self, _cancel: CancellationToken) {}

    /// Called once when the host begins a graceful shutdown
    async fn on_stopping(&self, _cancel: CancellationToken) {}
}

pub struct HostLifetime {
    observers: Mutex<Vec<Arc<dyn LifecycleObserver>>>,
    started: CancellationToken,
    stopping: CancellationToken,
    abort: CancellationToken,
    started_fired: AtomicBool,
    stopping_fired: AtomicBool,
}

impl HostLifetime {
    pub fn new() -> Self {
        Self {
            observers: Mutex::new(Vec::new()),
            started: CancellationToken::new(),
            stopping: CancellationToken::new(),
            abort: CancellationToken::new(),
            started_fired: AtomicBool::new(false),
            stopping_fired: AtomicBool::new(false),
        }
    }

    /// Add an observer. Observers added after an event fired do not see it.
    pub fn subscribe(&self, observer: Arc<dyn LifecycleObserver>) {
        debug!("Subscribing {} to host lifetime", observer.name());
        let mut observers = self.observers.lock().unwrap_or_else(|e| e.into_inner());
        observers.push(observer);
    }

    pub fn observer_count(&self) -> usize {
        self.observers.lock().map(|o| o.len()).unwrap_or(0)
    }

    /// Fire the started event; repeated calls are ignored
    pub async fn notify_started(&self) {
        if self.started_fired.swap(true, Ordering::SeqCst) {
            debug!("Started already notified");
            return;
        }

        info!("Application started");
        let observers = self.snapshot();
        join_all(
            observers
                .iter()
                .map(|observer| observer.on_started(self.abort.child_token())),
        )
        .await;
        self.started.cancel();
    }

    /// Fire the stopping event; repeated calls are ignored
    pub async fn notify_stopping(&self) {
        if self.stopping_fired.swap(true, Ordering::SeqCst) {
            debug!("Stopping already notified");
            return;
        }

        info!("Application stopping");
        let observers = self.snapshot();
        join_all(
            observers
                .iter()
                .map(|observer| observer.on_stopping(self.abort.child_token())),
        )
        .await;
        self.stopping.cancel();
    }

    /// Force shutdown: cancels observer calls still in flight
    pub fn abort(&self) {
        info!("Forced shutdown requested");
        self.abort.cancel();
    }

    /// Cancelled once every observer has handled the started event
    pub fn started_token(&self) -> CancellationToken {
        self.started.clone()
    }

    /// Cancelled once every observer has handled the stopping event
    pub fn stopping_token(&self) -> CancellationToken {
        self.stopping.clone()
    }

    fn snapshot(&self) -> Vec<Arc<dyn LifecycleObserver>> {
        self.observers
            .lock()
            .map(|o| o.clone())
            .unwrap_or_else(|e| e.into_inner().clone())
    }
}

impl Default for HostLifetime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Default)]
    struct CountingObserver {
        started: AtomicUsize,
        stopping: AtomicUsize,
        cancelled: AtomicUsize,
    }

    #[async_trait]
    impl LifecycleObserver for CountingObserver {
        fn name(&self) -> &str {
            "CountingObserver"
        }

        async fn on_started(&self, _cancel: CancellationToken) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }

        async fn on_stopping(&self, cancel: CancellationToken) {
            self.stopping.fetch_add(1, Ordering::SeqCst);
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.cancelled.fetch_add(1, Ordering::SeqCst);
                }
                _ = tokio::time::sleep(Duration::from_millis(20)) => {}
            }
        }
    }

    #[tokio::test]
    async fn test_events_fire_once() {
        let lifetime = HostLifetime::new();
        let observer = Arc::new(CountingObserver::default());
        lifetime.subscribe(observer.clone());
        assert_eq!(lifetime.observer_count(), 1);

        lifetime.notify_started().await;
        lifetime.notify_started().await;
        lifetime.notify_stopping().await;
        lifetime.notify_stopping().await;

        assert_eq!(observer.started.load(Ordering::SeqCst), 1);
        assert_eq!(observer.stopping.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_tokens_release_after_observers() {
        let lifetime = HostLifetime::new();
        let observer = Arc::new(CountingObserver::default());
        lifetime.subscribe(observer.clone());

        let started = lifetime.started_token();
        let stopping = lifetime.stopping_token();
        assert!(!started.is_cancelled());

        lifetime.notify_started().await;
        assert!(started.is_cancelled());
        assert!(!stopping.is_cancelled());

        lifetime.notify_stopping().await;
        assert!(stopping.is_cancelled());
        assert_eq!(observer.stopping.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_abort_cancels_observers() {
        let lifetime = HostLifetime::new();
        let observer = Arc::new(CountingObserver::default());
        lifetime.subscribe(observer.clone());

        lifetime.abort();
        lifetime.notify_stopping().await;

        assert_eq!(observer.cancelled.load(Ordering::SeqCst), 1);
    }
}
