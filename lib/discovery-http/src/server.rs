//! HTTP/1 server loop with graceful shutdown

use crate::handlers::{route, AppState};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Serves the service endpoints until the shutdown token fires
pub struct HttpServer {
    state: Arc<AppState>,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Accept connections on `listener` until `shutdown` is cancelled.
    ///
    /// In-flight connections finish their current request and then close;
    /// `serve` returns once every connection task has ended.
    pub async fn serve(&self, listener: TcpListener, shutdown: CancellationToken) -> std::io::Result<()> {
        info!("HTTP server listening on {}", listener.local_addr()?);

        let connections = TaskTracker::new();
        loop {
            let (stream, peer_addr) = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("HTTP server no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok(connection) => connection,
                    Err(e) => {
                        warn!("Error accepting HTTP connection: {}", e);
                        continue;
                    }
                },
            };

            let io = TokioIo::new(stream);
            let state = self.state.clone();
            let shutdown = shutdown.clone();

            connections.spawn(async move {
                let service = service_fn(move |req| {
                    let state = state.clone();
                    async move { Ok::<_, Infallible>(route(req, &state).await) }
                });

                let connection = http1::Builder::new().serve_connection(io, service);
                tokio::pin!(connection);

                tokio::select! {
                    result = connection.as_mut() => {
                        if let Err(e) = result {
                            debug!("Error serving HTTP connection from {}: {}", peer_addr, e);
                        }
                        return;
                    }
                    _ = shutdown.cancelled() => {}
                }

                connection.as_mut().graceful_shutdown();
                if let Err(e) = connection.await {
                    debug!("Error closing HTTP connection from {}: {}", peer_addr, e);
                }
            });
        }

        connections.close();
        if !connections.is_empty() {
            info!("Draining {} HTTP connection(s)", connections.len());
        }
        connections.wait().await;
        info!("HTTP server stopped");
        Ok(())
    }
}
