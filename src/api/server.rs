//! HTTP server lifecycle for the estimation API.

use std::net::SocketAddr;

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::error::ServerError;

/// Configuration for the API server.
pub struct ApiServerConfig {
    /// Address to bind the server to.
    pub addr: SocketAddr,
}

/// Hosts the API router on one listener.
///
/// `start()` binds and spawns the server task; `shutdown()` stops it
/// gracefully, letting in-flight estimations finish.
pub struct ApiServer {
    config: ApiServerConfig,
    router: Option<Router>,
    local_addr: Option<SocketAddr>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl ApiServer {
    /// Create a server for `router`, which should already have its state applied.
    pub fn new(config: ApiServerConfig, router: Router) -> Self {
        Self {
            config,
            router: Some(router),
            local_addr: None,
            shutdown_tx: None,
            handle: None,
        }
    }

    /// The bound address, once started. Differs from the configured one for port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Bind the listener and spawn the server.
    pub async fn start(&mut self) -> Result<(), ServerError> {
        let Some(app) = self.router.take() else {
            return Ok(());
        };

        let bind_failed = |e: std::io::Error| ServerError::BindFailed {
            addr: self.config.addr.to_string(),
            reason: e.to_string(),
        };
        let listener = tokio::net::TcpListener::bind(self.config.addr)
            .await
            .map_err(bind_failed)?;
        let local_addr = listener.local_addr().map_err(bind_failed)?;
        self.local_addr = Some(local_addr);

        tracing::info!(%local_addr, "API server listening");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                    tracing::info!("API server shutting down");
                })
                .await
            {
                tracing::error!("API server error: {}", e);
            }
        });

        self.handle = Some(handle);
        Ok(())
    }

    /// Signal graceful shutdown and wait for the server task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}
