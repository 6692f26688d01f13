//! Relay server listener
//!
//! Binds the TCP listener and serves the HTTP/WebSocket router on it.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::command::CommandRouter;
use crate::error::Result;
use crate::registry::ConnectionRegistry;
use crate::server::config::ServerConfig;
use crate::server::routes;
use crate::server::state::RelayState;

/// Robot/dashboard relay server
pub struct RelayServer {
    config: ServerConfig,
    state: RelayState,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let state = RelayState::new(config.clone());
        Self { config, state }
    }

    /// Get a reference to the connection registry
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.state.registry
    }

    /// Get the command router
    pub fn commands(&self) -> &CommandRouter {
        &self.state.commands
    }

    /// Build the HTTP/WebSocket router sharing this server's state
    pub fn router(&self) -> Router {
        routes::router(self.state.clone())
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves
    ///
    /// Open WebSocket sessions are detached from the HTTP server once
    /// upgraded and are not awaited on shutdown.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            addr = %addr,
            channels = ?self.config.broadcast_channels,
            max_connections = self.config.max_connections,
            mirror_dashboard = self.config.mirror_dashboard,
            "Relay server listening"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let server = Arc::new(RelayServer::new(ServerConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (stop, stopped) = oneshot::channel::<()>();

        let task = {
            let server = Arc::clone(&server);
            tokio::spawn(async move {
                server
                    .serve(listener, async {
                        let _ = stopped.await;
                    })
                    .await
            })
        };

        stop.send(()).unwrap();
        let result = task.await.unwrap();

        assert!(result.is_ok());
    }

    #[test]
    fn test_accessors_share_state() {
        let server = RelayServer::new(ServerConfig::default().max_connections(3));

        assert_eq!(server.bind_addr().port(), 8001);
        assert_eq!(server.registry().config().outbound_capacity, 256);
    }
}
