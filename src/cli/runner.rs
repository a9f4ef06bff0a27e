//! Process startup: wires configuration, registry client and listener together

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::registry::OciRegistry;
use crate::server::{self, AppState};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct Runner {
    config: GatewayConfig,
}

impl Runner {
    pub fn new(config: GatewayConfig) -> Self {
        Self { config }
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.config.port))
    }

    pub async fn run(self) -> Result<()> {
        let registry = OciRegistry::from_config(&self.config.registry);
        let state = AppState::new(&self.config.upstream, Arc::new(registry));
        let app = server::router(state, &self.config.credentials);

        let listener = TcpListener::bind(self.listen_addr()).await?;

        tracing::info!(
            "Listening on {}, upstream: {}",
            self.config.port,
            self.config.upstream
        );
        if self.config.credentials.is_enabled() {
            tracing::info!("Basic authentication enabled");
        }

        server::serve(listener, app, shutdown_signal()).await?;

        tracing::info!("Server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(err = %e, "failed to listen for Ctrl+C");
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
                tracing::warn!(err = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
