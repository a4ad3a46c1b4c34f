pub mod handler;

use crate::{Config, Result};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub use handler::{router, AppState};

/// HTTP API and chat proxy
pub struct Server {
    config: Arc<Config>,
    cancellation_token: CancellationToken,
}

impl Server {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub async fn run(&self) -> Result<()> {
        let state = AppState::from_config(&self.config)?;
        let address = format!("{}:{}", self.config.server.host, self.config.server.port);
        let listener = TcpListener::bind(&address).await?;
        self.serve(listener, state).await
    }

    /// Serve on an already bound listener until shutdown is requested
    pub async fn serve(&self, listener: TcpListener, state: AppState) -> Result<()> {
        let local: SocketAddr = listener.local_addr()?;
        info!("Listening on http://{}", local);

        let signal_token = self.cancellation_token.clone();
        tokio::spawn(async move {
            wait_for_signal().await;
            signal_token.cancel();
        });

        let shutdown_token = self.cancellation_token.clone();
        let server = axum::serve(listener, router(state))
            .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
            .into_future();

        let drain_timeout =
            tokio::time::Duration::from_secs(self.config.server.graceful_shutdown_timeout_secs);
        let drain_token = self.cancellation_token.clone();

        tokio::select! {
            result = server => result?,
            () = async {
                drain_token.cancelled().await;
                tokio::time::sleep(drain_timeout).await;
            } => {
                warn!("Graceful shutdown timeout exceeded, forcing shutdown");
            }
        }

        info!("Server shutdown complete");
        Ok(())
    }

    pub fn shutdown(&self) {
        warn!("Initiating server shutdown");
        self.cancellation_token.cancel();
    }

    /// Check if the server has been requested to shutdown
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.cancellation_token.is_cancelled()
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

async fn wait_for_signal() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to setup SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => info!("Received SIGINT, initiating graceful shutdown"),
        () = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}
