use crate::application::Application;
use crate::error::{Error, ErrorExt};
use std::io;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};

impl Application {
    /// Serves the application on the configured address until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    /// Fails when the address cannot be bound or the server stops with an IO error.
    pub async fn serve(&self) -> Result<(), Error> {
        let address = self.settings().server.socket_addr();
        let listener = TcpListener::bind(address).await.context(format!("Binding {address}"))?;
        self.serve_on(listener).await
    }

    /// Serves the application on an already bound listener.
    ///
    /// # Errors
    /// Fails when the server stops with an IO error.
    pub async fn serve_on(&self, listener: TcpListener) -> Result<(), Error> {
        let address = listener.local_addr()?;
        info!(channel = %self.name(), address = %address, "Starting HTTP server on http://{address}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async {
                match shutdown_signal().await {
                    Ok(()) => info!("Shutdown signal received, starting graceful shutdown..."),
                    Err(err) => {
                        error!("Error while waiting for shutdown signal: {err}");
                        std::future::pending::<()>().await;
                    },
                }
            })
            .await
            .context("HTTP server failed")?;

        info!(channel = %self.name(), "Server shutdown complete");
        Ok(())
    }
}

/// Completes on SIGINT (Ctrl+C) or SIGTERM.
async fn shutdown_signal() -> io::Result<()> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?.recv().await;
        Ok::<_, io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<io::Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}
