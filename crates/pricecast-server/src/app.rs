//! Application wiring and lifecycle.

use std::future::Future;
use std::sync::Arc;

use pricecast_feed::{spawn_relay, Poller};
use pricecast_history::build_history;
use pricecast_hub::spawn_hub;
use pricecast_quotes::HttpPriceSource;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::server::{build_router, AppState};

/// Main application.
pub struct Application {
    config: AppConfig,
    cancel: CancellationToken,
}

impl Application {
    /// Create a new application from a validated configuration.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
        })
    }

    /// Root token; cancelling it stops the whole service.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Bind the configured address and run until SIGINT or SIGTERM.
    pub async fn run(self) -> AppResult<()> {
        let addr = self.config.server.bind_addr();
        let listener = TcpListener::bind(&addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Run on `listener` until `shutdown` resolves or the root token is
    /// cancelled.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> AppResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = &self.config;
        let pair = config.pair()?;

        let history = build_history(&config.history)?;
        info!(
            backend = ?config.history.backend,
            capacity = history.capacity(),
            "History store ready"
        );

        let (hub, hub_join) = spawn_hub(&config.hub, history)?;

        let source = Arc::new(HttpPriceSource::new(&config.upstream)?);
        let poller = Poller::new(source, config.poller.clone())?;
        let (updates, poll_join) = poller.start(self.cancel.child_token(), pair);
        let relay_join = spawn_relay(updates, Arc::new(hub.clone()));

        let state = AppState::new(
            hub.clone(),
            config.default_pair()?,
            config.hub.subscriber_queue_size,
            config.telemetry.metrics_enabled,
        );
        let router = build_router(state);

        info!(addr = %listener.local_addr()?, pair = %pair, "Server listening");

        let cancel = self.cancel.clone();
        let shutdown_hub = hub.clone();
        let graceful = async move {
            tokio::select! {
                () = shutdown => {}
                () = cancel.cancelled() => {}
            }
            info!("Shutting down");
            // Closing subscribers ends their response bodies so open streams
            // let the server finish.
            cancel.cancel();
            shutdown_hub.shutdown();
        };

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(graceful)
            .await;

        self.cancel.cancel();
        hub.shutdown();

        if let Err(e) = poll_join.await {
            error!(error = %e, "Poller task failed");
        }
        match relay_join.await {
            Ok(stats) => info!(
                forwarded = stats.forwarded,
                dropped = stats.dropped,
                "Relay finished"
            ),
            Err(e) => error!(error = %e, "Relay task failed"),
        }
        if let Err(e) = hub_join.await {
            error!(error = %e, "Hub task failed");
        }

        served?;
        info!("Shutdown complete");
        Ok(())
    }
}

/// Wait for SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C"),
        () = terminate => info!("Received SIGTERM"),
    }
}
