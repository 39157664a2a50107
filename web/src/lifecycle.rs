//! Application assembly and graceful shutdown.
//!
//! 1. **Startup**: pick storage, build the coordinator, start the sweeper
//! 2. **Runtime**: serve HTTP and WebSocket traffic
//! 3. **Shutdown**: on Ctrl+C or SIGTERM stop accepting connections, signal
//!    the sweeper and give it `SHUTDOWN_TIMEOUT` to finish

use crate::catalog::UnitCatalog;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use seat_inventory_core::{BookingStore, SeatLedger};
use seat_inventory_postgres::{PostgresBookingStore, PostgresSeatLedger};
use seat_inventory_runtime::{
    InMemoryBookingStore, InMemorySeatLedger, ReservationCoordinator, spawn_sweeper,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Storage selected at startup.
pub struct Storage {
    /// Ledger the coordinator commits against
    pub ledger: Arc<dyn SeatLedger>,
    /// Booking store the coordinator writes to
    pub bookings: Arc<dyn BookingStore>,
    /// Unit registration against `ledger`
    pub catalog: Arc<dyn UnitCatalog>,
}

impl Storage {
    /// Volatile storage for development and tests.
    #[must_use]
    pub fn in_memory() -> Self {
        let ledger = Arc::new(InMemorySeatLedger::new());
        Self {
            ledger: ledger.clone(),
            bookings: Arc::new(InMemoryBookingStore::new()),
            catalog: ledger,
        }
    }

    /// `PostgreSQL` when `DATABASE_URL` is set (migrations are applied),
    /// in-memory otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached or migrated.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let Some(url) = config.database.url.as_deref() else {
            warn!("DATABASE_URL not set, using in-memory storage; data is lost on restart");
            return Ok(Self::in_memory());
        };

        let pool = seat_inventory_postgres::connect(
            url,
            config.database.max_connections,
            config.database.connect_timeout,
        )
        .await
        .context("Failed to connect to PostgreSQL")?;
        seat_inventory_postgres::migrate(&pool)
            .await
            .context("Failed to run migrations")?;
        info!(max_connections = config.database.max_connections, "Using PostgreSQL storage");

        let ledger = Arc::new(PostgresSeatLedger::new(pool.clone()));
        Ok(Self {
            ledger: ledger.clone(),
            bookings: Arc::new(PostgresBookingStore::new(pool)),
            catalog: ledger,
        })
    }
}

/// Running application: listener, router and background tasks.
pub struct Application {
    listener: tokio::net::TcpListener,
    state: AppState,
    config: Config,
}

impl Application {
    /// Bind the listener and wire the engine over `storage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn build(
        config: Config,
        storage: Storage,
        metrics: Option<PrometheusHandle>,
    ) -> anyhow::Result<Self> {
        let coordinator = ReservationCoordinator::builder(storage.ledger, storage.bookings)
            .config(config.engine.clone())
            .build();
        let mut state = AppState::new(Arc::new(coordinator), storage.catalog);
        if let Some(handle) = metrics {
            state = state.with_metrics(handle);
        }

        let address = config.bind_address();
        let listener = tokio::net::TcpListener::bind(&address)
            .await
            .with_context(|| format!("Failed to bind {address}"))?;

        Ok(Self {
            listener,
            state,
            config,
        })
    }

    /// Local address the server listens on.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the socket address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until Ctrl+C or SIGTERM.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails.
    pub async fn run(self) -> anyhow::Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` completes, then stop background tasks.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP server fails.
    pub async fn run_until<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        let sweeper = spawn_sweeper(
            Arc::clone(&self.state.coordinator),
            self.config.engine.sweep_interval,
            shutdown_rx,
        );

        info!(address = %self.config.bind_address(), "HTTP server listening for requests");
        axum::serve(self.listener, build_router(self.state))
            .with_graceful_shutdown(shutdown)
            .await
            .context("HTTP server failed")?;

        info!("HTTP server stopped, initiating graceful shutdown...");
        let _ = shutdown_tx.send(());

        match tokio::time::timeout(self.config.server.shutdown_timeout, sweeper).await {
            Ok(Ok(())) => info!("Hold sweeper stopped gracefully"),
            Ok(Err(e)) => warn!(error = %e, "Hold sweeper task failed"),
            Err(_) => warn!("Hold sweeper shutdown timed out"),
        }

        info!("Graceful shutdown complete");
        Ok(())
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C signal"),
        () = terminate => info!("Received SIGTERM signal"),
    }
}
