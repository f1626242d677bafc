//! EventBook Server: seat reservation and expiry engine for event booking.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use eventbook_api::{AppState, build_router};
use eventbook_core::config::AppConfig;
use eventbook_core::error::AppError;
use eventbook_core::traits::{Clock, SystemClock};
use eventbook_database::DatabasePool;
use eventbook_reservation::{CancellationHandler, InventoryLedger, PostgresLedger, RetryPolicy};
use eventbook_worker::ExpirySweeper;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server error");
        std::process::exit(1);
    }
}

/// Load configuration from files and environment. `AppConfig::load`
/// rejects invalid settings.
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("EVENTBOOK_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting EventBook");

    // ── Database connection + migrations ─────────────────────────
    let db = DatabasePool::connect(&config.database).await?;
    if config.database.run_migrations {
        eventbook_database::migration::run_migrations(db.pool()).await?;
    }

    // ── Reservation engine ───────────────────────────────────────
    let ledger: Arc<dyn InventoryLedger> = Arc::new(PostgresLedger::new(db.clone()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // ── Expiry sweeper ───────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut drain_rx = shutdown_rx.clone();
    let sweeper = if config.sweeper.enabled {
        let cancellation = CancellationHandler::new(
            ledger.clone(),
            clock.clone(),
            RetryPolicy::new(config.retry.clone()),
        );
        let sweeper = Arc::new(ExpirySweeper::new(
            ledger.clone(),
            cancellation,
            clock.clone(),
            config.sweeper.clone(),
        ));
        sweeper.start(shutdown_rx)?;
        Some(sweeper)
    } else {
        tracing::warn!("Expiry sweeper disabled; expired bookings will keep their seats");
        None
    };

    // ── HTTP server ──────────────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let grace = Duration::from_secs(config.server.shutdown_grace_seconds);
    let app = build_router(AppState::new(config, ledger, clock));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    tracing::info!(%addr, "EventBook server listening");

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    let server = async { server.await };
    tokio::pin!(server);
    let drain_deadline = async {
        let _ = drain_rx.wait_for(|stopping| *stopping).await;
        tokio::time::sleep(grace).await;
    };

    let served = tokio::select! {
        result = &mut server => {
            result.map_err(|e| AppError::internal(format!("Server error: {e}")))
        }
        _ = drain_deadline => {
            tracing::warn!(grace_seconds = grace.as_secs(), "HTTP drain timed out");
            Ok(())
        }
    };

    // ── Background tasks ─────────────────────────────────────────
    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }
    db.close().await;

    served?;
    tracing::info!("EventBook server shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
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
}
