// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! notifyd: notification fan-out service.
//!
//! Consumes notification records from Kafka, persists them in an in-memory
//! store, and pushes them to the owning user's live WebSocket session.

pub mod config;
pub mod delivery;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod notification;
pub mod registry;
pub mod session;
pub mod state;
pub mod store;
pub mod test_support;
pub mod transport;

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::delivery::DeliveryService;
use crate::ingest::kafka::KafkaSource;
use crate::ingest::IngestWorker;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::state::AppState;
use crate::store::Store;
use crate::transport::build_router;

/// Drain window after the stop signal, and the ceiling on waiting for the
/// ingest worker once the listeners are down.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Run the service until shutdown. Startup failures (bus consumer
/// construction, listener binds) surface as errors; the caller turns them
/// into a non-zero exit.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let session_cancel = CancellationToken::new();

    let metrics = Arc::new(Metrics::new()?);
    let store = Arc::new(Store::new());
    let registry = Arc::new(Registry::new(Arc::clone(&metrics)));
    let delivery = Arc::new(DeliveryService::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        Arc::clone(&metrics),
    ));

    let source = KafkaSource::connect(&config.kafka)?;
    let worker =
        IngestWorker::new(source, Arc::clone(&delivery), Arc::clone(&metrics), shutdown.clone());
    let worker_handle = tokio::spawn(worker.run());

    // Metrics on the auxiliary port.
    let metrics_addr = format!("0.0.0.0:{}", config.server.metrics_port);
    let metrics_listener = TcpListener::bind(&metrics_addr).await?;
    tracing::info!(addr = %metrics_addr, "metrics listener ready");
    let metrics_router = metrics::router(Arc::clone(&metrics));
    let metrics_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = axum::serve(metrics_listener, metrics_router)
            .with_graceful_shutdown(metrics_shutdown.cancelled_owned())
            .await
        {
            tracing::error!(err = %e, "metrics server failed");
        }
    });

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "notifyd listening");

    let state = Arc::new(AppState {
        config,
        store,
        registry: Arc::clone(&registry),
        delivery,
        metrics,
        shutdown: shutdown.clone(),
        session_cancel: session_cancel.clone(),
    });

    spawn_signal_handler(shutdown.clone());
    spawn_session_drain(
        shutdown.clone(),
        session_cancel.clone(),
        Arc::clone(&registry),
        SHUTDOWN_GRACE,
    );

    // The stop signal only stops accepting; live sessions keep running
    // through the drain window and are forced closed by the drain task, at
    // which point the graceful shutdown below can finish.
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown.clone().cancelled_owned())
        .await?;

    // Covers the path where serve exits before the drain task fires.
    registry.close_all().await;
    session_cancel.cancel();
    if tokio::time::timeout(SHUTDOWN_GRACE, worker_handle).await.is_err() {
        tracing::warn!("ingest worker did not stop within the grace period");
    }
    tracing::info!("service stopped");
    Ok(())
}

/// After the stop signal, give live connections `grace` to finish on their
/// own, then force the remaining sessions closed.
pub(crate) fn spawn_session_drain(
    shutdown: CancellationToken,
    session_cancel: CancellationToken,
    registry: Arc<Registry>,
    grace: Duration,
) {
    tokio::spawn(async move {
        shutdown.cancelled().await;
        tokio::time::sleep(grace).await;
        tracing::info!("drain window elapsed, closing remaining sessions");
        registry.close_all().await;
        session_cancel.cancel();
    });
}

/// Cancel the stop token on SIGINT or SIGTERM.
fn spawn_signal_handler(shutdown: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(err = %e, "installing SIGINT handler failed");
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
                    tracing::error!(err = %e, "installing SIGTERM handler failed");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        tracing::info!("shutdown signal received");
        shutdown.cancel();
    });
}
