// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: config builder and an in-process server
//! spawner for integration tests that speak real WebSockets.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::delivery::DeliveryService;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::state::AppState;
use crate::store::Store;
use crate::transport::build_router;

/// Builder for a valid [`Config`] with test-friendly heartbeat timing.
pub struct ConfigBuilder {
    pong_wait: u64,
    ping_period: Option<u64>,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self { pong_wait: 60, ping_period: None }
    }

    /// Pong deadline in seconds.
    pub fn pong_wait(mut self, secs: u64) -> Self {
        self.pong_wait = secs;
        self
    }

    /// Explicit ping cadence in seconds.
    pub fn ping_period(mut self, secs: u64) -> Self {
        self.ping_period = Some(secs);
        self
    }

    pub fn build(self) -> Config {
        let mut config = Config::default();
        config.kafka.brokers = vec!["127.0.0.1:9092".to_owned()];
        config.kafka.topic = "notifications".to_owned();
        config.websocket.pong_wait = self.pong_wait;
        config.websocket.ping_period = self.ping_period;
        config
    }
}

/// An in-process server plus handles on its shared state.
pub struct TestApp {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
}

impl TestApp {
    pub fn ws_url(&self, query: &str) -> String {
        if query.is_empty() {
            format!("ws://{}/ws", self.addr)
        } else {
            format!("ws://{}/ws?{query}", self.addr)
        }
    }
}

/// Short drain window so shutdown tests finish quickly.
pub const DRAIN_GRACE: Duration = Duration::from_millis(200);

/// Bind the full router on an ephemeral port. No bus is attached; tests
/// drive the delivery service directly. Shutdown drains for [`DRAIN_GRACE`]
/// before sessions are forced closed, mirroring the real run loop.
pub async fn spawn_server(config: Config) -> anyhow::Result<TestApp> {
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
    crate::spawn_session_drain(
        shutdown.clone(),
        session_cancel.clone(),
        Arc::clone(&registry),
        DRAIN_GRACE,
    );
    let state = Arc::new(AppState {
        config,
        store,
        registry,
        delivery,
        metrics,
        shutdown,
        session_cancel,
    });

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let router = build_router(Arc::clone(&state));
    let serve_shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router)
            .with_graceful_shutdown(serve_shutdown.cancelled_owned())
            .await;
    });

    Ok(TestApp { addr, state })
}
