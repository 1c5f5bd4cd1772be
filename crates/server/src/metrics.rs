// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prometheus counters/gauges and the text-format scrape endpoint served on
//! the auxiliary metrics port.

use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, TextEncoder};

/// Instrumentation shared across the pipeline.
pub struct Metrics {
    registry: prometheus::Registry,
    /// Live WebSocket sessions.
    pub connected_sessions: IntGauge,
    /// Bus frames handed to the delivery service.
    pub notifications_ingested: IntCounter,
    /// Frames enqueued for a connected recipient.
    pub notifications_delivered: IntCounter,
    /// Bus frames that failed to decode.
    pub ingest_decode_failures: IntCounter,
    /// Delivery failures by error code.
    pub delivery_failures: IntCounterVec,
}

impl Metrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = prometheus::Registry::new();

        let connected_sessions =
            IntGauge::new("notifyd_connected_sessions", "Number of live WebSocket sessions")?;
        let notifications_ingested = IntCounter::new(
            "notifyd_notifications_ingested_total",
            "Notification records consumed from the bus",
        )?;
        let notifications_delivered = IntCounter::new(
            "notifyd_notifications_delivered_total",
            "Notification frames enqueued for a connected recipient",
        )?;
        let ingest_decode_failures = IntCounter::new(
            "notifyd_ingest_decode_failures_total",
            "Bus messages that were not valid notification JSON",
        )?;
        let delivery_failures = IntCounterVec::new(
            Opts::new("notifyd_delivery_failures_total", "Delivery failures by error code"),
            &["reason"],
        )?;

        registry.register(Box::new(connected_sessions.clone()))?;
        registry.register(Box::new(notifications_ingested.clone()))?;
        registry.register(Box::new(notifications_delivered.clone()))?;
        registry.register(Box::new(ingest_decode_failures.clone()))?;
        registry.register(Box::new(delivery_failures.clone()))?;

        Ok(Self {
            registry,
            connected_sessions,
            notifications_ingested,
            notifications_delivered,
            ingest_decode_failures,
            delivery_failures,
        })
    }

    /// Encode the current state in Prometheus text format.
    pub fn render(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::error!(err = %e, "metrics encoding failed");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

/// Router for the auxiliary metrics listener.
pub fn router(metrics: Arc<Metrics>) -> Router {
    Router::new().route("/metrics", get(scrape)).with_state(metrics)
}

/// `GET /metrics`
async fn scrape(State(metrics): State<Arc<Metrics>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], metrics.render())
}
