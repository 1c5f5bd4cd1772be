// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus ingest worker.
//!
//! One worker pulls JSON-encoded notification frames from the bus and hands
//! them to the delivery service. Per-message failures (decode or handler)
//! are logged and swallowed so one bad record cannot block the partition;
//! offsets advance independently of handler outcome, so semantics are
//! at-most-once after decode. Bus-level read failures back off with a
//! capped sleep and rate-limited error lines.

pub mod kafka;

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::delivery::DeliveryService;
use crate::error::ServiceError;
use crate::metrics::Metrics;
use crate::notification::Notification;

/// Cap on the per-error backoff sleep, in seconds.
const BACKOFF_CAP_SECS: u64 = 10;

/// Minimum spacing between identical-cause bus error lines.
const ERROR_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// A frame-oriented bus reader. The Kafka implementation lives in
/// [`kafka`]; tests script their own.
pub trait FrameSource {
    /// Pull the next frame payload.
    fn read(&mut self) -> impl std::future::Future<Output = anyhow::Result<Bytes>> + Send;

    /// Release the underlying reader.
    fn close(&mut self) {}
}

/// The single consumer-group worker.
pub struct IngestWorker<S> {
    source: S,
    delivery: Arc<DeliveryService>,
    metrics: Arc<Metrics>,
    shutdown: CancellationToken,
}

impl<S: FrameSource> IngestWorker<S> {
    pub fn new(
        source: S,
        delivery: Arc<DeliveryService>,
        metrics: Arc<Metrics>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { source, delivery, metrics, shutdown }
    }

    /// Consume frames until the shutdown token fires. Cancellation is
    /// observed between reads and during backoff sleeps.
    pub async fn run(mut self) {
        tracing::info!("ingest worker started");
        let mut errors: u64 = 0;
        let mut throttle = LogThrottle::new(ERROR_LOG_INTERVAL);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.source.read() => match result {
                    Ok(payload) => {
                        errors = 0;
                        self.handle_frame(&payload).await;
                    }
                    Err(e) => {
                        errors += 1;
                        throttle.log(&e.to_string());
                        let backoff = Duration::from_secs(errors.min(BACKOFF_CAP_SECS));
                        tokio::select! {
                            _ = self.shutdown.cancelled() => break,
                            _ = tokio::time::sleep(backoff) => {}
                        }
                    }
                }
            }
        }

        self.source.close();
        tracing::info!("ingest worker stopped");
    }

    async fn handle_frame(&self, payload: &[u8]) {
        let notification: Notification = match serde_json::from_slice(payload) {
            Ok(n) => n,
            Err(e) => {
                self.metrics.ingest_decode_failures.inc();
                tracing::warn!(err = %e, "discarding undecodable bus message");
                return;
            }
        };

        self.metrics.notifications_ingested.inc();
        tracing::debug!(
            notification_id = %notification.id,
            user_id = %notification.user_id,
            "handling bus notification"
        );

        match self.delivery.send(notification).await {
            Ok(()) => {}
            Err(ServiceError::UserNotConnected) => {
                tracing::debug!("recipient not connected, frame dropped");
            }
            Err(e) => {
                tracing::warn!(err = %e, "notification handling failed");
            }
        }
    }
}

/// Suppresses repeats of the same error cause within an interval, so a
/// down broker produces one line per window instead of a flood.
struct LogThrottle {
    interval: Duration,
    last: Option<(String, Instant)>,
}

impl LogThrottle {
    fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    fn log(&mut self, cause: &str) {
        if self.should_log(cause) {
            tracing::error!(err = %cause, "bus read failed");
        }
    }

    fn should_log(&mut self, cause: &str) -> bool {
        let now = Instant::now();
        if let Some((last_cause, at)) = &self.last {
            if last_cause == cause && now.duration_since(*at) < self.interval {
                return false;
            }
        }
        self.last = Some((cause.to_owned(), now));
        true
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
