// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::delivery::DeliveryService;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::store::Store;

/// Shared service state handed to the transport handlers.
pub struct AppState {
    pub config: Config,
    pub store: Arc<Store>,
    pub registry: Arc<Registry>,
    pub delivery: Arc<DeliveryService>,
    pub metrics: Arc<Metrics>,
    /// Stop signal: listeners stop accepting and the drain window starts.
    pub shutdown: CancellationToken,
    /// Parent of every session token. Cancelled only after the drain
    /// window elapses, so live sessions are not torn down by the stop
    /// signal itself.
    pub session_cancel: CancellationToken,
}
