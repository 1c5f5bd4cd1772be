// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delivery service: turns an accepted notification into a persisted,
//! serialized, routed frame.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::metrics::Metrics;
use crate::notification::Notification;
use crate::registry::Registry;
use crate::store::Store;

pub struct DeliveryService {
    store: Arc<Store>,
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl DeliveryService {
    pub fn new(store: Arc<Store>, registry: Arc<Registry>, metrics: Arc<Metrics>) -> Self {
        Self { store, registry, metrics }
    }

    /// Assign identity and time, validate, persist, serialize, route.
    ///
    /// A disconnected recipient is reported as `UserNotConnected` so the
    /// caller can log it, but the record is persisted regardless; side
    /// effects already applied are never rolled back.
    pub async fn send(&self, mut n: Notification) -> Result<(), ServiceError> {
        if n.id.is_empty() {
            n.id = Uuid::new_v4().to_string();
        }
        if n.created_at.is_none() {
            n.created_at = Some(Utc::now());
        }

        if let Err(e) = n.validate() {
            tracing::warn!(notification_id = %n.id, user_id = %n.user_id, err = %e, "notification failed validation");
            self.metrics.delivery_failures.with_label_values(&[e.as_str()]).inc();
            return Err(e);
        }

        let n = Arc::new(n);
        self.store.save(Arc::clone(&n));

        let frame = serde_json::to_string(n.as_ref()).map_err(|e| {
            let err = ServiceError::Internal(format!("serializing notification: {e}"));
            tracing::error!(notification_id = %n.id, err = %e, "notification serialization failed");
            self.metrics.delivery_failures.with_label_values(&[err.as_str()]).inc();
            err
        })?;

        match self.registry.send_to_user(&n.user_id, frame).await {
            Ok(()) => {
                self.metrics.notifications_delivered.inc();
                tracing::info!(
                    notification_id = %n.id,
                    user_id = %n.user_id,
                    notification_type = n.r#type.as_str(),
                    "notification delivered"
                );
                Ok(())
            }
            Err(e) => {
                self.metrics.delivery_failures.with_label_values(&[e.as_str()]).inc();
                Err(e)
            }
        }
    }

    /// Flip `is_read` for the given notification, provided `user_id` owns
    /// it. Concurrent calls are serialized by the store lock; the last
    /// writer wins.
    pub fn mark_as_read(&self, id: &str, user_id: &str) -> Result<(), ServiceError> {
        let current = self.store.find_by_id(id).ok_or(ServiceError::NotFound)?;
        if current.user_id != user_id {
            tracing::warn!(notification_id = id, user_id, "mark-as-read on another user's notification");
            return Err(ServiceError::Unauthorized);
        }

        let mut updated = (*current).clone();
        updated.is_read = true;
        self.store.update(Arc::new(updated))?;
        tracing::info!(notification_id = id, user_id, "notification marked as read");
        Ok(())
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
