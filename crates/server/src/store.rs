// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory notification repository.
//!
//! A primary id-keyed map plus a per-user index in insertion order, guarded
//! as one unit by a single reader-writer lock so index readers never observe
//! a half-applied update.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ServiceError;
use crate::notification::Notification;

#[derive(Default)]
struct StoreInner {
    by_id: HashMap<String, Arc<Notification>>,
    by_user: HashMap<String, Vec<Arc<Notification>>>,
}

/// Process-local notification storage. Records are never removed.
#[derive(Default)]
pub struct Store {
    inner: RwLock<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a new record. Callers guarantee the id is fresh; there is no
    /// duplicate check here.
    pub fn save(&self, n: Arc<Notification>) {
        let mut inner = self.write();
        tracing::debug!(notification_id = %n.id, "saving notification");
        inner.by_user.entry(n.user_id.clone()).or_default().push(Arc::clone(&n));
        inner.by_id.insert(n.id.clone(), n);
    }

    pub fn find_by_id(&self, id: &str) -> Option<Arc<Notification>> {
        self.read().by_id.get(id).cloned()
    }

    /// Snapshot of a user's notifications in insertion order. Unknown users
    /// get an empty list, not an error.
    pub fn find_by_user(&self, user_id: &str) -> Vec<Arc<Notification>> {
        self.read().by_user.get(user_id).cloned().unwrap_or_default()
    }

    /// Replace an existing record in the primary map and at its position in
    /// the user index.
    pub fn update(&self, n: Arc<Notification>) -> Result<(), ServiceError> {
        let mut inner = self.write();
        if !inner.by_id.contains_key(&n.id) {
            return Err(ServiceError::NotFound);
        }
        if let Some(list) = inner.by_user.get_mut(&n.user_id) {
            if let Some(slot) = list.iter_mut().find(|existing| existing.id == n.id) {
                *slot = Arc::clone(&n);
            }
        }
        tracing::debug!(notification_id = %n.id, "notification updated");
        inner.by_id.insert(n.id.clone(), n);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
