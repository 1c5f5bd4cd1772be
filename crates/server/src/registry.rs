// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry: the process-wide index from user id to live session.
//!
//! At most one session per user is reachable through the map. A new
//! connection supersedes the incumbent, which is closed before the
//! newcomer is installed. Unregistration compares session identity so a
//! superseded session's late unregister cannot evict its replacement.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::ServiceError;
use crate::metrics::Metrics;
use crate::session::Session;

pub struct Registry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    metrics: Arc<Metrics>,
}

impl Registry {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { sessions: RwLock::new(HashMap::new()), metrics }
    }

    /// Install a session for its user, closing any incumbent first.
    pub async fn register(&self, session: Arc<Session>) {
        let mut sessions = self.sessions.write().await;
        if let Some(incumbent) = sessions.get(&session.user_id) {
            tracing::info!(user_id = %session.user_id, "closing existing session for user");
            incumbent.close();
        }
        sessions.insert(session.user_id.clone(), Arc::clone(&session));
        self.metrics.connected_sessions.set(sessions.len() as i64);
        tracing::info!(user_id = %session.user_id, "user connected");
    }

    /// Remove the mapping only if `session` is still the one installed.
    /// A superseded session unregistering late must not remove its
    /// replacement.
    pub async fn unregister(&self, user_id: &str, session: &Arc<Session>) {
        let mut sessions = self.sessions.write().await;
        if sessions.get(user_id).is_some_and(|current| Arc::ptr_eq(current, session)) {
            sessions.remove(user_id);
            self.metrics.connected_sessions.set(sessions.len() as i64);
            tracing::info!(user_id, "user disconnected");
        }
    }

    /// Route a serialized frame to the user's session. The session pointer
    /// is copied out of the map so the enqueue happens without holding the
    /// registry lock.
    pub async fn send_to_user(&self, user_id: &str, frame: String) -> Result<(), ServiceError> {
        let session = {
            let sessions = self.sessions.read().await;
            sessions.get(user_id).cloned()
        };
        match session {
            Some(session) => {
                session.send(frame);
                Ok(())
            }
            None => {
                tracing::warn!(user_id, "send to disconnected user");
                Err(ServiceError::UserNotConnected)
            }
        }
    }

    /// Enqueue a frame for every connected session. Enqueue is non-blocking
    /// by contract, so one slow session cannot stall the iteration.
    pub async fn broadcast(&self, frame: &str) {
        let sessions = self.sessions.read().await;
        tracing::info!(session_count = sessions.len(), "broadcasting frame");
        for session in sessions.values() {
            session.send(frame.to_owned());
        }
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Close every session. Used on process shutdown; each session's pumps
    /// unregister themselves as they exit.
    pub async fn close_all(&self) {
        let sessions = self.sessions.read().await;
        for session in sessions.values() {
            session.close();
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
