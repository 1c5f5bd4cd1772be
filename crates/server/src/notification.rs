// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification record and validation rules.
//!
//! The wire form is plain JSON with a fixed field order; `created_at` is
//! RFC 3339 and round-trips at nanosecond precision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Notification category. The closed set means an unknown `type` is
/// rejected when the record is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    System,
    Alert,
    Message,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::Alert => "alert",
            Self::Message => "message",
        }
    }
}

/// Lowest and highest accepted priority, inclusive.
pub const PRIORITY_MIN: i32 = 0;
pub const PRIORITY_MAX: i32 = 5;

/// A single delivery record.
///
/// `id` and `created_at` may be absent on ingest; the delivery service
/// assigns them before validation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub r#type: NotificationType,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub priority: i32,
}

impl Notification {
    /// Check the record against the model rules, returning the first
    /// violated field. Runs after server-side assignment, so `id` must be
    /// populated by then.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.id.is_empty() {
            return Err(ServiceError::invalid("id", "must not be empty"));
        }
        if self.user_id.is_empty() {
            return Err(ServiceError::invalid("user_id", "must not be empty"));
        }
        if self.title.is_empty() {
            return Err(ServiceError::invalid("title", "must not be empty"));
        }
        if self.content.is_empty() {
            return Err(ServiceError::invalid("content", "must not be empty"));
        }
        if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&self.priority) {
            return Err(ServiceError::invalid(
                "priority",
                format!("must be within [{PRIORITY_MIN},{PRIORITY_MAX}]"),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
