// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::fmt;

/// Unified error taxonomy for the delivery pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Unexpected failure; logged, never surfaced to clients.
    Internal(String),
    /// Lookup miss in the store.
    NotFound,
    /// The registry had no live session for the recipient.
    UserNotConnected,
    /// A notification failed validation; names the violated field.
    InvalidInput { field: &'static str, reason: String },
    /// Cross-user mark-as-read attempt.
    Unauthorized,
}

impl ServiceError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal(_) => "INTERNAL",
            Self::NotFound => "NOT_FOUND",
            Self::UserNotConnected => "USER_NOT_CONNECTED",
            Self::InvalidInput { .. } => "INVALID_INPUT",
            Self::Unauthorized => "UNAUTHORIZED",
        }
    }

    /// Shorthand for a validation error on `field`.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput { field, reason: reason.into() }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
            Self::NotFound => f.write_str("resource not found"),
            Self::UserNotConnected => f.write_str("user not connected"),
            Self::InvalidInput { field, reason } => {
                write!(f, "invalid input: field {field}: {reason}")
            }
            Self::Unauthorized => f.write_str("unauthorized"),
        }
    }
}

impl std::error::Error for ServiceError {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
