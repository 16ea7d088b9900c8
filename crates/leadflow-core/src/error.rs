// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Leadflow engagement engine.

use thiserror::Error;

use crate::types::LeadId;

/// The primary error type used across all Leadflow adapter traits and core operations.
#[derive(Debug, Error)]
pub enum LeadflowError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Lead repository errors (quota exhaustion, connection failure, serialization).
    #[error("repository error: {source}")]
    Repository {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Voice gateway errors (call placement rejected, status lookup failure).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Messaging channel errors (WhatsApp template send, SMTP delivery).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No lead matches the given identifier.
    #[error("lead not found: {id}")]
    LeadNotFound { id: LeadId },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl LeadflowError {
    /// Whether the error is worth retrying with backoff (repository/transport blips).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LeadflowError::Repository { .. } | LeadflowError::Timeout { .. }
        )
    }
}
