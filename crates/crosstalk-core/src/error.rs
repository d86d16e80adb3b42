// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Crosstalk messaging engine.

use thiserror::Error;

/// The primary error type used across all Crosstalk adapter traits and core operations.
#[derive(Debug, Error)]
pub enum CrosstalkError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transport adapter errors (recipient rejected, gateway failure, auth failure).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Template variable resolution failure.
    #[error("render error: {message}")]
    Render { message: String },

    /// Malformed input (missing required recipient field, confidence out of range).
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Concurrent writers raced on a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Requested adapter was not found in the registry.
    #[error("adapter not found: {adapter_type}/{name}")]
    AdapterNotFound { adapter_type: String, name: String },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CrosstalkError {
    /// Shorthand for a [`CrosstalkError::NotFound`] with an owned id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CrosstalkError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
