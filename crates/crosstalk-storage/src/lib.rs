// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Crosstalk messaging engine.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed CRUD operations for
//! channels, conversations, messages, chatbot entities, metrics rollups, and
//! a crash-safe dispatch queue.

pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod writer;

pub use database::Database;
pub use models::*;

/// Current UTC time as an RFC 3339 string with millisecond precision and a
/// `Z` suffix, matching the `strftime('%Y-%m-%dT%H:%M:%fZ', 'now')` format
/// used in SQL defaults. All timestamp columns use this shape so string
/// comparison equals chronological comparison.
pub fn now_rfc3339() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
