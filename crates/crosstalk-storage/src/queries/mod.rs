// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod batches;
pub mod channels;
pub mod conversations;
pub mod intents;
pub mod interactions;
pub mod messages;
pub mod metrics;
pub mod queue;
pub mod rules;
pub mod templates;

/// Decode a JSON TEXT column into a typed value, surfacing parse failures as
/// column conversion errors rather than panics.
pub(crate) fn json_col<T: serde::de::DeserializeOwned>(
    idx: usize,
    raw: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse a lowercase enum TEXT column (status, direction, channel kind).
pub(crate) fn enum_col<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = strum::ParseError>,
{
    raw.parse().map_err(|e: strum::ParseError| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}
