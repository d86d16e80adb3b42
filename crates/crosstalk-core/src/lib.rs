// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Crosstalk messaging engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! domain types used throughout the Crosstalk workspace. All adapter plugins
//! implement traits defined here.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::CrosstalkError;
pub use types::{
    AdapterType, ChannelKind, Classification, DeliveryState, Direction, HealthStatus,
    MessageStatus, TurnOutcome,
};

// Re-export all adapter traits at crate root.
pub use traits::{
    IntentClassifier, PluginAdapter, TemplateRenderer, TrainableClassifier, TransportAdapter,
};
