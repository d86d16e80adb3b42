// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Crosstalk integration tests.
//!
//! Provides [`MockTransport`], a scriptable transport adapter, and harness
//! helpers for temp databases and seeded entities.

pub mod harness;
pub mod mock_transport;

pub use harness::{seed_channel, seed_intent, temp_database};
pub use mock_transport::MockTransport;
