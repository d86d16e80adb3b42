// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Policy evaluation for the Crosstalk messaging engine.
//!
//! This crate provides:
//! - [`HandoffPolicy`]: escalation decision over (intent, confidence, rules)
//! - [`match_auto_reply`]: pattern-triggered canned responses
//!
//! Both are pure, deterministic functions over typed inputs; callers load
//! the current rule sets from storage before each evaluation.

pub mod autoreply;
pub mod handoff;

pub use autoreply::match_auto_reply;
pub use handoff::HandoffPolicy;
