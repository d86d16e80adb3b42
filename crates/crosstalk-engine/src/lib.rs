// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation orchestration for the Crosstalk messaging engine.
//!
//! The [`ConversationEngine`] is the central coordinator that:
//! - Resolves inbound events to conversations (get-or-create, per-contact
//!   serialization)
//! - Runs the turn state machine: classify, evaluate handoff policy, select
//!   or synthesize a response, record the interaction
//! - Queues responses for asynchronous outbound dispatch
//!
//! Around it: the [`Dispatcher`] drains the crash-safe outbound queue into
//! per-channel transport adapters, the [`DeliveryTracker`] reconciles
//! provider delivery state, and `jobs` hosts the periodic sweeps.

pub mod batch;
pub mod delivery;
pub mod dispatch;
pub mod jobs;
pub mod registry;
pub mod render;
pub mod respond;
pub mod rollup;
pub mod shutdown;
pub mod turn;

pub use batch::{BatchOutcome, ingest_batch};
pub use delivery::{DeliveryTracker, ReconcileSummary};
pub use dispatch::{DISPATCH_QUEUE, Dispatcher, OutboundRequest};
pub use registry::ChannelRegistry;
pub use render::VarRenderer;
pub use rollup::MetricsRollup;
pub use turn::{ConversationEngine, InboundOutcome, ResponseTexts};
