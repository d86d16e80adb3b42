// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `crosstalk-core::types` for use across
//! adapter trait boundaries. This module re-exports them for convenience
//! within the storage crate.

pub use crosstalk_core::types::{
    AutoReply, Channel, ChannelMetrics, Conversation, ConversationMessage, EmailBatch,
    EmailDetails, HandoffRule, Intent, IntentResponse, Interaction, KnowledgeBase,
    KnowledgeEntry, Message, QueueEntry, Template, WhatsappDetails,
};
