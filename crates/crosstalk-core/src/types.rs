// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Crosstalk workspace.
//!
//! These are the canonical entity definitions. `crosstalk-storage::models`
//! re-exports them; query modules map rows to and from these structs.
//! Timestamps are RFC 3339 strings throughout (SQLite TEXT columns).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter in the plugin registry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    Storage,
    Classifier,
    Renderer,
}

/// The messaging surface a channel speaks.
///
/// Stored as lowercase TEXT; parsed back via `FromStr` at the storage boundary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Whatsapp,
    Webchat,
}

/// Outbound message delivery lifecycle.
///
/// Transitions only move forward through the success chain
/// (pending -> sent -> delivered -> read); `Failed` is reachable from any
/// non-terminal state and is itself terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    fn rank(self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Sent => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
            MessageStatus::Failed => 4,
        }
    }

    /// Whether no further transition is possible from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Read | MessageStatus::Failed)
    }

    /// Whether the partial order permits moving from `self` to `next`.
    ///
    /// Forward jumps within the success chain are allowed (a provider may
    /// report `read` while we still hold `sent`); moving backward never is.
    pub fn can_transition_to(self, next: MessageStatus) -> bool {
        if self == next || self.is_terminal() {
            return false;
        }
        if next == MessageStatus::Failed {
            return true;
        }
        next.rank() > self.rank()
    }
}

/// Delivery state reported by a transport provider for a dispatched message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryState {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
    /// Provider does not know the reference or has nothing new to report.
    Unknown,
}

/// Who authored a conversation message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Inbound, written by the external contact.
    User,
    /// Outbound, written by the engine.
    System,
}

// --- Entities ---

/// A messaging surface with its own transport and configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub name: String,
    pub kind: ChannelKind,
    /// Opaque adapter configuration as a JSON string.
    pub configuration: Option<String>,
    pub is_active: bool,
}

/// A reusable outbound content template with declared variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub channel_id: String,
    pub name: String,
    pub subject: Option<String>,
    pub content: String,
    /// Variable names the content references, e.g. `["first_name"]`.
    pub variables: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An outbound message and its delivery lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub channel_id: String,
    pub template_id: Option<String>,
    /// Internal actor that authored the send, if any.
    pub sender: Option<String>,
    /// Opaque recipient address (email address or phone number).
    pub recipient: String,
    pub subject: Option<String>,
    pub content: String,
    pub metadata: Option<String>,
    pub status: MessageStatus,
    pub scheduled_at: Option<String>,
    /// Set when the message was admitted to the dispatch queue.
    pub queued_at: Option<String>,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub read_at: Option<String>,
    pub provider_ref: Option<String>,
    pub created_at: String,
}

/// The ongoing exchange with one external contact on one channel.
///
/// Uniquely identified by `(channel_id, external_id)`; lookup is always
/// get-or-create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub channel_id: String,
    pub user_id: Option<String>,
    /// Phone number, email address, or web session id of the contact.
    pub external_id: String,
    /// Free-form JSON metadata; carries handoff flags.
    pub metadata: Option<String>,
    pub tags: Vec<String>,
    pub started_at: String,
    pub last_message_at: String,
}

/// A media reference attached to a conversation message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub url: String,
    #[serde(default)]
    pub media_type: Option<String>,
}

/// One entry in a conversation's ordered history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub conversation_id: String,
    pub direction: Direction,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub metadata: Option<String>,
    pub created_at: String,
}

/// A recognizable user intention with its training phrases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub training_phrases: Vec<String>,
}

/// A canned response registered for an intent, optionally backed by a
/// knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResponse {
    pub id: String,
    pub intent_id: String,
    pub text: String,
    pub knowledge_base_id: Option<String>,
}

/// One key/value entry in a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub key: String,
    pub value: String,
}

/// An insertion-ordered key/value store scanned during response selection.
///
/// Entries are a JSON array of pairs, not an object, so lookup order is
/// deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: String,
    pub name: String,
    pub description: String,
    pub entries: Vec<KnowledgeEntry>,
}

/// Record of one classified inbound turn, created exactly once per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    pub conversation_id: String,
    pub user_input: String,
    pub intent_id: Option<String>,
    pub confidence: f32,
    pub response: String,
    pub feedback_rating: Option<i32>,
    pub created_at: String,
}

/// A handoff escalation rule.
///
/// `intent_id = None` makes the rule general (applies to every intent).
/// Any matching active rule firing triggers handoff (OR semantics).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffRule {
    pub id: String,
    pub intent_id: Option<String>,
    pub confidence_threshold: f32,
    pub is_active: bool,
}

/// A canned response triggered by substring match on inbound content,
/// independent of intent classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoReply {
    pub id: String,
    pub channel_id: String,
    pub name: String,
    pub trigger_pattern: String,
    pub response_text: String,
    pub is_active: bool,
}

/// A bulk-send batch created from an ingested recipient list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailBatch {
    pub id: String,
    pub name: String,
    pub description: String,
    pub processed: bool,
    pub created_at: String,
}

/// Email-specific details, one row per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailDetails {
    pub message_id: String,
    pub batch_id: Option<String>,
    pub opens: i64,
    pub clicks: i64,
    pub spam_score: f32,
}

/// WhatsApp-specific details, one row per message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappDetails {
    pub message_id: String,
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

/// Per-(channel, date) delivery and conversation rollup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub channel_id: String,
    /// Calendar date in `YYYY-MM-DD`.
    pub date: String,
    pub messages_sent: i64,
    pub messages_delivered: i64,
    pub messages_read: i64,
    pub conversations_started: i64,
    pub conversations_completed: i64,
    pub average_response_time_secs: f64,
}

/// A row in the crash-safe dispatch queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    pub queue_name: String,
    pub payload: String,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    pub created_at: String,
    pub updated_at: String,
    pub locked_until: Option<String>,
}

// --- Transport boundary types ---

/// Everything a transport adapter needs to perform one outbound send.
#[derive(Debug, Clone)]
pub struct OutboundDispatch {
    pub message: Message,
    /// Media payload for channels that carry it (WhatsApp).
    pub media_url: Option<String>,
    pub media_type: Option<String>,
}

/// Result of a successful dispatch handed back by a transport adapter.
#[derive(Debug, Clone)]
pub struct DispatchReceipt {
    /// Provider reference used later for status polling, when the provider
    /// issues one.
    pub provider_ref: Option<String>,
}

/// Result of intent classification for one input text.
///
/// Confidence is always populated; a no-match carries 0.0, never an absent
/// score.
#[derive(Debug, Clone)]
pub struct Classification {
    pub intent_id: Option<String>,
    pub intent_name: Option<String>,
    pub confidence: f32,
}

impl Classification {
    /// The no-match result: no intent, confidence 0.0.
    pub fn no_match() -> Self {
        Self {
            intent_id: None,
            intent_name: None,
            confidence: 0.0,
        }
    }
}

/// The full observable result of processing one inbound turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub response: String,
    pub needs_handoff: bool,
    pub intent: Option<String>,
    pub confidence: f32,
    /// Id of the from-system [`ConversationMessage`] appended for this turn.
    pub message_id: String,
    pub interaction_id: String,
}
