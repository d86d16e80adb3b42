// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbound turn state machine.
//!
//! One turn moves through received -> classified -> policy-evaluated ->
//! responded, each step a commit point: a failure after a step must not
//! re-run earlier side effects. Every turn appends exactly one from-user
//! message, one from-system message, and one interaction record, whether or
//! not it hands off.
//!
//! Turns for different conversations run in parallel; turns for the same
//! `(channel, external_id)` serialize on a keyed async mutex so concurrent
//! inbound delivery from one contact cannot interleave history.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crosstalk_core::types::{Attachment, Direction, TurnOutcome};
use crosstalk_core::{CrosstalkError, IntentClassifier};
use crosstalk_policy::{HandoffPolicy, match_auto_reply};
use crosstalk_storage::queries::{conversations, interactions, rules};
use crosstalk_storage::{Database, Interaction, now_rfc3339};

use crate::dispatch::{Dispatcher, OutboundRequest};
use crate::respond;

/// Result of handling one channel-level inbound event.
#[derive(Debug, Clone)]
pub enum InboundOutcome {
    /// An auto-reply pattern matched; the canned response was appended and
    /// queued for outbound dispatch without running classification.
    AutoReplied {
        conversation_id: String,
        outbound_message_id: String,
    },
    /// The full turn ran; the response was queued for outbound dispatch.
    Turn {
        conversation_id: String,
        outbound_message_id: String,
        outcome: TurnOutcome,
    },
}

/// Fixed response texts the engine falls back to.
#[derive(Debug, Clone)]
pub struct ResponseTexts {
    /// Sent when a turn hands off to a human agent.
    pub handoff_notice: String,
    /// Sent when no intent matched at all.
    pub generic_fallback: String,
}

/// The conversation orchestrator.
///
/// Owns the per-turn pipeline: append inbound, classify, evaluate handoff
/// policy, select or synthesize a response, append it, and record the
/// interaction. Channel-facing entry points additionally resolve the
/// conversation by `(channel, external_id)` and queue the response for
/// outbound dispatch.
pub struct ConversationEngine {
    db: Arc<Database>,
    classifier: Arc<dyn IntentClassifier>,
    policy: HandoffPolicy,
    texts: ResponseTexts,
    dispatcher: Arc<Dispatcher>,
    /// Per-(channel, external_id) turn serialization.
    turn_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationEngine {
    /// Create an engine over the given storage, classifier, and policy.
    pub fn new(
        db: Arc<Database>,
        classifier: Arc<dyn IntentClassifier>,
        policy: HandoffPolicy,
        texts: ResponseTexts,
        dispatcher: Arc<Dispatcher>,
    ) -> Self {
        Self {
            db,
            classifier,
            policy,
            texts,
            dispatcher,
            turn_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, channel_id: &str, external_id: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .entry(format!("{channel_id}\u{1f}{external_id}"))
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Handle one inbound event from a channel.
    ///
    /// Resolves (get-or-create) the conversation under the per-contact lock,
    /// checks the channel's auto-replies first, and otherwise runs the full
    /// turn. Either way the response is recorded as a pending outbound
    /// message and queued for asynchronous dispatch; the turn itself never
    /// waits on transport I/O.
    pub async fn handle_inbound(
        &self,
        channel_id: &str,
        external_id: &str,
        content: &str,
        attachments: &[Attachment],
    ) -> Result<InboundOutcome, CrosstalkError> {
        let lock = self.lock_for(channel_id, external_id);
        let _guard = lock.lock().await;

        let conversation = conversations::get_or_create(&self.db, channel_id, external_id).await?;

        // Auto-replies match on raw content, before and independent of
        // intent classification.
        let auto_replies = rules::list_active_auto_replies(&self.db, channel_id).await?;
        if let Some(auto_reply) = match_auto_reply(&auto_replies, content) {
            debug!(
                conversation_id = conversation.id.as_str(),
                auto_reply = auto_reply.id.as_str(),
                "auto-reply matched"
            );
            conversations::append_message(
                &self.db,
                &conversation.id,
                Direction::User,
                content,
                attachments,
                None,
            )
            .await?;

            let outbound = self
                .dispatcher
                .create_outbound(OutboundRequest::new(
                    channel_id,
                    external_id,
                    &auto_reply.response_text,
                ))
                .await?;

            let metadata = serde_json::json!({
                "auto_reply_id": auto_reply.id,
                "message_id": outbound.id,
            })
            .to_string();
            conversations::append_message(
                &self.db,
                &conversation.id,
                Direction::System,
                &auto_reply.response_text,
                &[],
                Some(&metadata),
            )
            .await?;

            return Ok(InboundOutcome::AutoReplied {
                conversation_id: conversation.id,
                outbound_message_id: outbound.id,
            });
        }

        let outcome = self
            .run_turn(&conversation.id, content, attachments)
            .await?;

        let outbound = self
            .dispatcher
            .create_outbound(OutboundRequest::new(
                channel_id,
                external_id,
                &outcome.response,
            ))
            .await?;

        Ok(InboundOutcome::Turn {
            conversation_id: conversation.id,
            outbound_message_id: outbound.id,
            outcome,
        })
    }

    /// Process one user message against an existing conversation.
    ///
    /// The typed core of the turn: conversation id and text in, the full
    /// observable result out. Serving layers that answer in-band (web chat
    /// HTTP shims) call this directly and relay the response themselves.
    pub async fn process_user_message(
        &self,
        conversation_id: &str,
        user_input: &str,
    ) -> Result<TurnOutcome, CrosstalkError> {
        self.run_turn(conversation_id, user_input, &[]).await
    }

    async fn run_turn(
        &self,
        conversation_id: &str,
        user_input: &str,
        attachments: &[Attachment],
    ) -> Result<TurnOutcome, CrosstalkError> {
        // 1. Commit the inbound message. Fails the turn if the conversation
        //    is unknown or storage is down.
        conversations::append_message(
            &self.db,
            conversation_id,
            Direction::User,
            user_input,
            attachments,
            None,
        )
        .await?;

        // 2. Classify. Infallible: a degraded classifier reports a no-match
        //    and the turn continues.
        let classification = self.classifier.classify(user_input);

        // 3. Evaluate handoff policy against the current active rule set.
        let active_rules = rules::list_active_handoff_rules(&self.db).await?;
        let needs_handoff = self.policy.should_handoff(
            classification.intent_id.as_deref(),
            classification.confidence,
            &active_rules,
        );

        // 4. Produce the response.
        let response_text = if needs_handoff {
            self.flag_handoff(conversation_id).await?;
            self.texts.handoff_notice.clone()
        } else {
            respond::select_response(
                &self.db,
                classification.intent_id.as_deref(),
                classification.intent_name.as_deref(),
                user_input,
                &self.texts.generic_fallback,
            )
            .await?
            .text
        };

        // 5. Commit the response message with classification metadata.
        let system_metadata = serde_json::json!({
            "intent": classification.intent_name,
            "confidence": classification.confidence,
            "needs_handoff": needs_handoff,
        })
        .to_string();
        let system_message = conversations::append_message(
            &self.db,
            conversation_id,
            Direction::System,
            &response_text,
            &[],
            Some(&system_metadata),
        )
        .await?;

        // 6. Record exactly one interaction for the turn.
        let interaction = Interaction {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            user_input: user_input.to_string(),
            intent_id: classification.intent_id.clone(),
            confidence: classification.confidence,
            response: response_text.clone(),
            feedback_rating: None,
            created_at: now_rfc3339(),
        };
        interactions::insert_interaction(&self.db, &interaction).await?;

        info!(
            conversation_id,
            intent = classification.intent_name.as_deref().unwrap_or("<none>"),
            confidence = classification.confidence,
            needs_handoff,
            "turn processed"
        );

        Ok(TurnOutcome {
            response: response_text,
            needs_handoff,
            intent: classification.intent_name,
            confidence: classification.confidence,
            message_id: system_message.id,
            interaction_id: interaction.id,
        })
    }

    /// Mark the conversation as needing a human, stamping the request time.
    async fn flag_handoff(&self, conversation_id: &str) -> Result<(), CrosstalkError> {
        let conversation = conversations::get_conversation(&self.db, conversation_id)
            .await?
            .ok_or_else(|| CrosstalkError::not_found("conversation", conversation_id))?;

        let mut metadata: serde_json::Value = conversation
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        metadata["needs_handoff"] = serde_json::Value::Bool(true);
        metadata["handoff_requested_at"] = serde_json::Value::String(now_rfc3339());

        conversations::set_metadata(&self.db, conversation_id, Some(&metadata.to_string())).await
    }

    /// Record user feedback on an interaction. Last write wins; unknown ids
    /// fail with `NotFound`.
    pub async fn record_feedback(
        &self,
        interaction_id: &str,
        rating: i32,
    ) -> Result<(), CrosstalkError> {
        interactions::set_feedback(&self.db, interaction_id, rating).await
    }
}
