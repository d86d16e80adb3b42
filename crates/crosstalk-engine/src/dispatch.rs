// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asynchronous outbound dispatch through the crash-safe queue.
//!
//! Creating a message commits it `pending` and (unless scheduled for later)
//! admits it to the dispatch queue; a worker drains the queue and hands each
//! message to its channel's transport adapter under a bounded timeout.
//! A failed or timed-out attempt marks the message `failed` with the reason
//! in its metadata. That transition is terminal here: retry policy, if any,
//! belongs to the transport adapter.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crosstalk_core::types::{ChannelKind, MessageStatus, OutboundDispatch};
use crosstalk_core::CrosstalkError;
use crosstalk_storage::queries::{batches, channels, messages, queue};
use crosstalk_storage::{Database, EmailDetails, Message, WhatsappDetails, now_rfc3339};

use crate::registry::ChannelRegistry;

/// Name of the outbound dispatch queue.
pub const DISPATCH_QUEUE: &str = "dispatch";

/// Queue payload: the id of the message to dispatch.
#[derive(Debug, Serialize, Deserialize)]
struct DispatchPayload {
    message_id: String,
}

/// Everything needed to create one outbound message.
#[derive(Debug, Clone, Default)]
pub struct OutboundRequest {
    pub channel_id: String,
    pub recipient: String,
    pub content: String,
    pub subject: Option<String>,
    pub template_id: Option<String>,
    pub sender: Option<String>,
    pub metadata: Option<String>,
    /// RFC 3339 send time; `None` dispatches immediately.
    pub scheduled_at: Option<String>,
    /// Media payload for channels that carry it.
    pub media_url: Option<String>,
    pub media_type: Option<String>,
    /// Owning email batch, when created by batch ingestion.
    pub batch_id: Option<String>,
}

impl OutboundRequest {
    /// A plain immediate text send.
    pub fn new(channel_id: &str, recipient: &str, content: &str) -> Self {
        Self {
            channel_id: channel_id.to_string(),
            recipient: recipient.to_string(),
            content: content.to_string(),
            ..Self::default()
        }
    }
}

/// Creates outbound messages and drains the dispatch queue.
pub struct Dispatcher {
    db: Arc<Database>,
    registry: Arc<ChannelRegistry>,
    /// Upper bound on a single dispatch attempt.
    timeout: Duration,
}

impl Dispatcher {
    /// Create a dispatcher over the given storage and channel registry.
    pub fn new(db: Arc<Database>, registry: Arc<ChannelRegistry>, timeout: Duration) -> Self {
        Self { db, registry, timeout }
    }

    /// Create a pending outbound message and, unless scheduled for later,
    /// admit it to the dispatch queue.
    ///
    /// Also writes the per-channel details row (email/WhatsApp), keyed
    /// uniquely by message id.
    pub async fn create_outbound(
        &self,
        request: OutboundRequest,
    ) -> Result<Message, CrosstalkError> {
        if request.recipient.trim().is_empty() {
            return Err(CrosstalkError::Validation(
                "outbound message requires a recipient".to_string(),
            ));
        }

        let channel = channels::get_channel(&self.db, &request.channel_id)
            .await?
            .ok_or_else(|| CrosstalkError::not_found("channel", request.channel_id.clone()))?;
        if !channel.is_active {
            return Err(CrosstalkError::Validation(format!(
                "channel {} is not active",
                channel.id
            )));
        }

        let mut message = messages::new_pending_message(
            &request.channel_id,
            &request.recipient,
            &request.content,
        );
        message.subject = request.subject;
        message.template_id = request.template_id;
        message.sender = request.sender;
        message.metadata = request.metadata;
        message.scheduled_at = request.scheduled_at;
        messages::insert_message(&self.db, &message).await?;

        match channel.kind {
            ChannelKind::Email => {
                batches::insert_email_details(
                    &self.db,
                    &EmailDetails {
                        message_id: message.id.clone(),
                        batch_id: request.batch_id,
                        opens: 0,
                        clicks: 0,
                        spam_score: 0.0,
                    },
                )
                .await?;
            }
            ChannelKind::Whatsapp => {
                batches::insert_whatsapp_details(
                    &self.db,
                    &WhatsappDetails {
                        message_id: message.id.clone(),
                        media_url: request.media_url,
                        media_type: request.media_type,
                    },
                )
                .await?;
            }
            ChannelKind::Webchat => {}
        }

        // Scheduled messages stay pending until the sweep promotes them.
        if message.scheduled_at.is_none() {
            self.admit(&message.id).await?;
        }

        debug!(
            message_id = message.id.as_str(),
            channel_id = message.channel_id.as_str(),
            scheduled = message.scheduled_at.is_some(),
            "outbound message created"
        );
        Ok(messages::get_message(&self.db, &message.id)
            .await?
            .unwrap_or(message))
    }

    /// Put a message id on the dispatch queue and stamp its admission.
    async fn admit(&self, message_id: &str) -> Result<(), CrosstalkError> {
        let payload = serde_json::to_string(&DispatchPayload {
            message_id: message_id.to_string(),
        })
        .map_err(|e| CrosstalkError::Internal(e.to_string()))?;
        queue::enqueue(&self.db, DISPATCH_QUEUE, &payload).await?;
        messages::mark_queued(&self.db, message_id).await?;
        Ok(())
    }

    /// Dequeue and dispatch one message. Returns `false` when the queue is
    /// empty.
    pub async fn process_next(&self) -> Result<bool, CrosstalkError> {
        let Some(entry) = queue::dequeue(&self.db, DISPATCH_QUEUE).await? else {
            return Ok(false);
        };

        match serde_json::from_str::<DispatchPayload>(&entry.payload) {
            Ok(payload) => self.attempt_dispatch(&payload.message_id).await,
            Err(e) => warn!(
                entry_id = entry.id,
                error = %e,
                "dropping malformed dispatch payload"
            ),
        }

        // The attempt recorded its outcome on the message; the queue entry
        // is done either way.
        queue::ack(&self.db, entry.id).await?;
        Ok(true)
    }

    /// Hand one message to its transport adapter under the attempt timeout.
    async fn attempt_dispatch(&self, message_id: &str) {
        let message = match messages::get_message(&self.db, message_id).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                warn!(message_id, "queued message no longer exists");
                return;
            }
            Err(e) => {
                warn!(message_id, error = %e, "failed to load queued message");
                return;
            }
        };
        if message.status != MessageStatus::Pending {
            debug!(message_id, status = %message.status, "message already moved, skipping");
            return;
        }

        let adapter = match self.registry.get(&message.channel_id) {
            Ok(adapter) => adapter,
            Err(e) => {
                self.record_failure(message_id, &e.to_string()).await;
                return;
            }
        };

        let (media_url, media_type) = match adapter.channel_kind() {
            ChannelKind::Whatsapp => {
                match batches::get_whatsapp_details(&self.db, message_id).await {
                    Ok(Some(details)) => (details.media_url, details.media_type),
                    _ => (None, None),
                }
            }
            _ => (None, None),
        };

        let outbound = OutboundDispatch {
            message: message.clone(),
            media_url,
            media_type,
        };

        match tokio::time::timeout(self.timeout, adapter.dispatch(&outbound)).await {
            Ok(Ok(receipt)) => {
                if let Err(e) =
                    messages::mark_sent(&self.db, message_id, receipt.provider_ref.as_deref()).await
                {
                    warn!(message_id, error = %e, "failed to record sent status");
                    return;
                }
                info!(
                    message_id,
                    channel_id = message.channel_id.as_str(),
                    provider_ref = receipt.provider_ref.as_deref().unwrap_or("<none>"),
                    "message dispatched"
                );
            }
            Ok(Err(e)) => {
                self.record_failure(message_id, &e.to_string()).await;
            }
            Err(_elapsed) => {
                let reason = format!("dispatch timed out after {:?}", self.timeout);
                self.record_failure(message_id, &reason).await;
            }
        }
    }

    async fn record_failure(&self, message_id: &str, reason: &str) {
        warn!(message_id, reason, "dispatch failed");
        if let Err(e) = messages::mark_failed(&self.db, message_id, reason).await {
            warn!(message_id, error = %e, "failed to record dispatch failure");
        }
    }

    /// Promote due scheduled messages into the queue and release dispatch
    /// queue entries abandoned by a crashed worker. Returns the number of
    /// messages promoted.
    pub async fn sweep(&self) -> Result<usize, CrosstalkError> {
        let released = queue::release_expired(&self.db, DISPATCH_QUEUE).await?;
        if released > 0 {
            info!(released, "released expired dispatch locks");
        }

        let due = messages::list_due_scheduled(&self.db, &now_rfc3339()).await?;
        let promoted = due.len();
        for message in due {
            self.admit(&message.id).await?;
            debug!(message_id = message.id.as_str(), "scheduled message promoted");
        }
        Ok(promoted)
    }

    /// Drain the queue until cancelled, sleeping `poll_interval` when empty.
    pub async fn run(&self, poll_interval: Duration, token: CancellationToken) {
        info!("dispatch worker started");
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("dispatch worker stopping");
                    break;
                }
                processed = self.process_next() => {
                    match processed {
                        Ok(true) => {}
                        Ok(false) => tokio::time::sleep(poll_interval).await,
                        Err(e) => {
                            warn!(error = %e, "dispatch worker error");
                            tokio::time::sleep(poll_interval).await;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstalk_core::types::Channel;
    use crosstalk_test_utils::MockTransport;
    use tempfile::tempdir;

    async fn setup(
        kind: ChannelKind,
    ) -> (Arc<Database>, Arc<MockTransport>, Dispatcher, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Arc::new(
            Database::open(dir.path().join("test.db").to_str().unwrap())
                .await
                .unwrap(),
        );
        channels::insert_channel(
            &db,
            &Channel {
                id: "ch-1".into(),
                name: "test".into(),
                kind,
                configuration: None,
                is_active: true,
            },
        )
        .await
        .unwrap();

        let transport = Arc::new(MockTransport::with_kind(kind));
        let mut registry = ChannelRegistry::new();
        registry.register("ch-1", transport.clone());
        let dispatcher = Dispatcher::new(db.clone(), Arc::new(registry), Duration::from_millis(250));
        (db, transport, dispatcher, dir)
    }

    #[tokio::test]
    async fn immediate_message_is_queued_and_dispatched() {
        let (db, transport, dispatcher, _dir) = setup(ChannelKind::Webchat).await;

        let message = dispatcher
            .create_outbound(OutboundRequest::new("ch-1", "visitor-1", "hello"))
            .await
            .unwrap();
        assert_eq!(message.status, MessageStatus::Pending);
        assert!(message.queued_at.is_some());

        assert!(dispatcher.process_next().await.unwrap());
        assert!(!dispatcher.process_next().await.unwrap(), "queue must be drained");

        let sent = messages::get_message(&db, &message.id).await.unwrap().unwrap();
        assert_eq!(sent.status, MessageStatus::Sent);
        assert!(sent.sent_at.is_some());
        assert!(sent.provider_ref.is_some());
        assert_eq!(transport.dispatched_count().await, 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_recipient_is_validation_error() {
        let (db, _transport, dispatcher, _dir) = setup(ChannelKind::Webchat).await;
        let err = dispatcher
            .create_outbound(OutboundRequest::new("ch-1", "  ", "hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrosstalkError::Validation(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn transport_error_marks_failed_terminal() {
        let (db, transport, dispatcher, _dir) = setup(ChannelKind::Webchat).await;
        transport.fail_next("recipient rejected").await;

        let message = dispatcher
            .create_outbound(OutboundRequest::new("ch-1", "visitor-1", "hello"))
            .await
            .unwrap();
        dispatcher.process_next().await.unwrap();

        let failed = messages::get_message(&db, &message.id).await.unwrap().unwrap();
        assert_eq!(failed.status, MessageStatus::Failed);
        let meta: serde_json::Value =
            serde_json::from_str(failed.metadata.as_deref().unwrap()).unwrap();
        assert!(meta["error"].as_str().unwrap().contains("recipient rejected"));

        // Failure is terminal: nothing left on the queue to retry.
        assert!(!dispatcher.process_next().await.unwrap());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn slow_transport_times_out_to_failed() {
        let (db, transport, dispatcher, _dir) = setup(ChannelKind::Webchat).await;
        transport.delay_next(Duration::from_secs(5)).await;

        let message = dispatcher
            .create_outbound(OutboundRequest::new("ch-1", "visitor-1", "hello"))
            .await
            .unwrap();
        dispatcher.process_next().await.unwrap();

        let failed = messages::get_message(&db, &message.id).await.unwrap().unwrap();
        assert_eq!(failed.status, MessageStatus::Failed);
        let meta: serde_json::Value =
            serde_json::from_str(failed.metadata.as_deref().unwrap()).unwrap();
        assert!(meta["error"].as_str().unwrap().contains("timed out"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn scheduled_message_waits_for_sweep() {
        let (db, _transport, dispatcher, _dir) = setup(ChannelKind::Webchat).await;

        let mut request = OutboundRequest::new("ch-1", "visitor-1", "later");
        request.scheduled_at = Some("2026-01-01T00:00:00.000Z".into());
        let message = dispatcher.create_outbound(request).await.unwrap();
        assert!(message.queued_at.is_none());

        // Nothing queued yet.
        assert!(!dispatcher.process_next().await.unwrap());

        // The sweep promotes it (schedule time is in the past).
        let promoted = dispatcher.sweep().await.unwrap();
        assert_eq!(promoted, 1);
        assert!(dispatcher.process_next().await.unwrap());

        let sent = messages::get_message(&db, &message.id).await.unwrap().unwrap();
        assert_eq!(sent.status, MessageStatus::Sent);

        // A second sweep must not promote it again.
        assert_eq!(dispatcher.sweep().await.unwrap(), 0);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn whatsapp_outbound_carries_media_details() {
        let (db, transport, dispatcher, _dir) = setup(ChannelKind::Whatsapp).await;

        let mut request = OutboundRequest::new("ch-1", "+15550001111", "see attached");
        request.media_url = Some("https://cdn.example/cat.jpg".into());
        request.media_type = Some("jpg".into());
        let message = dispatcher.create_outbound(request).await.unwrap();

        let details = batches::get_whatsapp_details(&db, &message.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(details.media_url.as_deref(), Some("https://cdn.example/cat.jpg"));

        dispatcher.process_next().await.unwrap();
        let dispatched = transport.dispatched().await;
        assert_eq!(dispatched.len(), 1);
        assert_eq!(
            dispatched[0].media_url.as_deref(),
            Some("https://cdn.example/cat.jpg")
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn email_outbound_gets_details_row() {
        let (db, _transport, dispatcher, _dir) = setup(ChannelKind::Email).await;
        let message = dispatcher
            .create_outbound(OutboundRequest::new("ch-1", "a@example.com", "hi"))
            .await
            .unwrap();
        let details = batches::get_email_details(&db, &message.id).await.unwrap();
        assert!(details.is_some());
        db.close().await.unwrap();
    }
}
