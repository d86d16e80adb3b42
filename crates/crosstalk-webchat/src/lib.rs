// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process web chat transport adapter.
//!
//! Web chat has no external provider: outbound messages land in a per-session
//! buffer that the serving shim (HTTP/WebSocket layer, out of scope here)
//! drains towards the browser. A message counts as delivered once its
//! session drained it, which is what `fetch_status` reports.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crosstalk_config::model::WebchatConfig;
use crosstalk_core::traits::adapter::PluginAdapter;
use crosstalk_core::traits::transport::TransportAdapter;
use crosstalk_core::types::{
    AdapterType, ChannelKind, DeliveryState, DispatchReceipt, HealthStatus, OutboundDispatch,
};
use crosstalk_core::CrosstalkError;

/// One buffered outbound chat message awaiting its session.
#[derive(Debug, Clone)]
pub struct WebchatDelivery {
    /// Provider reference issued at dispatch, used for status polling.
    pub delivery_ref: String,
    pub content: String,
}

/// Transport adapter buffering outbound messages per chat session.
pub struct WebchatTransport {
    buffer_size: usize,
    /// Outbound buffers keyed by session id (the message recipient).
    buffers: Mutex<HashMap<String, VecDeque<WebchatDelivery>>>,
    /// References whose messages have been drained to the client.
    delivered: Mutex<HashSet<String>>,
}

impl WebchatTransport {
    /// Build the adapter from configuration.
    pub fn new(config: &WebchatConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
            buffers: Mutex::new(HashMap::new()),
            delivered: Mutex::new(HashSet::new()),
        }
    }

    /// Drain every buffered message for a session, marking them delivered.
    ///
    /// Called by the serving shim when the client polls or its socket is
    /// writable.
    pub async fn take_outbound(&self, session_id: &str) -> Vec<WebchatDelivery> {
        let drained: Vec<WebchatDelivery> = {
            let mut buffers = self.buffers.lock().await;
            buffers
                .get_mut(session_id)
                .map(|buffer| buffer.drain(..).collect())
                .unwrap_or_default()
        };

        if !drained.is_empty() {
            let mut delivered = self.delivered.lock().await;
            for delivery in &drained {
                delivered.insert(delivery.delivery_ref.clone());
            }
            debug!(session_id, count = drained.len(), "webchat buffer drained");
        }
        drained
    }

    /// Buffered message count for a session.
    pub async fn pending_count(&self, session_id: &str) -> usize {
        self.buffers
            .lock()
            .await
            .get(session_id)
            .map(|buffer| buffer.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl PluginAdapter for WebchatTransport {
    fn name(&self) -> &str {
        "webchat"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, CrosstalkError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), CrosstalkError> {
        self.buffers.lock().await.clear();
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for WebchatTransport {
    fn channel_kind(&self) -> ChannelKind {
        ChannelKind::Webchat
    }

    async fn dispatch(
        &self,
        outbound: &OutboundDispatch,
    ) -> Result<DispatchReceipt, CrosstalkError> {
        let message = &outbound.message;
        let delivery = WebchatDelivery {
            delivery_ref: format!("wc-{}", uuid::Uuid::new_v4()),
            content: message.content.clone(),
        };
        let delivery_ref = delivery.delivery_ref.clone();

        let mut buffers = self.buffers.lock().await;
        let buffer = buffers.entry(message.recipient.clone()).or_default();
        if buffer.len() >= self.buffer_size {
            // An absent client keeps its backlog bounded; the oldest
            // undelivered message gives way.
            let dropped = buffer.pop_front();
            warn!(
                session_id = message.recipient.as_str(),
                dropped = dropped.map(|d| d.delivery_ref).as_deref().unwrap_or("<none>"),
                "webchat buffer full, dropping oldest"
            );
        }
        buffer.push_back(delivery);

        Ok(DispatchReceipt {
            provider_ref: Some(delivery_ref),
        })
    }

    async fn fetch_status(&self, provider_ref: &str) -> Result<DeliveryState, CrosstalkError> {
        if self.delivered.lock().await.contains(provider_ref) {
            Ok(DeliveryState::Delivered)
        } else {
            Ok(DeliveryState::Sent)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstalk_core::types::{Message, MessageStatus};

    fn transport() -> WebchatTransport {
        WebchatTransport::new(&WebchatConfig {
            enabled: true,
            buffer_size: 2,
        })
    }

    fn make_outbound(session: &str, content: &str) -> OutboundDispatch {
        OutboundDispatch {
            message: Message {
                id: uuid::Uuid::new_v4().to_string(),
                channel_id: "ch-web".to_string(),
                template_id: None,
                sender: None,
                recipient: session.to_string(),
                subject: None,
                content: content.to_string(),
                metadata: None,
                status: MessageStatus::Pending,
                scheduled_at: None,
                queued_at: None,
                sent_at: None,
                delivered_at: None,
                read_at: None,
                provider_ref: None,
                created_at: "2026-01-01T00:00:00.000Z".to_string(),
            },
            media_url: None,
            media_type: None,
        }
    }

    #[tokio::test]
    async fn dispatch_buffers_per_session_in_order() {
        let transport = transport();
        transport.dispatch(&make_outbound("sess-1", "first")).await.unwrap();
        transport.dispatch(&make_outbound("sess-1", "second")).await.unwrap();
        transport.dispatch(&make_outbound("sess-2", "other")).await.unwrap();

        assert_eq!(transport.pending_count("sess-1").await, 2);
        assert_eq!(transport.pending_count("sess-2").await, 1);

        let drained = transport.take_outbound("sess-1").await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].content, "first");
        assert_eq!(drained[1].content, "second");
        assert_eq!(transport.pending_count("sess-1").await, 0);
    }

    #[tokio::test]
    async fn drained_messages_report_delivered() {
        let transport = transport();
        let receipt = transport.dispatch(&make_outbound("sess-1", "hi")).await.unwrap();
        let delivery_ref = receipt.provider_ref.unwrap();

        assert_eq!(
            transport.fetch_status(&delivery_ref).await.unwrap(),
            DeliveryState::Sent
        );

        transport.take_outbound("sess-1").await;
        assert_eq!(
            transport.fetch_status(&delivery_ref).await.unwrap(),
            DeliveryState::Delivered
        );
    }

    #[tokio::test]
    async fn full_buffer_drops_oldest() {
        let transport = transport();
        transport.dispatch(&make_outbound("sess-1", "one")).await.unwrap();
        transport.dispatch(&make_outbound("sess-1", "two")).await.unwrap();
        transport.dispatch(&make_outbound("sess-1", "three")).await.unwrap();

        let drained = transport.take_outbound("sess-1").await;
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].content, "two");
        assert_eq!(drained[1].content, "three");
    }

    #[tokio::test]
    async fn empty_session_drains_nothing() {
        let transport = transport();
        assert!(transport.take_outbound("nobody").await.is_empty());
    }
}
