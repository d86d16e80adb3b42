// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport adapter for deterministic testing.
//!
//! `MockTransport` implements `TransportAdapter` with captured dispatches,
//! scriptable per-reference delivery states, and injectable failures and
//! delays for exercising the dispatcher's error and timeout paths.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crosstalk_core::traits::adapter::PluginAdapter;
use crosstalk_core::traits::transport::TransportAdapter;
use crosstalk_core::types::{
    AdapterType, ChannelKind, DeliveryState, DispatchReceipt, HealthStatus, OutboundDispatch,
};
use crosstalk_core::CrosstalkError;

/// A mock transport channel for testing.
///
/// Captures everything passed to `dispatch()` and answers `fetch_status()`
/// from a scripted map (defaulting to [`DeliveryState::Unknown`]).
pub struct MockTransport {
    kind: ChannelKind,
    dispatched: Arc<Mutex<Vec<OutboundDispatch>>>,
    statuses: Arc<Mutex<HashMap<String, DeliveryState>>>,
    fail_next: Arc<Mutex<Option<String>>>,
    delay_next: Arc<Mutex<Option<Duration>>>,
}

impl MockTransport {
    /// Create a web-chat-flavored mock with empty capture state.
    pub fn new() -> Self {
        Self::with_kind(ChannelKind::Webchat)
    }

    /// Create a mock reporting the given channel kind.
    pub fn with_kind(kind: ChannelKind) -> Self {
        Self {
            kind,
            dispatched: Arc::new(Mutex::new(Vec::new())),
            statuses: Arc::new(Mutex::new(HashMap::new())),
            fail_next: Arc::new(Mutex::new(None)),
            delay_next: Arc::new(Mutex::new(None)),
        }
    }

    /// Everything dispatched through this adapter, in order.
    pub async fn dispatched(&self) -> Vec<OutboundDispatch> {
        self.dispatched.lock().await.clone()
    }

    /// Count of dispatched messages.
    pub async fn dispatched_count(&self) -> usize {
        self.dispatched.lock().await.len()
    }

    /// Script the delivery state returned for a provider reference.
    pub async fn set_status(&self, provider_ref: &str, state: DeliveryState) {
        self.statuses
            .lock()
            .await
            .insert(provider_ref.to_string(), state);
    }

    /// Make the next `dispatch()` call fail with a transport error.
    pub async fn fail_next(&self, reason: &str) {
        *self.fail_next.lock().await = Some(reason.to_string());
    }

    /// Make the next `dispatch()` call sleep before answering, for timeout
    /// tests.
    pub async fn delay_next(&self, delay: Duration) {
        *self.delay_next.lock().await = Some(delay);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
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
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for MockTransport {
    fn channel_kind(&self) -> ChannelKind {
        self.kind
    }

    async fn dispatch(
        &self,
        outbound: &OutboundDispatch,
    ) -> Result<DispatchReceipt, CrosstalkError> {
        if let Some(delay) = self.delay_next.lock().await.take() {
            tokio::time::sleep(delay).await;
        }
        if let Some(reason) = self.fail_next.lock().await.take() {
            return Err(CrosstalkError::Transport {
                message: reason,
                source: None,
            });
        }

        self.dispatched.lock().await.push(outbound.clone());
        Ok(DispatchReceipt {
            provider_ref: Some(format!("mock-{}", uuid::Uuid::new_v4())),
        })
    }

    async fn fetch_status(&self, provider_ref: &str) -> Result<DeliveryState, CrosstalkError> {
        Ok(self
            .statuses
            .lock()
            .await
            .get(provider_ref)
            .copied()
            .unwrap_or(DeliveryState::Unknown))
    }
}
