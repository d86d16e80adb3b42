// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel registry mapping channel ids to transport adapters.
//!
//! Built once at startup, read-only afterwards. The dispatcher and delivery
//! tracker resolve adapters through it; an unknown channel id surfaces as
//! `AdapterNotFound` and never panics a worker.

use std::collections::HashMap;
use std::sync::Arc;

use crosstalk_core::types::HealthStatus;
use crosstalk_core::{CrosstalkError, TransportAdapter};
use tracing::info;

/// Maps channel ids to their transport adapters.
#[derive(Default)]
pub struct ChannelRegistry {
    adapters: HashMap<String, Arc<dyn TransportAdapter>>,
}

impl ChannelRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the transport adapter serving a channel id.
    ///
    /// Registering the same channel id twice replaces the earlier adapter.
    pub fn register(&mut self, channel_id: impl Into<String>, adapter: Arc<dyn TransportAdapter>) {
        let channel_id = channel_id.into();
        info!(
            channel_id = channel_id.as_str(),
            adapter = adapter.name(),
            kind = %adapter.channel_kind(),
            "transport adapter registered"
        );
        self.adapters.insert(channel_id, adapter);
    }

    /// Resolve the adapter for a channel id.
    pub fn get(&self, channel_id: &str) -> Result<Arc<dyn TransportAdapter>, CrosstalkError> {
        self.adapters
            .get(channel_id)
            .cloned()
            .ok_or_else(|| CrosstalkError::AdapterNotFound {
                adapter_type: "Transport".to_string(),
                name: channel_id.to_string(),
            })
    }

    /// Number of registered channels.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether the registry has no channels.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Shut down every registered adapter, logging failures.
    pub async fn shutdown_all(&self) {
        for (channel_id, adapter) in &self.adapters {
            if let Err(e) = adapter.shutdown().await {
                tracing::warn!(
                    channel_id = channel_id.as_str(),
                    error = %e,
                    "adapter shutdown error"
                );
            }
        }
    }

    /// Health-check every registered adapter, returning per-channel status.
    pub async fn health_check_all(&self) -> Vec<(String, HealthStatus)> {
        let mut results = Vec::with_capacity(self.adapters.len());
        for (channel_id, adapter) in &self.adapters {
            let status = match adapter.health_check().await {
                Ok(status) => status,
                Err(e) => HealthStatus::Unhealthy(e.to_string()),
            };
            results.push((channel_id.clone(), status));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crosstalk_test_utils::MockTransport;

    #[test]
    fn get_unknown_channel_is_adapter_not_found() {
        let registry = ChannelRegistry::new();
        let err = registry.get("ch-missing").unwrap_err();
        assert!(matches!(err, CrosstalkError::AdapterNotFound { .. }));
    }

    #[test]
    fn register_and_resolve() {
        let mut registry = ChannelRegistry::new();
        registry.register("ch-1", Arc::new(MockTransport::new()));
        assert_eq!(registry.len(), 1);
        let adapter = registry.get("ch-1").unwrap();
        assert_eq!(adapter.name(), "mock-transport");
    }

    #[tokio::test]
    async fn health_check_reports_every_channel() {
        let mut registry = ChannelRegistry::new();
        registry.register("ch-1", Arc::new(MockTransport::new()));
        registry.register("ch-2", Arc::new(MockTransport::new()));

        let statuses = registry.health_check_all().await;
        assert_eq!(statuses.len(), 2);
        assert!(statuses.iter().all(|(_, s)| *s == HealthStatus::Healthy));
    }
}
