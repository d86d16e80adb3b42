// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-status reconciliation.
//!
//! A periodic pass polls the provider for every message still `sent` (bounded
//! batch) and applies a monotonic upgrade: sent -> delivered -> read, or
//! sent/delivered -> failed. Unknown or unchanged provider state leaves the
//! row untouched, as does a failed poll; the next pass will see it again.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crosstalk_core::types::DeliveryState;
use crosstalk_core::CrosstalkError;
use crosstalk_storage::Database;
use crosstalk_storage::queries::messages;

use crate::registry::ChannelRegistry;

/// Counters from one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub polled: usize,
    pub delivered: usize,
    pub read: usize,
    pub failed: usize,
}

/// Reconciles provider-reported delivery state into message status.
pub struct DeliveryTracker {
    db: Arc<Database>,
    registry: Arc<ChannelRegistry>,
    batch_size: usize,
}

impl DeliveryTracker {
    /// Create a tracker polling at most `batch_size` messages per pass.
    pub fn new(db: Arc<Database>, registry: Arc<ChannelRegistry>, batch_size: usize) -> Self {
        Self { db, registry, batch_size }
    }

    /// Run one reconciliation pass.
    pub async fn reconcile(&self) -> Result<ReconcileSummary, CrosstalkError> {
        let batch = messages::list_sent_for_reconcile(&self.db, self.batch_size).await?;
        let mut summary = ReconcileSummary::default();

        for message in batch {
            let Some(provider_ref) = message.provider_ref.as_deref() else {
                continue;
            };
            let adapter = match self.registry.get(&message.channel_id) {
                Ok(adapter) => adapter,
                Err(e) => {
                    warn!(
                        message_id = message.id.as_str(),
                        channel_id = message.channel_id.as_str(),
                        error = %e,
                        "no adapter for sent message, skipping"
                    );
                    continue;
                }
            };

            let state = match adapter.fetch_status(provider_ref).await {
                Ok(state) => state,
                Err(e) => {
                    // A failed poll is not a delivery failure; try again
                    // next pass.
                    warn!(
                        message_id = message.id.as_str(),
                        error = %e,
                        "status poll failed"
                    );
                    continue;
                }
            };
            summary.polled += 1;

            match state {
                DeliveryState::Delivered => {
                    if messages::mark_delivered(&self.db, &message.id).await? {
                        summary.delivered += 1;
                    }
                }
                DeliveryState::Read => {
                    if messages::mark_read(&self.db, &message.id).await? {
                        summary.read += 1;
                    }
                }
                DeliveryState::Failed => {
                    if messages::mark_failed(&self.db, &message.id, "provider reported failure")
                        .await?
                    {
                        summary.failed += 1;
                    }
                }
                DeliveryState::Queued | DeliveryState::Sent | DeliveryState::Unknown => {
                    debug!(
                        message_id = message.id.as_str(),
                        state = %state,
                        "no status change"
                    );
                }
            }
        }

        if summary.delivered + summary.read + summary.failed > 0 {
            info!(
                polled = summary.polled,
                delivered = summary.delivered,
                read = summary.read,
                failed = summary.failed,
                "delivery reconciliation pass complete"
            );
        }
        Ok(summary)
    }
}
