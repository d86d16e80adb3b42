// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transport adapter trait for outbound channel integrations (email, WhatsApp, web chat).

use async_trait::async_trait;

use crate::error::CrosstalkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelKind, DeliveryState, DispatchReceipt, OutboundDispatch};

/// Adapter for channel-specific outbound transport.
///
/// Transport adapters hand messages to an external provider and answer status
/// polls for messages already handed off. They never touch the message store;
/// the dispatcher owns all status bookkeeping.
#[async_trait]
pub trait TransportAdapter: PluginAdapter {
    /// The channel surface this adapter speaks.
    fn channel_kind(&self) -> ChannelKind;

    /// Hands one outbound message to the provider.
    ///
    /// Returns a receipt carrying the provider reference used for later
    /// status polling. Rejections, auth failures, and network failures
    /// surface as [`CrosstalkError::Transport`]; retry policy, if any,
    /// lives inside the adapter.
    async fn dispatch(&self, outbound: &OutboundDispatch) -> Result<DispatchReceipt, CrosstalkError>;

    /// Polls the provider for the delivery state of a dispatched message.
    ///
    /// Adapters with no status API return [`DeliveryState::Unknown`], which
    /// the delivery tracker treats as "nothing new".
    async fn fetch_status(&self, provider_ref: &str) -> Result<DeliveryState, CrosstalkError>;
}
