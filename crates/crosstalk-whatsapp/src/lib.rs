// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp gateway transport adapter.
//!
//! Speaks a Twilio-style messages API: dispatch POSTs the message (with
//! optional media) and keeps the returned SID as the provider reference;
//! `fetch_status` GETs the message resource and maps the gateway's status
//! string onto [`DeliveryState`].

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crosstalk_config::model::WhatsappConfig;
use crosstalk_core::traits::adapter::PluginAdapter;
use crosstalk_core::traits::transport::TransportAdapter;
use crosstalk_core::types::{
    AdapterType, ChannelKind, DeliveryState, DispatchReceipt, HealthStatus, OutboundDispatch,
};
use crosstalk_core::CrosstalkError;

/// The gateway's view of a message resource.
#[derive(Debug, Deserialize)]
struct GatewayMessage {
    sid: String,
    status: String,
}

/// Map a gateway status string onto the delivery state machine.
///
/// `sending`/`accepted`/`queued` are pre-delivery states we already account
/// for as `sent`; anything unrecognized is `Unknown` and leaves the message
/// untouched.
fn map_gateway_status(status: &str) -> DeliveryState {
    match status {
        "queued" | "accepted" | "scheduled" => DeliveryState::Queued,
        "sending" | "sent" => DeliveryState::Sent,
        "delivered" => DeliveryState::Delivered,
        "read" => DeliveryState::Read,
        "failed" | "undelivered" | "canceled" => DeliveryState::Failed,
        _ => DeliveryState::Unknown,
    }
}

/// Transport adapter for a WhatsApp gateway account.
pub struct WhatsappTransport {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    base_url: String,
}

impl WhatsappTransport {
    /// Build the adapter from configuration. Requires the full credential
    /// set (SID, token, sender number).
    pub fn new(config: &WhatsappConfig) -> Result<Self, CrosstalkError> {
        let account_sid = config
            .account_sid
            .clone()
            .ok_or_else(|| CrosstalkError::Config("whatsapp.account_sid is not set".to_string()))?;
        let auth_token = config
            .auth_token
            .clone()
            .ok_or_else(|| CrosstalkError::Config("whatsapp.auth_token is not set".to_string()))?;
        let from_number = config
            .from_number
            .clone()
            .ok_or_else(|| CrosstalkError::Config("whatsapp.from_number is not set".to_string()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            account_sid,
            auth_token,
            from_number,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/Accounts/{}/Messages.json", self.base_url, self.account_sid)
    }

    fn message_url(&self, sid: &str) -> String {
        format!(
            "{}/Accounts/{}/Messages/{}.json",
            self.base_url, self.account_sid, sid
        )
    }
}

#[async_trait]
impl PluginAdapter for WhatsappTransport {
    fn name(&self) -> &str {
        "whatsapp-gateway"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, CrosstalkError> {
        // The account root answers authenticated GETs; a failure here means
        // credentials or connectivity are broken.
        let url = format!("{}/Accounts/{}.json", self.base_url, self.account_sid);
        match self
            .http
            .get(&url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(response) => Ok(HealthStatus::Unhealthy(format!(
                "gateway answered {}",
                response.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), CrosstalkError> {
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for WhatsappTransport {
    fn channel_kind(&self) -> ChannelKind {
        ChannelKind::Whatsapp
    }

    async fn dispatch(
        &self,
        outbound: &OutboundDispatch,
    ) -> Result<DispatchReceipt, CrosstalkError> {
        let message = &outbound.message;

        let mut form = vec![
            ("From".to_string(), format!("whatsapp:{}", self.from_number)),
            ("To".to_string(), format!("whatsapp:{}", message.recipient)),
            ("Body".to_string(), message.content.clone()),
        ];
        if let Some(media_url) = &outbound.media_url {
            form.push(("MediaUrl".to_string(), media_url.clone()));
        }

        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| CrosstalkError::Transport {
                message: format!("gateway request failed for {}", message.recipient),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CrosstalkError::Transport {
                message: format!("gateway rejected message: {status} {body}"),
                source: None,
            });
        }

        let created: GatewayMessage =
            response.json().await.map_err(|e| CrosstalkError::Transport {
                message: "unreadable gateway response".to_string(),
                source: Some(Box::new(e)),
            })?;

        debug!(
            message_id = message.id.as_str(),
            sid = created.sid.as_str(),
            gateway_status = created.status.as_str(),
            "whatsapp message accepted"
        );

        Ok(DispatchReceipt {
            provider_ref: Some(created.sid),
        })
    }

    async fn fetch_status(&self, provider_ref: &str) -> Result<DeliveryState, CrosstalkError> {
        let response = self
            .http
            .get(self.message_url(provider_ref))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| CrosstalkError::Transport {
                message: format!("status poll failed for {provider_ref}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Ok(DeliveryState::Unknown);
        }

        let fetched: GatewayMessage =
            response.json().await.map_err(|e| CrosstalkError::Transport {
                message: "unreadable gateway status".to_string(),
                source: Some(Box::new(e)),
            })?;

        Ok(map_gateway_status(&fetched.status))
    }
}
