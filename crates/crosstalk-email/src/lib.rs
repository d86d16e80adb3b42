// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SMTP transport adapter for the Crosstalk messaging engine.
//!
//! Hands outbound mail to an SMTP relay via `lettre`, gated by a keyword
//! spam score: content over the configured threshold is refused (surfacing
//! as a transport failure) rather than sent. SMTP offers no status polling,
//! so `fetch_status` always answers `Unknown` and delivery upgrades for
//! email come from open tracking, not reconciliation.

pub mod spam;

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::debug;

use crosstalk_config::model::EmailConfig;
use crosstalk_core::traits::adapter::PluginAdapter;
use crosstalk_core::traits::transport::TransportAdapter;
use crosstalk_core::types::{
    AdapterType, ChannelKind, DeliveryState, DispatchReceipt, HealthStatus, OutboundDispatch,
};
use crosstalk_core::CrosstalkError;

pub use spam::spam_score;

/// Transport adapter dispatching mail through an SMTP relay.
pub struct EmailTransport {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    spam_threshold: f32,
}

impl EmailTransport {
    /// Build the adapter from configuration.
    ///
    /// Requires `smtp_host`; credentials are optional for open relays.
    pub fn new(config: &EmailConfig) -> Result<Self, CrosstalkError> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| CrosstalkError::Config("email.smtp_host is not set".to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| CrosstalkError::Transport {
                message: format!("invalid SMTP relay {host}"),
                source: Some(Box::new(e)),
            })?
            .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            mailer: builder.build(),
            from_address: config.from_address.clone(),
            spam_threshold: config.spam_threshold,
        })
    }
}

#[async_trait]
impl PluginAdapter for EmailTransport {
    fn name(&self) -> &str {
        "smtp-email"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, CrosstalkError> {
        match self.mailer.test_connection().await {
            Ok(true) => Ok(HealthStatus::Healthy),
            Ok(false) => Ok(HealthStatus::Unhealthy("SMTP relay refused NOOP".to_string())),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), CrosstalkError> {
        Ok(())
    }
}

#[async_trait]
impl TransportAdapter for EmailTransport {
    fn channel_kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    async fn dispatch(
        &self,
        outbound: &OutboundDispatch,
    ) -> Result<DispatchReceipt, CrosstalkError> {
        let message = &outbound.message;

        let score = spam_score(&message.content);
        if score > self.spam_threshold {
            return Err(CrosstalkError::Transport {
                message: format!(
                    "refusing to send: spam score {score:.2} over threshold {:.2}",
                    self.spam_threshold
                ),
                source: None,
            });
        }

        let from = self
            .from_address
            .parse()
            .map_err(|e| CrosstalkError::Validation(format!("invalid from address: {e}")))?;
        let to = message
            .recipient
            .parse()
            .map_err(|e| CrosstalkError::Validation(format!("invalid recipient: {e}")))?;

        let email = lettre::Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone().unwrap_or_default())
            .body(message.content.clone())
            .map_err(|e| CrosstalkError::Transport {
                message: "could not build email".to_string(),
                source: Some(Box::new(e)),
            })?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| CrosstalkError::Transport {
                message: format!("SMTP send failed for {}", message.recipient),
                source: Some(Box::new(e)),
            })?;

        debug!(
            message_id = message.id.as_str(),
            recipient = message.recipient.as_str(),
            "email handed to relay"
        );

        // SMTP relays issue no pollable reference.
        Ok(DispatchReceipt { provider_ref: None })
    }

    async fn fetch_status(&self, _provider_ref: &str) -> Result<DeliveryState, CrosstalkError> {
        Ok(DeliveryState::Unknown)
    }
}
