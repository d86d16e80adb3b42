// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Crosstalk messaging engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Crosstalk configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrosstalkConfig {
    /// Engine identity and response texts.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Handoff policy settings.
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Intent classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Outbound dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Delivery-status reconciliation settings.
    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Daily metrics rollup settings.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Email (SMTP) transport settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// WhatsApp gateway transport settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Web chat transport settings.
    #[serde(default)]
    pub webchat: WebchatConfig,
}

/// Engine identity and fixed response texts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Display name of the engine instance.
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Response text used when a turn is handed off to a human agent.
    #[serde(default = "default_handoff_notice")]
    pub handoff_notice: String,

    /// Response text used when no intent matched at all.
    #[serde(default = "default_fallback_response")]
    pub fallback_response: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            log_level: default_log_level(),
            handoff_notice: default_handoff_notice(),
            fallback_response: default_fallback_response(),
        }
    }
}

fn default_engine_name() -> String {
    "crosstalk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_handoff_notice() -> String {
    "I'll connect you with a human agent who can better assist you.".to_string()
}

fn default_fallback_response() -> String {
    "I'm not sure I understand. Could you rephrase that?".to_string()
}

/// Handoff policy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PolicyConfig {
    /// Global confidence floor below which every turn is handed off,
    /// regardless of per-rule thresholds. Range 0.0-1.0.
    #[serde(default = "default_handoff_floor")]
    pub handoff_floor: f32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            handoff_floor: default_handoff_floor(),
        }
    }
}

fn default_handoff_floor() -> f32 {
    0.4
}

/// Intent classifier configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Minimum cosine similarity for a phrase match to count (0.0-1.0).
    /// Below this floor the classifier reports a no-match.
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f32,

    /// Seconds between periodic model retrains from stored intents.
    #[serde(default = "default_retrain_interval_secs")]
    pub retrain_interval_secs: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_similarity: default_min_similarity(),
            retrain_interval_secs: default_retrain_interval_secs(),
        }
    }
}

fn default_min_similarity() -> f32 {
    0.3
}

fn default_retrain_interval_secs() -> u64 {
    3600
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("crosstalk").join("crosstalk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("crosstalk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Outbound dispatch configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Upper bound on a single dispatch attempt in seconds. A timed-out
    /// attempt marks the message failed rather than leaving it pending.
    #[serde(default = "default_dispatch_timeout_secs")]
    pub timeout_secs: u64,

    /// Seconds between sweeps that promote due scheduled messages into the
    /// dispatch queue and release expired processing locks.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_dispatch_timeout_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

/// Delivery-status reconciliation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    /// Seconds between provider status polls.
    #[serde(default = "default_reconcile_interval_secs")]
    pub reconcile_interval_secs: u64,

    /// Maximum number of sent messages polled per reconciliation pass.
    #[serde(default = "default_reconcile_batch_size")]
    pub reconcile_batch_size: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: default_reconcile_interval_secs(),
            reconcile_batch_size: default_reconcile_batch_size(),
        }
    }
}

fn default_reconcile_interval_secs() -> u64 {
    120
}

fn default_reconcile_batch_size() -> usize {
    100
}

/// Daily metrics rollup configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Seconds between rollup passes.
    #[serde(default = "default_rollup_interval_secs")]
    pub rollup_interval_secs: u64,

    /// Hours without a user message after a from-system message before a
    /// conversation counts as completed.
    #[serde(default = "default_completion_idle_hours")]
    pub completion_idle_hours: u64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            rollup_interval_secs: default_rollup_interval_secs(),
            completion_idle_hours: default_completion_idle_hours(),
        }
    }
}

fn default_rollup_interval_secs() -> u64 {
    86_400
}

fn default_completion_idle_hours() -> u64 {
    4
}

/// Email (SMTP) transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// SMTP relay hostname. `None` disables the email transport.
    #[serde(default)]
    pub smtp_host: Option<String>,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    /// SMTP username, if the relay requires authentication.
    #[serde(default)]
    pub username: Option<String>,

    /// SMTP password, if the relay requires authentication.
    #[serde(default)]
    pub password: Option<String>,

    /// From address for outbound mail.
    #[serde(default = "default_from_address")]
    pub from_address: String,

    /// Spam score above which a message is refused rather than sent (0.0-1.0).
    #[serde(default = "default_spam_threshold")]
    pub spam_threshold: f32,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: default_smtp_port(),
            username: None,
            password: None,
            from_address: default_from_address(),
            spam_threshold: default_spam_threshold(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_address() -> String {
    "noreply@localhost".to_string()
}

fn default_spam_threshold() -> f32 {
    0.7
}

/// WhatsApp gateway transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Gateway account SID. `None` disables the WhatsApp transport.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Gateway auth token.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender phone number in E.164 form.
    #[serde(default)]
    pub from_number: Option<String>,

    /// Gateway API base URL.
    #[serde(default = "default_whatsapp_base_url")]
    pub base_url: String,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            base_url: default_whatsapp_base_url(),
        }
    }
}

fn default_whatsapp_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

/// Web chat transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebchatConfig {
    /// Enable the in-process web chat transport.
    #[serde(default = "default_webchat_enabled")]
    pub enabled: bool,

    /// Maximum buffered outbound messages per chat session.
    #[serde(default = "default_webchat_buffer")]
    pub buffer_size: usize,
}

impl Default for WebchatConfig {
    fn default() -> Self {
        Self {
            enabled: default_webchat_enabled(),
            buffer_size: default_webchat_buffer(),
        }
    }
}

fn default_webchat_enabled() -> bool {
    true
}

fn default_webchat_buffer() -> usize {
    64
}
