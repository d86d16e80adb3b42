// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./crosstalk.toml` > `~/.config/crosstalk/crosstalk.toml`
//! > `/etc/crosstalk/crosstalk.toml` with environment variable overrides via
//! `CROSSTALK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::CrosstalkConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/crosstalk/crosstalk.toml` (system-wide)
/// 3. `~/.config/crosstalk/crosstalk.toml` (user XDG config)
/// 4. `./crosstalk.toml` (local directory)
/// 5. `CROSSTALK_*` environment variables
pub fn load_config() -> Result<CrosstalkConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CrosstalkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosstalkConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CrosstalkConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrosstalkConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(CrosstalkConfig::default()))
        .merge(Toml::file("/etc/crosstalk/crosstalk.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("crosstalk/crosstalk.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("crosstalk.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. For example, `CROSSTALK_POLICY_HANDOFF_FLOOR`
/// must map to `policy.handoff_floor`, not `policy.handoff.floor`.
fn env_provider() -> Env {
    Env::prefixed("CROSSTALK_").map(|key| {
        // `key` is the lowercased env var name with prefix stripped.
        // Example: CROSSTALK_STORAGE_DATABASE_PATH -> "storage_database_path"
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("policy_", "policy.", 1)
            .replacen("classifier_", "classifier.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("dispatch_", "dispatch.", 1)
            .replacen("delivery_", "delivery.", 1)
            .replacen("metrics_", "metrics.", 1)
            .replacen("email_", "email.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("webchat_", "webchat.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_extract_cleanly() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.engine.name, "crosstalk");
        assert_eq!(config.policy.handoff_floor, 0.4);
        assert_eq!(config.classifier.min_similarity, 0.3);
        assert!(config.storage.wal_mode);
    }

    #[test]
    fn toml_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[engine]
name = "support-bot"

[policy]
handoff_floor = 0.55

[delivery]
reconcile_batch_size = 25
"#,
        )
        .unwrap();
        assert_eq!(config.engine.name, "support-bot");
        assert_eq!(config.policy.handoff_floor, 0.55);
        assert_eq!(config.delivery.reconcile_batch_size, 25);
        // Untouched sections keep defaults.
        assert_eq!(config.dispatch.timeout_secs, 30);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = load_config_from_str(
            r#"
[policy]
handoff_flor = 0.5
"#,
        );
        assert!(result.is_err());
    }
}
