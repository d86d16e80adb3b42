// SPDX-FileCopyrightText: 2026 Crosstalk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as score ranges and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::CrosstalkConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &CrosstalkConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !(0.0..=1.0).contains(&config.policy.handoff_floor) {
        errors.push(ConfigError::Validation {
            message: format!(
                "policy.handoff_floor must be within 0.0-1.0, got {}",
                config.policy.handoff_floor
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.classifier.min_similarity) {
        errors.push(ConfigError::Validation {
            message: format!(
                "classifier.min_similarity must be within 0.0-1.0, got {}",
                config.classifier.min_similarity
            ),
        });
    }

    if !(0.0..=1.0).contains(&config.email.spam_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "email.spam_threshold must be within 0.0-1.0, got {}",
                config.email.spam_threshold
            ),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.dispatch.timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatch.timeout_secs must be at least 1".to_string(),
        });
    }

    if config.delivery.reconcile_batch_size == 0 {
        errors.push(ConfigError::Validation {
            message: "delivery.reconcile_batch_size must be at least 1".to_string(),
        });
    }

    // WhatsApp credentials come as a set: a SID without a token (or vice
    // versa) can never authenticate against the gateway.
    let wa = &config.whatsapp;
    if wa.account_sid.is_some() != wa.auth_token.is_some() {
        errors.push(ConfigError::Validation {
            message: "whatsapp.account_sid and whatsapp.auth_token must be set together"
                .to_string(),
        });
    }
    if wa.account_sid.is_some() && wa.from_number.is_none() {
        errors.push(ConfigError::Validation {
            message: "whatsapp.from_number is required when whatsapp credentials are set"
                .to_string(),
        });
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = CrosstalkConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn handoff_floor_out_of_range_fails() {
        let mut config = CrosstalkConfig::default();
        config.policy.handoff_floor = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("handoff_floor"))
        ));
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = CrosstalkConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn zero_batch_size_fails_validation() {
        let mut config = CrosstalkConfig::default();
        config.delivery.reconcile_batch_size = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("reconcile_batch_size"))
        ));
    }

    #[test]
    fn whatsapp_partial_credentials_fail() {
        let mut config = CrosstalkConfig::default();
        config.whatsapp.account_sid = Some("AC123".to_string());
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("auth_token"))
        ));
    }

    #[test]
    fn whatsapp_full_credentials_pass() {
        let mut config = CrosstalkConfig::default();
        config.whatsapp.account_sid = Some("AC123".to_string());
        config.whatsapp.auth_token = Some("secret".to_string());
        config.whatsapp.from_number = Some("+15550001111".to_string());
        assert!(validate_config(&config).is_ok());
    }
}
