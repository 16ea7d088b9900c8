// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as non-empty intervals, positive sweep cadences, and
//! channel credential presence when a channel is live.

use crate::diagnostic::ConfigError;
use crate::model::LeadflowConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &LeadflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.retry.max_retries == 0 {
        errors.push(ConfigError::Validation {
            message: "retry.max_retries must be at least 1".to_string(),
        });
    }

    if config.retry.intervals.is_empty() {
        errors.push(ConfigError::Validation {
            message: "retry.intervals must contain at least one entry".to_string(),
        });
    }

    for (i, interval) in config.retry.intervals.iter().enumerate() {
        if *interval <= 0.0 || !interval.is_finite() {
            errors.push(ConfigError::Validation {
                message: format!(
                    "retry.intervals[{i}] must be a positive finite number, got {interval}"
                ),
            });
        }
    }

    if config.engine.orchestrator_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.orchestrator_interval_secs must be at least 1".to_string(),
        });
    }

    if config.engine.reconciliation_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "engine.reconciliation_interval_secs must be at least 1".to_string(),
        });
    }

    if config.classification.missed_keywords.is_empty() {
        errors.push(ConfigError::Validation {
            message: "classification.missed_keywords must not be empty".to_string(),
        });
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Gateway bind address must parse as an IP or look like a hostname.
    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::Validation {
            message: "gateway.host must not be empty".to_string(),
        });
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("gateway.host `{host}` is not a valid IP address or hostname"),
            });
        }
    }

    // A live (non dry-run) channel needs its credentials.
    if config.whatsapp.enabled && !config.whatsapp.dry_run {
        if config.whatsapp.access_token.is_none() {
            errors.push(ConfigError::Validation {
                message: "whatsapp.access_token is required when whatsapp is enabled and not dry_run"
                    .to_string(),
            });
        }
        if config.whatsapp.phone_number_id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message:
                    "whatsapp.phone_number_id is required when whatsapp is enabled and not dry_run"
                        .to_string(),
            });
        }
    }

    if !config.email.dry_run && config.email.smtp_host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "email.smtp_host is required when email.dry_run is false".to_string(),
        });
    }

    if config.batch.parallel_calls == 0 {
        errors.push(ConfigError::Validation {
            message: "batch.parallel_calls must be at least 1".to_string(),
        });
    }

    if config.batch.call_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "batch.call_timeout_secs must be at least 1".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
