// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Leadflow engagement engine.
//!
//! Provides TOML configuration parsing with strict validation
//! (`deny_unknown_fields`), XDG file hierarchy lookup, environment variable
//! overrides, and miette diagnostic rendering with typo suggestions.
//!
//! # Usage
//!
//! ```no_run
//! use leadflow_config::load_and_validate;
//!
//! let config = load_and_validate().expect("config errors");
//! println!("max retries: {}", config.retry.max_retries);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

pub use diagnostic::{render_errors, ConfigError};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    BatchConfig, ClassificationConfig, EmailConfig, EngineConfig, GatewayConfig, IntervalUnit,
    LeadflowConfig, RetryConfig, StorageConfig, VoiceConfig, WhatsappConfig,
};

/// Load configuration from the XDG hierarchy and validate it.
///
/// This is the high-level entry point that:
/// 1. Loads config from TOML files + env vars via Figment
/// 2. On success: runs post-deserialization validation
/// 3. On Figment error: converts to miette diagnostics with typo suggestions
///
/// Returns either a valid `LeadflowConfig` or a list of diagnostic errors.
pub fn load_and_validate() -> Result<LeadflowConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

/// Load configuration from a TOML string and validate it.
///
/// Useful for testing and embedded configuration.
pub fn load_and_validate_str(toml_content: &str) -> Result<LeadflowConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_defaults() {
        let config = load_and_validate_str("").unwrap();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.intervals, vec![1.0, 4.0, 24.0]);
        assert_eq!(config.retry.interval_unit, IntervalUnit::Hours);
        assert_eq!(config.engine.orchestrator_interval_secs, 60);
        assert_eq!(config.engine.reconciliation_interval_secs, 300);
        assert!(config.email.dry_run);
        assert_eq!(config.batch.parallel_calls, 5);
        assert_eq!(config.batch.interval_seconds, 240);
    }

    #[test]
    fn toml_overrides_defaults() {
        let toml = r#"
[retry]
max_retries = 5
intervals = [0.5, 2.0]
interval_unit = "minutes"

[voice]
api_key = "sk-test"
assistant_id = "asst_1"
phone_number_id = "pn_1"
"#;
        let config = load_and_validate_str(toml).unwrap();
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.retry.intervals, vec![0.5, 2.0]);
        assert_eq!(config.retry.interval_unit, IntervalUnit::Minutes);
        assert_eq!(config.voice.api_key.as_deref(), Some("sk-test"));
        // untouched sections keep defaults
        assert_eq!(config.gateway.port, 8080);
    }

    #[test]
    fn unknown_key_reports_suggestion() {
        let toml = r#"
[retry]
max_retires = 5
"#;
        let errors = load_and_validate_str(toml).unwrap_err();
        assert!(errors.iter().any(|e| matches!(
            e,
            ConfigError::UnknownKey { key, suggestion, .. }
                if key == "max_retires" && suggestion.as_deref() == Some("max_retries")
        )));
    }

    #[test]
    fn validation_errors_surface_from_toml() {
        let toml = r#"
[retry]
intervals = []
"#;
        let errors = load_and_validate_str(toml).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("intervals"))));
    }

    #[test]
    fn default_keyword_sets_are_populated() {
        let config = LeadflowConfig::default();
        assert!(config
            .classification
            .missed_keywords
            .iter()
            .any(|k| k == "no-answer"));
        assert!(config
            .classification
            .failed_keywords
            .iter()
            .any(|k| k == "providerfault"));
    }
}
