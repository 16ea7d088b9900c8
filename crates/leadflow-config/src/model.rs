// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Leadflow engagement engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Leadflow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadflowConfig {
    /// Engine-wide settings: logging, sweep cadence.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Retry ladder and fallback trigger settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Keyword sets for ended-reason classification.
    #[serde(default)]
    pub classification: ClassificationConfig,

    /// Voice platform settings.
    #[serde(default)]
    pub voice: VoiceConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Outbound SMTP email settings.
    #[serde(default)]
    pub email: EmailConfig,

    /// Lead store settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings (webhooks + campaign control).
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Batch campaign worker defaults.
    #[serde(default)]
    pub batch: BatchConfig,
}

/// Engine-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Seconds between orchestrator sweeps over due leads.
    #[serde(default = "default_orchestrator_interval")]
    pub orchestrator_interval_secs: u64,

    /// Seconds between reconciliation sweeps over in-flight calls.
    #[serde(default = "default_reconciliation_interval")]
    pub reconciliation_interval_secs: u64,

    /// Whether the sweep also picks up brand-new pending leads, or only
    /// retry-due ones.
    #[serde(default = "default_true")]
    pub include_new_leads: bool,

    /// Send a follow-up email after a completed engagement when the lead
    /// has not been emailed yet.
    #[serde(default)]
    pub post_success_followup: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            orchestrator_interval_secs: default_orchestrator_interval(),
            reconciliation_interval_secs: default_reconciliation_interval(),
            include_new_leads: true,
            post_success_followup: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_orchestrator_interval() -> u64 {
    60
}

fn default_reconciliation_interval() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

/// Unit for the retry interval ladder entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntervalUnit {
    Minutes,
    Hours,
}

/// Retry ladder configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Maximum call attempts before fallback.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wait durations between successive attempts, in `interval_unit`.
    /// Counts past the ladder reuse the last entry.
    #[serde(default = "default_intervals")]
    pub intervals: Vec<f64>,

    /// Unit the ladder entries are expressed in.
    #[serde(default = "default_interval_unit")]
    pub interval_unit: IntervalUnit,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            intervals: default_intervals(),
            interval_unit: default_interval_unit(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_intervals() -> Vec<f64> {
    vec![1.0, 4.0, 24.0]
}

fn default_interval_unit() -> IntervalUnit {
    IntervalUnit::Hours
}

/// Keyword sets for classifying `ended_reason` text. Matched as lowercase
/// substrings; missed keywords are checked before failed keywords.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClassificationConfig {
    #[serde(default = "default_missed_keywords")]
    pub missed_keywords: Vec<String>,

    #[serde(default = "default_failed_keywords")]
    pub failed_keywords: Vec<String>,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            missed_keywords: default_missed_keywords(),
            failed_keywords: default_failed_keywords(),
        }
    }
}

fn default_missed_keywords() -> Vec<String> {
    [
        "no-answer",
        "noanswer",
        "rejected",
        "busy",
        "timeout",
        "cancelled",
        "canceled",
        "unavailable",
        "486",
        "487",
        "480",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_failed_keywords() -> Vec<String> {
    ["failed", "error", "providerfault", "server-error", "503", "500"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Voice platform configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VoiceConfig {
    /// Platform API key. `None` requires environment variable override.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Assistant the outbound calls run against.
    #[serde(default)]
    pub assistant_id: String,

    /// Outbound line the calls are placed from.
    #[serde(default)]
    pub phone_number_id: String,

    /// API base URL; overridable for testing.
    #[serde(default = "default_voice_base_url")]
    pub base_url: String,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            assistant_id: String::new(),
            phone_number_id: String::new(),
            base_url: default_voice_base_url(),
        }
    }
}

fn default_voice_base_url() -> String {
    "https://api.vapi.ai".to_string()
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Master switch for the WhatsApp fallback channel.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub access_token: Option<String>,

    /// Sender phone-number id registered with the Cloud API.
    #[serde(default)]
    pub phone_number_id: String,

    /// Approved fallback template name. Empty disables the channel.
    #[serde(default)]
    pub fallback_template: String,

    /// BCP-47 language code for the template.
    #[serde(default = "default_whatsapp_language")]
    pub language: String,

    /// Simulate sends without network calls. Defaults on so a bare config
    /// never messages real prospects.
    #[serde(default = "default_true")]
    pub dry_run: bool,

    /// API base URL; overridable for testing.
    #[serde(default = "default_whatsapp_base_url")]
    pub base_url: String,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            access_token: None,
            phone_number_id: String::new(),
            fallback_template: String::new(),
            language: default_whatsapp_language(),
            dry_run: true,
            base_url: default_whatsapp_base_url(),
        }
    }
}

fn default_whatsapp_language() -> String {
    "en".to_string()
}

fn default_whatsapp_base_url() -> String {
    "https://graph.facebook.com/v20.0".to_string()
}

/// Outbound SMTP email configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EmailConfig {
    /// Simulate sends without network calls. Defaults on so a bare config
    /// never emails real prospects.
    #[serde(default = "default_true")]
    pub dry_run: bool,

    #[serde(default)]
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub smtp_user: Option<String>,

    #[serde(default)]
    pub smtp_pass: Option<String>,

    #[serde(default = "default_from_email")]
    pub from: String,

    #[serde(default)]
    pub reply_to: Option<String>,

    /// Subject for the missed-call / fallback email.
    #[serde(default = "default_email_subject")]
    pub subject: String,

    /// Body template; `{name}` is replaced with the lead's first name.
    #[serde(default = "default_email_body")]
    pub body_template: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            dry_run: true,
            smtp_host: String::new(),
            smtp_port: default_smtp_port(),
            smtp_user: None,
            smtp_pass: None,
            from: default_from_email(),
            reply_to: None,
            subject: default_email_subject(),
            body_template: default_email_body(),
        }
    }
}

fn default_smtp_port() -> u16 {
    587
}

fn default_from_email() -> String {
    "no-reply@example.com".to_string()
}

fn default_email_subject() -> String {
    "We tried to reach you".to_string()
}

fn default_email_body() -> String {
    "Hi {name}, we tried reaching you by phone and couldn't connect. \
     Reply to this email and we'll find a time that works."
        .to_string()
}

/// Lead store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// SQLite database path.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Read-cache TTL in seconds. Stale entries are served when a refresh
    /// fails, to absorb repository quota pressure.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            cache_ttl_secs: default_cache_ttl(),
        }
    }
}

fn default_database_path() -> String {
    "leadflow.db".to_string()
}

fn default_cache_ttl() -> u64 {
    15
}

/// HTTP gateway configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_host")]
    pub host: String,

    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bearer token for the /v1 control surface. `None` disables those
    /// routes (webhook and health stay reachable).
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_gateway_host(),
            port: default_gateway_port(),
            bearer_token: None,
        }
    }
}

fn default_gateway_host() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    8080
}

/// Batch campaign worker defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BatchConfig {
    /// Default batch width when the caller does not specify one.
    #[serde(default = "default_parallel_calls")]
    pub parallel_calls: usize,

    /// Default pacing gap between batches, in seconds.
    #[serde(default = "default_batch_interval")]
    pub interval_seconds: u64,

    /// Join timeout per call placement within a batch.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            parallel_calls: default_parallel_calls(),
            interval_seconds: default_batch_interval(),
            call_timeout_secs: default_call_timeout(),
        }
    }
}

fn default_parallel_calls() -> usize {
    5
}

fn default_batch_interval() -> u64 {
    240
}

fn default_call_timeout() -> u64 {
    30
}
