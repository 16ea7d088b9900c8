// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound voice-platform event types.
//!
//! The platform delivers two asynchronous event kinds, both correlated to a
//! lead via the `lead_uuid` we attach at call placement and the platform
//! echoes back in call metadata. Delivery is at-least-once; processing must
//! tolerate duplicates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CallId, LeadId};

/// Status string carried by a status-update event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventStatus {
    Answered,
    Missed,
    Failed,
    Ended,
}

/// A call status change pushed by the voice platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: EventStatus,
    /// Platform-specific reason text on `ended` (e.g. "customer-busy",
    /// SIP codes). Classified against configured keyword sets.
    #[serde(default)]
    pub ended_reason: Option<String>,
    /// When the call was picked up, if it ever connected. Absence on an
    /// `ended` event means the call never connected.
    #[serde(default)]
    pub answered_at: Option<DateTime<Utc>>,
}

/// The structured analysis attached to an end-of-engagement report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngagementAnalysis {
    #[serde(default)]
    pub summary: String,
    /// Qualification verdict produced by the platform's evaluator.
    #[serde(default)]
    pub qualification_evaluation: String,
    /// Schema-free structured payload; scalar sub-fields are flattened into
    /// repository columns on persist.
    #[serde(default)]
    pub structured_fields: serde_json::Value,
}

/// End-of-engagement report delivered once a call concludes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementReport {
    pub analysis: EngagementAnalysis,
    #[serde(default)]
    pub call_id: Option<CallId>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

/// One inbound event, resolved to a lead.
#[derive(Debug, Clone)]
pub struct VoiceEvent {
    pub lead_id: LeadId,
    pub kind: VoiceEventKind,
}

/// The two event kinds the state machine interprets.
#[derive(Debug, Clone)]
pub enum VoiceEventKind {
    StatusUpdate(StatusUpdate),
    Report(EngagementReport),
}

/// What processing an event amounted to. Returned to the webhook surface so
/// it can answer the platform without leaking internals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum EventOutcome {
    /// Status persisted with no further action.
    StatusRecorded { status: String },
    /// Missed-call path ran and a retry was scheduled.
    RetryScheduled { retry_count: u32 },
    /// Missed-call path ran and retries are exhausted; fallback invoked.
    RetriesExhausted,
    /// Report persisted; engagement complete.
    ReportProcessed,
    /// The event named no lead we know. Logged and dropped.
    Unresolved,
    /// Event kind we do not act on.
    Ignored,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_status_uses_kebab_case() {
        let s: EventStatus = serde_json::from_str("\"ended\"").unwrap();
        assert_eq!(s, EventStatus::Ended);
        assert_eq!(serde_json::to_string(&EventStatus::Answered).unwrap(), "\"answered\"");
    }

    #[test]
    fn status_update_tolerates_missing_optionals() {
        let update: StatusUpdate =
            serde_json::from_str(r#"{"status":"missed"}"#).unwrap();
        assert_eq!(update.status, EventStatus::Missed);
        assert!(update.ended_reason.is_none());
        assert!(update.answered_at.is_none());
    }

    #[test]
    fn analysis_defaults_are_empty() {
        let analysis: EngagementAnalysis = serde_json::from_str("{}").unwrap();
        assert!(analysis.summary.is_empty());
        assert!(analysis.structured_fields.is_null());
    }
}
