// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Leadflow workspace.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Stable, immutable identifier for a lead. Assigned once at intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(pub Uuid);

impl LeadId {
    /// Generate a fresh lead identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LeadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for LeadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Identifier assigned by the voice platform to one placed call.
///
/// Overwritten, not appended, each time a call is re-initiated for the lead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(pub String);

/// Call lifecycle state for a lead. The closed set of states replaces the
/// stringly-typed status column of earlier revisions; unknown strings fail
/// at parse time, not deep inside a transition.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    /// Intake complete, no call attempted yet.
    Pending,
    /// A call has been placed and its outcome is not yet known.
    Initiated,
    /// The voice platform reported the call as picked up.
    Answered,
    /// The call did not connect (or connected unproductively).
    Missed,
    /// The call was rejected at placement or failed mid-flight.
    Failed,
    /// Terminal: the engagement ran to completion.
    Completed,
    /// The lead asked to be called back; a one-shot callback is scheduled.
    CallbackScheduled,
    /// The scheduled callback call was placed.
    CallbackInitiated,
    /// The scheduled callback call could not be placed.
    CallbackFailed,
}

impl CallStatus {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, CallStatus::Completed)
    }

    /// States from which the orchestrator may place a call.
    pub fn is_callable(self) -> bool {
        matches!(
            self,
            CallStatus::Pending | CallStatus::Missed | CallStatus::Failed
        )
    }
}

/// Outbound channel for one interaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Call,
    Whatsapp,
    Email,
}

/// Direction of one interaction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

/// One prospect and their engagement state.
///
/// Mutated exclusively through the event processor, orchestrator, and batch
/// worker; the intake surface only appends new rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub phone: String,
    /// WhatsApp destination; defaults to `phone` at intake.
    pub whatsapp_phone: String,
    pub email: String,
    pub display_name: String,
    /// Free-form partner/source attribution tag.
    pub partner_tag: String,
    pub call_status: CallStatus,
    pub retry_count: u32,
    /// When the next call attempt becomes due. Null once retries are
    /// exhausted or the lead reaches a terminal state.
    pub next_retry_at: Option<DateTime<Utc>>,
    /// Fallback idempotency guard: set once the WhatsApp fallback was sent.
    pub whatsapp_sent: bool,
    /// Fallback idempotency guard: set once the missed-call/fallback email was sent.
    pub email_sent: bool,
    pub external_call_id: Option<CallId>,
    pub summary: Option<String>,
    pub qualification: Option<String>,
    /// Raw structured analysis payload from the end-of-engagement report.
    pub structured_fields: Option<serde_json::Value>,
    pub last_call_at: Option<DateTime<Utc>>,
    pub last_terminal_reason: Option<String>,
    pub callback_requested_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Lead {
    /// Create a pending lead at intake. WhatsApp number falls back to the
    /// primary phone when not provided.
    pub fn new_pending(
        phone: impl Into<String>,
        whatsapp_phone: Option<String>,
        email: impl Into<String>,
        display_name: impl Into<String>,
        partner_tag: impl Into<String>,
    ) -> Self {
        let phone = phone.into();
        let whatsapp_phone = whatsapp_phone.unwrap_or_else(|| phone.clone());
        Self {
            id: LeadId::new(),
            phone,
            whatsapp_phone,
            email: email.into(),
            display_name: display_name.into(),
            partner_tag: partner_tag.into(),
            call_status: CallStatus::Pending,
            retry_count: 0,
            next_retry_at: None,
            whatsapp_sent: false,
            email_sent: false,
            external_call_id: None,
            summary: None,
            qualification: None,
            structured_fields: None,
            last_call_at: None,
            last_terminal_reason: None,
            callback_requested_at: None,
            created_at: Utc::now(),
        }
    }

    /// First name for message templating; "there" when the name is blank.
    pub fn first_name(&self) -> &str {
        let first = self.display_name.split_whitespace().next().unwrap_or("");
        if first.is_empty() { "there" } else { first }
    }
}

/// A single batched field update against one lead row.
///
/// Every set field is written in one repository call; unset fields are left
/// untouched. `Some(None)` in a nullable slot clears the stored value.
/// `extra` carries flattened analysis sub-fields whose columns the
/// repository creates on first write.
#[derive(Debug, Clone, Default)]
pub struct LeadPatch {
    pub call_status: Option<CallStatus>,
    pub retry_count: Option<u32>,
    pub next_retry_at: Option<Option<DateTime<Utc>>>,
    pub whatsapp_sent: Option<bool>,
    pub email_sent: Option<bool>,
    pub external_call_id: Option<Option<CallId>>,
    pub summary: Option<String>,
    pub qualification: Option<String>,
    pub structured_fields: Option<serde_json::Value>,
    pub last_call_at: Option<DateTime<Utc>>,
    pub last_terminal_reason: Option<String>,
    pub callback_requested_at: Option<Option<DateTime<Utc>>>,
    pub extra: BTreeMap<String, String>,
}

impl LeadPatch {
    pub fn is_empty(&self) -> bool {
        self.call_status.is_none()
            && self.retry_count.is_none()
            && self.next_retry_at.is_none()
            && self.whatsapp_sent.is_none()
            && self.email_sent.is_none()
            && self.external_call_id.is_none()
            && self.summary.is_none()
            && self.qualification.is_none()
            && self.structured_fields.is_none()
            && self.last_call_at.is_none()
            && self.last_terminal_reason.is_none()
            && self.callback_requested_at.is_none()
            && self.extra.is_empty()
    }

    pub fn status(mut self, status: CallStatus) -> Self {
        self.call_status = Some(status);
        self
    }
}

/// Filter for `LeadRepository::list`.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    /// Match any of these statuses; empty matches all.
    pub statuses: Vec<CallStatus>,
    /// Only leads whose `next_retry_at` is at or before this instant.
    /// Pending leads carry no schedule and always pass the time filter;
    /// any other lead with a null `next_retry_at` is excluded (retries
    /// exhausted, nothing due).
    pub due_before: Option<DateTime<Utc>>,
    /// Only leads with a recorded external call id.
    pub with_external_call_id: bool,
}

impl LeadFilter {
    /// Leads the orchestrator sweep acts on: new, plus retry-due.
    pub fn due_for_call(now: DateTime<Utc>, include_new: bool) -> Self {
        let statuses = if include_new {
            vec![CallStatus::Pending, CallStatus::Missed, CallStatus::Failed]
        } else {
            vec![CallStatus::Missed, CallStatus::Failed]
        };
        Self {
            statuses,
            due_before: Some(now),
            with_external_call_id: false,
        }
    }

    /// Leads the reconciliation sweep inspects: stuck in flight.
    pub fn in_flight() -> Self {
        Self {
            statuses: vec![CallStatus::Initiated],
            due_before: None,
            with_external_call_id: true,
        }
    }
}

/// Append-only record of one outbound/inbound interaction. Never mutated
/// or deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    pub lead_id: LeadId,
    pub channel: Channel,
    pub direction: Direction,
    pub timestamp: DateTime<Utc>,
    pub subject: String,
    pub content: String,
    /// Delivery outcome, e.g. "sent", "dry-run", "failed".
    pub status: String,
}

impl ConversationEntry {
    pub fn outbound(lead_id: LeadId, channel: Channel, subject: &str, content: &str) -> Self {
        Self {
            lead_id,
            channel,
            direction: Direction::Out,
            timestamp: Utc::now(),
            subject: subject.to_string(),
            content: content.to_string(),
            status: "sent".to_string(),
        }
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = status.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn call_status_round_trips_through_strings() {
        for status in [
            CallStatus::Pending,
            CallStatus::Initiated,
            CallStatus::Answered,
            CallStatus::Missed,
            CallStatus::Failed,
            CallStatus::Completed,
            CallStatus::CallbackScheduled,
            CallStatus::CallbackInitiated,
            CallStatus::CallbackFailed,
        ] {
            let s = status.to_string();
            let parsed = CallStatus::from_str(&s).expect("should parse back");
            assert_eq!(status, parsed);
        }
    }

    #[test]
    fn only_completed_is_terminal() {
        assert!(CallStatus::Completed.is_terminal());
        assert!(!CallStatus::Missed.is_terminal());
        assert!(!CallStatus::Answered.is_terminal());
    }

    #[test]
    fn callable_states_match_orchestrator_filter() {
        let filter = LeadFilter::due_for_call(Utc::now(), true);
        for status in &filter.statuses {
            assert!(status.is_callable());
        }
        let retry_only = LeadFilter::due_for_call(Utc::now(), false);
        assert!(!retry_only.statuses.contains(&CallStatus::Pending));
    }

    #[test]
    fn new_pending_lead_defaults() {
        let lead = Lead::new_pending("+15550001111", None, "a@b.c", "Ada Lovelace", "");
        assert_eq!(lead.call_status, CallStatus::Pending);
        assert_eq!(lead.retry_count, 0);
        assert_eq!(lead.whatsapp_phone, "+15550001111");
        assert!(!lead.whatsapp_sent);
        assert!(!lead.email_sent);
        assert_eq!(lead.first_name(), "Ada");
    }

    #[test]
    fn first_name_falls_back_when_blank() {
        let lead = Lead::new_pending("+1", None, "", "", "");
        assert_eq!(lead.first_name(), "there");
    }

    #[test]
    fn empty_patch_reports_empty() {
        assert!(LeadPatch::default().is_empty());
        assert!(!LeadPatch::default().status(CallStatus::Missed).is_empty());
    }

    #[test]
    fn lead_id_parses_and_displays() {
        let id = LeadId::new();
        let parsed = LeadId::from_str(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }
}
