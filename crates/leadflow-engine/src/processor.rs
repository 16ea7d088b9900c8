// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call-status state machine driven by inbound voice-platform events.
//!
//! Two event kinds arrive, at-least-once: status updates while a call is in
//! flight, and an end-of-engagement report once it concludes. The processor
//! resolves the lead, applies the transition, schedules retries through the
//! [`RetryPolicy`], and hands exhausted leads to the [`FallbackSequencer`].
//! All repository writes are idempotent field overwrites, so replaying an
//! event re-applies the same state rather than corrupting it.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use leadflow_core::{
    CallId, CallStatus, Channel, ConversationEntry, EngagementReport, EventOutcome, EventStatus,
    Lead, LeadPatch, LeadRepository, LeadflowError, StatusUpdate, VoiceEvent, VoiceEventKind,
    VoiceGateway,
};
use tracing::{debug, info, warn};

use crate::backoff::{with_backoff, BackoffPolicy};
use crate::callback::{detect_callback_intent, parse_callback_time};
use crate::classify::{EndedOutcome, ReasonClassifier};
use crate::fallback::FallbackSequencer;
use crate::retry::RetryPolicy;

pub struct EventProcessor {
    repo: Arc<dyn LeadRepository>,
    voice: Arc<dyn VoiceGateway>,
    fallback: Arc<FallbackSequencer>,
    retry: RetryPolicy,
    classifier: ReasonClassifier,
    /// Send the follow-up email after a completed engagement.
    post_success_followup: bool,
    backoff: BackoffPolicy,
}

impl EventProcessor {
    pub fn new(
        repo: Arc<dyn LeadRepository>,
        voice: Arc<dyn VoiceGateway>,
        fallback: Arc<FallbackSequencer>,
        retry: RetryPolicy,
        classifier: ReasonClassifier,
        post_success_followup: bool,
    ) -> Self {
        Self {
            repo,
            voice,
            fallback,
            retry,
            classifier,
            post_success_followup,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Process one resolved inbound event.
    ///
    /// Unknown leads are logged and dropped rather than erroring: the
    /// platform may redeliver events for rows an operator already removed.
    pub async fn handle_event(&self, event: VoiceEvent) -> Result<EventOutcome, LeadflowError> {
        let Some(lead) = self.repo.get_by_id(event.lead_id).await? else {
            warn!(lead_id = %event.lead_id, "event references unknown lead, dropping");
            return Ok(EventOutcome::Unresolved);
        };

        match event.kind {
            VoiceEventKind::StatusUpdate(update) => self.handle_status_update(lead, update).await,
            VoiceEventKind::Report(report) => self.handle_report(lead, report).await,
        }
    }

    async fn handle_status_update(
        &self,
        lead: Lead,
        update: StatusUpdate,
    ) -> Result<EventOutcome, LeadflowError> {
        debug!(lead_id = %lead.id, status = ?update.status, reason = ?update.ended_reason, "status update");
        match update.status {
            EventStatus::Answered => {
                self.persist(
                    &lead,
                    LeadPatch::default().status(CallStatus::Answered),
                )
                .await?;
                Ok(EventOutcome::StatusRecorded {
                    status: "answered".to_string(),
                })
            }
            EventStatus::Missed => {
                self.run_missed_path(lead, CallStatus::Missed, update.ended_reason.as_deref())
                    .await
            }
            EventStatus::Failed => {
                self.run_missed_path(lead, CallStatus::Failed, update.ended_reason.as_deref())
                    .await
            }
            EventStatus::Ended => {
                let answered = update.answered_at.is_some();
                match self
                    .classifier
                    .classify(update.ended_reason.as_deref(), answered)
                {
                    // Every unproductive ending is recorded as missed,
                    // whatever flavor the ended reason carried.
                    EndedOutcome::Missed | EndedOutcome::Failed => {
                        self.run_missed_path(
                            lead,
                            CallStatus::Missed,
                            update.ended_reason.as_deref(),
                        )
                        .await
                    }
                    EndedOutcome::Completed => {
                        let mut patch = LeadPatch::default().status(CallStatus::Completed);
                        patch.next_retry_at = Some(None);
                        patch.last_terminal_reason = update.ended_reason.clone();
                        self.persist(&lead, patch).await?;
                        Ok(EventOutcome::StatusRecorded {
                            status: "completed".to_string(),
                        })
                    }
                }
            }
        }
    }

    /// The missed-call path: email once, then retry or fall back.
    async fn run_missed_path(
        &self,
        lead: Lead,
        recorded_status: CallStatus,
        reason: Option<&str>,
    ) -> Result<EventOutcome, LeadflowError> {
        // Once-only missed-call email, best effort.
        let mut lead = lead;
        match self.fallback.send_email_once(&lead).await {
            Ok(sent) => lead.email_sent |= sent,
            Err(err) => warn!(lead_id = %lead.id, error = %err, "missed-call email failed"),
        }

        let count = lead.retry_count;
        if self.retry.can_retry(count) {
            let new_count = count + 1;
            let next = self.retry.next_retry_at(count, Utc::now());
            let mut patch = LeadPatch::default().status(recorded_status);
            patch.retry_count = Some(new_count);
            patch.next_retry_at = Some(next);
            patch.last_terminal_reason = reason.map(str::to_string);
            self.persist(&lead, patch).await?;

            if self.retry.should_trigger_fallback(new_count) {
                info!(lead_id = %lead.id, retry_count = new_count, "final attempt recorded, retries exhausted");
                self.fallback.run_exhausted(&lead).await;
                return Ok(EventOutcome::RetriesExhausted);
            }
            info!(lead_id = %lead.id, retry_count = new_count, next_retry_at = ?next, "retry scheduled");
            Ok(EventOutcome::RetryScheduled {
                retry_count: new_count,
            })
        } else {
            let mut patch = LeadPatch::default().status(recorded_status);
            patch.next_retry_at = Some(None);
            patch.last_terminal_reason = reason.map(str::to_string);
            self.persist(&lead, patch).await?;

            info!(lead_id = %lead.id, retry_count = count, "retries exhausted, running fallback");
            self.fallback.run_exhausted(&lead).await;
            Ok(EventOutcome::RetriesExhausted)
        }
    }

    /// Persist the end-of-engagement analysis, then run the post-call
    /// follow-ups: best-effort transcript, callback detection, optional
    /// follow-up email.
    async fn handle_report(
        &self,
        lead: Lead,
        report: EngagementReport,
    ) -> Result<EventOutcome, LeadflowError> {
        let analysis = &report.analysis;
        let mut patch = LeadPatch::default().status(CallStatus::Completed);
        patch.next_retry_at = Some(None);
        if !analysis.summary.is_empty() {
            patch.summary = Some(analysis.summary.clone());
        }
        if !analysis.qualification_evaluation.is_empty() {
            patch.qualification = Some(analysis.qualification_evaluation.clone());
        }
        if !analysis.structured_fields.is_null() {
            patch.structured_fields = Some(analysis.structured_fields.clone());
            patch.extra = flatten_structured_fields(&analysis.structured_fields);
        }
        if let Some(duration) = report.duration_seconds {
            patch
                .extra
                .insert("call_duration_seconds".to_string(), format!("{duration:.1}"));
        }
        if let Some(url) = &report.recording_url {
            patch.extra.insert("recording_url".to_string(), url.clone());
        }
        patch
            .extra
            .insert("last_analysis_at".to_string(), Utc::now().to_rfc3339());
        self.persist(&lead, patch).await?;
        info!(lead_id = %lead.id, "engagement report persisted");

        self.log_transcript(&lead, report.call_id.as_ref()).await;

        // Callback intent: summary plus structured payload text.
        let haystack = format!("{} {}", analysis.summary, analysis.structured_fields);
        if detect_callback_intent(&haystack) {
            let at = parse_callback_time(&haystack, Utc::now());
            self.schedule_callback(&lead, at).await?;
        } else if self.post_success_followup {
            if let Err(err) = self.fallback.send_email_once(&lead).await {
                warn!(lead_id = %lead.id, error = %err, "post-engagement follow-up failed");
            }
        }

        Ok(EventOutcome::ReportProcessed)
    }

    /// Best-effort transcript retrieval; absence is not an error.
    async fn log_transcript(&self, lead: &Lead, call_id: Option<&CallId>) {
        let Some(call_id) = call_id.or(lead.external_call_id.as_ref()) else {
            return;
        };
        match self.voice.get_transcript(call_id).await {
            Ok(Some(text)) => {
                let entry =
                    ConversationEntry::outbound(lead.id, Channel::Call, "transcript", &text)
                        .with_status("recorded");
                if let Err(err) = self.repo.log_conversation(&entry).await {
                    warn!(lead_id = %lead.id, error = %err, "transcript log failed");
                }
            }
            Ok(None) => debug!(lead_id = %lead.id, "no transcript available"),
            Err(err) => debug!(lead_id = %lead.id, error = %err, "transcript retrieval failed"),
        }
    }

    /// Persist the callback request and spawn the one-shot callback call.
    async fn schedule_callback(
        &self,
        lead: &Lead,
        at: DateTime<Utc>,
    ) -> Result<(), LeadflowError> {
        let mut patch = LeadPatch::default().status(CallStatus::CallbackScheduled);
        patch.callback_requested_at = Some(Some(at));
        self.persist(lead, patch).await?;
        info!(lead_id = %lead.id, callback_at = %at, "callback scheduled");

        let repo = Arc::clone(&self.repo);
        let voice = Arc::clone(&self.voice);
        let lead_id = lead.id;
        tokio::spawn(async move {
            let wait = (at - Utc::now()).to_std().unwrap_or_default();
            tokio::time::sleep(wait).await;
            run_callback_call(repo, voice, lead_id).await;
        });
        Ok(())
    }

    async fn persist(&self, lead: &Lead, patch: LeadPatch) -> Result<(), LeadflowError> {
        with_backoff(self.backoff, "lead_update", || {
            self.repo.update_fields(lead.id, &patch)
        })
        .await
    }
}

/// Place the scheduled callback call and record the outcome.
async fn run_callback_call(
    repo: Arc<dyn LeadRepository>,
    voice: Arc<dyn VoiceGateway>,
    lead_id: leadflow_core::LeadId,
) {
    let lead = match repo.get_by_id(lead_id).await {
        Ok(Some(lead)) => lead,
        Ok(None) => {
            warn!(%lead_id, "callback fired for removed lead");
            return;
        }
        Err(err) => {
            warn!(%lead_id, error = %err, "callback lead fetch failed");
            return;
        }
    };
    if lead.call_status != CallStatus::CallbackScheduled {
        debug!(%lead_id, status = %lead.call_status, "callback superseded, skipping");
        return;
    }

    let (status, call_id) = match voice.initiate(&lead).await {
        Ok(placement) => (CallStatus::CallbackInitiated, Some(placement.call_id)),
        Err(err) => {
            warn!(%lead_id, error = %err, "callback call placement failed");
            (CallStatus::CallbackFailed, None)
        }
    };
    let mut patch = LeadPatch::default().status(status);
    if let Some(call_id) = call_id {
        patch.external_call_id = Some(Some(call_id));
        patch.last_call_at = Some(Utc::now());
    }
    if let Err(err) = repo.update_fields(lead_id, &patch).await {
        warn!(%lead_id, error = %err, "callback outcome persist failed");
    }
}

/// Flatten scalar analysis sub-fields into repository columns.
///
/// Top-level scalars keep their key; one level of nesting joins with `_`.
/// Deeper structure stays only in the raw `structured_fields` payload.
fn flatten_structured_fields(value: &serde_json::Value) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    let Some(obj) = value.as_object() else {
        return out;
    };
    for (key, val) in obj {
        match val {
            serde_json::Value::Object(inner) => {
                for (inner_key, inner_val) in inner {
                    if let Some(s) = scalar_to_string(inner_val) {
                        out.insert(format!("{key}_{inner_key}"), s);
                    }
                }
            }
            _ => {
                if let Some(s) = scalar_to_string(val) {
                    out.insert(key.clone(), s);
                }
            }
        }
    }
    out
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flatten_keeps_top_level_scalars() {
        let fields = json!({
            "country": "Germany",
            "budget": 1200,
            "visa_ready": true,
            "notes": ["a", "b"]
        });
        let flat = flatten_structured_fields(&fields);
        assert_eq!(flat.get("country").map(String::as_str), Some("Germany"));
        assert_eq!(flat.get("budget").map(String::as_str), Some("1200"));
        assert_eq!(flat.get("visa_ready").map(String::as_str), Some("true"));
        assert!(!flat.contains_key("notes"));
    }

    #[test]
    fn flatten_joins_one_nesting_level() {
        let fields = json!({
            "housing": { "type": "shared", "rooms": 2 }
        });
        let flat = flatten_structured_fields(&fields);
        assert_eq!(flat.get("housing_type").map(String::as_str), Some("shared"));
        assert_eq!(flat.get("housing_rooms").map(String::as_str), Some("2"));
    }

    #[test]
    fn flatten_ignores_non_objects() {
        assert!(flatten_structured_fields(&json!(null)).is_empty());
        assert!(flatten_structured_fields(&json!("text")).is_empty());
    }
}
