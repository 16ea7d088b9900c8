// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook payloads from the voice platform.
//!
//! Two message kinds are acted on: `status-update` and
//! `end-of-call-report`. Everything else is acknowledged and ignored.
//! Correlation back to a lead relies on the `lead_uuid` metadata we attach
//! at placement; the platform echoes it in `message.call.metadata` (some
//! deliveries carry a top-level `call` object instead).

use chrono::{DateTime, Utc};
use leadflow_core::{
    CallId, EngagementAnalysis, EngagementReport, LeadId, StatusUpdate, VoiceEvent,
    VoiceEventKind,
};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub message: WebhookMessage,
    /// Some delivery paths put the call object beside the message.
    #[serde(default)]
    pub call: Option<CallObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookMessage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub ended_reason: Option<String>,
    #[serde(default)]
    pub answered_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub call: Option<CallObject>,
    #[serde(default)]
    pub analysis: Option<AnalysisWire>,
    #[serde(default)]
    pub duration_seconds: Option<f64>,
    #[serde(default)]
    pub recording_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallObject {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub metadata: Option<CallMetadataWire>,
}

#[derive(Debug, Deserialize)]
pub struct CallMetadataWire {
    #[serde(default)]
    pub lead_uuid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisWire {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub success_evaluation: String,
    #[serde(default)]
    pub structured_data: serde_json::Value,
}

/// How an inbound payload was interpreted.
#[derive(Debug)]
pub enum WebhookDisposition {
    /// A message kind we act on, resolved to a lead.
    Event(VoiceEvent),
    /// A message kind we act on, but no correlation id was present.
    MissingCorrelation,
    /// A message kind we acknowledge without acting.
    Unsupported,
}

impl WebhookEnvelope {
    fn lead_id(&self) -> Option<LeadId> {
        let from = |call: &Option<CallObject>| {
            call.as_ref()?
                .metadata
                .as_ref()?
                .lead_uuid
                .as_deref()?
                .parse::<LeadId>()
                .ok()
        };
        from(&self.message.call).or_else(|| from(&self.call))
    }

    fn call_id(&self) -> Option<CallId> {
        let from = |call: &Option<CallObject>| Some(CallId(call.as_ref()?.id.clone()?));
        from(&self.message.call).or_else(|| from(&self.call))
    }
}

/// Interpret one inbound payload.
pub fn interpret(envelope: &WebhookEnvelope) -> WebhookDisposition {
    let kind = match envelope.message.kind.as_str() {
        "status-update" => {
            let raw = envelope.message.status.as_deref().unwrap_or_default();
            let Ok(status) = serde_json::from_value(serde_json::Value::String(raw.to_string()))
            else {
                debug!(status = raw, "unrecognized call status, ignoring");
                return WebhookDisposition::Unsupported;
            };
            VoiceEventKind::StatusUpdate(StatusUpdate {
                status,
                ended_reason: envelope.message.ended_reason.clone(),
                answered_at: envelope.message.answered_at,
            })
        }
        "end-of-call-report" => {
            let analysis = envelope.message.analysis.as_ref();
            VoiceEventKind::Report(EngagementReport {
                analysis: EngagementAnalysis {
                    summary: analysis.map(|a| a.summary.clone()).unwrap_or_default(),
                    qualification_evaluation: analysis
                        .map(|a| a.success_evaluation.clone())
                        .unwrap_or_default(),
                    structured_fields: analysis
                        .map(|a| a.structured_data.clone())
                        .unwrap_or(serde_json::Value::Null),
                },
                call_id: envelope.call_id(),
                duration_seconds: envelope.message.duration_seconds,
                recording_url: envelope.message.recording_url.clone(),
            })
        }
        other => {
            debug!(kind = other, "unsupported webhook message kind");
            return WebhookDisposition::Unsupported;
        }
    };

    match envelope.lead_id() {
        Some(lead_id) => WebhookDisposition::Event(VoiceEvent { lead_id, kind }),
        None => WebhookDisposition::MissingCorrelation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadflow_core::EventStatus;

    fn envelope(json: serde_json::Value) -> WebhookEnvelope {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn status_update_resolves_lead_from_message_call() {
        let lead_id = LeadId::new();
        let env = envelope(serde_json::json!({
            "message": {
                "type": "status-update",
                "status": "ended",
                "endedReason": "customer-did-not-answer",
                "call": {"id": "call-1", "metadata": {"lead_uuid": lead_id.to_string()}},
            }
        }));
        match interpret(&env) {
            WebhookDisposition::Event(event) => {
                assert_eq!(event.lead_id, lead_id);
                match event.kind {
                    VoiceEventKind::StatusUpdate(update) => {
                        assert_eq!(update.status, EventStatus::Ended);
                        assert_eq!(
                            update.ended_reason.as_deref(),
                            Some("customer-did-not-answer")
                        );
                        assert!(update.answered_at.is_none());
                    }
                    other => panic!("unexpected kind: {other:?}"),
                }
            }
            other => panic!("unexpected disposition: {other:?}"),
        }
    }

    #[test]
    fn top_level_call_object_is_a_fallback() {
        let lead_id = LeadId::new();
        let env = envelope(serde_json::json!({
            "message": {"type": "status-update", "status": "answered"},
            "call": {"id": "call-2", "metadata": {"lead_uuid": lead_id.to_string()}},
        }));
        assert!(matches!(
            interpret(&env),
            WebhookDisposition::Event(VoiceEvent { lead_id: id, .. }) if id == lead_id
        ));
    }

    #[test]
    fn report_carries_analysis_and_call_metadata() {
        let lead_id = LeadId::new();
        let env = envelope(serde_json::json!({
            "message": {
                "type": "end-of-call-report",
                "analysis": {
                    "summary": "Interested, wants a call back tomorrow",
                    "successEvaluation": "qualified",
                    "structuredData": {"country": "Germany"},
                },
                "durationSeconds": 182.4,
                "recordingUrl": "https://recordings.example/r1",
                "call": {"id": "call-3", "metadata": {"lead_uuid": lead_id.to_string()}},
            }
        }));
        match interpret(&env) {
            WebhookDisposition::Event(VoiceEvent {
                kind: VoiceEventKind::Report(report),
                ..
            }) => {
                assert_eq!(report.analysis.summary, "Interested, wants a call back tomorrow");
                assert_eq!(report.analysis.qualification_evaluation, "qualified");
                assert_eq!(
                    report.analysis.structured_fields["country"],
                    serde_json::json!("Germany")
                );
                assert_eq!(report.call_id, Some(CallId("call-3".to_string())));
                assert_eq!(report.duration_seconds, Some(182.4));
            }
            other => panic!("unexpected disposition: {other:?}"),
        }
    }

    #[test]
    fn missing_correlation_is_flagged_not_dropped_silently() {
        let env = envelope(serde_json::json!({
            "message": {"type": "status-update", "status": "missed"}
        }));
        assert!(matches!(interpret(&env), WebhookDisposition::MissingCorrelation));
    }

    #[test]
    fn unknown_message_kinds_are_acknowledged_and_ignored() {
        let env = envelope(serde_json::json!({
            "message": {"type": "speech-update", "status": "started"}
        }));
        assert!(matches!(interpret(&env), WebhookDisposition::Unsupported));
    }
}
