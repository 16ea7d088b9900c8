// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the outbound voice-calling platform.
//!
//! Places calls with the lead id attached as correlation metadata, and
//! exposes the authoritative status / transcript lookups the reconciliation
//! sweep depends on.

use std::time::Duration;

use async_trait::async_trait;
use leadflow_config::VoiceConfig;
use leadflow_core::{
    CallId, CallPlacement, GatewayCallState, Lead, LeadflowError, VoiceGateway,
};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlaceCallRequest<'a> {
    assistant_id: &'a str,
    phone_number_id: &'a str,
    customer: Customer<'a>,
    metadata: CallMetadata,
}

#[derive(Debug, Serialize)]
struct Customer<'a> {
    number: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct CallMetadata {
    lead_uuid: String,
}

#[derive(Debug, Deserialize)]
struct PlaceCallResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallStateResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    ended_reason: Option<String>,
    #[serde(default)]
    transcript: Option<String>,
}

/// HTTP client for the voice platform's call API.
#[derive(Debug, Clone)]
pub struct VoiceClient {
    client: reqwest::Client,
    assistant_id: String,
    phone_number_id: String,
    base_url: String,
}

impl VoiceClient {
    pub fn new(config: &VoiceConfig) -> Result<Self, LeadflowError> {
        let api_key = config
            .api_key
            .as_deref()
            .ok_or_else(|| LeadflowError::Config("voice.api_key is not set".to_string()))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| LeadflowError::Config(format!("invalid voice API key: {e}")))?;
        auth.set_sensitive(true);
        headers.insert("authorization", auth);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LeadflowError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            assistant_id: config.assistant_id.clone(),
            phone_number_id: config.phone_number_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }

    async fn fetch_call(&self, call_id: &CallId) -> Result<CallStateResponse, LeadflowError> {
        let url = format!("{}/call/{}", self.base_url, call_id.0);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| LeadflowError::Gateway {
                message: format!("status lookup failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadflowError::Gateway {
                message: format!("status lookup returned {status}: {body}"),
                source: None,
            });
        }
        response
            .json::<CallStateResponse>()
            .await
            .map_err(|e| LeadflowError::Gateway {
                message: format!("failed to parse call state: {e}"),
                source: Some(Box::new(e)),
            })
    }
}

/// Statuses the platform reports while a call is still live.
const IN_PROGRESS_STATUSES: &[&str] = &["queued", "ringing", "in-progress", "forwarding"];

/// Ended-reason fragments that mean the call never productively connected.
const UNPRODUCTIVE_FRAGMENTS: &[&str] =
    &["no-answer", "busy", "rejected", "failed", "error", "timeout", "cancel"];

fn map_call_state(state: &CallStateResponse) -> GatewayCallState {
    match state.status.as_deref() {
        Some(s) if IN_PROGRESS_STATUSES.contains(&s) => GatewayCallState::InProgress,
        Some("ended") | Some("completed") => {
            let reason = state.ended_reason.as_deref().unwrap_or("").to_lowercase();
            if UNPRODUCTIVE_FRAGMENTS.iter().any(|f| reason.contains(f)) {
                GatewayCallState::Missed
            } else {
                GatewayCallState::Completed
            }
        }
        // Unknown vocabulary: do not correct the lead on guesswork.
        _ => GatewayCallState::InProgress,
    }
}

#[async_trait]
impl VoiceGateway for VoiceClient {
    async fn initiate(&self, lead: &Lead) -> Result<CallPlacement, LeadflowError> {
        let request = PlaceCallRequest {
            assistant_id: &self.assistant_id,
            phone_number_id: &self.phone_number_id,
            customer: Customer {
                number: &lead.phone,
                name: (!lead.display_name.is_empty()).then_some(lead.display_name.as_str()),
            },
            metadata: CallMetadata {
                lead_uuid: lead.id.to_string(),
            },
        };

        let url = format!("{}/call", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LeadflowError::Gateway {
                message: format!("call placement failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadflowError::Gateway {
                message: format!("call placement returned {status}: {body}"),
                source: None,
            });
        }

        let placed: PlaceCallResponse =
            response.json().await.map_err(|e| LeadflowError::Gateway {
                message: format!("failed to parse placement response: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(lead_id = %lead.id, call_id = %placed.id, "call placed");
        Ok(CallPlacement {
            call_id: CallId(placed.id),
        })
    }

    async fn get_status(&self, call_id: &CallId) -> Result<GatewayCallState, LeadflowError> {
        let state = self.fetch_call(call_id).await?;
        Ok(map_call_state(&state))
    }

    async fn get_transcript(&self, call_id: &CallId) -> Result<Option<String>, LeadflowError> {
        let state = self.fetch_call(call_id).await?;
        Ok(state.transcript.filter(|t| !t.is_empty()))
    }
}
