// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers: voice webhook, campaign control, lead intake.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use leadflow_core::{EventOutcome, Lead, LeadId, LeadflowError};
use leadflow_engine::batch::{BatchSpec, JobProgress};
use leadflow_voice::{interpret, WebhookDisposition, WebhookEnvelope};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::server::AppState;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Map an internal error to a response. Caller-actionable failures get the
/// specific message; infrastructure failures degrade to a generic 500 so the
/// platform retries delivery.
fn error_response(err: LeadflowError) -> Response {
    let (status, message) = match &err {
        LeadflowError::LeadNotFound { id } => {
            (StatusCode::NOT_FOUND, format!("lead {id} not found"))
        }
        LeadflowError::Config(message) | LeadflowError::Internal(message) => {
            (StatusCode::BAD_REQUEST, message.clone())
        }
        LeadflowError::Gateway { message, .. } => (StatusCode::BAD_GATEWAY, message.clone()),
        _ => {
            warn!(error = %err, "request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error".to_string(),
            )
        }
    };
    (status, Json(ErrorResponse { error: message })).into_response()
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /webhook/voice — inbound events from the voice platform.
///
/// Always answers 200 for payloads we understood, even when processing
/// amounted to a no-op; the platform only needs to know delivery succeeded.
pub async fn post_voice_webhook(
    State(state): State<AppState>,
    Json(envelope): Json<WebhookEnvelope>,
) -> Response {
    match interpret(&envelope) {
        WebhookDisposition::Event(event) => match state.processor.handle_event(event).await {
            Ok(outcome) => Json(outcome).into_response(),
            Err(err) => error_response(err),
        },
        WebhookDisposition::MissingCorrelation => {
            warn!("webhook payload carried no lead correlation id");
            Json(EventOutcome::Unresolved).into_response()
        }
        WebhookDisposition::Unsupported => Json(EventOutcome::Ignored).into_response(),
    }
}

/// Request body for POST /v1/campaigns.
#[derive(Debug, Deserialize)]
pub struct StartCampaignRequest {
    pub lead_ids: Vec<LeadId>,
    /// Batch width; configured default when omitted.
    #[serde(default)]
    pub parallel_calls: Option<usize>,
    /// Pacing gap between batches; configured default when omitted.
    #[serde(default)]
    pub interval_seconds: Option<u64>,
}

/// Response body for POST /v1/campaigns.
#[derive(Debug, Serialize)]
pub struct StartCampaignResponse {
    pub job_id: Uuid,
}

pub async fn post_campaign(
    State(state): State<AppState>,
    Json(request): Json<StartCampaignRequest>,
) -> Response {
    let spec = BatchSpec {
        lead_ids: request.lead_ids,
        parallel_calls: request
            .parallel_calls
            .unwrap_or(state.batch_defaults.parallel_calls),
        interval: Duration::from_secs(
            request
                .interval_seconds
                .unwrap_or(state.batch_defaults.interval_seconds),
        ),
        call_timeout: Duration::from_secs(state.batch_defaults.call_timeout_secs),
    };
    match state.batch.start(spec).await {
        Ok(job_id) => (
            StatusCode::ACCEPTED,
            Json(StartCampaignResponse { job_id }),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn get_campaign(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobProgress>, StatusCode> {
    state
        .batch
        .status(job_id)
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_active_campaign(
    State(state): State<AppState>,
) -> Result<Json<JobProgress>, StatusCode> {
    state
        .batch
        .active_status()
        .await
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

/// Response body for DELETE /v1/campaigns/{id}.
#[derive(Debug, Serialize)]
pub struct CancelCampaignResponse {
    pub cancelled: bool,
}

pub async fn delete_campaign(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Json<CancelCampaignResponse> {
    Json(CancelCampaignResponse {
        cancelled: state.batch.cancel(job_id).await,
    })
}

/// Request body for POST /v1/leads (intake).
#[derive(Debug, Deserialize)]
pub struct IntakeRequest {
    pub phone: String,
    #[serde(default)]
    pub whatsapp_phone: Option<String>,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub partner_tag: String,
}

/// Response body for POST /v1/leads.
#[derive(Debug, Serialize)]
pub struct IntakeResponse {
    pub id: LeadId,
}

pub async fn post_lead(
    State(state): State<AppState>,
    Json(request): Json<IntakeRequest>,
) -> Response {
    if request.phone.trim().is_empty() {
        return error_response(LeadflowError::Internal(
            "phone number is required".to_string(),
        ));
    }
    let lead = Lead::new_pending(
        request.phone,
        request.whatsapp_phone,
        request.email,
        request.name,
        request.partner_tag,
    );
    match state.repo.append(&lead).await {
        Ok(()) => (StatusCode::CREATED, Json(IntakeResponse { id: lead.id })).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn delete_lead(
    State(state): State<AppState>,
    Path(id): Path<LeadId>,
) -> Result<StatusCode, Response> {
    match state.repo.delete(id).await {
        Ok(true) => Ok(StatusCode::NO_CONTENT),
        Ok(false) => Ok(StatusCode::NOT_FOUND),
        Err(err) => Err(error_response(err)),
    }
}

pub async fn get_retry_config(
    State(state): State<AppState>,
) -> Json<leadflow_config::RetryConfig> {
    Json(state.retry_config.clone())
}
