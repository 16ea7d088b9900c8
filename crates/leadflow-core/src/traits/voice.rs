// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Voice gateway trait for the outbound calling platform.

use async_trait::async_trait;

use crate::error::LeadflowError;
use crate::types::{CallId, Lead};

/// Result of a successful call placement.
#[derive(Debug, Clone)]
pub struct CallPlacement {
    pub call_id: CallId,
}

/// Authoritative call state as reported by the platform's status endpoint.
/// Used by the reconciliation sweep when delivery events never arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCallState {
    Completed,
    Missed,
    /// Still ringing/in conversation; leave the lead alone.
    InProgress,
}

/// Outbound voice platform: call placement, status lookup, transcripts.
#[async_trait]
pub trait VoiceGateway: Send + Sync {
    /// Place an outbound call to the lead. The implementation attaches the
    /// lead id as correlation metadata so inbound events can be resolved.
    async fn initiate(&self, lead: &Lead) -> Result<CallPlacement, LeadflowError>;

    /// Authoritative status of a previously placed call.
    async fn get_status(&self, call_id: &CallId) -> Result<GatewayCallState, LeadflowError>;

    /// Best-effort transcript retrieval; `Ok(None)` when unavailable.
    async fn get_transcript(&self, call_id: &CallId) -> Result<Option<String>, LeadflowError>;
}
