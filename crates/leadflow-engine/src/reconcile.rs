// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconciliation sweep for leads stuck in flight.
//!
//! Delivery events are not guaranteed to arrive. A lead left `initiated`
//! with a recorded call id is periodically checked against the platform's
//! authoritative status endpoint and corrected: completed/ended calls
//! become `completed`, failed/busy/no-answer calls become `missed`.
//! In-progress calls are left alone.

use std::sync::Arc;

use leadflow_core::{
    CallStatus, GatewayCallState, LeadFilter, LeadPatch, LeadRepository, LeadflowError,
    VoiceGateway,
};
use tracing::{debug, info, warn};

/// What one reconciliation pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub inspected: usize,
    pub corrected: usize,
}

pub struct Reconciler {
    repo: Arc<dyn LeadRepository>,
    voice: Arc<dyn VoiceGateway>,
}

impl Reconciler {
    pub fn new(repo: Arc<dyn LeadRepository>, voice: Arc<dyn VoiceGateway>) -> Self {
        Self { repo, voice }
    }

    /// Run one corrective pass over in-flight leads.
    pub async fn sweep(&self) -> Result<ReconcileStats, LeadflowError> {
        let stuck = self.repo.list(&LeadFilter::in_flight()).await?;
        let mut stats = ReconcileStats {
            inspected: stuck.len(),
            ..Default::default()
        };

        for lead in &stuck {
            let Some(call_id) = &lead.external_call_id else {
                continue;
            };
            let state = match self.voice.get_status(call_id).await {
                Ok(state) => state,
                Err(err) => {
                    warn!(lead_id = %lead.id, error = %err, "status lookup failed, will retry next pass");
                    continue;
                }
            };
            let corrected_status = match state {
                GatewayCallState::Completed => CallStatus::Completed,
                GatewayCallState::Missed => CallStatus::Missed,
                GatewayCallState::InProgress => {
                    debug!(lead_id = %lead.id, "call still in progress");
                    continue;
                }
            };

            let mut patch = LeadPatch::default().status(corrected_status);
            if corrected_status == CallStatus::Completed {
                patch.next_retry_at = Some(None);
            }
            if let Err(err) = self.repo.update_fields(lead.id, &patch).await {
                warn!(lead_id = %lead.id, error = %err, "reconciliation write failed");
                continue;
            }
            stats.corrected += 1;
            info!(lead_id = %lead.id, status = %corrected_status, "reconciled stuck lead");
        }

        Ok(stats)
    }
}
