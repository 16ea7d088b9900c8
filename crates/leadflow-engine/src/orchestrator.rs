// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration sweep: find leads due for a call and place it.
//!
//! The sweep queries for new leads and retry-due leads, then drives each
//! through call initiation. Placement failures leave the lead in its prior
//! retry-eligible state; `retry_count` only advances when a missed/failed
//! event later arrives. At-most-one sweep runs at a time; the scheduler
//! enforces that by awaiting each run before ticking again.

use std::sync::Arc;

use chrono::Utc;
use leadflow_core::{Lead, LeadPatch, LeadRepository, LeadflowError, VoiceGateway};
use tracing::{info, warn};

use crate::backoff::{with_backoff, BackoffPolicy};

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub examined: usize,
    pub initiated: usize,
    pub failed: usize,
}

pub struct Orchestrator {
    repo: Arc<dyn LeadRepository>,
    voice: Arc<dyn VoiceGateway>,
    include_new_leads: bool,
    backoff: BackoffPolicy,
}

impl Orchestrator {
    pub fn new(
        repo: Arc<dyn LeadRepository>,
        voice: Arc<dyn VoiceGateway>,
        include_new_leads: bool,
    ) -> Self {
        Self {
            repo,
            voice,
            include_new_leads,
            backoff: BackoffPolicy::default(),
        }
    }

    /// Run one sweep over due leads.
    pub async fn sweep(&self) -> Result<SweepStats, LeadflowError> {
        let filter = leadflow_core::LeadFilter::due_for_call(Utc::now(), self.include_new_leads);
        let due = self.repo.list(&filter).await?;

        let mut stats = SweepStats {
            examined: due.len(),
            ..Default::default()
        };
        for lead in &due {
            match self.initiate_call(lead).await {
                Ok(()) => stats.initiated += 1,
                Err(err) => {
                    stats.failed += 1;
                    warn!(lead_id = %lead.id, error = %err, "call placement failed, lead stays retryable");
                }
            }
        }
        if stats.examined > 0 {
            info!(
                examined = stats.examined,
                initiated = stats.initiated,
                failed = stats.failed,
                "orchestrator sweep done"
            );
        }
        Ok(stats)
    }

    /// Place one call and record the in-flight state.
    pub async fn initiate_call(&self, lead: &Lead) -> Result<(), LeadflowError> {
        if lead.phone.is_empty() {
            return Err(LeadflowError::Internal(format!(
                "lead {} has no phone number",
                lead.id
            )));
        }
        let placement = self.voice.initiate(lead).await?;

        let mut patch = LeadPatch::default().status(leadflow_core::CallStatus::Initiated);
        patch.external_call_id = Some(Some(placement.call_id));
        patch.last_call_at = Some(Utc::now());
        with_backoff(self.backoff, "record_initiated", || {
            self.repo.update_fields(lead.id, &patch)
        })
        .await
    }
}
