// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch campaign worker: paced, bounded-parallelism call runs.
//!
//! A campaign is an explicit list of leads executed as consecutive batches
//! of `parallel_calls` concurrent placements, with `interval_seconds` of
//! pacing between batches to stay under the calling platform's concurrent
//! call ceiling. Jobs are ephemeral, in-memory only, and cooperatively
//! cancellable: the token is checked before each batch and before each call,
//! and in-flight placements are bounded by a per-call join timeout rather
//! than aborted.
//!
//! At most one job is active system-wide; starting a new one cancels the
//! previous active job.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use leadflow_core::{CallStatus, LeadId, LeadPatch, LeadRepository, LeadflowError, VoiceGateway};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backoff::{with_backoff, BackoffPolicy};

/// Most recent errors kept per job.
const ERROR_RING_CAPACITY: usize = 10;

/// Caller-supplied campaign parameters.
#[derive(Debug, Clone)]
pub struct BatchSpec {
    pub lead_ids: Vec<LeadId>,
    /// Batch width: concurrent placements per batch.
    pub parallel_calls: usize,
    /// Pacing gap between batches.
    pub interval: Duration,
    /// Join timeout per placement so one hung call cannot stall the batch.
    pub call_timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Point-in-time snapshot of a job's progress. Callers poll; nothing streams.
#[derive(Debug, Clone, serde::Serialize)]
pub struct JobProgress {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub total_leads: usize,
    pub initiated: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub current_batch: usize,
    pub total_batches: usize,
    pub recent_errors: Vec<String>,
}

/// Mutable job bookkeeping, guarded by one lock per job.
struct JobState {
    status: JobStatus,
    total_leads: usize,
    initiated: u64,
    succeeded: u64,
    failed: u64,
    current_batch: usize,
    total_batches: usize,
    errors: VecDeque<String>,
}

impl JobState {
    fn record_error(&mut self, message: String) {
        if self.errors.len() == ERROR_RING_CAPACITY {
            self.errors.pop_front();
        }
        self.errors.push_back(message);
    }

    fn snapshot(&self, job_id: Uuid) -> JobProgress {
        JobProgress {
            job_id,
            status: self.status,
            total_leads: self.total_leads,
            initiated: self.initiated,
            succeeded: self.succeeded,
            failed: self.failed,
            current_batch: self.current_batch,
            total_batches: self.total_batches,
            recent_errors: self.errors.iter().cloned().collect(),
        }
    }
}

struct JobHandle {
    state: Arc<Mutex<JobState>>,
    cancel: CancellationToken,
}

pub struct BatchWorker {
    repo: Arc<dyn LeadRepository>,
    voice: Arc<dyn VoiceGateway>,
    jobs: DashMap<Uuid, Arc<JobHandle>>,
    active: Mutex<Option<Uuid>>,
    backoff: BackoffPolicy,
}

impl BatchWorker {
    pub fn new(repo: Arc<dyn LeadRepository>, voice: Arc<dyn VoiceGateway>) -> Self {
        Self {
            repo,
            voice,
            jobs: DashMap::new(),
            active: Mutex::new(None),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Override the bookkeeping retry policy. Tests use tight delays.
    pub fn with_backoff_policy(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Start a campaign. Any previously active job is cancelled first.
    pub async fn start(self: &Arc<Self>, spec: BatchSpec) -> Result<Uuid, LeadflowError> {
        if spec.lead_ids.is_empty() {
            return Err(LeadflowError::Internal(
                "campaign has no target leads".to_string(),
            ));
        }
        if spec.parallel_calls == 0 {
            return Err(LeadflowError::Internal(
                "parallel_calls must be at least 1".to_string(),
            ));
        }

        let job_id = Uuid::new_v4();
        let total_batches = spec.lead_ids.len().div_ceil(spec.parallel_calls);
        let handle = Arc::new(JobHandle {
            state: Arc::new(Mutex::new(JobState {
                status: JobStatus::Running,
                total_leads: spec.lead_ids.len(),
                initiated: 0,
                succeeded: 0,
                failed: 0,
                current_batch: 0,
                total_batches,
                errors: VecDeque::new(),
            })),
            cancel: CancellationToken::new(),
        });
        self.jobs.insert(job_id, Arc::clone(&handle));

        // Replace the active-job pointer, cancelling the previous holder.
        {
            let mut active = self.active.lock().await;
            if let Some(previous) = active.replace(job_id) {
                self.cancel_job(previous).await;
            }
        }

        info!(
            %job_id,
            leads = spec.lead_ids.len(),
            parallel_calls = spec.parallel_calls,
            total_batches,
            "campaign started"
        );

        let worker = Arc::clone(self);
        tokio::spawn(async move {
            worker.run_job(job_id, handle, spec).await;
        });
        Ok(job_id)
    }

    /// Cooperatively cancel a job. Returns false for unknown ids.
    pub async fn cancel(&self, job_id: Uuid) -> bool {
        if !self.jobs.contains_key(&job_id) {
            return false;
        }
        self.cancel_job(job_id).await;
        true
    }

    async fn cancel_job(&self, job_id: Uuid) {
        if let Some(handle) = self.jobs.get(&job_id).map(|h| Arc::clone(&h)) {
            handle.cancel.cancel();
            let mut state = handle.state.lock().await;
            if state.status == JobStatus::Running {
                state.status = JobStatus::Cancelled;
                info!(%job_id, "campaign cancelled");
            }
        }
    }

    /// Snapshot of one job's progress.
    pub async fn status(&self, job_id: Uuid) -> Option<JobProgress> {
        let handle = self.jobs.get(&job_id).map(|h| Arc::clone(&h))?;
        let state = handle.state.lock().await;
        Some(state.snapshot(job_id))
    }

    /// Snapshot of the currently active job, if any.
    pub async fn active_status(&self) -> Option<JobProgress> {
        let job_id = (*self.active.lock().await)?;
        self.status(job_id).await
    }

    async fn run_job(self: Arc<Self>, job_id: Uuid, handle: Arc<JobHandle>, spec: BatchSpec) {
        let batches: Vec<&[LeadId]> = spec.lead_ids.chunks(spec.parallel_calls).collect();
        let batch_count = batches.len();

        for (index, batch) in batches.into_iter().enumerate() {
            if handle.cancel.is_cancelled() {
                break;
            }
            {
                let mut state = handle.state.lock().await;
                state.current_batch = index + 1;
            }

            let mut joins = Vec::with_capacity(batch.len());
            for lead_id in batch {
                if handle.cancel.is_cancelled() {
                    break;
                }
                let worker = Arc::clone(&self);
                let state = Arc::clone(&handle.state);
                let lead_id = *lead_id;
                let outcome = Arc::new(AtomicBool::new(false));
                let task_outcome = Arc::clone(&outcome);
                joins.push((
                    lead_id,
                    outcome,
                    tokio::spawn(async move {
                        worker.place_campaign_call(lead_id, state, task_outcome).await;
                    }),
                ));
            }

            // One deadline for the whole join set: the placements run
            // concurrently, so N hung calls stall the batch for one timeout,
            // not N of them.
            let deadline = tokio::time::Instant::now() + spec.call_timeout;
            for (lead_id, outcome, join) in joins {
                if tokio::time::timeout_at(deadline, join).await.is_err()
                    && !outcome.swap(true, Ordering::SeqCst)
                {
                    warn!(%job_id, %lead_id, "call placement exceeded timeout, moving on");
                    let mut state = handle.state.lock().await;
                    state.failed += 1;
                    state.record_error(format!("lead {lead_id}: placement timed out"));
                }
            }

            // Pacing gap; cancellation wakes the sleep early.
            if index + 1 < batch_count && !handle.cancel.is_cancelled() {
                tokio::select! {
                    _ = handle.cancel.cancelled() => {}
                    _ = tokio::time::sleep(spec.interval) => {}
                }
            }
        }

        let mut state = handle.state.lock().await;
        if state.status == JobStatus::Running {
            state.status = JobStatus::Completed;
            info!(
                %job_id,
                initiated = state.initiated,
                succeeded = state.succeeded,
                failed = state.failed,
                "campaign finished"
            );
        }
    }

    /// Place one campaign call and keep the job counters current.
    ///
    /// Call placement and repository bookkeeping are separate failure
    /// domains: a persistence failure after a successful placement still
    /// counts as a success, but lands in the error ring.
    ///
    /// `outcome` is the single-shot claim for this lead's terminal counter:
    /// whichever of this task or the join-timeout path flips it first gets
    /// to count the lead, so a placement that outlives its join timeout
    /// cannot be reported as both failed and succeeded.
    async fn place_campaign_call(
        &self,
        lead_id: LeadId,
        state: Arc<Mutex<JobState>>,
        outcome: Arc<AtomicBool>,
    ) {
        {
            let mut s = state.lock().await;
            s.initiated += 1;
        }

        let lead = match self.repo.get_by_id(lead_id).await {
            Ok(Some(lead)) => lead,
            Ok(None) => {
                if !outcome.swap(true, Ordering::SeqCst) {
                    let mut s = state.lock().await;
                    s.failed += 1;
                    s.record_error(format!("lead {lead_id}: not found"));
                }
                return;
            }
            Err(err) => {
                if !outcome.swap(true, Ordering::SeqCst) {
                    let mut s = state.lock().await;
                    s.failed += 1;
                    s.record_error(format!("lead {lead_id}: fetch failed: {err}"));
                }
                return;
            }
        };

        match self.voice.initiate(&lead).await {
            Ok(placement) => {
                if !outcome.swap(true, Ordering::SeqCst) {
                    let mut s = state.lock().await;
                    s.succeeded += 1;
                }
                let mut patch = LeadPatch::default().status(CallStatus::Initiated);
                patch.external_call_id = Some(Some(placement.call_id));
                patch.last_call_at = Some(Utc::now());
                let persisted = with_backoff(self.backoff, "campaign_record_initiated", || {
                    self.repo.update_fields(lead_id, &patch)
                })
                .await;
                if let Err(err) = persisted {
                    warn!(%lead_id, error = %err, "campaign bookkeeping write failed");
                    let mut s = state.lock().await;
                    s.record_error(format!("lead {lead_id}: bookkeeping failed: {err}"));
                }
            }
            Err(err) => {
                if !outcome.swap(true, Ordering::SeqCst) {
                    let mut s = state.lock().await;
                    s.failed += 1;
                    s.record_error(format!("lead {lead_id}: placement failed: {err}"));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_ring_is_bounded() {
        let mut state = JobState {
            status: JobStatus::Running,
            total_leads: 0,
            initiated: 0,
            succeeded: 0,
            failed: 0,
            current_batch: 0,
            total_batches: 0,
            errors: VecDeque::new(),
        };
        for i in 0..25 {
            state.record_error(format!("error {i}"));
        }
        assert_eq!(state.errors.len(), ERROR_RING_CAPACITY);
        assert_eq!(state.errors.front().map(String::as_str), Some("error 15"));
        assert_eq!(state.errors.back().map(String::as_str), Some("error 24"));
    }

    #[test]
    fn batch_partitioning_rounds_up() {
        assert_eq!(12usize.div_ceil(5), 3);
        assert_eq!(10usize.div_ceil(5), 2);
        assert_eq!(1usize.div_ceil(5), 1);
    }
}
