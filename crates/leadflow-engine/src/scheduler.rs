// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Periodic job runner for the orchestrator and reconciliation sweeps.
//!
//! Each job runs on its own timer with single-instance execution by
//! construction: the loop awaits the sweep before asking the timer for the
//! next tick, and `MissedTickBehavior::Delay` absorbs overruns instead of
//! firing a burst of catch-up ticks. Shutdown is cooperative; an in-flight
//! sweep finishes before the loop exits.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::orchestrator::Orchestrator;
use crate::reconcile::Reconciler;

pub struct Scheduler {
    orchestrator: Arc<Orchestrator>,
    reconciler: Arc<Reconciler>,
    orchestrator_interval: Duration,
    reconciliation_interval: Duration,
    cancel: CancellationToken,
    tasks: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        reconciler: Arc<Reconciler>,
        orchestrator_interval: Duration,
        reconciliation_interval: Duration,
    ) -> Self {
        Self {
            orchestrator,
            reconciler,
            orchestrator_interval,
            reconciliation_interval,
            cancel: CancellationToken::new(),
            tasks: tokio::sync::Mutex::new(Vec::new()),
        }
    }

    /// Spawn both periodic jobs. Idempotent start is not supported; call once.
    pub async fn start(&self) {
        info!(
            orchestrator_secs = self.orchestrator_interval.as_secs(),
            reconciliation_secs = self.reconciliation_interval.as_secs(),
            "scheduler starting"
        );

        let orchestrator = Arc::clone(&self.orchestrator);
        let cancel = self.cancel.clone();
        let interval = self.orchestrator_interval;
        let orchestrator_task = tokio::spawn(async move {
            run_periodic("orchestrator", interval, cancel, move || {
                let orchestrator = Arc::clone(&orchestrator);
                async move {
                    orchestrator.sweep().await.map(|_| ())
                }
            })
            .await;
        });

        let reconciler = Arc::clone(&self.reconciler);
        let cancel = self.cancel.clone();
        let interval = self.reconciliation_interval;
        let reconciliation_task = tokio::spawn(async move {
            run_periodic("reconciliation", interval, cancel, move || {
                let reconciler = Arc::clone(&reconciler);
                async move {
                    reconciler.sweep().await.map(|_| ())
                }
            })
            .await;
        });

        let mut tasks = self.tasks.lock().await;
        tasks.push(orchestrator_task);
        tasks.push(reconciliation_task);
    }

    /// Stop both jobs, waiting for any in-flight sweep to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let mut tasks = self.tasks.lock().await;
        for task in tasks.drain(..) {
            let _ = task.await;
        }
        info!("scheduler stopped");
    }
}

/// Drive one named job on a fixed cadence until cancelled.
async fn run_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    mut job: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), leadflow_core::LeadflowError>>,
{
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick is immediate; skip it so startup does not double-run
    // jobs the caller may have already primed.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!(job = name, "periodic job stopping");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = job().await {
                    error!(job = name, error = %err, "periodic job run failed");
                }
            }
        }
    }
}
