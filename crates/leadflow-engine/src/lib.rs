// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration core of the Leadflow engagement engine.
//!
//! This crate holds everything that decides what happens to a lead: the
//! retry ladder ([`retry`]), ended-reason classification ([`classify`]),
//! callback parsing ([`callback`]), the event-driven state machine
//! ([`processor`]), fallback sequencing ([`fallback`]), the periodic
//! orchestrator and reconciliation sweeps ([`orchestrator`], [`reconcile`],
//! [`scheduler`]), and the batch campaign worker ([`batch`]). All I/O goes
//! through the adapter traits in `leadflow-core`.

pub mod backoff;
pub mod batch;
pub mod callback;
pub mod classify;
pub mod fallback;
pub mod orchestrator;
pub mod processor;
pub mod reconcile;
pub mod retry;
pub mod scheduler;

pub use backoff::{with_backoff, BackoffPolicy};
pub use batch::{BatchSpec, BatchWorker, JobProgress, JobStatus};
pub use callback::{detect_callback_intent, parse_callback_time};
pub use classify::{EndedOutcome, ReasonClassifier};
pub use fallback::FallbackSequencer;
pub use orchestrator::{Orchestrator, SweepStats};
pub use processor::EventProcessor;
pub use reconcile::{ReconcileStats, Reconciler};
pub use retry::RetryPolicy;
pub use scheduler::Scheduler;
