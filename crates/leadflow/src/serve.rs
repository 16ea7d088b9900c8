// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadflow serve` command implementation.
//!
//! Wires storage, the voice and messaging gateways, the event processor,
//! the periodic sweeps, and the HTTP surface together, then runs until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use leadflow_config::LeadflowConfig;
use leadflow_core::{EmailGateway, LeadRepository, LeadflowError, VoiceGateway, WhatsappGateway};
use leadflow_email::EmailClient;
use leadflow_engine::{
    BatchWorker, EventProcessor, FallbackSequencer, Orchestrator, ReasonClassifier, Reconciler,
    RetryPolicy, Scheduler,
};
use leadflow_gateway::{AppState, start_server};
use leadflow_storage::{CachedLeadRepository, Database, SqliteLeadRepository};
use leadflow_voice::VoiceClient;
use leadflow_whatsapp::WhatsappClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Runs the `leadflow serve` command.
pub async fn run_serve(config: LeadflowConfig) -> Result<(), LeadflowError> {
    init_tracing(&config.engine.log_level);

    info!("starting leadflow serve");

    // Storage, with the short-TTL read cache in front.
    let db = Database::open(&config.storage.database_path).await?;
    let sqlite: Arc<dyn LeadRepository> = Arc::new(SqliteLeadRepository::new(db));
    let repo: Arc<dyn LeadRepository> = Arc::new(CachedLeadRepository::new(
        sqlite,
        Duration::from_secs(config.storage.cache_ttl_secs),
    ));

    // External gateways.
    let voice: Arc<dyn VoiceGateway> = Arc::new(VoiceClient::new(&config.voice)?);
    let whatsapp: Arc<dyn WhatsappGateway> = Arc::new(WhatsappClient::new(&config.whatsapp)?);
    let email: Arc<dyn EmailGateway> = Arc::new(EmailClient::new(&config.email)?);
    if whatsapp.is_dry_run() {
        info!("whatsapp channel running in dry-run mode");
    }
    if email.is_dry_run() {
        info!("email channel running in dry-run mode");
    }

    // Event processing pipeline.
    let fallback = Arc::new(FallbackSequencer::new(
        Arc::clone(&repo),
        whatsapp,
        email,
        config.whatsapp.clone(),
        config.email.clone(),
    ));
    let processor = Arc::new(EventProcessor::new(
        Arc::clone(&repo),
        Arc::clone(&voice),
        fallback,
        RetryPolicy::new(&config.retry),
        ReasonClassifier::new(&config.classification),
        config.engine.post_success_followup,
    ));

    // Periodic sweeps.
    let orchestrator = Arc::new(Orchestrator::new(
        Arc::clone(&repo),
        Arc::clone(&voice),
        config.engine.include_new_leads,
    ));
    let reconciler = Arc::new(Reconciler::new(Arc::clone(&repo), Arc::clone(&voice)));
    let scheduler = Scheduler::new(
        orchestrator,
        reconciler,
        Duration::from_secs(config.engine.orchestrator_interval_secs),
        Duration::from_secs(config.engine.reconciliation_interval_secs),
    );
    scheduler.start().await;

    // Batch campaign worker and HTTP surface.
    let batch = Arc::new(BatchWorker::new(Arc::clone(&repo), Arc::clone(&voice)));
    let state = AppState {
        repo,
        processor,
        batch,
        batch_defaults: config.batch.clone(),
        retry_config: config.retry.clone(),
        start_time: Instant::now(),
    };

    let shutdown = shutdown_token();
    let server = start_server(&config.gateway, state, shutdown.clone());

    let result = server.await;

    // Reached on shutdown signal or bind failure; stop the sweeps either way.
    scheduler.stop().await;
    info!("leadflow stopped");
    result
}

/// Returns a token cancelled on SIGINT or SIGTERM.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signal_token = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT, initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(err) => {
                    debug!(error = %err, "failed to install SIGTERM handler");
                    let _ = ctrl_c.await;
                    info!("received SIGINT, initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        signal_token.cancel();
    });

    token
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
