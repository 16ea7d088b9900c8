// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Route layout:
//! - `GET /health`, `POST /webhook/voice` — open (the platform does not
//!   sign webhook deliveries; correlation ids are unguessable UUIDs).
//! - `/v1/*` — campaign control, lead intake, retry-config introspection,
//!   behind bearer-token middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    middleware as axum_middleware,
    routing::{delete, get, post},
    Router,
};
use leadflow_config::{BatchConfig, GatewayConfig, RetryConfig};
use leadflow_core::{LeadRepository, LeadflowError};
use leadflow_engine::batch::BatchWorker;
use leadflow_engine::processor::EventProcessor;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{auth_middleware, AuthConfig};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn LeadRepository>,
    pub processor: Arc<EventProcessor>,
    pub batch: Arc<BatchWorker>,
    pub batch_defaults: BatchConfig,
    pub retry_config: RetryConfig,
    pub start_time: Instant,
}

/// Build the full router. Split out from [`start_server`] so tests can
/// drive it without binding a socket.
pub fn build_router(state: AppState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/webhook/voice", post(handlers::post_voice_webhook))
        .with_state(state.clone());

    let control_routes = Router::new()
        .route("/v1/campaigns", post(handlers::post_campaign))
        .route("/v1/campaigns/active", get(handlers::get_active_campaign))
        .route(
            "/v1/campaigns/{id}",
            get(handlers::get_campaign).delete(handlers::delete_campaign),
        )
        .route("/v1/leads", post(handlers::post_lead))
        .route("/v1/leads/{id}", delete(handlers::delete_lead))
        .route("/v1/retry-config", get(handlers::get_retry_config))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(control_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Start the gateway HTTP server; runs until `shutdown` is cancelled.
pub async fn start_server(
    config: &GatewayConfig,
    state: AppState,
    shutdown: CancellationToken,
) -> Result<(), LeadflowError> {
    let auth = AuthConfig {
        bearer_token: config.bearer_token.clone(),
    };
    let app = build_router(state, auth);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeadflowError::Gateway {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| LeadflowError::Gateway {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}
