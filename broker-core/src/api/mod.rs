//! HTTP and WebSocket boundary.
//!
//! Handlers never touch `DashMap`s or locks directly — every operation goes
//! through `IntentEngine`, `ProviderRegistry`, or `PaymentOrchestrator`, so
//! the invariants those modules enforce (the per-intent critical section,
//! escrow's one-way status transitions) can't be bypassed from here.

pub mod dto;
pub mod handlers;
pub mod websocket;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::engine::IntentEngine;
use crate::payment::PaymentOrchestrator;
use crate::push::PushLayer;
use crate::registry::ProviderRegistry;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<IntentEngine>,
    pub registry: Arc<ProviderRegistry>,
    pub payment: Arc<PaymentOrchestrator>,
    pub push: Arc<PushLayer>,
    pub metrics_handle: PrometheusHandle,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .route("/ws", get(websocket::ws_handler))
        .route("/intents", post(handlers::create_intent).get(handlers::get_open_intents))
        .route("/intents/:intent_id", get(handlers::get_intent))
        .route("/intents/:intent_id/bids", post(handlers::submit_bid).get(handlers::get_bids_for_intent))
        .route("/intents/:intent_id/bids/close", post(handlers::force_close_bidding))
        .route("/intents/:intent_id/acknowledge", post(handlers::acknowledge_assignment))
        .route("/intents/:intent_id/result", post(handlers::report_result))
        .route("/intents/:intent_id/failure", post(handlers::report_failure))
        .route("/providers", post(handlers::register_provider).get(handlers::list_providers))
        .route("/providers/stats", get(handlers::provider_stats))
        .route("/providers/:provider_id", get(handlers::get_provider))
        .route("/providers/:provider_id/heartbeat", post(handlers::heartbeat))
        .route("/providers/by-address/:address", get(handlers::get_provider_by_address))
        .route("/payments/:intent_id/settlement", get(handlers::get_settlement))
        .route("/payments/stats", get(handlers::payment_stats))
        .route("/push/stats", get(handlers::push_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
