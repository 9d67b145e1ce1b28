//! HTTP handlers. Each one parses its request, calls exactly one core
//! operation, and returns `Result<impl IntoResponse, BrokerError>` — the
//! `IntoResponse` impl on `BrokerError` does the status-code mapping.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::collections::HashMap;

use crate::domain::{IntentId, ProviderId};
use crate::error::{BrokerError, Result};

use super::dto::{
    AcknowledgeAssignmentBody, CreateIntentBody, RegisterProviderBody, ReportFailureBody,
    ReportResultBody, SubmitBidBody,
};
use super::AppState;

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    let body = state.metrics_handle.render();
    ([(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// --- Intent API ----------------------------------------------------------

pub async fn create_intent(
    State(state): State<AppState>,
    Json(body): Json<CreateIntentBody>,
) -> Result<impl IntoResponse> {
    let intent = state.engine.create_intent(body.into_request()?).await?;
    Ok((StatusCode::CREATED, Json(intent)))
}

pub async fn submit_bid(
    State(state): State<AppState>,
    Path(intent_id): Path<IntentId>,
    Json(body): Json<SubmitBidBody>,
) -> Result<impl IntoResponse> {
    let bid = state.engine.submit_bid(body.into_request(intent_id)?).await?;
    Ok((StatusCode::CREATED, Json(bid)))
}

pub async fn get_intent(State(state): State<AppState>, Path(intent_id): Path<IntentId>) -> Result<impl IntoResponse> {
    Ok(Json(state.engine.get_intent(intent_id).await?))
}

pub async fn get_bids_for_intent(
    State(state): State<AppState>,
    Path(intent_id): Path<IntentId>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.engine.get_bids_for_intent(intent_id).await?))
}

pub async fn get_open_intents(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.engine.get_open_intents().await)
}

pub async fn report_result(
    State(state): State<AppState>,
    Path(intent_id): Path<IntentId>,
    Json(body): Json<ReportResultBody>,
) -> Result<impl IntoResponse> {
    state
        .engine
        .report_result(intent_id, body.provider_id, body.data, body.execution_time_ms)
        .await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn report_failure(
    State(state): State<AppState>,
    Path(intent_id): Path<IntentId>,
    Json(body): Json<ReportFailureBody>,
) -> Result<impl IntoResponse> {
    state.engine.report_failure(intent_id, body.provider_id).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn force_close_bidding(
    State(state): State<AppState>,
    Path(intent_id): Path<IntentId>,
) -> Result<impl IntoResponse> {
    state.engine.force_close_bidding(intent_id).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn acknowledge_assignment(
    State(state): State<AppState>,
    Path(intent_id): Path<IntentId>,
    Json(body): Json<AcknowledgeAssignmentBody>,
) -> Result<impl IntoResponse> {
    state.engine.acknowledge_assignment(intent_id, body.provider_id).await?;
    Ok(StatusCode::ACCEPTED)
}

// --- Provider API ---------------------------------------------------------

pub async fn register_provider(
    State(state): State<AppState>,
    Json(body): Json<RegisterProviderBody>,
) -> Result<impl IntoResponse> {
    if body.name.trim().is_empty() {
        return Err(BrokerError::validation("provider name must not be empty"));
    }
    if body.capabilities.is_empty() {
        return Err(BrokerError::validation("provider must declare at least one capability"));
    }
    let provider = state.registry.register(
        body.address,
        body.name,
        body.capabilities.into_iter().collect(),
        body.tee_attested,
    );
    Ok((StatusCode::CREATED, Json(provider)))
}

pub async fn heartbeat(
    State(state): State<AppState>,
    Path(provider_id): Path<ProviderId>,
) -> Result<impl IntoResponse> {
    state.registry.heartbeat(provider_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_provider(
    State(state): State<AppState>,
    Path(provider_id): Path<ProviderId>,
) -> Result<impl IntoResponse> {
    state
        .registry
        .get(provider_id)
        .map(Json)
        .ok_or_else(|| BrokerError::unknown_provider(provider_id))
}

pub async fn get_provider_by_address(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<impl IntoResponse> {
    state
        .registry
        .get_by_address(&address)
        .map(Json)
        .ok_or_else(|| BrokerError::unknown_provider(address))
}

pub async fn list_providers(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    match params.get("capability") {
        Some(cap) => Json(state.registry.find_by_capability(cap)),
        None => Json(state.registry.all()),
    }
}

pub async fn provider_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.registry.stats())
}

// --- Payment API (read-only at the boundary; mutation is engine-owned) ---

pub async fn get_settlement(
    State(state): State<AppState>,
    Path(intent_id): Path<IntentId>,
) -> Result<impl IntoResponse> {
    state
        .payment
        .get_settlement(intent_id)
        .map(Json)
        .ok_or_else(BrokerError::no_settlement_recorded)
}

pub async fn payment_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.payment.stats())
}

// --- Push API --------------------------------------------------------------

pub async fn push_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.push.stats())
}
