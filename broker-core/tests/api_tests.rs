//! Integration tests driving the HTTP boundary end to end: a client posts
//! an intent, a provider bids and wins, execution is acknowledged and
//! reported, and the settlement becomes visible through the read-only
//! payment endpoint.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use broker_core::api::{self, AppState};
use broker_core::prelude::*;

fn metrics_handle() -> metrics_exporter_prometheus::PrometheusHandle {
    static HANDLE: OnceLock<metrics_exporter_prometheus::PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("install prometheus recorder once per test binary")
        })
        .clone()
}

fn test_app() -> axum::Router {
    let clock = clock::system();
    let push = PushLayer::new(PushConfig::default());
    let registry = ProviderRegistry::new(RegistryConfig::default(), clock.clone(), push.clone());
    let facilitator: Arc<dyn PaymentFacilitator> = Arc::new(DemoFacilitator);
    let payment = PaymentOrchestrator::new(PaymentConfig::default(), clock.clone(), facilitator);
    let engine = IntentEngine::new(
        EngineConfig::default(),
        clock,
        registry.clone(),
        payment.clone(),
        push.clone(),
        ScoreWeightTable::default(),
    );

    api::build_router(AppState {
        engine,
        registry,
        payment,
        push,
        metrics_handle: metrics_handle(),
    })
}

async fn request(app: &axum::Router, method: &str, path: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(value) => Body::from(serde_json::to_vec(&value).unwrap()),
        None => Body::empty(),
    };
    let req = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, json)
}

async fn register_and_heartbeat(app: &axum::Router, address: &str, capability: &str) -> String {
    let (status, provider) = request(
        app,
        "POST",
        "/providers",
        Some(json!({
            "address": address,
            "name": format!("{address}-worker"),
            "capabilities": [capability],
            "tee_attested": true,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let provider_id = provider["id"].as_str().unwrap().to_string();

    let (status, _) = request(app, "POST", &format!("/providers/{provider_id}/heartbeat"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    provider_id
}

#[tokio::test]
async fn health_check_reports_ok() {
    let app = test_app();
    let (status, body) = request(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn happy_path_end_to_end_through_http() {
    let app = test_app();

    let provider_id = register_and_heartbeat(&app, "0xprovider1", "compute.render").await;

    let (status, intent) = request(
        &app,
        "POST",
        "/intents",
        Some(json!({
            "type": "compute.render",
            "client_address": "0xclient1",
            "max_budget": "0.020000",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let intent_id = intent["id"].as_str().unwrap().to_string();
    assert_eq!(intent["status"], "OPEN");

    let (status, bid) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/bids"),
        Some(json!({
            "provider_id": provider_id,
            "bid_amount": "0.010000",
            "estimated_time_ms": 1500,
            "confidence": 90,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(bid["bid_amount"], "0.010000");

    let (status, _) = request(&app, "POST", &format!("/intents/{intent_id}/bids/close"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, intent) = request(&app, "GET", &format!("/intents/{intent_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["status"], "ASSIGNED");
    assert_eq!(intent["assigned_provider"], provider_id);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/acknowledge"),
        Some(json!({ "provider_id": provider_id })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, intent) = request(&app, "GET", &format!("/intents/{intent_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["status"], "EXECUTING");

    let (status, _) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/result"),
        Some(json!({
            "provider_id": provider_id,
            "data": { "frames": 120 },
            "execution_time_ms": 1400,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, intent) = request(&app, "GET", &format!("/intents/{intent_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["status"], "COMPLETED");

    let (status, settlement) = request(&app, "GET", &format!("/payments/{intent_id}/settlement"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(settlement["success"], true);
    assert_eq!(settlement["amount"], "0.010000");
    assert_eq!(settlement["platform_fee"], "0.000500");
    assert_eq!(settlement["net_amount"], "0.009500");

    let (status, stats) = request(&app, "GET", "/payments/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["escrows_released"], 1);
    assert_eq!(stats["total_settled"], "0.010000");
}

#[tokio::test]
async fn failure_report_triggers_failover_to_next_bidder() {
    let app = test_app();

    let winner_id = register_and_heartbeat(&app, "0xprovider-winner", "compute.render").await;
    let runner_up_id = register_and_heartbeat(&app, "0xprovider-runnerup", "compute.render").await;

    let (_, intent) = request(
        &app,
        "POST",
        "/intents",
        Some(json!({
            "type": "compute.render",
            "client_address": "0xclient3",
            "max_budget": "0.050000",
        })),
    )
    .await;
    let intent_id = intent["id"].as_str().unwrap().to_string();

    let (status, _) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/bids"),
        Some(json!({
            "provider_id": winner_id,
            "bid_amount": "0.010000",
            "estimated_time_ms": 1000,
            "confidence": 95,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/bids"),
        Some(json!({
            "provider_id": runner_up_id,
            "bid_amount": "0.020000",
            "estimated_time_ms": 2000,
            "confidence": 70,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = request(&app, "POST", &format!("/intents/{intent_id}/bids/close"), None).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (_, intent) = request(&app, "GET", &format!("/intents/{intent_id}"), None).await;
    assert_eq!(intent["assigned_provider"], winner_id);

    let (status, _) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/failure"),
        Some(json!({ "provider_id": winner_id })),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, intent) = request(&app, "GET", &format!("/intents/{intent_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["status"], "ASSIGNED");
    assert_eq!(intent["assigned_provider"], runner_up_id);
}

#[tokio::test]
async fn unknown_intent_returns_not_found_with_error_envelope() {
    let app = test_app();
    let (status, body) = request(&app, "GET", &format!("/intents/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "UNKNOWN_INTENT_ID");
}

#[tokio::test]
async fn bid_exceeding_budget_is_rejected() {
    let app = test_app();

    let provider_id = register_and_heartbeat(&app, "0xprovider2", "compute.render").await;

    let (_, intent) = request(
        &app,
        "POST",
        "/intents",
        Some(json!({
            "type": "compute.render",
            "client_address": "0xclient2",
            "max_budget": "0.010000",
        })),
    )
    .await;
    let intent_id = intent["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/bids"),
        Some(json!({
            "provider_id": provider_id,
            "bid_amount": "0.020000",
            "estimated_time_ms": 1000,
            "confidence": 80,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"]["code"], "BID_EXCEEDS_BUDGET");
}

#[tokio::test]
async fn bid_from_offline_provider_is_rejected() {
    let app = test_app();

    let (_, provider) = request(
        &app,
        "POST",
        "/providers",
        Some(json!({
            "address": "0xprovider-offline",
            "name": "never-heartbeat",
            "capabilities": ["compute.render"],
        })),
    )
    .await;
    let provider_id = provider["id"].as_str().unwrap().to_string();

    let (_, intent) = request(
        &app,
        "POST",
        "/intents",
        Some(json!({
            "type": "compute.render",
            "client_address": "0xclient4",
            "max_budget": "0.010000",
        })),
    )
    .await;
    let intent_id = intent["id"].as_str().unwrap().to_string();

    let (status, body) = request(
        &app,
        "POST",
        &format!("/intents/{intent_id}/bids"),
        Some(json!({
            "provider_id": provider_id,
            "bid_amount": "0.005000",
            "estimated_time_ms": 1000,
            "confidence": 80,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "PROVIDER_NOT_ONLINE");
}
