//! Broker server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use broker_core::api::{self, AppState};
use broker_core::observability;
use broker_core::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("warning: could not load config ({e}); using defaults");
        Config::default()
    });

    let metrics_handle = observability::init(&config)?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting broker server");

    let clock = clock::system();
    let push = PushLayer::new(config.push_config());
    let registry = ProviderRegistry::new(config.registry_config(), clock.clone(), push.clone());
    let facilitator: Arc<dyn PaymentFacilitator> = Arc::new(DemoFacilitator);
    let payment = PaymentOrchestrator::new(config.payment_config(), clock.clone(), facilitator);
    let engine = IntentEngine::new(
        config.engine_config(),
        clock.clone(),
        registry.clone(),
        payment.clone(),
        push.clone(),
        ScoreWeightTable::default(),
    );

    registry.spawn_liveness_sweep();
    push.spawn_flush_task();
    payment.spawn_expiry_sweep();

    let state = AppState {
        engine,
        registry,
        payment,
        push,
        metrics_handle,
    };
    let app = api::build_router(state);

    let host: std::net::IpAddr = config.host.parse().unwrap_or(std::net::IpAddr::from([0, 0, 0, 0]));
    let addr = SocketAddr::from((host, config.port));
    tracing::info!(address = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
