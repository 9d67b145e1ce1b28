//! Structured logging and metrics init.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

/// Installs a `tracing` subscriber (JSON or compact, per config) and a
/// Prometheus metrics recorder, returning the handle the `/metrics` HTTP
/// handler renders from. Call once at process start.
pub fn init(config: &Config) -> anyhow::Result<PrometheusHandle> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("failed to install prometheus metrics recorder: {e}"))
}
