//! Runtime configuration.
//!
//! Every field is one of the configuration keys the broker recognizes;
//! `main.rs` translates this flat set into the per-module `*Config`
//! structs (`EngineConfig`, `RegistryConfig`, `PushConfig`,
//! `PaymentConfig`) each module actually takes.

use std::time::Duration as StdDuration;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub json_logging: bool,

    pub auction_bidding_duration_default_ms: u64,
    pub auction_execution_grace_ms: u64,
    pub failover_depth: usize,
    /// Platform fee, in permille (parts per thousand), 0-1000.
    pub platform_fee_permille: u32,
    pub escrow_ttl_ms: u64,
    pub heartbeat_liveness_window_ms: u64,
    pub heartbeat_sweep_interval_ms: u64,
    pub push_batch_interval_ms: u64,
    pub push_max_batch_size: usize,
    pub push_backpressure_threshold: usize,
    pub facilitator_timeout_ms: u64,
    pub demo_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            json_logging: true,

            auction_bidding_duration_default_ms: 30_000,
            auction_execution_grace_ms: 60_000,
            failover_depth: 3,
            platform_fee_permille: 50, // 5%
            escrow_ttl_ms: 30 * 60 * 1000,
            heartbeat_liveness_window_ms: 60_000,
            heartbeat_sweep_interval_ms: 15_000,
            push_batch_interval_ms: 100,
            push_max_batch_size: 50,
            push_backpressure_threshold: 100,
            facilitator_timeout_ms: 10_000,
            demo_mode: true,
        }
    }
}

impl Config {
    /// Load from the environment (`BROKER__FIELD_NAME`), falling back to
    /// defaults for anything unset.
    pub fn load() -> anyhow::Result<Self> {
        let builder = config::Config::builder()
            .add_source(config::Environment::with_prefix("BROKER").separator("__"));
        let cfg = builder.build()?;
        Ok(cfg.try_deserialize()?)
    }

    pub fn engine_config(&self) -> crate::engine::EngineConfig {
        crate::engine::EngineConfig {
            bidding_duration_default: StdDuration::from_millis(self.auction_bidding_duration_default_ms),
            execution_grace: StdDuration::from_millis(self.auction_execution_grace_ms),
            failover_depth: self.failover_depth,
        }
    }

    pub fn registry_config(&self) -> crate::registry::RegistryConfig {
        crate::registry::RegistryConfig {
            liveness_window: chrono::Duration::milliseconds(self.heartbeat_liveness_window_ms as i64),
            sweep_interval: StdDuration::from_millis(self.heartbeat_sweep_interval_ms),
        }
    }

    pub fn push_config(&self) -> crate::push::PushConfig {
        crate::push::PushConfig {
            backpressure_threshold: self.push_backpressure_threshold,
            batch_interval: StdDuration::from_millis(self.push_batch_interval_ms),
            max_batch_size: self.push_max_batch_size,
        }
    }

    pub fn payment_config(&self) -> crate::payment::PaymentConfig {
        crate::payment::PaymentConfig {
            escrow_ttl: chrono::Duration::milliseconds(self.escrow_ttl_ms as i64),
            fee_rate_micros: self.platform_fee_permille * 1000,
            facilitator_timeout: StdDuration::from_millis(self.facilitator_timeout_ms),
            sweep_interval: StdDuration::from_millis(self.heartbeat_sweep_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_fee_rate_is_five_percent_in_ppm() {
        let config = Config::default();
        assert_eq!(config.payment_config().fee_rate_micros, 50_000);
    }
}
