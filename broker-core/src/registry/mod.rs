//! Provider Registry (component B).
//!
//! Providers live in a `DashMap` keyed by id, with secondary `DashMap`
//! indexes by address and by capability, so a read or write for one
//! provider never blocks access to another.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::clock::SharedClock;
use crate::domain::{Provider, ProviderId, ProviderStatus};
use crate::error::{BrokerError, Result};
use crate::push::{PushEvent, PushLayer};

const EMA_ALPHA: f64 = 0.1;
const DELTA_SUCCESS: f64 = 0.05;
const DELTA_FAILURE: f64 = 0.10;

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub liveness_window: Duration,
    pub sweep_interval: StdDuration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            liveness_window: Duration::seconds(60),
            sweep_interval: StdDuration::from_secs(15),
        }
    }
}

#[derive(Debug, Default, Serialize)]
pub struct RegistryStats {
    pub total_providers: u64,
    pub online_providers: u64,
}

pub struct ProviderRegistry {
    config: RegistryConfig,
    clock: SharedClock,
    push: Arc<PushLayer>,
    providers: DashMap<ProviderId, Provider>,
    by_address: DashMap<String, ProviderId>,
    capability_index: DashMap<String, HashSet<ProviderId>>,
    online_count: AtomicU64,
}

impl ProviderRegistry {
    pub fn new(config: RegistryConfig, clock: SharedClock, push: Arc<PushLayer>) -> Arc<Self> {
        Arc::new(Self {
            config,
            clock,
            push,
            providers: DashMap::new(),
            by_address: DashMap::new(),
            capability_index: DashMap::new(),
            online_count: AtomicU64::new(0),
        })
    }

    /// Idempotent by address: an already-known address returns the
    /// existing provider unchanged.
    pub fn register(
        &self,
        address: String,
        name: String,
        capabilities: HashSet<String>,
        tee_attested: bool,
    ) -> Provider {
        if let Some(existing_id) = self.by_address.get(&address) {
            if let Some(existing) = self.providers.get(&existing_id) {
                return existing.clone();
            }
        }
        let provider = Provider::new(address.clone(), name, capabilities.clone(), tee_attested, self.clock.now());
        self.by_address.insert(address, provider.id);
        self.rebuild_capability_index_entry(provider.id, &capabilities);
        self.providers.insert(provider.id, provider.clone());
        provider
    }

    fn rebuild_capability_index_entry(&self, id: ProviderId, capabilities: &HashSet<String>) {
        for cap in capabilities {
            self.capability_index.entry(cap.clone()).or_default().insert(id);
        }
    }

    pub fn get(&self, id: ProviderId) -> Option<Provider> {
        self.providers.get(&id).map(|p| p.clone())
    }

    pub fn get_by_address(&self, address: &str) -> Option<Provider> {
        let id = self.by_address.get(address)?;
        self.get(*id)
    }

    pub fn all(&self) -> Vec<Provider> {
        self.providers.iter().map(|e| e.value().clone()).collect()
    }

    /// Hierarchical match: a provider declaring the prefix of `cap` up to
    /// the first `.` also matches.
    pub fn find_by_capability(&self, cap: &str) -> Vec<Provider> {
        let mut ids: HashSet<ProviderId> = HashSet::new();
        if let Some(exact) = self.capability_index.get(cap) {
            ids.extend(exact.iter().copied());
        }
        if let Some((prefix, _)) = cap.split_once('.') {
            if let Some(prefix_ids) = self.capability_index.get(prefix) {
                ids.extend(prefix_ids.iter().copied());
            }
        }
        ids.into_iter().filter_map(|id| self.get(id)).collect()
    }

    pub fn heartbeat(&self, id: ProviderId) -> Result<()> {
        let mut entry = self
            .providers
            .get_mut(&id)
            .ok_or_else(|| BrokerError::unknown_provider(id))?;
        entry.last_heartbeat_at = self.clock.now();
        let was_offline = entry.status == ProviderStatus::Offline;
        if was_offline {
            entry.status = ProviderStatus::Online;
            self.online_count.fetch_add(1, Ordering::Relaxed);
        }
        let snapshot = entry.clone();
        drop(entry);
        if was_offline {
            self.push.emit(PushEvent::ProviderOnline { provider: snapshot });
        }
        Ok(())
    }

    pub fn record_job_success(&self, id: ProviderId, execution_time_ms: u64, earnings: crate::domain::MinorUnits) -> Result<()> {
        let mut entry = self
            .providers
            .get_mut(&id)
            .ok_or_else(|| BrokerError::unknown_provider(id))?;
        entry.total_jobs += 1;
        entry.successful_jobs += 1;
        entry.avg_response_time_ms =
            EMA_ALPHA * execution_time_ms as f64 + (1.0 - EMA_ALPHA) * entry.avg_response_time_ms;
        entry.total_earnings = entry.total_earnings.checked_add(earnings).unwrap_or(entry.total_earnings);
        entry.reputation_score = (entry.reputation_score + DELTA_SUCCESS).min(5.0);
        let snapshot = entry.clone();
        drop(entry);
        self.push.emit(PushEvent::ProviderUpdated { provider: snapshot });
        Ok(())
    }

    pub fn record_job_failure(&self, id: ProviderId) -> Result<()> {
        let mut entry = self
            .providers
            .get_mut(&id)
            .ok_or_else(|| BrokerError::unknown_provider(id))?;
        entry.total_jobs += 1;
        entry.reputation_score = (entry.reputation_score - DELTA_FAILURE).max(0.0);
        let snapshot = entry.clone();
        drop(entry);
        self.push.emit(PushEvent::ProviderUpdated { provider: snapshot });
        Ok(())
    }

    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_providers: self.providers.len() as u64,
            online_providers: self.online_count.load(Ordering::Relaxed),
        }
    }

    /// Marks any provider whose last heartbeat is older than the liveness
    /// window as `OFFLINE`, emitting `provider:offline` for each.
    pub fn sweep_liveness(&self) {
        let cutoff = self.clock.now() - self.config.liveness_window;
        let mut newly_offline = Vec::new();
        for mut entry in self.providers.iter_mut() {
            if entry.status == ProviderStatus::Online && entry.last_heartbeat_at < cutoff {
                entry.status = ProviderStatus::Offline;
                newly_offline.push(entry.clone());
            }
        }
        if !newly_offline.is_empty() {
            self.online_count
                .fetch_sub(newly_offline.len() as u64, Ordering::Relaxed);
        }
        for provider in newly_offline {
            self.push.emit(PushEvent::ProviderOffline { provider });
        }
    }

    pub fn spawn_liveness_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.sweep_liveness();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::ManualClock;

    fn registry() -> (Arc<ProviderRegistry>, Arc<ManualClock>) {
        let clock = ManualClock::new(chrono::Utc::now());
        let push = PushLayer::new(Default::default());
        let registry = ProviderRegistry::new(RegistryConfig::default(), clock.clone(), push);
        (registry, clock)
    }

    #[test]
    fn register_is_idempotent_by_address() {
        let (registry, _clock) = registry();
        let caps: HashSet<String> = ["weather.current".to_string()].into_iter().collect();
        let first = registry.register("addr-1".into(), "p1".into(), caps.clone(), false);
        let second = registry.register("addr-1".into(), "p2-different-name".into(), caps, false);
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "p1");
    }

    #[test]
    fn hierarchical_capability_match() {
        let (registry, _clock) = registry();
        let caps: HashSet<String> = ["weather".to_string()].into_iter().collect();
        let provider = registry.register("addr-1".into(), "p1".into(), caps, false);
        let found = registry.find_by_capability("weather.current");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, provider.id);
    }

    #[test]
    fn successful_jobs_never_exceeds_total_jobs() {
        let (registry, _clock) = registry();
        let caps: HashSet<String> = ["weather.current".to_string()].into_iter().collect();
        let provider = registry.register("addr-1".into(), "p1".into(), caps, false);
        registry.record_job_failure(provider.id).unwrap();
        registry.record_job_success(provider.id, 500, crate::domain::MinorUnits::ZERO).unwrap();
        let updated = registry.get(provider.id).unwrap();
        assert!(updated.successful_jobs <= updated.total_jobs);
        assert_eq!(updated.total_jobs, 2);
        assert_eq!(updated.successful_jobs, 1);
    }

    #[test]
    fn sweep_marks_stale_providers_offline() {
        let (registry, clock) = registry();
        let caps: HashSet<String> = ["weather.current".to_string()].into_iter().collect();
        let provider = registry.register("addr-1".into(), "p1".into(), caps, false);
        registry.heartbeat(provider.id).unwrap();
        clock.advance(Duration::seconds(61));
        registry.sweep_liveness();
        let updated = registry.get(provider.id).unwrap();
        assert_eq!(updated.status, ProviderStatus::Offline);
    }
}
