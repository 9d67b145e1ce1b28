//! Payment Orchestrator (component C).
//!
//! Escrow status moves `HELD -> {RELEASED, REFUNDED, EXPIRED}`, each a
//! one-way transition with no path back to `HELD`.

pub mod facilitator;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use dashmap::DashMap;
use serde::Serialize;
use tokio::task::JoinHandle;

use crate::clock::SharedClock;
use crate::domain::{EscrowEntry, EscrowStatus, IntentId, MinorUnits, PaymentSettlement};
use crate::error::{BrokerError, Result};

pub use facilitator::{DemoFacilitator, PaymentFacilitator, PaymentRequirements};

#[derive(Debug, Clone, Copy)]
pub struct PaymentConfig {
    pub escrow_ttl: Duration,
    pub fee_rate_micros: u32,
    pub facilitator_timeout: StdDuration,
    pub sweep_interval: StdDuration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            escrow_ttl: Duration::minutes(30),
            fee_rate_micros: 50_000, // 5% (parts-per-million)
            facilitator_timeout: StdDuration::from_secs(10),
            sweep_interval: StdDuration::from_secs(15),
        }
    }
}

/// A per-intent in-flight latch: only one `release_escrow` call may be
/// executing the facilitator round-trip for a given intent at a time.
struct SettlementLatch(AtomicBool);

#[derive(Debug, Default, Serialize)]
pub struct PaymentStats {
    pub escrows_held: u64,
    pub escrows_released: u64,
    pub escrows_refunded: u64,
    pub escrows_expired: u64,
    pub total_settled: MinorUnits,
    pub total_platform_fees: MinorUnits,
}

pub struct PaymentOrchestrator {
    config: PaymentConfig,
    clock: SharedClock,
    facilitator: Arc<dyn PaymentFacilitator>,
    escrows: DashMap<IntentId, EscrowEntry>,
    settlements: DashMap<IntentId, PaymentSettlement>,
    latches: DashMap<IntentId, SettlementLatch>,
}

impl PaymentOrchestrator {
    pub fn new(config: PaymentConfig, clock: SharedClock, facilitator: Arc<dyn PaymentFacilitator>) -> Arc<Self> {
        Arc::new(Self {
            config,
            clock,
            facilitator,
            escrows: DashMap::new(),
            settlements: DashMap::new(),
            latches: DashMap::new(),
        })
    }

    pub async fn create_escrow(
        &self,
        intent_id: IntentId,
        client_address: String,
        max_budget: MinorUnits,
        settlement_amount: MinorUnits,
        payment_payload: Option<String>,
        provider_address_hint: Option<String>,
    ) -> Result<EscrowEntry> {
        if let Some(payload) = &payment_payload {
            let requirements = PaymentRequirements {
                intent_id,
                amount: settlement_amount,
                client_address: client_address.clone(),
                provider_address: provider_address_hint.unwrap_or_default(),
            };
            let verified = tokio::time::timeout(
                self.config.facilitator_timeout,
                self.facilitator.verify(payload, &requirements),
            )
            .await
            .map_err(|_| BrokerError::facilitator_unreachable("verify timed out"))??;
            if !verified.valid {
                return Err(BrokerError::payment_payload_rejected(
                    verified.error.unwrap_or_else(|| "payment payload rejected".to_string()),
                ));
            }
        }

        let now = self.clock.now();
        let entry = EscrowEntry {
            intent_id,
            client_address,
            max_budget,
            settlement_amount,
            payment_payload,
            status: EscrowStatus::Held,
            created_at: now,
            expires_at: now + self.config.escrow_ttl,
        };
        self.escrows.insert(intent_id, entry.clone());
        Ok(entry)
    }

    fn fee_split(&self, amount: MinorUnits) -> (MinorUnits, MinorUnits) {
        let fee = amount.mul_rate_floor(self.config.fee_rate_micros);
        let net = amount.checked_sub(fee).unwrap_or(MinorUnits::ZERO);
        (fee, net)
    }

    /// Settle the escrow against the winning provider. Only one in-flight
    /// settlement per intent is allowed; a concurrent call fails fast.
    pub async fn release_escrow(&self, intent_id: IntentId, provider_address: String) -> Result<PaymentSettlement> {
        let latch = self
            .latches
            .entry(intent_id)
            .or_insert_with(|| SettlementLatch(AtomicBool::new(false)));
        if latch
            .0
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(BrokerError::settlement_in_progress());
        }
        let result = self.release_escrow_inner(intent_id, provider_address).await;
        latch.0.store(false, Ordering::SeqCst);
        result
    }

    async fn release_escrow_inner(&self, intent_id: IntentId, provider_address: String) -> Result<PaymentSettlement> {
        let escrow = self
            .escrows
            .get(&intent_id)
            .map(|e| e.clone())
            .ok_or_else(BrokerError::insufficient_escrow)?;
        if !escrow.is_active() {
            return Err(BrokerError::insufficient_escrow());
        }

        let requirements = PaymentRequirements {
            intent_id,
            amount: escrow.settlement_amount,
            client_address: escrow.client_address.clone(),
            provider_address: provider_address.clone(),
        };

        let settle_result = if self.facilitator.demo_mode() {
            self.facilitator.settle(&requirements).await
        } else {
            tokio::time::timeout(self.config.facilitator_timeout, self.facilitator.settle(&requirements))
                .await
                .map_err(|_| BrokerError::facilitator_unreachable("settle timed out"))?
        };

        let now = self.clock.now();
        let (platform_fee, net_amount) = self.fee_split(escrow.settlement_amount);

        let settlement = match settle_result {
            Ok(outcome) if outcome.success => {
                self.escrows.alter(&intent_id, |_, mut e| {
                    e.status = EscrowStatus::Released;
                    e
                });
                PaymentSettlement {
                    intent_id,
                    success: true,
                    amount: escrow.settlement_amount,
                    platform_fee,
                    net_amount,
                    provider_address,
                    tx_reference: outcome.tx_reference,
                    settled_at: now,
                    error: None,
                }
            }
            Ok(outcome) => PaymentSettlement {
                intent_id,
                success: false,
                amount: escrow.settlement_amount,
                platform_fee,
                net_amount,
                provider_address,
                tx_reference: None,
                settled_at: now,
                error: outcome.error.or(Some("settlement failed".to_string())),
            },
            Err(err) => {
                err.log();
                PaymentSettlement {
                    intent_id,
                    success: false,
                    amount: escrow.settlement_amount,
                    platform_fee,
                    net_amount,
                    provider_address,
                    tx_reference: None,
                    settled_at: now,
                    error: Some(err.user_message().to_string()),
                }
            }
        };

        self.settlements.insert(intent_id, settlement.clone());
        if !settlement.success {
            return Err(BrokerError::settlement_failed(
                settlement.error.clone().unwrap_or_else(|| "settlement failed".to_string()),
            ));
        }
        Ok(settlement)
    }

    /// Status-only transition `HELD -> REFUNDED`. No on-chain action is
    /// assumed to have occurred before release (spec §9 open question).
    pub fn refund_escrow(&self, intent_id: IntentId) -> Result<()> {
        let mut entry = self
            .escrows
            .get_mut(&intent_id)
            .ok_or_else(BrokerError::insufficient_escrow)?;
        if entry.status != EscrowStatus::Held {
            return Err(BrokerError::invalid_state_transition(
                "escrow is not in a refundable state",
            ));
        }
        entry.status = EscrowStatus::Refunded;
        Ok(())
    }

    pub fn get_settlement(&self, intent_id: IntentId) -> Option<PaymentSettlement> {
        self.settlements.get(&intent_id).map(|s| s.clone())
    }

    pub fn get_escrow(&self, intent_id: IntentId) -> Option<EscrowEntry> {
        self.escrows.get(&intent_id).map(|e| e.clone())
    }

    pub fn stats(&self) -> PaymentStats {
        let mut stats = PaymentStats::default();
        for entry in self.escrows.iter() {
            match entry.status {
                EscrowStatus::Held => stats.escrows_held += 1,
                EscrowStatus::Released => stats.escrows_released += 1,
                EscrowStatus::Refunded => stats.escrows_refunded += 1,
                EscrowStatus::Expired => stats.escrows_expired += 1,
            }
        }
        for entry in self.settlements.iter() {
            if entry.success {
                stats.total_settled = stats.total_settled.checked_add(entry.amount).unwrap_or(stats.total_settled);
                stats.total_platform_fees = stats
                    .total_platform_fees
                    .checked_add(entry.platform_fee)
                    .unwrap_or(stats.total_platform_fees);
            }
        }
        stats
    }

    pub fn sweep_expired(&self) {
        let now = self.clock.now();
        for mut entry in self.escrows.iter_mut() {
            if entry.status == EscrowStatus::Held && entry.expires_at <= now {
                entry.status = EscrowStatus::Expired;
            }
        }
    }

    pub fn spawn_expiry_sweep(self: &Arc<Self>) -> JoinHandle<()> {
        let orchestrator = Arc::clone(self);
        let interval = self.config.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                orchestrator.sweep_expired();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::ManualClock;

    fn orchestrator() -> Arc<PaymentOrchestrator> {
        let clock = ManualClock::new(chrono::Utc::now());
        PaymentOrchestrator::new(PaymentConfig::default(), clock, Arc::new(DemoFacilitator))
    }

    #[tokio::test]
    async fn settlement_amount_equals_fee_plus_net() {
        let orchestrator = orchestrator();
        let intent_id = IntentId::new();
        orchestrator
            .create_escrow(
                intent_id,
                "client-1".into(),
                "0.020000".parse().unwrap(),
                "0.010000".parse().unwrap(),
                None,
                None,
            )
            .await
            .unwrap();
        let settlement = orchestrator
            .release_escrow(intent_id, "provider-1".into())
            .await
            .unwrap();
        assert_eq!(
            settlement.platform_fee.checked_add(settlement.net_amount).unwrap(),
            settlement.amount
        );
    }

    #[tokio::test]
    async fn second_concurrent_release_fails_fast() {
        let orchestrator = orchestrator();
        let intent_id = IntentId::new();
        orchestrator
            .create_escrow(
                intent_id,
                "client-1".into(),
                "0.010000".parse().unwrap(),
                "0.010000".parse().unwrap(),
                None,
                None,
            )
            .await
            .unwrap();

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.release_escrow(intent_id, "provider-1".into()).await })
        };
        tokio::time::sleep(StdDuration::from_millis(50)).await;
        let second = orchestrator.release_escrow(intent_id, "provider-1".into()).await;
        assert!(second.is_err());
        first.await.unwrap().unwrap();
    }

    #[test]
    fn refund_is_status_only() {
        let clock = ManualClock::new(chrono::Utc::now());
        let orchestrator = PaymentOrchestrator::new(PaymentConfig::default(), clock.clone(), Arc::new(DemoFacilitator));
        let intent_id = IntentId::new();
        let entry = EscrowEntry {
            intent_id,
            client_address: "client-1".into(),
            max_budget: "0.010000".parse().unwrap(),
            settlement_amount: "0.010000".parse().unwrap(),
            payment_payload: None,
            status: EscrowStatus::Held,
            created_at: clock.now(),
            expires_at: clock.now() + Duration::minutes(30),
        };
        orchestrator.escrows.insert(intent_id, entry);
        orchestrator.refund_escrow(intent_id).unwrap();
        assert_eq!(orchestrator.get_escrow(intent_id).unwrap().status, EscrowStatus::Refunded);
    }
}
