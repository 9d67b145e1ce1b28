//! Intent Engine (component E): the lifecycle state machine for intents,
//! bid admission and ranking, winner selection, failover, and result
//! ingestion.
//!
//! State mutations for a given intent are serialized through a
//! `tokio::sync::Mutex<IntentState>` held one-per-intent in a `DashMap` —
//! parallel across distinct intents, single-threaded per intent, matching
//! the per-intent-actor-or-mutex equivalence called for by the
//! concurrency model. No lock is ever held across an `.await` on another
//! intent or on the facilitator round-trip.

pub mod timers;

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration as ChronoDuration;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::Mutex as AsyncMutex;

use crate::clock::SharedClock;
use crate::domain::{
    Bid, BidId, BidStatus, Intent, IntentCategory, IntentId, IntentResult, IntentStatus,
    MinorUnits, ProviderId,
};
use crate::error::{BrokerError, Result};
use crate::payment::PaymentOrchestrator;
use crate::push::{PushEvent, PushLayer};
use crate::registry::ProviderRegistry;
use crate::scoring::{self, ScoreWeightTable};

use timers::TimerHandle;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub bidding_duration_default: StdDuration,
    pub execution_grace: StdDuration,
    pub failover_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bidding_duration_default: StdDuration::from_secs(30),
            execution_grace: StdDuration::from_secs(60),
            failover_depth: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateIntentRequest {
    pub intent_type: String,
    pub client_address: String,
    pub params: Option<Value>,
    pub max_budget: MinorUnits,
    pub min_reputation: Option<f64>,
    pub bidding_duration: Option<StdDuration>,
    pub execution_duration: Option<StdDuration>,
}

#[derive(Debug, Clone, Copy)]
pub struct SubmitBidRequest {
    pub intent_id: IntentId,
    pub provider_id: ProviderId,
    pub bid_amount: MinorUnits,
    pub estimated_time_ms: u64,
    pub confidence: u8,
}

struct IntentState {
    intent: Intent,
    bids: Vec<Bid>,
    bidding_timer: Option<TimerHandle>,
    execution_timer: Option<TimerHandle>,
}

pub struct IntentEngine {
    config: EngineConfig,
    clock: SharedClock,
    registry: Arc<ProviderRegistry>,
    payment: Arc<PaymentOrchestrator>,
    push: Arc<PushLayer>,
    weights: ScoreWeightTable,
    intents: DashMap<IntentId, Arc<AsyncMutex<IntentState>>>,
}

impl IntentEngine {
    pub fn new(
        config: EngineConfig,
        clock: SharedClock,
        registry: Arc<ProviderRegistry>,
        payment: Arc<PaymentOrchestrator>,
        push: Arc<PushLayer>,
        weights: ScoreWeightTable,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            clock,
            registry,
            payment,
            push,
            weights,
            intents: DashMap::new(),
        })
    }

    fn get_state(&self, intent_id: IntentId) -> Result<Arc<AsyncMutex<IntentState>>> {
        self.intents
            .get(&intent_id)
            .map(|e| e.clone())
            .ok_or_else(|| BrokerError::unknown_intent(intent_id))
    }

    pub async fn create_intent(self: &Arc<Self>, req: CreateIntentRequest) -> Result<Intent> {
        if req.intent_type.trim().is_empty() {
            return Err(BrokerError::validation("intent type must not be empty"));
        }
        if req.max_budget.micros() <= 0 {
            return Err(BrokerError::invalid_budget("maxBudget must be greater than zero"));
        }
        let bidding_duration = req.bidding_duration.unwrap_or(self.config.bidding_duration_default);
        if bidding_duration < StdDuration::from_secs(1) {
            return Err(BrokerError::invalid_duration("biddingDuration must be at least 1 second"));
        }
        let execution_duration = req.execution_duration.unwrap_or(self.config.execution_grace);

        let now = self.clock.now();
        let bidding_deadline = now
            + ChronoDuration::from_std(bidding_duration).unwrap_or_else(|_| ChronoDuration::seconds(30));
        let execution_deadline = bidding_deadline
            + ChronoDuration::from_std(execution_duration).unwrap_or_else(|_| ChronoDuration::seconds(60));

        let intent = Intent {
            id: IntentId::new(),
            category: IntentCategory::infer(&req.intent_type),
            intent_type: req.intent_type,
            client_address: req.client_address,
            params: req.params.unwrap_or_else(|| serde_json::json!({})),
            max_budget: req.max_budget,
            min_reputation: req.min_reputation,
            created_at: now,
            bidding_deadline,
            execution_deadline,
            status: IntentStatus::Open,
            assigned_provider: None,
            failover_queue: VecDeque::new(),
            result: None,
            failure_reason: None,
        };

        let state = Arc::new(AsyncMutex::new(IntentState {
            intent: intent.clone(),
            bids: Vec::new(),
            bidding_timer: None,
            execution_timer: None,
        }));
        self.intents.insert(intent.id, state.clone());

        let delay = (bidding_deadline - now).to_std().unwrap_or(StdDuration::ZERO);
        let engine = Arc::clone(self);
        let intent_id = intent.id;
        let timer = TimerHandle::spawn(delay, async move {
            engine.on_bidding_timeout(intent_id).await;
        });
        state.lock().await.bidding_timer = Some(timer);

        self.push.emit(PushEvent::IntentCreated { intent: intent.clone() });
        Ok(intent)
    }

    pub async fn submit_bid(self: &Arc<Self>, req: SubmitBidRequest) -> Result<Bid> {
        let state = self.get_state(req.intent_id)?;
        let mut guard = state.lock().await;
        if guard.intent.status != IntentStatus::Open {
            return Err(BrokerError::intent_not_open());
        }

        let provider = self
            .registry
            .get(req.provider_id)
            .ok_or_else(|| BrokerError::unknown_provider(req.provider_id))?;
        if !provider.is_online() {
            return Err(BrokerError::provider_not_online());
        }
        if !provider.covers(&guard.intent.intent_type) {
            return Err(BrokerError::unknown_capability(guard.intent.intent_type.clone()));
        }
        if req.bid_amount > guard.intent.max_budget {
            return Err(BrokerError::bid_exceeds_budget());
        }
        if let Some(min_reputation) = guard.intent.min_reputation {
            if provider.reputation_score < min_reputation {
                return Err(BrokerError::reputation_below_minimum());
            }
        }

        let now = self.clock.now();
        let mut bid = Bid {
            id: BidId::new(),
            intent_id: req.intent_id,
            provider_id: provider.id,
            provider_address: provider.address.clone(),
            bid_amount: req.bid_amount,
            estimated_time_ms: req.estimated_time_ms,
            confidence: req.confidence,
            reputation_score: provider.reputation_score,
            tee_attested: provider.tee_attested,
            capabilities: provider.capabilities.iter().cloned().collect(),
            calculated_score: 0,
            rank: 0,
            submitted_at: now,
            expires_at: guard.intent.bidding_deadline,
            status: BidStatus::Pending,
        };
        let weights = self.weights.for_category(guard.intent.category);
        let (calculated, _) = scoring::score(&bid, &guard.intent, &weights);
        bid.calculated_score = calculated;
        let bid_id = bid.id;
        guard.bids.push(bid);
        scoring::rank_bids(&mut guard.bids, &guard.intent, &weights);

        let stored = guard
            .bids
            .iter()
            .find(|b| b.id == bid_id)
            .cloned()
            .expect("bid just inserted must be present");
        let total_bids = guard.bids.len() as u32;
        let current_leader = guard.bids.first().cloned();
        let intent_snapshot = guard.intent.clone();
        drop(guard);

        self.push.emit(PushEvent::BidReceived {
            bid: stored.clone(),
            intent: intent_snapshot,
            total_bids,
            current_leader,
        });
        Ok(stored)
    }

    async fn on_bidding_timeout(self: Arc<Self>, intent_id: IntentId) {
        if let Err(err) = self.close_bidding(intent_id).await {
            err.log();
        }
    }

    pub async fn force_close_bidding(self: &Arc<Self>, intent_id: IntentId) -> Result<()> {
        self.close_bidding(intent_id).await
    }

    async fn close_bidding(self: &Arc<Self>, intent_id: IntentId) -> Result<()> {
        let state = self.get_state(intent_id)?;
        let mut guard = state.lock().await;
        if guard.intent.status != IntentStatus::Open {
            // Already transitioned — a timer firing after a force-close is a no-op.
            return Ok(());
        }
        if let Some(timer) = guard.bidding_timer.take() {
            timer.cancel();
        }

        if guard.bids.is_empty() {
            guard.intent.status = IntentStatus::Failed;
            guard.intent.failure_reason = Some("NO_BIDS".to_string());
            let intent_snapshot = guard.intent.clone();
            let bids_snapshot = guard.bids.clone();
            drop(guard);
            self.push.emit(PushEvent::IntentFailed {
                intent: intent_snapshot,
                reason: "NO_BIDS".to_string(),
                bids: bids_snapshot,
            });
            return Ok(());
        }

        guard.intent.status = IntentStatus::BiddingClosed;
        for (i, bid) in guard.bids.iter_mut().enumerate() {
            bid.status = if i == 0 { BidStatus::Accepted } else { BidStatus::Rejected };
        }
        let winner = guard.bids[0].clone();
        let failover_queue: VecDeque<ProviderId> = guard.bids[1..]
            .iter()
            .take(self.config.failover_depth)
            .map(|b| b.provider_id)
            .collect();
        guard.intent.assigned_provider = Some(winner.provider_id);
        guard.intent.failover_queue = failover_queue.clone();
        guard.intent.status = IntentStatus::Assigned;
        let intent_snapshot = guard.intent.clone();
        let all_bids = guard.bids.clone();
        drop(guard);

        if let Err(err) = self
            .payment
            .create_escrow(
                intent_id,
                intent_snapshot.client_address.clone(),
                intent_snapshot.max_budget,
                winner.bid_amount,
                None,
                Some(winner.provider_address.clone()),
            )
            .await
        {
            err.log();
        }

        self.push.emit(PushEvent::WinnerSelected {
            winner,
            intent: intent_snapshot,
            all_bids,
            failover_queue: failover_queue.into_iter().collect(),
        });
        Ok(())
    }

    pub async fn acknowledge_assignment(self: &Arc<Self>, intent_id: IntentId, provider_id: ProviderId) -> Result<()> {
        let state = self.get_state(intent_id)?;
        let mut guard = state.lock().await;
        if guard.intent.status != IntentStatus::Assigned {
            return Err(BrokerError::invalid_state_transition(
                "intent is not awaiting assignment acknowledgement",
            ));
        }
        if guard.intent.assigned_provider != Some(provider_id) {
            return Err(BrokerError::not_assigned_provider());
        }
        guard.intent.status = IntentStatus::Executing;

        let now = self.clock.now();
        let delay = (guard.intent.execution_deadline - now).to_std().unwrap_or(StdDuration::ZERO);
        let engine = Arc::clone(self);
        let timer = TimerHandle::spawn(delay, async move {
            engine.on_execution_timeout(intent_id).await;
        });
        guard.execution_timer = Some(timer);
        Ok(())
    }

    async fn on_execution_timeout(self: Arc<Self>, intent_id: IntentId) {
        let state = match self.get_state(intent_id) {
            Ok(state) => state,
            Err(_) => return,
        };
        let mut guard = state.lock().await;
        if guard.intent.status != IntentStatus::Executing {
            return;
        }
        let failed_provider = guard.intent.assigned_provider;
        guard.execution_timer = None;
        guard.intent.status = IntentStatus::Failover;
        drop(guard);

        if let Some(provider_id) = failed_provider {
            if let Err(err) = self.registry.record_job_failure(provider_id) {
                err.log();
            }
        }
        self.trigger_failover(intent_id, failed_provider).await;
    }

    pub async fn report_result(
        self: &Arc<Self>,
        intent_id: IntentId,
        provider_id: ProviderId,
        data: Value,
        execution_time_ms: u64,
    ) -> Result<()> {
        let state = self.get_state(intent_id)?;
        let mut guard = state.lock().await;
        if guard.intent.status != IntentStatus::Executing {
            return Err(BrokerError::invalid_state_transition("intent is not executing"));
        }
        if guard.intent.assigned_provider != Some(provider_id) {
            return Err(BrokerError::not_assigned_provider());
        }
        if let Some(timer) = guard.execution_timer.take() {
            timer.cancel();
        }
        let provider_address = self
            .registry
            .get(provider_id)
            .ok_or_else(|| BrokerError::unknown_provider(provider_id))?
            .address;
        drop(guard);

        match self.release_escrow_with_retry(intent_id, provider_address).await {
            Ok(settlement) => {
                let mut guard = state.lock().await;
                let now = self.clock.now();
                guard.intent.status = IntentStatus::Completed;
                guard.intent.result = Some(IntentResult {
                    data,
                    execution_time_ms,
                    settlement_reference: settlement.tx_reference.clone(),
                    settled_amount: Some(settlement.net_amount),
                    completed_at: now,
                });
                let intent_snapshot = guard.intent.clone();
                let bids_snapshot = guard.bids.clone();
                let result_snapshot = intent_snapshot
                    .result
                    .clone()
                    .expect("result was just set above");
                drop(guard);

                if let Err(err) = self
                    .registry
                    .record_job_success(provider_id, execution_time_ms, settlement.net_amount)
                {
                    err.log();
                }
                self.push.emit(PushEvent::IntentCompleted {
                    intent: intent_snapshot.clone(),
                    bids: bids_snapshot,
                    result: result_snapshot,
                });
                self.push.emit(PushEvent::PaymentSettled {
                    intent: intent_snapshot,
                    amount: settlement.amount,
                    tx_reference: settlement.tx_reference,
                    refund_amount: None,
                });
                Ok(())
            }
            Err(err) => {
                err.log();
                let mut guard = state.lock().await;
                guard.intent.status = IntentStatus::Failover;
                drop(guard);
                if let Err(err) = self.registry.record_job_failure(provider_id) {
                    err.log();
                }
                self.trigger_failover(intent_id, Some(provider_id)).await;
                Ok(())
            }
        }
    }

    pub async fn report_failure(self: &Arc<Self>, intent_id: IntentId, provider_id: ProviderId) -> Result<()> {
        let state = self.get_state(intent_id)?;
        let mut guard = state.lock().await;
        if guard.intent.assigned_provider != Some(provider_id) {
            return Err(BrokerError::not_assigned_provider());
        }
        if !matches!(guard.intent.status, IntentStatus::Assigned | IntentStatus::Executing) {
            return Err(BrokerError::invalid_state_transition(
                "intent is not in an active execution state",
            ));
        }
        if let Some(timer) = guard.execution_timer.take() {
            timer.cancel();
        }
        guard.intent.status = IntentStatus::Failover;
        drop(guard);

        if let Err(err) = self.registry.record_job_failure(provider_id) {
            err.log();
        }
        self.trigger_failover(intent_id, Some(provider_id)).await;
        Ok(())
    }

    /// Pops the head of the failover queue and reassigns, or transitions to
    /// `FAILED` and refunds escrow if no runners-up remain.
    async fn trigger_failover(self: &Arc<Self>, intent_id: IntentId, failed_provider: Option<ProviderId>) {
        let state = match self.get_state(intent_id) {
            Ok(state) => state,
            Err(_) => return,
        };
        let mut guard = state.lock().await;

        if let Some(new_provider) = guard.intent.failover_queue.pop_front() {
            guard.intent.assigned_provider = Some(new_provider);
            guard.intent.status = IntentStatus::Assigned;
            let remaining_failovers = guard.intent.failover_queue.len() as u32;
            let intent_snapshot = guard.intent.clone();
            let bids_snapshot = guard.bids.clone();
            drop(guard);

            self.push.emit(PushEvent::FailoverTriggered {
                intent: intent_snapshot,
                failed_provider: failed_provider.unwrap_or(new_provider),
                new_provider,
                remaining_failovers,
                all_bids: bids_snapshot,
            });
        } else {
            guard.intent.status = IntentStatus::Failed;
            guard.intent.failure_reason = Some("ALL_PROVIDERS_FAILED".to_string());
            let intent_snapshot = guard.intent.clone();
            let bids_snapshot = guard.bids.clone();
            drop(guard);

            if let Err(err) = self.payment.refund_escrow(intent_id) {
                err.log();
            }
            self.push.emit(PushEvent::IntentFailed {
                intent: intent_snapshot,
                reason: "ALL_PROVIDERS_FAILED".to_string(),
                bids: bids_snapshot,
            });
        }
    }

    /// The facilitator-boundary retry policy: infra errors only, 200ms
    /// initial backoff doubling to a 5s cap, 3 attempts total.
    async fn release_escrow_with_retry(
        &self,
        intent_id: IntentId,
        provider_address: String,
    ) -> Result<crate::domain::PaymentSettlement> {
        let mut delay = StdDuration::from_millis(200);
        let cap = StdDuration::from_secs(5);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.payment.release_escrow(intent_id, provider_address.clone()).await {
                Ok(settlement) => return Ok(settlement),
                Err(err) if err.is_retryable() && attempt < 3 => {
                    err.log();
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(cap);
                }
                Err(err) => return Err(err),
            }
        }
    }

    pub async fn get_intent(&self, intent_id: IntentId) -> Result<Intent> {
        let state = self.get_state(intent_id)?;
        Ok(state.lock().await.intent.clone())
    }

    pub async fn get_bids_for_intent(&self, intent_id: IntentId) -> Result<Vec<Bid>> {
        let state = self.get_state(intent_id)?;
        Ok(state.lock().await.bids.clone())
    }

    pub async fn get_open_intents(&self) -> Vec<Intent> {
        let states: Vec<Arc<AsyncMutex<IntentState>>> = self.intents.iter().map(|e| e.value().clone()).collect();
        let mut open = Vec::new();
        for state in states {
            let guard = state.lock().await;
            if guard.intent.status == IntentStatus::Open {
                open.push(guard.intent.clone());
            }
        }
        open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::ManualClock;
    use crate::payment::{DemoFacilitator, PaymentConfig};
    use crate::push::PushConfig;
    use crate::registry::RegistryConfig;
    use std::collections::HashSet;

    fn harness() -> (Arc<IntentEngine>, Arc<ProviderRegistry>, Arc<ManualClock>) {
        let clock = ManualClock::new(chrono::Utc::now());
        let push = PushLayer::new(PushConfig::default());
        let registry = ProviderRegistry::new(RegistryConfig::default(), clock.clone(), push.clone());
        let payment = PaymentOrchestrator::new(PaymentConfig::default(), clock.clone(), Arc::new(DemoFacilitator));
        let engine = IntentEngine::new(
            EngineConfig::default(),
            clock.clone(),
            registry.clone(),
            payment,
            push,
            ScoreWeightTable::default(),
        );
        (engine, registry, clock)
    }

    fn weather_caps() -> HashSet<String> {
        ["weather.current".to_string()].into_iter().collect()
    }

    #[tokio::test]
    async fn scenario_s1_happy_path() {
        let (engine, registry, _clock) = harness();
        let p1 = registry.register("p1-addr".into(), "p1".into(), weather_caps(), true);
        let p2 = registry.register("p2-addr".into(), "p2".into(), weather_caps(), false);
        registry.heartbeat(p1.id).unwrap();
        registry.heartbeat(p2.id).unwrap();
        registry.record_job_success(p1.id, 100, MinorUnits::ZERO).unwrap();
        for _ in 0..8 {
            registry.record_job_success(p1.id, 100, MinorUnits::ZERO).unwrap();
        }
        registry.record_job_success(p2.id, 100, MinorUnits::ZERO).unwrap();
        for _ in 0..7 {
            registry.record_job_success(p2.id, 100, MinorUnits::ZERO).unwrap();
        }

        let intent = engine
            .create_intent(CreateIntentRequest {
                intent_type: "weather.current".into(),
                client_address: "client-1".into(),
                params: None,
                max_budget: "0.020".parse().unwrap(),
                min_reputation: None,
                bidding_duration: Some(StdDuration::from_secs(3)),
                execution_duration: Some(StdDuration::from_secs(30)),
            })
            .await
            .unwrap();

        engine
            .submit_bid(SubmitBidRequest {
                intent_id: intent.id,
                provider_id: p1.id,
                bid_amount: "0.010".parse().unwrap(),
                estimated_time_ms: 500,
                confidence: 90,
            })
            .await
            .unwrap();
        engine
            .submit_bid(SubmitBidRequest {
                intent_id: intent.id,
                provider_id: p2.id,
                bid_amount: "0.008".parse().unwrap(),
                estimated_time_ms: 800,
                confidence: 80,
            })
            .await
            .unwrap();

        engine.force_close_bidding(intent.id).await.unwrap();
        let assigned = engine.get_intent(intent.id).await.unwrap();
        assert_eq!(assigned.status, IntentStatus::Assigned);
        assert_eq!(assigned.assigned_provider, Some(p1.id));

        engine.acknowledge_assignment(intent.id, p1.id).await.unwrap();
        engine
            .report_result(intent.id, p1.id, serde_json::json!({"temp": 22}), 400)
            .await
            .unwrap();

        let completed = engine.get_intent(intent.id).await.unwrap();
        assert_eq!(completed.status, IntentStatus::Completed);
        let result = completed.result.unwrap();
        assert_eq!(result.settled_amount.unwrap(), "0.009500".parse().unwrap());
    }

    #[tokio::test]
    async fn scenario_s2_failover_on_reported_failure() {
        let (engine, registry, _clock) = harness();
        let p1 = registry.register("p1-addr".into(), "p1".into(), weather_caps(), false);
        let p2 = registry.register("p2-addr".into(), "p2".into(), weather_caps(), false);
        registry.heartbeat(p1.id).unwrap();
        registry.heartbeat(p2.id).unwrap();

        let intent = engine
            .create_intent(CreateIntentRequest {
                intent_type: "weather.current".into(),
                client_address: "client-1".into(),
                params: None,
                max_budget: "0.020".parse().unwrap(),
                min_reputation: None,
                bidding_duration: Some(StdDuration::from_secs(3)),
                execution_duration: Some(StdDuration::from_secs(30)),
            })
            .await
            .unwrap();

        engine
            .submit_bid(SubmitBidRequest {
                intent_id: intent.id,
                provider_id: p1.id,
                bid_amount: "0.010".parse().unwrap(),
                estimated_time_ms: 500,
                confidence: 90,
            })
            .await
            .unwrap();
        engine
            .submit_bid(SubmitBidRequest {
                intent_id: intent.id,
                provider_id: p2.id,
                bid_amount: "0.012".parse().unwrap(),
                estimated_time_ms: 900,
                confidence: 70,
            })
            .await
            .unwrap();

        engine.force_close_bidding(intent.id).await.unwrap();
        let assigned = engine.get_intent(intent.id).await.unwrap();
        let winner = assigned.assigned_provider.unwrap();
        assert_eq!(winner, p1.id);

        engine.acknowledge_assignment(intent.id, p1.id).await.unwrap();
        engine.report_failure(intent.id, p1.id).await.unwrap();

        let failed_over = engine.get_intent(intent.id).await.unwrap();
        assert_eq!(failed_over.status, IntentStatus::Assigned);
        assert_eq!(failed_over.assigned_provider, Some(p2.id));

        engine.acknowledge_assignment(intent.id, p2.id).await.unwrap();
        engine
            .report_result(intent.id, p2.id, serde_json::json!({"temp": 21}), 600)
            .await
            .unwrap();

        let completed = engine.get_intent(intent.id).await.unwrap();
        assert_eq!(completed.status, IntentStatus::Completed);

        let p1_after = registry.get(p1.id).unwrap();
        assert_eq!(p1_after.total_jobs, 1);
        assert_eq!(p1_after.successful_jobs, 0);
    }

    #[tokio::test]
    async fn scenario_s3_no_bids_fails_with_reason() {
        let (engine, _registry, _clock) = harness();
        let intent = engine
            .create_intent(CreateIntentRequest {
                intent_type: "unknown.x".into(),
                client_address: "client-1".into(),
                params: None,
                max_budget: "0.020".parse().unwrap(),
                min_reputation: None,
                bidding_duration: Some(StdDuration::from_secs(3)),
                execution_duration: Some(StdDuration::from_secs(30)),
            })
            .await
            .unwrap();

        engine.force_close_bidding(intent.id).await.unwrap();
        let failed = engine.get_intent(intent.id).await.unwrap();
        assert_eq!(failed.status, IntentStatus::Failed);
        assert_eq!(failed.failure_reason.as_deref(), Some("NO_BIDS"));
    }

    #[tokio::test]
    async fn failover_depth_never_exceeded() {
        let (engine, registry, _clock) = harness();
        for i in 0..5 {
            let provider = registry.register(format!("addr-{i}"), format!("p{i}"), weather_caps(), false);
            registry.heartbeat(provider.id).unwrap();
        }

        let intent = engine
            .create_intent(CreateIntentRequest {
                intent_type: "weather.current".into(),
                client_address: "client-1".into(),
                params: None,
                max_budget: "0.020".parse().unwrap(),
                min_reputation: None,
                bidding_duration: Some(StdDuration::from_secs(3)),
                execution_duration: Some(StdDuration::from_secs(30)),
            })
            .await
            .unwrap();

        for provider in registry.all() {
            engine
                .submit_bid(SubmitBidRequest {
                    intent_id: intent.id,
                    provider_id: provider.id,
                    bid_amount: "0.010".parse().unwrap(),
                    estimated_time_ms: 500,
                    confidence: 80,
                })
                .await
                .unwrap();
        }

        engine.force_close_bidding(intent.id).await.unwrap();
        let assigned = engine.get_intent(intent.id).await.unwrap();
        // 1 assigned + at most failoverDepth (default 3) queued = at most 4 distinct providers ever tried.
        assert!(assigned.failover_queue.len() <= engine_config_failover_depth());
    }

    fn engine_config_failover_depth() -> usize {
        EngineConfig::default().failover_depth
    }
}
