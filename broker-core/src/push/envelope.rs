use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Bid, Intent, IntentResult, MinorUnits, Provider, ProviderId};

use super::rooms::RoomId;

/// Three priority classes. Declaration order doubles as sort order (derived
/// `Ord` ranks `High` before `Medium` before `Low`), matching the
/// HIGH-first stable-sort required at flush time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A tagged variant per lifecycle event, carrying its own typed payload.
/// One multiplexed channel of these feeds the push layer, per the
/// "avoid stringly-typed event dispatch in the core" design note.
#[derive(Debug, Clone)]
pub enum PushEvent {
    IntentCreated {
        intent: Intent,
    },
    BidReceived {
        bid: Bid,
        intent: Intent,
        total_bids: u32,
        current_leader: Option<Bid>,
    },
    WinnerSelected {
        winner: Bid,
        intent: Intent,
        all_bids: Vec<Bid>,
        failover_queue: Vec<ProviderId>,
    },
    FailoverTriggered {
        intent: Intent,
        failed_provider: ProviderId,
        new_provider: ProviderId,
        remaining_failovers: u32,
        all_bids: Vec<Bid>,
    },
    IntentCompleted {
        intent: Intent,
        bids: Vec<Bid>,
        result: IntentResult,
    },
    IntentFailed {
        intent: Intent,
        reason: String,
        bids: Vec<Bid>,
    },
    PaymentSettled {
        intent: Intent,
        amount: MinorUnits,
        tx_reference: Option<String>,
        refund_amount: Option<MinorUnits>,
    },
    ProviderOnline {
        provider: Provider,
    },
    ProviderOffline {
        provider: Provider,
    },
    ProviderUpdated {
        provider: Provider,
    },
}

impl PushEvent {
    /// The wire-level `type` string.
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::IntentCreated { .. } => "intent:created",
            PushEvent::BidReceived { .. } => "bid:received",
            PushEvent::WinnerSelected { .. } => "winner:selected",
            PushEvent::FailoverTriggered { .. } => "failover:triggered",
            PushEvent::IntentCompleted { .. } => "intent:completed",
            PushEvent::IntentFailed { .. } => "intent:failed",
            PushEvent::PaymentSettled { .. } => "payment:settled",
            PushEvent::ProviderOnline { .. } => "provider:online",
            PushEvent::ProviderOffline { .. } => "provider:offline",
            PushEvent::ProviderUpdated { .. } => "provider:updated",
        }
    }

    pub fn priority(&self) -> Priority {
        match self {
            PushEvent::WinnerSelected { .. }
            | PushEvent::IntentCompleted { .. }
            | PushEvent::IntentFailed { .. } => Priority::High,
            PushEvent::BidReceived { .. } | PushEvent::FailoverTriggered { .. } => {
                Priority::Medium
            }
            PushEvent::IntentCreated { .. }
            | PushEvent::PaymentSettled { .. }
            | PushEvent::ProviderOnline { .. }
            | PushEvent::ProviderOffline { .. }
            | PushEvent::ProviderUpdated { .. } => Priority::Low,
        }
    }

    /// Rooms this event is delivered to, per the table in spec §6.
    pub fn rooms(&self) -> Vec<RoomId> {
        match self {
            PushEvent::IntentCreated { intent } => vec![
                RoomId::Providers,
                RoomId::Capability(capability_prefix(&intent.intent_type)),
                RoomId::Dashboard,
            ],
            PushEvent::BidReceived { intent, .. } => {
                vec![RoomId::Intent(intent.id), RoomId::Dashboard]
            }
            PushEvent::WinnerSelected { intent, .. } => {
                vec![RoomId::Intent(intent.id), RoomId::Providers, RoomId::Dashboard]
            }
            PushEvent::FailoverTriggered { intent, .. } => {
                vec![RoomId::Intent(intent.id), RoomId::Dashboard]
            }
            PushEvent::IntentCompleted { intent, .. } => {
                vec![RoomId::Intent(intent.id), RoomId::Dashboard]
            }
            PushEvent::IntentFailed { intent, .. } => {
                vec![RoomId::Intent(intent.id), RoomId::Dashboard]
            }
            PushEvent::PaymentSettled { intent, .. } => {
                vec![RoomId::Intent(intent.id), RoomId::Dashboard]
            }
            PushEvent::ProviderOnline { .. }
            | PushEvent::ProviderOffline { .. }
            | PushEvent::ProviderUpdated { .. } => vec![RoomId::Dashboard],
        }
    }

    pub fn payload(&self) -> serde_json::Value {
        match self {
            PushEvent::IntentCreated { intent } => serde_json::json!({ "intent": intent }),
            PushEvent::BidReceived {
                bid,
                intent,
                total_bids,
                current_leader,
            } => serde_json::json!({
                "bid": bid,
                "intent": intent,
                "totalBids": total_bids,
                "currentLeader": current_leader,
            }),
            PushEvent::WinnerSelected {
                winner,
                intent,
                all_bids,
                failover_queue,
            } => serde_json::json!({
                "winner": winner,
                "intent": intent,
                "allBids": all_bids,
                "failoverQueue": failover_queue,
            }),
            PushEvent::FailoverTriggered {
                intent,
                failed_provider,
                new_provider,
                remaining_failovers,
                all_bids,
            } => serde_json::json!({
                "intent": intent,
                "failedProvider": failed_provider,
                "newProvider": new_provider,
                "remainingFailovers": remaining_failovers,
                "allBids": all_bids,
            }),
            PushEvent::IntentCompleted { intent, bids, result } => serde_json::json!({
                "intent": intent,
                "bids": bids,
                "result": result,
            }),
            PushEvent::IntentFailed { intent, reason, bids } => serde_json::json!({
                "intent": intent,
                "reason": reason,
                "bids": bids,
            }),
            PushEvent::PaymentSettled {
                intent,
                amount,
                tx_reference,
                refund_amount,
            } => serde_json::json!({
                "intent": intent,
                "amount": amount,
                "transactionReference": tx_reference,
                "refundAmount": refund_amount,
            }),
            PushEvent::ProviderOnline { provider }
            | PushEvent::ProviderOffline { provider }
            | PushEvent::ProviderUpdated { provider } => serde_json::json!({ "provider": provider }),
        }
    }
}

fn capability_prefix(intent_type: &str) -> String {
    intent_type
        .split_once('.')
        .map(|(prefix, _)| prefix.to_string())
        .unwrap_or_else(|| intent_type.to_string())
}

/// A queued, in-memory message awaiting flush. Distinct from the wire
/// envelope: `event`/`payload` are already materialized so flush only
/// needs to group and stamp a timestamp.
#[derive(Debug, Clone)]
pub struct Message {
    pub event: &'static str,
    pub payload: serde_json::Value,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
}

impl From<&PushEvent> for Message {
    fn from(event: &PushEvent) -> Self {
        Message {
            event: event.name(),
            payload: event.payload(),
            priority: event.priority(),
            timestamp: Utc::now(),
        }
    }
}

/// The wire-level record delivered to a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireEnvelope {
    Single {
        #[serde(rename = "type")]
        event_type: String,
        payload: serde_json::Value,
        timestamp: i64,
    },
    Batch {
        #[serde(rename = "type")]
        event_type: String,
        payload: Vec<serde_json::Value>,
        count: usize,
        timestamp: i64,
    },
}
