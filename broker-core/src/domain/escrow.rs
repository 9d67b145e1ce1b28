use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{intent::IntentId, MinorUnits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowStatus {
    Held,
    Released,
    Refunded,
    Expired,
}

/// Held funds for an intent. Transitions out of `Held` are terminal.
///
/// `max_budget` is the client's authorization ceiling; `settlement_amount`
/// is the amount actually owed to the assigned provider (the winning bid),
/// which is never greater than `max_budget` but is usually less.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscrowEntry {
    pub intent_id: IntentId,
    pub client_address: String,
    pub max_budget: MinorUnits,
    pub settlement_amount: MinorUnits,
    pub payment_payload: Option<String>,
    pub status: EscrowStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl EscrowEntry {
    pub fn is_active(&self) -> bool {
        self.status == EscrowStatus::Held
    }
}
