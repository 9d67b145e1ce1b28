use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{intent::IntentId, MinorUnits};

/// The record of one settlement attempt. `amount = platform_fee + net_amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentSettlement {
    pub intent_id: IntentId,
    pub success: bool,
    pub amount: MinorUnits,
    pub platform_fee: MinorUnits,
    pub net_amount: MinorUnits,
    pub provider_address: String,
    pub tx_reference: Option<String>,
    pub settled_at: DateTime<Utc>,
    pub error: Option<String>,
}
