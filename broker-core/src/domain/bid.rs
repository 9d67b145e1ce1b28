use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{intent::IntentId, provider::ProviderId, MinorUnits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BidId(pub Uuid);

impl BidId {
    pub fn new() -> Self {
        BidId(Uuid::new_v4())
    }
}

impl Default for BidId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BidId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BidStatus {
    Pending,
    Accepted,
    Rejected,
    Withdrawn,
}

/// A provider's priced offer against one intent, plus the reputation/TEE
/// snapshot used by the scoring function at the moment of submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub intent_id: IntentId,
    pub provider_id: ProviderId,
    pub provider_address: String,
    pub bid_amount: MinorUnits,
    pub estimated_time_ms: u64,
    pub confidence: u8,
    pub reputation_score: f64,
    pub tee_attested: bool,
    pub capabilities: Vec<String>,
    pub calculated_score: u32,
    pub rank: u32,
    pub submitted_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: BidStatus,
}

impl Bid {
    /// Total order used to maintain rank: score descending, ties broken by
    /// earlier `submitted_at`.
    pub fn rank_key(&self) -> (std::cmp::Reverse<u32>, DateTime<Utc>) {
        (std::cmp::Reverse(self.calculated_score), self.submitted_at)
    }
}
