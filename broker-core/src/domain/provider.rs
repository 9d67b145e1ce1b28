use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::MinorUnits;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(pub Uuid);

impl ProviderId {
    pub fn new() -> Self {
        ProviderId(Uuid::new_v4())
    }
}

impl Default for ProviderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderStatus {
    Online,
    Offline,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub address: String,
    pub name: String,
    pub capabilities: HashSet<String>,
    pub reputation_score: f64,
    pub total_jobs: u64,
    pub successful_jobs: u64,
    pub avg_response_time_ms: f64,
    pub total_earnings: MinorUnits,
    pub tee_attested: bool,
    pub status: ProviderStatus,
    pub last_heartbeat_at: DateTime<Utc>,
}

impl Provider {
    pub fn new(address: String, name: String, capabilities: HashSet<String>, tee_attested: bool, now: DateTime<Utc>) -> Self {
        Self {
            id: ProviderId::new(),
            address,
            name,
            capabilities,
            reputation_score: 0.0,
            total_jobs: 0,
            successful_jobs: 0,
            avg_response_time_ms: 0.0,
            total_earnings: MinorUnits::ZERO,
            tee_attested,
            status: ProviderStatus::Offline,
            last_heartbeat_at: now,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == ProviderStatus::Online
    }

    /// Exact or hierarchical-prefix capability match: a provider declaring
    /// `weather` covers an intent type of `weather.current`.
    pub fn covers(&self, intent_type: &str) -> bool {
        if self.capabilities.contains(intent_type) {
            return true;
        }
        if let Some((prefix, _)) = intent_type.split_once('.') {
            return self.capabilities.contains(prefix);
        }
        false
    }
}
