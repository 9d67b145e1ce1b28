use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{provider::ProviderId, MinorUnits};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IntentId(pub Uuid);

impl IntentId {
    pub fn new() -> Self {
        IntentId(Uuid::new_v4())
    }
}

impl Default for IntentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse domain bucket driving which scoring weight set applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentCategory {
    General,
    LlmTool,
}

impl IntentCategory {
    /// `llm.*` and `tool.*` intent types use the LLM/tool weight variant;
    /// everything else uses the default weight set.
    pub fn infer(intent_type: &str) -> Self {
        if intent_type.starts_with("llm.") || intent_type.starts_with("tool.") {
            IntentCategory::LlmTool
        } else {
            IntentCategory::General
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Open,
    BiddingClosed,
    Assigned,
    Executing,
    Failover,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentResult {
    pub data: serde_json::Value,
    pub execution_time_ms: u64,
    pub settlement_reference: Option<String>,
    pub settled_amount: Option<MinorUnits>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intent {
    pub id: IntentId,
    #[serde(rename = "type")]
    pub intent_type: String,
    pub category: IntentCategory,
    pub client_address: String,
    pub params: serde_json::Value,
    pub max_budget: MinorUnits,
    pub min_reputation: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub bidding_deadline: DateTime<Utc>,
    pub execution_deadline: DateTime<Utc>,
    pub status: IntentStatus,
    pub assigned_provider: Option<ProviderId>,
    pub failover_queue: VecDeque<ProviderId>,
    pub result: Option<IntentResult>,
    pub failure_reason: Option<String>,
}

impl Intent {
    pub fn is_open(&self) -> bool {
        self.status == IntentStatus::Open
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, IntentStatus::Completed | IntentStatus::Failed)
    }
}
