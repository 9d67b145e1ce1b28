//! Request/response payloads for the HTTP boundary.
//!
//! Domain types (`Intent`, `Bid`, `Provider`, ...) are returned as-is in
//! responses — their `Serialize` impls already encode money as decimal
//! strings. Only inbound request bodies get dedicated types here, since
//! they need validation distinct from the domain constructors.

use std::time::Duration as StdDuration;

use serde::Deserialize;

use crate::domain::{IntentId, MinorUnits, ProviderId};
use crate::engine::{CreateIntentRequest, SubmitBidRequest};
use crate::error::{BrokerError, Result};

#[derive(Debug, Deserialize)]
pub struct CreateIntentBody {
    #[serde(rename = "type")]
    pub intent_type: String,
    pub client_address: String,
    pub params: Option<serde_json::Value>,
    pub max_budget: String,
    pub min_reputation: Option<f64>,
    pub bidding_duration_ms: Option<u64>,
    pub execution_duration_ms: Option<u64>,
}

impl CreateIntentBody {
    pub fn into_request(self) -> Result<CreateIntentRequest> {
        let max_budget: MinorUnits = self.max_budget.parse()?;
        Ok(CreateIntentRequest {
            intent_type: self.intent_type,
            client_address: self.client_address,
            params: self.params,
            max_budget,
            min_reputation: self.min_reputation,
            bidding_duration: self.bidding_duration_ms.map(StdDuration::from_millis),
            execution_duration: self.execution_duration_ms.map(StdDuration::from_millis),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitBidBody {
    pub provider_id: ProviderId,
    pub bid_amount: String,
    pub estimated_time_ms: u64,
    pub confidence: u8,
}

impl SubmitBidBody {
    pub fn into_request(self, intent_id: IntentId) -> Result<SubmitBidRequest> {
        let bid_amount: MinorUnits = self.bid_amount.parse()?;
        if self.confidence > 100 {
            return Err(BrokerError::validation("confidence must be between 0 and 100"));
        }
        Ok(SubmitBidRequest {
            intent_id,
            provider_id: self.provider_id,
            bid_amount,
            estimated_time_ms: self.estimated_time_ms,
            confidence: self.confidence,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterProviderBody {
    pub address: String,
    pub name: String,
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub tee_attested: bool,
}

#[derive(Debug, Deserialize)]
pub struct ReportResultBody {
    pub provider_id: ProviderId,
    pub data: serde_json::Value,
    pub execution_time_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReportFailureBody {
    pub provider_id: ProviderId,
}

#[derive(Debug, Deserialize)]
pub struct AcknowledgeAssignmentBody {
    pub provider_id: ProviderId,
}
