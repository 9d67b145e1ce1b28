//! The external payment facilitator boundary (out of scope to implement for
//! real — concrete facilitators are an external collaborator per spec §1).
//! `DemoFacilitator` stands in for local testing and demos.

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{IntentId, MinorUnits};
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct PaymentRequirements {
    pub intent_id: IntentId,
    pub amount: MinorUnits,
    pub client_address: String,
    pub provider_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResult {
    pub valid: bool,
    pub error: Option<String>,
    pub amount: Option<MinorUnits>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettleResult {
    pub success: bool,
    pub tx_reference: Option<String>,
    pub status: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportedMethod {
    pub chain_id: Option<String>,
    pub token_address: Option<String>,
}

#[async_trait]
pub trait PaymentFacilitator: Send + Sync {
    async fn verify(&self, payload: &str, requirements: &PaymentRequirements) -> Result<VerifyResult>;
    async fn settle(&self, requirements: &PaymentRequirements) -> Result<SettleResult>;
    fn supported(&self) -> Vec<SupportedMethod>;
    fn demo_mode(&self) -> bool;
}

/// A simulated facilitator: verification always succeeds, settlement
/// returns a synthesized reference after the 500-1500ms demo latency
/// spec §4.3 calls for.
pub struct DemoFacilitator;

#[async_trait]
impl PaymentFacilitator for DemoFacilitator {
    async fn verify(&self, _payload: &str, requirements: &PaymentRequirements) -> Result<VerifyResult> {
        Ok(VerifyResult {
            valid: true,
            error: None,
            amount: Some(requirements.amount),
            from: Some(requirements.client_address.clone()),
            to: Some(requirements.provider_address.clone()),
            token: Some("demo-token".to_string()),
        })
    }

    async fn settle(&self, requirements: &PaymentRequirements) -> Result<SettleResult> {
        let delay_ms = rand::thread_rng().gen_range(500..=1500);
        tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
        Ok(SettleResult {
            success: true,
            tx_reference: Some(format!("demo-tx-{}", requirements.intent_id)),
            status: "confirmed".to_string(),
            error: None,
        })
    }

    fn supported(&self) -> Vec<SupportedMethod> {
        vec![SupportedMethod {
            chain_id: None,
            token_address: None,
        }]
    }

    fn demo_mode(&self) -> bool {
        true
    }
}
