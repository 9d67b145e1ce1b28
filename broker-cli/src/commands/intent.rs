//! Intent lifecycle commands: create, inspect, bid, close, report outcome.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum IntentCommands {
    /// Post a new intent for bidding
    Create {
        /// Intent type, e.g. `llm.completion` or `compute.render`
        #[arg(short = 't', long = "type")]
        intent_type: String,
        /// The client's on-chain address
        #[arg(long)]
        client_address: String,
        /// Maximum budget, as a decimal string (e.g. "0.020000")
        #[arg(long)]
        max_budget: String,
        /// Minimum acceptable provider reputation, 0.0-1.0
        #[arg(long)]
        min_reputation: Option<f64>,
        /// Bidding window, in milliseconds
        #[arg(long)]
        bidding_duration_ms: Option<u64>,
        /// Execution grace window, in milliseconds
        #[arg(long)]
        execution_duration_ms: Option<u64>,
        /// Arbitrary JSON params passed through to the provider
        #[arg(long)]
        params: Option<String>,
    },

    /// List all currently open intents
    List,

    /// Get one intent by id
    Get { intent_id: Uuid },

    /// List bids submitted against one intent
    Bids { intent_id: Uuid },

    /// Submit a bid against an open intent, as a provider
    Bid {
        intent_id: Uuid,
        #[arg(long)]
        provider_id: Uuid,
        /// Bid amount, as a decimal string
        #[arg(long)]
        amount: String,
        #[arg(long)]
        estimated_time_ms: u64,
        /// Confidence, 0-100
        #[arg(long)]
        confidence: u8,
    },

    /// Force bidding closed before its deadline
    CloseBidding { intent_id: Uuid },

    /// Acknowledge assignment as the winning provider, starting execution
    Acknowledge {
        intent_id: Uuid,
        #[arg(long)]
        provider_id: Uuid,
    },

    /// Report a successful execution result for an assigned intent
    ReportResult {
        intent_id: Uuid,
        #[arg(long)]
        provider_id: Uuid,
        #[arg(long)]
        execution_time_ms: u64,
        /// Result payload, as a JSON string
        #[arg(long, default_value = "{}")]
        data: String,
    },

    /// Report an execution failure, triggering failover
    ReportFailure {
        intent_id: Uuid,
        #[arg(long)]
        provider_id: Uuid,
    },
}

#[derive(Serialize)]
struct CreateIntentBody {
    #[serde(rename = "type")]
    intent_type: String,
    client_address: String,
    max_budget: String,
    min_reputation: Option<f64>,
    bidding_duration_ms: Option<u64>,
    execution_duration_ms: Option<u64>,
    params: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct SubmitBidBody {
    provider_id: Uuid,
    bid_amount: String,
    estimated_time_ms: u64,
    confidence: u8,
}

#[derive(Serialize)]
struct ReportResultBody {
    provider_id: Uuid,
    data: serde_json::Value,
    execution_time_ms: u64,
}

#[derive(Serialize)]
struct ReportFailureBody {
    provider_id: Uuid,
}

#[derive(Serialize)]
struct AcknowledgeAssignmentBody {
    provider_id: Uuid,
}

#[derive(Debug, Deserialize, Serialize)]
struct IntentView {
    id: Uuid,
    #[serde(rename = "type")]
    intent_type: String,
    category: serde_json::Value,
    client_address: String,
    max_budget: String,
    status: serde_json::Value,
    assigned_provider: Option<Uuid>,
}

#[derive(Debug, Deserialize, Serialize, Tabled)]
struct IntentRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    intent_type: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Budget")]
    max_budget: String,
    #[tabled(rename = "Client")]
    client_address: String,
}

impl From<IntentView> for IntentRow {
    fn from(v: IntentView) -> Self {
        IntentRow {
            id: v.id.to_string()[..8].to_string(),
            intent_type: v.intent_type,
            status: v.status.as_str().unwrap_or("?").to_string(),
            max_budget: v.max_budget,
            client_address: v.client_address,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct BidView {
    id: Uuid,
    provider_id: Uuid,
    bid_amount: String,
    confidence: u8,
    calculated_score: u32,
    rank: u32,
    status: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize, Tabled)]
struct BidRow {
    #[tabled(rename = "Rank")]
    rank: u32,
    #[tabled(rename = "Provider")]
    provider_id: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Score")]
    score: u32,
    #[tabled(rename = "Confidence")]
    confidence: u8,
    #[tabled(rename = "Status")]
    status: String,
}

impl From<BidView> for BidRow {
    fn from(b: BidView) -> Self {
        BidRow {
            rank: b.rank,
            provider_id: b.provider_id.to_string()[..8].to_string(),
            amount: b.bid_amount,
            score: b.calculated_score,
            confidence: b.confidence,
            status: b.status.as_str().unwrap_or("?").to_string(),
        }
    }
}

pub async fn execute(cmd: IntentCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        IntentCommands::Create {
            intent_type,
            client_address,
            max_budget,
            min_reputation,
            bidding_duration_ms,
            execution_duration_ms,
            params,
        } => {
            let params = params
                .map(|p| serde_json::from_str(&p))
                .transpose()
                .map_err(|e| anyhow::anyhow!("--params is not valid JSON: {e}"))?;
            let body = CreateIntentBody {
                intent_type,
                client_address,
                max_budget,
                min_reputation,
                bidding_duration_ms,
                execution_duration_ms,
                params,
            };
            let intent: IntentView = client.post("/intents", &body).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success("intent created");
                    output::print_detail("ID", &intent.id.to_string());
                    output::print_detail("Type", &intent.intent_type);
                    output::print_detail("Budget", &intent.max_budget);
                }
                _ => output::print_item(&intent, format),
            }
        }

        IntentCommands::List => {
            let intents: Vec<IntentView> = client.get("/intents").await?;
            let rows: Vec<IntentRow> = intents.into_iter().map(Into::into).collect();
            output::print_list(&rows, format);
        }

        IntentCommands::Get { intent_id } => {
            let intent: IntentView = client.get(&format!("/intents/{intent_id}")).await?;
            output::print_item(&intent, format);
        }

        IntentCommands::Bids { intent_id } => {
            let bids: Vec<BidView> = client.get(&format!("/intents/{intent_id}/bids")).await?;
            let rows: Vec<BidRow> = bids.into_iter().map(Into::into).collect();
            output::print_list(&rows, format);
        }

        IntentCommands::Bid {
            intent_id,
            provider_id,
            amount,
            estimated_time_ms,
            confidence,
        } => {
            let body = SubmitBidBody {
                provider_id,
                bid_amount: amount,
                estimated_time_ms,
                confidence,
            };
            let bid: BidView = client.post(&format!("/intents/{intent_id}/bids"), &body).await?;
            match format {
                OutputFormat::Table => output::print_success(&format!("bid {} submitted", bid.id)),
                _ => output::print_item(&bid, format),
            }
        }

        IntentCommands::CloseBidding { intent_id } => {
            client
                .post_no_content(&format!("/intents/{intent_id}/bids/close"), &serde_json::json!({}))
                .await?;
            output::print_success("bidding closed");
        }

        IntentCommands::Acknowledge { intent_id, provider_id } => {
            let body = AcknowledgeAssignmentBody { provider_id };
            client.post_no_content(&format!("/intents/{intent_id}/acknowledge"), &body).await?;
            output::print_success("assignment acknowledged");
        }

        IntentCommands::ReportResult {
            intent_id,
            provider_id,
            execution_time_ms,
            data,
        } => {
            let data = serde_json::from_str(&data).map_err(|e| anyhow::anyhow!("--data is not valid JSON: {e}"))?;
            let body = ReportResultBody { provider_id, data, execution_time_ms };
            client.post_no_content(&format!("/intents/{intent_id}/result"), &body).await?;
            output::print_success("result reported");
        }

        IntentCommands::ReportFailure { intent_id, provider_id } => {
            let body = ReportFailureBody { provider_id };
            client.post_no_content(&format!("/intents/{intent_id}/failure"), &body).await?;
            output::print_success("failure reported");
        }
    }

    Ok(())
}
