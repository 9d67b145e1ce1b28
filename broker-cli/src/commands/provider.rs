//! Provider registry commands: register, heartbeat, inspect, list.

use anyhow::Result;
use clap::Subcommand;
use serde::{Deserialize, Serialize};
use tabled::Tabled;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum ProviderCommands {
    /// Register a new provider (idempotent by address)
    Register {
        address: String,
        #[arg(long)]
        name: String,
        /// Comma-separated capability list, e.g. "llm.completion,tool.search"
        #[arg(long, value_delimiter = ',')]
        capabilities: Vec<String>,
        #[arg(long)]
        tee_attested: bool,
    },

    /// Send a liveness heartbeat for a registered provider
    Heartbeat { provider_id: Uuid },

    /// Get one provider by id
    Get { provider_id: Uuid },

    /// Get one provider by address
    GetByAddress { address: String },

    /// List providers, optionally filtered by capability
    List {
        #[arg(long)]
        capability: Option<String>,
    },

    /// Show aggregate registry statistics
    Stats,
}

#[derive(Serialize)]
struct RegisterProviderBody {
    address: String,
    name: String,
    capabilities: Vec<String>,
    tee_attested: bool,
}

#[derive(Debug, Deserialize, Serialize)]
struct ProviderView {
    id: Uuid,
    address: String,
    name: String,
    capabilities: Vec<String>,
    reputation_score: f64,
    total_jobs: u64,
    successful_jobs: u64,
    total_earnings: String,
    tee_attested: bool,
    status: serde_json::Value,
}

#[derive(Debug, Deserialize, Serialize, Tabled)]
struct ProviderRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Reputation")]
    reputation: String,
    #[tabled(rename = "Jobs")]
    jobs: String,
    #[tabled(rename = "Earnings")]
    earnings: String,
}

impl From<ProviderView> for ProviderRow {
    fn from(p: ProviderView) -> Self {
        ProviderRow {
            id: p.id.to_string()[..8].to_string(),
            name: p.name,
            status: p.status.as_str().unwrap_or("?").to_string(),
            reputation: format!("{:.2}", p.reputation_score),
            jobs: format!("{}/{}", p.successful_jobs, p.total_jobs),
            earnings: p.total_earnings,
        }
    }
}

pub async fn execute(cmd: ProviderCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        ProviderCommands::Register { address, name, capabilities, tee_attested } => {
            let body = RegisterProviderBody { address, name, capabilities, tee_attested };
            let provider: ProviderView = client.post("/providers", &body).await?;
            match format {
                OutputFormat::Table => {
                    output::print_success("provider registered");
                    output::print_detail("ID", &provider.id.to_string());
                    output::print_detail("Name", &provider.name);
                }
                _ => output::print_item(&provider, format),
            }
        }

        ProviderCommands::Heartbeat { provider_id } => {
            client.post_no_content(&format!("/providers/{provider_id}/heartbeat"), &serde_json::json!({})).await?;
            output::print_success("heartbeat recorded");
        }

        ProviderCommands::Get { provider_id } => {
            let provider: ProviderView = client.get(&format!("/providers/{provider_id}")).await?;
            output::print_item(&provider, format);
        }

        ProviderCommands::GetByAddress { address } => {
            let provider: ProviderView = client.get(&format!("/providers/by-address/{address}")).await?;
            output::print_item(&provider, format);
        }

        ProviderCommands::List { capability } => {
            let path = match &capability {
                Some(cap) => format!("/providers?capability={cap}"),
                None => "/providers".to_string(),
            };
            let providers: Vec<ProviderView> = client.get(&path).await?;
            let rows: Vec<ProviderRow> = providers.into_iter().map(Into::into).collect();
            output::print_list(&rows, format);
        }

        ProviderCommands::Stats => {
            let stats: serde_json::Value = client.get("/providers/stats").await?;
            output::print_item(&stats, format);
        }
    }

    Ok(())
}
