//! Push fan-out layer inspection.

use anyhow::Result;
use clap::Subcommand;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum PushCommands {
    /// Show connection and delivery statistics
    Stats,
}

pub async fn execute(cmd: PushCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        PushCommands::Stats => {
            let stats: serde_json::Value = client.get("/push/stats").await?;
            output::print_item(&stats, format);
        }
    }

    Ok(())
}
