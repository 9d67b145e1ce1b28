//! Read-only payment inspection commands.
//!
//! Escrow creation and release are engine-internal (triggered by winner
//! selection and result reporting) and have no CLI surface by design.

use anyhow::Result;
use clap::Subcommand;
use uuid::Uuid;

use crate::client::ApiClient;
use crate::output::{self, OutputFormat};

#[derive(Subcommand)]
pub enum PaymentCommands {
    /// Get the settlement recorded for an intent, if any
    Settlement { intent_id: Uuid },

    /// Show aggregate escrow and settlement statistics
    Stats,
}

pub async fn execute(cmd: PaymentCommands, client: &ApiClient, format: OutputFormat) -> Result<()> {
    match cmd {
        PaymentCommands::Settlement { intent_id } => {
            let settlement: serde_json::Value = client.get(&format!("/payments/{intent_id}/settlement")).await?;
            output::print_item(&settlement, format);
        }
        PaymentCommands::Stats => {
            let stats: serde_json::Value = client.get("/payments/stats").await?;
            output::print_item(&stats, format);
        }
    }

    Ok(())
}
