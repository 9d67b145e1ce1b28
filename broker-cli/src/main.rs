//! Operator CLI for the broker's HTTP API.
//!
//! Provides commands for intent, provider, payment, push, and health
//! inspection against a running broker server.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{config, health, intent, payment, provider, push};
use output::OutputFormat;

#[derive(Parser)]
#[command(
    name = "broker",
    author = "Aezi <aezi.zhu@icloud.com>",
    version = "0.1.0",
    about = "Operator CLI for the decentralized intent-matching broker",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Broker API server URL
    #[arg(long, global = true, env = "BROKER_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Intent lifecycle: create, inspect, bid, close, report outcome
    #[command(subcommand)]
    Intent(intent::IntentCommands),

    /// Provider registry: register, heartbeat, inspect, list
    #[command(subcommand)]
    Provider(provider::ProviderCommands),

    /// Payment inspection: settlements and escrow stats
    #[command(subcommand)]
    Payment(payment::PaymentCommands),

    /// Push fan-out layer inspection
    #[command(subcommand)]
    Push(push::PushCommands),

    /// Check server health
    Health(health::HealthArgs),

    /// CLI configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(config::load_api_url)
        .unwrap_or_else(|| "http://localhost:8080".to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Intent(cmd) => intent::execute(cmd, &client, format).await,
        Commands::Provider(cmd) => provider::execute(cmd, &client, format).await,
        Commands::Payment(cmd) => payment::execute(cmd, &client, format).await,
        Commands::Push(cmd) => push::execute(cmd, &client, format).await,
        Commands::Health(args) => health::execute(args, &client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
