//! # Wardenctl - Aegis Warden Control Client
//!
//! Drives a running Warden daemon over its HTTP API: trigger token
//! execution, reset the lifecycle, and inspect state and recent events.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

/// Aegis Warden control client
#[derive(Parser, Debug)]
#[command(name = "wardenctl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Warden daemon base URL
    #[arg(long, default_value = "http://127.0.0.1:8787", env = "WARDEN_URL")]
    url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Request a new token
    Execute {
        /// Action name override
        #[arg(long)]
        action: Option<String>,

        /// Field value for the validation gate (JSON)
        #[arg(long)]
        field_value: Option<String>,
    },
    /// Reset the token lifecycle to idle
    Reset,
    /// Show the current token state
    State,
    /// Show recent lifecycle events (daemon must run with show_debug_info)
    Events,
    /// Check daemon health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let response = match cli.command {
        Command::Execute { action, field_value } => {
            let field_value = match field_value {
                Some(raw) => Some(
                    serde_json::from_str::<serde_json::Value>(&raw)
                        .context("--field-value must be valid JSON")?,
                ),
                None => None,
            };
            let body = serde_json::json!({
                "action": action,
                "field_value": field_value,
            });
            client
                .post(format!("{}/token/execute", cli.url))
                .json(&body)
                .send()
                .await
        }
        Command::Reset => client.post(format!("{}/token/reset", cli.url)).send().await,
        Command::State => client.get(format!("{}/token/state", cli.url)).send().await,
        Command::Events => client.get(format!("{}/debug/events", cli.url)).send().await,
        Command::Health => client.get(format!("{}/health", cli.url)).send().await,
    };

    let response = response.context("Failed to reach warden")?;
    print_response(response).await
}

/// Pretty-print the response body and fail on non-success status
async fn print_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    let body = response.text().await.context("Failed to read response")?;

    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{body}"),
    }

    if !status.is_success() {
        bail!("warden returned {status}");
    }

    Ok(())
}
