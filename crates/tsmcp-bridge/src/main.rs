//! tailscale-mcp binary
//!
//! MCP server exposing Tailscale tools over stdio.
//!
//! ## Usage
//!
//! ```bash
//! TS_OAUTH_CLIENT_ID=... TS_OAUTH_CLIENT_SECRET=... tailscale-mcp
//! ```
//!
//! Logs go to stderr so stdout carries only protocol messages.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use tsmcp_bridge::cli::Cli;
use tsmcp_bridge::{BridgeConfig, BridgeResult, LogFormat, Server, ToolContext};

const DEFAULT_LOG_FILTER: &str = "tsmcp_bridge=info,tsmcp_tailscale=info";

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::from(2);
        }
    };

    init_tracing(config.log_format);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "bridge stopped");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(config: BridgeConfig) -> BridgeResult<()> {
    tracing::info!(
        client_id = config.credentials.client_id(),
        tailnet = %config.api.tailnet,
        exposure = ?config.exposure,
        "tailscale-mcp starting"
    );

    let server = Server::new(ToolContext::from_config(&config)?);
    server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
        .await?;
    Ok(())
}
