//! Avisia chat relay.
//!
//! Usage:
//!   avisia-chat                  Start the HTTP server (same as `serve`)
//!   avisia-chat serve            Start the HTTP server
//!   avisia-chat scan <MESSAGE>   Screen a message for prompt injection

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use avisia_chat::chat::injection_defense::{self, FlagReason, Verdict};
use avisia_chat::config::{self, RelayConfig};
use avisia_chat::inference::{CompletionProvider, InferenceClient};
use avisia_chat::server;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "avisia-chat")]
#[command(version)]
#[command(about = "Page-aware chat relay for the Avisia website assistant")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Optional TOML config file. Environment variables override it.
    #[arg(long, env = "RELAY_CONFIG")]
    config: Option<String>,

    /// Log level (debug, info, warn, error).
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server.
    Serve,

    /// Screen a message with the injection filter and print the verdict.
    Scan {
        /// Message to screen.
        message: String,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let cfg = config::resolve(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => cmd_serve(cfg).await,
        Commands::Scan { message } => cmd_scan(&cfg, &message),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_serve(cfg: RelayConfig) -> Result<()> {
    config::require_api_key(&cfg)?;

    let inference: Arc<dyn CompletionProvider> =
        Arc::new(InferenceClient::new(&cfg.api_url, &cfg.api_key));
    let cfg = Arc::new(cfg);

    println!(
        "{} Starting server with model: {} (port {})",
        ">>>".green().bold(),
        cfg.model,
        cfg.port,
    );

    let cancel = CancellationToken::new();
    let server_cancel = cancel.clone();
    let mut server_handle =
        tokio::spawn(async move { server::run(cfg, inference, server_cancel).await });

    // Stop early if the server exits on its own (e.g. the port is taken)
    tokio::select! {
        res = &mut server_handle => {
            return res.context("Server task join error")?;
        }
        res = shutdown_signal() => res?,
    }

    println!("\n{} Shutting down gracefully...", "<<<".red().bold());
    cancel.cancel();

    server_handle
        .await
        .context("Server task join error")??;

    info!("Shutdown complete");
    Ok(())
}

fn cmd_scan(cfg: &RelayConfig, message: &str) -> Result<()> {
    let verdict = injection_defense::inspect(message, cfg.max_message_length);
    let ratio = injection_defense::unusual_char_ratio(message);

    println!();
    println!("  {}:  {}", "Length".bold(), message.chars().count());
    println!("  {}:   {:.2}", "Ratio".bold(), ratio);
    println!("  {}: {}", "Verdict".bold(), colorize_verdict(&verdict));
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Resolve on Ctrl+C, or SIGTERM where available (container stop).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl+C")
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .context("Failed to listen for SIGTERM")?
            .recv()
            .await;
        Ok::<(), anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => res,
        res = terminate => res,
    }
}

fn colorize_verdict(verdict: &Verdict) -> String {
    match verdict {
        Verdict::Clear => "clear".green().to_string(),
        Verdict::Flagged(reason @ FlagReason::Pattern(_)) => {
            format!("{} ({})", "flagged".red().bold(), reason)
        }
        Verdict::Flagged(reason) => format!("{} ({})", "flagged".yellow().bold(), reason),
    }
}
