//! Marionette control panel CLI
//!
//! A command-line front-end for inspecting services, switching method
//! behaviors and watching service metrics through the control-panel
//! backend.

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use commands::{behavior, metrics, services, CommandContext};
use console_lib::{ClientConfig, ConsoleConfig, ConsoleMetrics, RemoteSyncClient, StructuredLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Marionette control panel CLI
#[derive(Parser)]
#[command(name = "mctl")]
#[command(author, version, about = "CLI for the Marionette control panel", long_about = None)]
pub struct Cli {
    /// Backend API endpoint (can also be set via MCTL_API_URL env var)
    #[arg(long, env = "MCTL_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Origin the console is served from; the API endpoint is derived from it
    #[arg(long, global = true)]
    pub origin: Option<String>,

    /// Path to a configuration file (uses ~/.config/mctl/config if not specified)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, short, default_value = "table", global = true)]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Print client metrics in Prometheus text format after the command
    #[arg(long, global = true)]
    pub self_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List services with their method counts
    Services {
        /// Ask the backend to re-query its services first
        #[arg(long)]
        refresh: bool,
    },

    /// Show the behavior configuration of a service
    Show {
        /// Service name
        service: String,
    },

    /// Switch a method to another behavior
    Set {
        /// Service name
        service: String,
        /// Class name
        class: String,
        /// Method name
        method: String,
        /// Behavior id (e.g. NORMAL, SLOW, ERROR)
        behavior: String,
    },

    /// Reset a service to its template configuration
    Reset {
        /// Service name
        service: String,
    },

    /// Trigger service discovery and reload the registry
    Discover {
        /// Re-scan every service instead of a quick pass
        #[arg(long)]
        full: bool,
    },

    /// Show historical and live metrics of a service
    Metrics {
        /// Service name
        service: String,

        /// Historical window in minutes
        #[arg(long, short)]
        minutes: Option<u32>,

        /// Restrict to one method
        #[arg(long)]
        method: Option<String>,
    },

    /// Keep refreshing the live metrics of a service until Ctrl-C
    Watch {
        /// Service name
        service: String,

        /// Historical window in minutes
        #[arg(long, short)]
        minutes: Option<u32>,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    // stdout carries command output, logs go to stderr
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let mut config =
        ConsoleConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(api_url) = cli.api_url.clone() {
        config.base_url = Some(api_url);
    }
    if let Some(origin) = cli.origin.clone() {
        config.origin = Some(origin);
    }

    let client_config =
        ClientConfig::from_console(&config).context("Failed to resolve backend endpoint")?;
    debug!(
        endpoint = %client_config.base_url,
        encoding = ?client_config.behavior_encoding,
        "Resolved backend endpoint"
    );
    let logger = StructuredLogger::new(client_config.base_url.as_str());
    let client = RemoteSyncClient::new(client_config).context("Failed to create HTTP client")?;
    logger.log_startup(VERSION);

    let ctx = CommandContext::new(Arc::new(client), config, logger.clone(), cli.format);

    // Execute command
    let outcome = match cli.command {
        Commands::Services { refresh } => services::list_services(&ctx, refresh).await,
        Commands::Show { service } => services::show_service(&ctx, &service).await,
        Commands::Set {
            service,
            class,
            method,
            behavior,
        } => behavior::set_behavior(&ctx, &service, &class, &method, &behavior).await,
        Commands::Reset { service } => services::reset_service(&ctx, &service).await,
        Commands::Discover { full } => services::discover(&ctx, full).await,
        Commands::Metrics {
            service,
            minutes,
            method,
        } => metrics::show_metrics(&ctx, &service, minutes, method.as_deref()).await,
        Commands::Watch { service, minutes } => {
            metrics::watch_metrics(&ctx, &service, minutes).await
        }
    };

    if cli.self_metrics {
        eprintln!("{}", ConsoleMetrics::new().render());
    }

    logger.log_shutdown(if outcome.is_ok() {
        "command completed"
    } else {
        "command failed"
    });
    outcome
}
