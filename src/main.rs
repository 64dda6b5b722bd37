//! tado-poller - tado° cloud poller
//!
//! Keeps a tado OAuth2 session alive and streams home/zone snapshots to a
//! display process.

mod api;
mod auth;
mod config;
mod error;
mod models;
mod poller;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::Fetcher;
use crate::auth::{CredentialRecord, TokenStore};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "tado-poller")]
#[command(about = "Poll the tado° cloud API and stream snapshots", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Token file, overriding the config file
    #[arg(long, global = true)]
    token_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll on a timer and print NEW_DATA events as JSON lines
    Run {
        /// Milliseconds between fetch cycles
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Accept CONFIG control messages as JSON lines on stdin
        #[arg(long)]
        stdin_control: bool,
    },

    /// Run a single fetch cycle and print the snapshot
    Fetch,

    /// Show cached token status
    Status,

    /// Store tokens obtained elsewhere in the token file
    Seed {
        #[arg(long)]
        access_token: String,

        #[arg(long)]
        refresh_token: String,

        /// Access token lifetime in seconds
        #[arg(long, default_value = "600")]
        expires_in: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for data
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = match cli.config {
        Some(ref path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let token_file = match cli.token_file {
        Some(path) => path,
        None => config.token_file()?,
    };
    let store = TokenStore::new(token_file);

    match cli.command {
        Commands::Run {
            interval_ms,
            stdin_control,
        } => {
            let interval = interval_ms.unwrap_or_else(|| config.update_interval_ms());
            let fetcher = Fetcher::from_parts(&config.auth_config(), config.api_base(), store)?;
            tracing::info!("Starting poller against {}", config.api_base());
            poller::stdio::run(fetcher, interval, stdin_control).await?;
        }
        Commands::Fetch => {
            let fetcher = Fetcher::from_parts(&config.auth_config(), config.api_base(), store)?;
            api::fetch_once(fetcher).await?;
        }
        Commands::Status => {
            auth::status(&store);
        }
        Commands::Seed {
            access_token,
            refresh_token,
            expires_in,
        } => {
            let record = CredentialRecord::issued_now(access_token, refresh_token, expires_in);
            store
                .save(&record)
                .with_context(|| format!("Failed to write {}", store.path().display()))?;
            println!("Tokens written to {}", store.path().display());
        }
    }

    Ok(())
}
