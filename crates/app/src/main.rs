//! Tokenwarden - Main Entry Point
//!
//! Loads client settings, wires the token lifecycle and runs one command.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tokenwarden_domain::ClientSettings;
use tokenwarden_infrastructure::{build_auth_gate, read_settings};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status when the caller has to log in again.
const EXIT_AUTH_REQUIRED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "tokenwarden", version, about = "Keeps an OAuth2 access token fresh")]
struct Cli {
    /// Settings file (YAML or JSON).
    #[arg(long, env = "TOKENWARDEN_CONFIG")]
    config: PathBuf,

    /// Client secret; overrides the settings file.
    #[arg(long, env = "TOKENWARDEN_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Token file location; overrides the settings file.
    #[arg(long, env = "TOKENWARDEN_TOKEN_PATH")]
    token_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a usable access token, refreshing it if needed.
    Token {
        /// Ignore stored credentials and require a fresh login.
        #[arg(long)]
        force_new: bool,
    },
    /// Show the state of the stored token.
    Status,
    /// Write a synthetic token valid for one hour.
    SeedTestToken,
}

impl Cli {
    async fn settings(&self) -> Result<ClientSettings, Box<dyn Error>> {
        let mut settings = read_settings(&self.config).await?;
        if let Some(secret) = &self.client_secret {
            settings.client_secret.clone_from(secret);
        }
        if let Some(path) = &self.token_path {
            settings.token_path = Some(path.clone());
        }
        settings.validate()?;
        Ok(settings)
    }
}

fn format_expiry(expires_at: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(expires_at)
        .map_or_else(|| expires_at.to_string(), |at| at.to_rfc3339())
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let settings = cli.settings().await?;
    let gate = build_auth_gate(&settings)?;

    match cli.command {
        Command::Token { force_new } => match gate.ensure_authenticated(force_new).await {
            Ok(token) => println!("{token}"),
            Err(e) => {
                eprintln!("{e}: complete an interactive login and retry");
                return Ok(ExitCode::from(EXIT_AUTH_REQUIRED));
            }
        },
        Command::Status => {
            let (state, record) = gate.supplier().snapshot().await;
            println!("{}", state.message());
            if let Some(record) = record {
                println!("expires at {}", format_expiry(record.expires_at));
            }
        }
        Command::SeedTestToken => {
            let record = gate.supplier().seed_synthetic().await?;
            tracing::info!("synthetic token written");
            println!("expires at {}", format_expiry(record.expires_at));
        }
    }

    Ok(ExitCode::SUCCESS)
}
