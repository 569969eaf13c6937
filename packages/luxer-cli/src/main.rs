//! Luxer CLI - follow pending Luxer One packages from a terminal
//!
//! This binary provides a small agent that can:
//! - Log in with an e-mailed one-time code
//! - Show pending packages per locker location
//! - Keep polling in the foreground (for systemd integration)

mod watch;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use luxer_core::api::{self, LuxerConfig};
use luxer_core::{
    ApiError, AuthSession, Coordinator, CoordinatorConfig, Location, LocationView, LuxerClient,
    PollError,
};
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "luxer")]
#[command(version)]
#[command(about = "Follow pending Luxer One packages")]
#[command(long_about = "
Luxer CLI logs in to a Luxer One resident account and reports the packages
waiting in each locker location.

Quick start:
  1. Log in:            luxer login --email you@example.com
  2. Store the token:   export LUXER_TOKEN=<token>  (or [account] token in config.toml)
  3. Check packages:    luxer status
  4. Keep polling:      luxer watch
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for scripting
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Log in with a one-time code sent by e-mail
    Login {
        /// Account e-mail (defaults to the configured one)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Fetch pending packages once
    Status,

    /// Poll pending packages until interrupted
    Watch {
        /// Poll interval in minutes (defaults to the configured one)
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Revoke the configured token
    Logout,

    /// Show configuration paths and settings
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("luxer={},luxer_core={}", log_level, log_level).into()),
        )
        .with_target(false)
        .init();

    let config = api::load_config();

    match &cli.command {
        Commands::Login { email } => cmd_login(&cli, &config, email.clone()).await,
        Commands::Status => cmd_status(&cli, &config).await,
        Commands::Watch { interval } => {
            let interval = interval
                .filter(|m| *m > 0)
                .map(|m| Duration::from_secs(m * 60))
                .unwrap_or(config.poll_interval);
            let client = authenticated_client(&config)?;
            watch::run_watch(client, CoordinatorConfig { interval }, cli.format).await
        }
        Commands::Logout => cmd_logout(&cli, &config).await,
        Commands::Config => cmd_config(&cli, &config),
    }
}

/// Client carrying the configured token, or a hint to log in first.
fn authenticated_client(config: &LuxerConfig) -> Result<LuxerClient> {
    let Some(token) = config.account.token.clone() else {
        bail!("No API token configured. Run 'luxer login' and set LUXER_TOKEN.");
    };
    Ok(LuxerClient::new(&config.endpoint)?.with_token(token))
}

async fn prompt(message: &str) -> Result<String> {
    eprint!("{}", message);
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read from stdin")?;
    Ok(line.trim().to_string())
}

async fn cmd_login(cli: &Cli, config: &LuxerConfig, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| config.account.email.clone()) {
        Some(email) => email,
        None => prompt("E-mail: ").await?,
    };
    if email.is_empty() {
        bail!("An e-mail address is required");
    }

    let client = LuxerClient::new(&config.endpoint)?;
    let mut session = AuthSession::new(client);
    let device = AuthSession::generate_device_identifier();

    if !session
        .request_code(&email)
        .await
        .context("Failed to request a one-time code")?
    {
        bail!("Luxer One did not accept the code request for {}", email);
    }

    if let OutputFormat::Text = cli.format {
        println!("A one-time code was sent to {}", email);
    }
    let code = prompt("Code: ").await?;

    let token = match session.verify_code(&email, &code, &device).await {
        Ok(token) => token,
        Err(ApiError::Transport(e)) => {
            tracing::debug!("Code verification failed: {}", e);
            bail!("Invalid or expired code");
        }
        Err(e) => return Err(e.into()),
    };

    let label = match session.user_label().await {
        Ok(label) => label,
        Err(e) => {
            tracing::warn!("Failed to fetch user profile: {}", e);
            email.clone()
        }
    };

    match cli.format {
        OutputFormat::Text => {
            println!();
            println!("Logged in as {}", label);
            println!();
            println!("Token: {}", token.as_str());
            println!(
                "Store it as LUXER_TOKEN or under [account] in {}",
                api::config::get_config_file_path_string()
            );
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "status": "logged_in",
                "account": label,
                "email": email,
                "device_id": device.as_str(),
                "token": token.as_str(),
            }));
        }
    }

    Ok(())
}

#[derive(Serialize)]
pub(crate) struct LocationRow<'a> {
    pub id: i64,
    pub name: &'a str,
    pub pending: usize,
    pub label_picture: Option<&'a str>,
}

pub(crate) fn location_rows<'a>(
    locations: &'a [Location],
    view: &'a LocationView,
) -> Vec<LocationRow<'a>> {
    locations
        .iter()
        .map(|loc| LocationRow {
            id: loc.id,
            name: &loc.name,
            pending: view.pending_count(loc.id),
            label_picture: view.first_label_picture(loc.id),
        })
        .collect()
}

pub(crate) fn print_rows(rows: &[LocationRow<'_>]) {
    for row in rows {
        match row.label_picture {
            Some(url) => println!("  {:30} {:>3} pending  {}", row.name, row.pending, url),
            None => println!("  {:30} {:>3} pending", row.name, row.pending),
        }
    }
}

async fn cmd_status(cli: &Cli, config: &LuxerConfig) -> Result<()> {
    let client = authenticated_client(config)?;
    let mut coordinator = Coordinator::new(client, CoordinatorConfig::default());

    let result = async {
        coordinator.setup().await?;
        coordinator.refresh().await
    }
    .await;

    let view = match result {
        Ok(view) => view,
        Err(PollError::AuthRequired) => {
            bail!("Token rejected by Luxer One. Run 'luxer login' to authenticate again.");
        }
        Err(e) => return Err(e.into()),
    };

    let rows = location_rows(coordinator.locations(), &view);
    match cli.format {
        OutputFormat::Text => {
            println!("{} pending packages:", view.total_pending());
            println!();
            print_rows(&rows);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "total_pending": view.total_pending(),
                "locations": rows,
                "deliveries": view,
            }));
        }
    }

    Ok(())
}

async fn cmd_logout(cli: &Cli, config: &LuxerConfig) -> Result<()> {
    let Some(token) = config.account.token.clone() else {
        match cli.format {
            OutputFormat::Text => println!("No token configured."),
            OutputFormat::Json => println!("{}", serde_json::json!({ "status": "not_logged_in" })),
        }
        return Ok(());
    };

    let mut session = AuthSession::with_token(LuxerClient::new(&config.endpoint)?, token);
    session.revoke().await;

    match cli.format {
        OutputFormat::Text => {
            println!("Token revoked. Remove it from LUXER_TOKEN or your config file.");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({ "status": "logged_out" }));
        }
    }

    Ok(())
}

fn cmd_config(cli: &Cli, config: &LuxerConfig) -> Result<()> {
    let config_path = api::config::get_config_file_path_string();
    let interval_minutes = config.poll_interval.as_secs() / 60;

    match cli.format {
        OutputFormat::Text => {
            println!("Configuration");
            println!("=============");
            println!();
            println!("Config file:   {}", config_path);
            println!("API endpoint:  {} (from {})", config.endpoint.base_url, config.endpoint.source);
            println!("Account:       {}", config.account.email.as_deref().unwrap_or("-"));
            println!("Token:         {}", if config.account.token.is_some() { "set" } else { "not set" });
            println!("Poll interval: {} minutes", interval_minutes);
            println!();
            println!("Environment variables:");
            println!("  LUXER_API_URL - Override API endpoint");
            println!("  LUXER_EMAIL   - Account e-mail");
            println!("  LUXER_TOKEN   - API token from 'luxer login'");
            println!();
            println!("Example config.toml:");
            println!();
            println!("{}", api::config::generate_example_config());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::json!({
                "config_file": config_path,
                "api_url": config.endpoint.base_url,
                "api_source": format!("{}", config.endpoint.source),
                "email": config.account.email,
                "token_set": config.account.token.is_some(),
                "poll_interval_minutes": interval_minutes,
            }));
        }
    }

    Ok(())
}
