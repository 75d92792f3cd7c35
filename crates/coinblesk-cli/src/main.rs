//! CoinBlesk console - administer a CoinBlesk server from the terminal.
//!
//! Every command resumes the persisted session if it can. When the server
//! asks for authentication mid-command, the user is prompted for credentials
//! and the interrupted request is replayed once the login goes through.

mod commands;
mod format;
mod prompt;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coinblesk_core::{Config, ConsoleApi, EventBus, Session, SessionGateway, SessionStore};

#[derive(Parser)]
#[command(name = "coinblesk", version, about = "Administer a CoinBlesk server")]
struct Cli {
    /// Backend URL, overriding the config file and COINBLESK_URL
    #[arg(long, global = true)]
    url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Log in and remember the session
    Login {
        #[arg(short, long)]
        username: Option<String>,
    },
    /// End the session locally and on the server
    Logout,
    /// Show who is logged in
    Status,
    /// Total balance and the latest transactions
    Balance,
    /// Full transaction history
    History,
    /// Registered users
    Users,
    /// Console administrators
    Admins,
    /// Trust relations with other servers
    Accounts,
    /// Pending requests from other servers
    Messages,
    /// Audit log
    Activities,
    /// Payout rules for one server account
    Rules {
        /// Server account URL
        url: String,
    },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::load()?;
    let mut gateway_config = config.gateway_config();
    if let Some(url) = cli.url {
        gateway_config.base_url = url;
    }
    info!(url = %gateway_config.base_url, "CoinBlesk console starting");

    let session = Session::shared();
    let bus = EventBus::new();
    let store = SessionStore::new(config.cache_dir()?);
    let gateway = SessionGateway::new(gateway_config, Arc::clone(&session), bus.clone(), Some(store))?;

    let restored = match gateway.restore().await {
        Ok(restored) => restored,
        Err(e) => {
            warn!(error = %e, "Could not restore session");
            false
        }
    };

    match cli.command {
        Command::Login { username } => commands::login(&gateway, &mut config, username).await,
        Command::Logout => {
            gateway.logout().await;
            println!("Logged out.");
            Ok(())
        }
        Command::Status => {
            commands::status(&session, restored);
            Ok(())
        }
        command => {
            let _prompt = prompt::LoginPrompt::install(&gateway, config.last_username.clone());
            commands::run(&ConsoleApi::new(gateway.clone()), command).await
        }
    }
}
