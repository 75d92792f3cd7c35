//! Command implementations. Each prints a plain table to stdout.

use anyhow::{Context, Result};

use coinblesk_core::{AuthState, Config, ConsoleApi, SessionGateway, SharedSession};

use crate::format::{format_btc, format_optional, format_timestamp, truncate_string};
use crate::prompt::prompt_credentials;
use crate::Command;

pub async fn login(gateway: &SessionGateway, config: &mut Config, username: Option<String>) -> Result<()> {
    let default_username = username.or_else(|| config.last_username.clone());
    let credentials = tokio::task::spawn_blocking(move || prompt_credentials(default_username))
        .await
        .context("Prompt task failed")??;
    let username = credentials.username.clone();

    gateway.login(credentials).await.context("Login failed")?;

    config.last_username = Some(username.clone());
    config.save()?;
    println!("Logged in as {}.", username);
    Ok(())
}

pub fn status(session: &SharedSession, restored: bool) {
    let session = session.read();
    match session.state() {
        AuthState::Authenticated => {
            println!("Logged in as {}", session.username().unwrap_or("?"));
            if let Some(user) = session.user() {
                println!("  email:   {}", user.display_email());
            }
            if restored {
                println!("  session: restored");
            }
        }
        AuthState::Authenticating => println!("Login in progress"),
        AuthState::Uninitialized => println!("Not logged in"),
    }
}

pub async fn run(api: &ConsoleApi, command: Command) -> Result<()> {
    match command {
        Command::Balance => {
            let (balance, recent) = futures::future::try_join(api.balance(), api.last_transactions()).await?;
            println!("Balance: {}", format_btc(balance));
            println!();
            for tx in recent {
                print_transaction(&tx);
            }
        }
        Command::History => {
            for tx in api.history().await? {
                print_transaction(&tx);
            }
        }
        Command::Users => {
            for user in api.users().await? {
                println!(
                    "{:<24} {:<32} {}",
                    truncate_string(&user.username, 24),
                    truncate_string(user.display_email(), 32),
                    user.balance.map(format_btc).unwrap_or_else(|| "-".to_string()),
                );
            }
        }
        Command::Admins => {
            for admin in api.admins().await? {
                println!("{:<24} {}", truncate_string(&admin.username, 24), admin.display_email());
            }
        }
        Command::Accounts => {
            for account in api.server_accounts().await? {
                println!(
                    "{:<40} {:<14} {:>18} limit {}",
                    truncate_string(&account.url, 40),
                    account.trust_level.to_string(),
                    format_btc(account.active_balance),
                    account.balance_limit,
                );
            }
        }
        Command::Messages => {
            for message in api.messages().await? {
                println!(
                    "[{}] {} {} - {}",
                    if message.answered { "x" } else { " " },
                    format_timestamp(message.creation_date),
                    truncate_string(&message.server_url, 40),
                    message.subject,
                );
            }
        }
        Command::Activities => {
            for activity in api.activities().await? {
                println!(
                    "{} {:<16} {}",
                    format_timestamp(activity.creation_date),
                    format_optional(activity.username.as_deref(), "-"),
                    activity.subject,
                );
            }
        }
        Command::Rules { url } => {
            let rules = api.payout_rules(&url).await?;
            if rules.is_empty() {
                println!("No payout rules for {}", url);
            }
            for rule in rules {
                println!(
                    "day {:>2} hour {:>2} -> {} (limit {})",
                    rule.day,
                    rule.hour,
                    rule.payout_address,
                    rule.balance_limit.map(|l| l.to_string()).unwrap_or_else(|| "-".to_string()),
                );
            }
        }
        Command::Login { .. } | Command::Logout | Command::Status => {}
    }
    Ok(())
}

fn print_transaction(tx: &coinblesk_core::models::ServerTransaction) {
    println!(
        "{} {:>20} {}{}",
        format_timestamp(tx.timestamp),
        format_btc(tx.signed_amount()),
        format_optional(tx.server_url.as_deref(), "-"),
        if tx.verified { "" } else { " (unverified)" },
    );
}
