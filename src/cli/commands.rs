//! CLI command implementations

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use dialoguer::Confirm;
use tracing::{info, warn};

use crate::config::Config;
use crate::ledger::{InMemoryLedger, Ledger};
use crate::proxy::types::{AccountState, Address, CallRequest};
use crate::proxy::Guardian;

/// Parse a base58 address argument
fn parse_address(s: &str, what: &str) -> Result<Address> {
    s.parse::<Address>()
        .with_context(|| format!("Invalid {} address: {}", what, s))
}

/// Load the persisted account, ledger, and history into a live guardian
async fn open_guardian(config: &Config) -> Result<(Arc<Guardian>, Arc<InMemoryLedger>)> {
    let account = Guardian::load_state(&config.account_path())?;
    let ledger = Arc::new(InMemoryLedger::load(config.ledger_path())?);

    let guardian = Arc::new(
        Guardian::new(
            account,
            config.policy.clone(),
            Arc::clone(&ledger) as Arc<dyn Ledger>,
        )
        .with_history_limit(config.state.history_limit)
        .with_persistence(config.account_path(), config.history_path()),
    );
    guardian.load_history(&config.history_path()).await?;

    Ok((guardian, ledger))
}

/// Create the account record
pub async fn init(
    config: &Config,
    owner: &str,
    client: &str,
    address: Option<String>,
    force: bool,
) -> Result<()> {
    let account_path = config.account_path();
    if account_path.exists() && !force {
        bail!(
            "Account record already exists at {} (use --force to overwrite)",
            account_path.display()
        );
    }

    let owner = parse_address(owner, "owner")?;
    let client = parse_address(client, "client")?;
    let address = match address {
        Some(s) => parse_address(&s, "account")?,
        None => Address::generate(),
    };

    let account = AccountState::new(address, owner, client)?;

    std::fs::create_dir_all(&config.state.dir)
        .with_context(|| format!("Failed to create state dir {}", config.state.dir))?;
    let json = serde_json::to_string_pretty(&account)?;
    std::fs::write(&account_path, json)
        .with_context(|| format!("Failed to write {}", account_path.display()))?;

    info!("Account record created at {}", account_path.display());

    println!("\n=== ACCOUNT CREATED ===");
    println!("Address: {}", account.address);
    println!("Owner:   {}", account.owner);
    println!("Client:  {}", account.client);

    Ok(())
}

/// Show the account record
pub async fn status(config: &Config) -> Result<()> {
    let (guardian, _ledger) = open_guardian(config).await?;
    let account = guardian.snapshot().await;

    println!("\n=== ACCOUNT STATUS ===");
    println!("Address: {}", account.address);
    println!("Owner:   {}", account.owner);
    println!("Client:  {}", account.client);
    println!("Locked:  {}", account.locked);
    println!("Balance: {} units", account.balance);

    if account.locked {
        warn!("Account is locked - forwarding is suspended");
        println!("\nTo release: guardian unlock --caller <CLIENT>");
    }

    Ok(())
}

/// Show current configuration
pub fn show_config(config: &Config) -> Result<()> {
    println!("{}", config.summary());
    Ok(())
}

/// Credit inbound value to the account
pub async fn fund(config: &Config, amount: u64) -> Result<()> {
    let (guardian, _ledger) = open_guardian(config).await?;

    let balance = guardian.deposit(amount).await?;
    println!("Deposited {} units (balance now {})", amount, balance);

    Ok(())
}

/// Engage the emergency lock
pub async fn lock(config: &Config, caller: &str) -> Result<()> {
    let caller = parse_address(caller, "caller")?;
    let (guardian, _ledger) = open_guardian(config).await?;

    guardian.lock(caller).await?;
    println!("Account locked - forwarding is suspended");
    println!("To release: guardian unlock --caller <CLIENT>");

    Ok(())
}

/// Release the emergency lock (recovery key only)
pub async fn unlock(config: &Config, caller: &str) -> Result<()> {
    let caller = parse_address(caller, "caller")?;
    let (guardian, _ledger) = open_guardian(config).await?;

    guardian.unlock(caller).await?;
    println!("Account unlocked - operations may resume");

    Ok(())
}

/// Replace the operating key (recovery key only)
pub async fn rotate_owner(config: &Config, caller: &str, new_owner: &str, force: bool) -> Result<()> {
    let caller = parse_address(caller, "caller")?;
    let new_owner = parse_address(new_owner, "new owner")?;
    let (guardian, _ledger) = open_guardian(config).await?;

    if config.policy.confirm_rotations && !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Replace the operating key with {}? The current key loses all access.",
                new_owner
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Rotation cancelled by user");
            return Ok(());
        }
    }

    guardian.rotate_owner(caller, new_owner).await?;
    println!("Operating key rotated to {}", new_owner);

    Ok(())
}

/// Replace the recovery key (operating key only)
pub async fn rotate_client(config: &Config, caller: &str, new_client: &str, force: bool) -> Result<()> {
    let caller = parse_address(caller, "caller")?;
    let new_client = parse_address(new_client, "new client")?;
    let (guardian, _ledger) = open_guardian(config).await?;

    if config.policy.confirm_rotations && !force {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Replace the recovery key with {}? The current key loses all access.",
                new_client
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            info!("Rotation cancelled by user");
            return Ok(());
        }
    }

    guardian.rotate_client(caller, new_client).await?;
    println!("Recovery key rotated to {}", new_client);

    Ok(())
}

/// Move value directly to a receiver
pub async fn send(config: &Config, caller: &str, receiver: &str, amount: u64) -> Result<()> {
    let caller = parse_address(caller, "caller")?;
    let receiver = parse_address(receiver, "receiver")?;
    let (guardian, ledger) = open_guardian(config).await?;

    guardian.send(caller, receiver, amount).await?;
    ledger.save(config.ledger_path())?;

    println!(
        "Sent {} units to {} (balance now {})",
        amount,
        receiver,
        guardian.balance().await
    );

    Ok(())
}

/// Forward an arbitrary call with value
pub async fn exec(
    config: &Config,
    caller: &str,
    target: &str,
    value: u64,
    payload: Option<String>,
    gas_limit: Option<u64>,
    value_cap: Option<u64>,
) -> Result<()> {
    let caller = parse_address(caller, "caller")?;
    let target = parse_address(target, "target")?;

    let payload = match payload {
        Some(encoded) => BASE64
            .decode(&encoded)
            .with_context(|| format!("Invalid base64 payload: {}", encoded))?,
        None => Vec::new(),
    };
    let request = CallRequest::new(target, payload, value);

    let (guardian, ledger) = open_guardian(config).await?;

    let receipt = match (gas_limit, value_cap) {
        (None, None) => guardian.exec(caller, request).await?,
        (Some(gas_limit), Some(value_cap)) => {
            guardian
                .exec_custom(caller, request, gas_limit, value_cap)
                .await?
        }
        _ => bail!("--gas-limit and --value-cap must be given together"),
    };
    ledger.save(config.ledger_path())?;

    println!("\n=== CALL FORWARDED ===");
    println!("Target:  {}", target);
    println!("Value:   {} units", value);
    println!("Gas:     {}", receipt.gas_used);
    println!("Balance: {} units", guardian.balance().await);

    Ok(())
}

/// View the audit history
pub async fn history(config: &Config, limit: usize) -> Result<()> {
    let (guardian, _ledger) = open_guardian(config).await?;
    let records = guardian.history(limit).await;

    println!("\n=== AUDIT HISTORY ===\n");

    if records.is_empty() {
        println!("No audit records found.");
    } else {
        println!("{:<12} {:<8} {:<46} {}", "DATE", "ROLE", "CALLER", "OPERATION");
        println!("{}", "-".repeat(100));

        for record in &records {
            println!(
                "{:<12} {:<8} {:<46} {}",
                record.timestamp.format("%Y-%m-%d"),
                record.role.to_string(),
                record.caller.to_string(),
                record.operation
            );
        }
    }

    println!();
    Ok(())
}
