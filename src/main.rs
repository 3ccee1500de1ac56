//! Guardian Proxy - two-key account custody CLI
//!
//! # WARNING
//! - The operating key can move funds; treat it like any hot key.
//! - Only the recovery key can release an engaged lock or replace the
//!   operating key. Losing BOTH keys strands the account.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::error;

// Use the library crate
use guardian_proxy::cli::commands;
use guardian_proxy::config::Config;

/// Guardian Proxy - two-key account custody
#[derive(Parser)]
#[command(name = "guardian")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "guardian.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the account record with its two controlling keys
    Init {
        /// Operating key (base58)
        owner: String,

        /// Recovery key (base58)
        client: String,

        /// Account address (generated if omitted)
        #[arg(long)]
        address: Option<String>,

        /// Overwrite an existing account record
        #[arg(long)]
        force: bool,
    },

    /// Show the account record (keys, lock, balance)
    Status,

    /// Show current configuration
    Config,

    /// Credit inbound value to the account
    Fund {
        /// Amount in ledger units
        amount: u64,
    },

    /// Engage the emergency lock (owner or client)
    Lock {
        /// Calling key (base58)
        #[arg(long)]
        caller: String,
    },

    /// Release the emergency lock (client only)
    Unlock {
        /// Calling key (base58)
        #[arg(long)]
        caller: String,
    },

    /// Replace the operating key (client only)
    RotateOwner {
        /// New operating key (base58)
        new_owner: String,

        /// Calling key (base58)
        #[arg(long)]
        caller: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Replace the recovery key (owner only)
    RotateClient {
        /// New recovery key (base58)
        new_client: String,

        /// Calling key (base58)
        #[arg(long)]
        caller: String,

        /// Skip confirmation prompt
        #[arg(long)]
        force: bool,
    },

    /// Move value directly to a receiver (owner or client)
    Send {
        /// Receiving address (base58)
        receiver: String,

        /// Amount in ledger units
        amount: u64,

        /// Calling key (base58)
        #[arg(long)]
        caller: String,
    },

    /// Forward an arbitrary call with value (owner or client, unlocked)
    Exec {
        /// Target address (base58)
        target: String,

        /// Value in ledger units
        value: u64,

        /// Calling key (base58)
        #[arg(long)]
        caller: String,

        /// Opaque payload, base64-encoded
        #[arg(long)]
        payload: Option<String>,

        /// Gas ceiling for the forwarded call (requires --value-cap)
        #[arg(long)]
        gas_limit: Option<u64>,

        /// Spending cap for this call (requires --gas-limit)
        #[arg(long)]
        value_cap: Option<u64>,
    },

    /// View the audit history
    History {
        /// Number of records to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("guardian_proxy=info".parse().unwrap()),
        )
        .with_target(true)
        .init();

    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load(&cli.config) {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Execute command
    let result = match cli.command {
        Commands::Init {
            owner,
            client,
            address,
            force,
        } => commands::init(&config, &owner, &client, address, force).await,
        Commands::Status => commands::status(&config).await,
        Commands::Config => commands::show_config(&config),
        Commands::Fund { amount } => commands::fund(&config, amount).await,
        Commands::Lock { caller } => commands::lock(&config, &caller).await,
        Commands::Unlock { caller } => commands::unlock(&config, &caller).await,
        Commands::RotateOwner {
            new_owner,
            caller,
            force,
        } => commands::rotate_owner(&config, &caller, &new_owner, force).await,
        Commands::RotateClient {
            new_client,
            caller,
            force,
        } => commands::rotate_client(&config, &caller, &new_client, force).await,
        Commands::Send {
            receiver,
            amount,
            caller,
        } => commands::send(&config, &caller, &receiver, amount).await,
        Commands::Exec {
            target,
            value,
            caller,
            payload,
            gas_limit,
            value_cap,
        } => {
            commands::exec(&config, &caller, &target, value, payload, gas_limit, value_cap).await
        }
        Commands::History { limit } => commands::history(&config, limit).await,
    };

    if let Err(e) = result {
        error!("Command failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}
