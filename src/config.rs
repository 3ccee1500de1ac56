//! Configuration loading and validation

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Where the account, history, and ledger files live
#[derive(Debug, Clone, Deserialize)]
pub struct StateConfig {
    /// Directory holding account.json, history.json, and ledger.json
    #[serde(default = "default_state_dir")]
    pub dir: String,

    /// Maximum number of audit records kept
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

/// Named policy choices of the guard
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Whether direct transfers bypass the emergency lock
    ///
    /// The lock always gates forwarding; this flag decides the
    /// plain-transfer path only.
    #[serde(default)]
    pub transfer_lock_exempt: bool,

    /// Require interactive confirmation for key rotations in the CLI
    #[serde(default = "default_true")]
    pub confirm_rotations: bool,
}

fn default_state_dir() -> String {
    "guardian-state".to_string()
}

fn default_history_limit() -> usize {
    1000
}

fn default_true() -> bool {
    true
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            transfer_lock_exempt: false,
            confirm_rotations: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state: StateConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let settings = config::Config::builder()
            // Start with defaults
            .set_default("state.dir", default_state_dir())?
            .set_default("state.history_limit", default_history_limit() as i64)?
            .set_default("policy.transfer_lock_exempt", false)?
            .set_default("policy.confirm_rotations", true)?
            // Load from file if exists
            .add_source(config::File::from(path).required(false))
            // Override with environment variables (prefix GUARDIAN_)
            .add_source(
                config::Environment::with_prefix("GUARDIAN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: Config = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.state.dir.trim().is_empty() {
            anyhow::bail!("state.dir must not be empty");
        }

        if self.state.history_limit == 0 {
            anyhow::bail!("state.history_limit must be at least 1");
        }

        if self.policy.transfer_lock_exempt {
            tracing::warn!(
                "policy.transfer_lock_exempt is enabled - direct transfers will bypass the emergency lock"
            );
        }

        Ok(())
    }

    /// Path of the persisted account record
    pub fn account_path(&self) -> PathBuf {
        Path::new(&self.state.dir).join("account.json")
    }

    /// Path of the persisted audit history
    pub fn history_path(&self) -> PathBuf {
        Path::new(&self.state.dir).join("history.json")
    }

    /// Path of the persisted ledger balances
    pub fn ledger_path(&self) -> PathBuf {
        Path::new(&self.state.dir).join("ledger.json")
    }

    /// Configuration for display
    pub fn summary(&self) -> String {
        format!(
            r#"Configuration:
  State:
    dir: {}
    history_limit: {}
  Policy:
    transfer_lock_exempt: {}
    confirm_rotations: {}
"#,
            self.state.dir,
            self.state.history_limit,
            self.policy.transfer_lock_exempt,
            self.policy.confirm_rotations,
        )
    }
}
