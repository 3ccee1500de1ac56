//! Guardian - core account proxy operations
//!
//! Coordinates role enforcement, the lock state machine, governance, call
//! forwarding, and direct transfer over one account record.
//!
//! Every mutating operation validates and commits its effects while
//! holding the account's write guard, and the guard is dropped BEFORE any
//! outbound call. External callees can therefore re-enter the proxy
//! without deadlocking and only ever observe fully-committed state; a
//! failed outbound call restores the exact debit it was charged.

use std::path::PathBuf;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::PolicyConfig;
use crate::error::{Error, Result};
use crate::ledger::{CallReceipt, Ledger};

use super::forwarder::{self, CallLimits};
use super::governance;
use super::lock;
use super::roles::Role;
use super::transfer;
use super::types::{AccountState, Address, CallRequest, OperationHistory, OperationKind, OperationRecord};

/// Core account guardian
pub struct Guardian {
    /// The guarded account record
    state: Arc<RwLock<AccountState>>,

    /// Host environment executing outbound calls and transfers
    ledger: Arc<dyn Ledger>,

    /// Named policy choices
    policy: PolicyConfig,

    /// Audit history
    history: Arc<RwLock<OperationHistory>>,

    /// Maximum audit records kept
    history_limit: usize,

    /// Path for account persistence
    state_path: Option<PathBuf>,

    /// Path for history persistence
    history_path: Option<PathBuf>,
}

impl Guardian {
    /// Create a guardian over a freshly constructed or loaded account
    pub fn new(account: AccountState, policy: PolicyConfig, ledger: Arc<dyn Ledger>) -> Self {
        Self {
            state: Arc::new(RwLock::new(account)),
            ledger,
            policy,
            history: Arc::new(RwLock::new(OperationHistory::default())),
            history_limit: 1000,
            state_path: None,
            history_path: None,
        }
    }

    /// Persist the account record and audit history after each mutation
    pub fn with_persistence(mut self, state_path: PathBuf, history_path: PathBuf) -> Self {
        self.state_path = Some(state_path);
        self.history_path = Some(history_path);
        self
    }

    /// Override the audit history cap
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Load a persisted account record
    pub fn load_state(path: &std::path::Path) -> Result<AccountState> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Persistence(format!(
                "Failed to read account record {}: {} (run `guardian init` first?)",
                path.display(),
                e
            ))
        })?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Persistence(format!("Failed to parse account record: {}", e)))
    }

    /// Load audit history from file, if present
    pub async fn load_history(&self, path: &std::path::Path) -> Result<()> {
        if let Ok(content) = tokio::fs::read_to_string(path).await {
            let loaded: OperationHistory = serde_json::from_str(&content)
                .map_err(|e| Error::Persistence(format!("Failed to parse history: {}", e)))?;

            let mut history = self.history.write().await;
            *history = loaded;

            info!("Loaded {} audit records", history.records.len());
        }
        Ok(())
    }

    /// Current operating key
    pub async fn owner(&self) -> Address {
        self.state.read().await.owner
    }

    /// Current recovery key
    pub async fn client(&self) -> Address {
        self.state.read().await.client
    }

    /// Whether the circuit-breaker is engaged
    pub async fn locked(&self) -> bool {
        self.state.read().await.locked
    }

    /// Held balance in ledger units
    pub async fn balance(&self) -> u64 {
        self.state.read().await.balance
    }

    /// Address under which the ledger knows this account
    pub async fn address(&self) -> Address {
        self.state.read().await.address
    }

    /// Snapshot of the full account record
    pub async fn snapshot(&self) -> AccountState {
        self.state.read().await.clone()
    }

    /// Accept inbound value
    ///
    /// Not a governed operation: deposits are accepted regardless of the
    /// lock and from any party. Returns the new balance.
    pub async fn deposit(&self, amount: u64) -> Result<u64> {
        let balance = {
            let mut state = self.state.write().await;
            state.balance = state
                .balance
                .checked_add(amount)
                .ok_or(Error::BalanceOverflow)?;
            state.balance
        };

        info!("Deposited {} units (balance now {})", amount, balance);
        self.save_state().await?;
        Ok(balance)
    }

    /// Engage the emergency lock. Owner or client; idempotent.
    pub async fn lock(&self, caller: Address) -> Result<()> {
        let role = {
            let mut state = self.state.write().await;
            lock::engage(&mut state, caller)?
        };

        self.record(caller, role, OperationKind::Locked).await?;
        self.save_state().await
    }

    /// Release the emergency lock. Client only.
    pub async fn unlock(&self, caller: Address) -> Result<()> {
        let role = {
            let mut state = self.state.write().await;
            lock::release(&mut state, caller)?
        };

        self.record(caller, role, OperationKind::Unlocked).await?;
        self.save_state().await
    }

    /// Replace the operating key. Client only; permitted while locked.
    pub async fn rotate_owner(&self, caller: Address, new_owner: Address) -> Result<()> {
        let role = {
            let mut state = self.state.write().await;
            governance::rotate_owner(&mut state, caller, new_owner)?
        };

        self.record(caller, role, OperationKind::OwnerRotated { new_owner })
            .await?;
        self.save_state().await
    }

    /// Replace the recovery key. Owner only; permitted while locked.
    pub async fn rotate_client(&self, caller: Address, new_client: Address) -> Result<()> {
        let role = {
            let mut state = self.state.write().await;
            governance::rotate_client(&mut state, caller, new_client)?
        };

        self.record(caller, role, OperationKind::ClientRotated { new_client })
            .await?;
        self.save_state().await
    }

    /// Forward an arbitrary call with value. Owner or client, unlocked.
    pub async fn exec(&self, caller: Address, request: CallRequest) -> Result<CallReceipt> {
        self.forward(caller, request, CallLimits::unbounded()).await
    }

    /// Forward a call under an explicit gas ceiling and spending cap
    ///
    /// Intended for lower-trust keys: value above `value_cap` is refused
    /// outright, and a callee that blows `gas_limit` counts as a failed
    /// call.
    pub async fn exec_custom(
        &self,
        caller: Address,
        request: CallRequest,
        gas_limit: u64,
        value_cap: u64,
    ) -> Result<CallReceipt> {
        self.forward(caller, request, CallLimits::bounded(gas_limit, value_cap))
            .await
    }

    /// Shared forwarding path
    async fn forward(
        &self,
        caller: Address,
        request: CallRequest,
        limits: CallLimits,
    ) -> Result<CallReceipt> {
        let (role, origin) = {
            let mut state = self.state.write().await;
            let role = forwarder::prepare(&mut state, caller, &request, &limits)?;
            (role, state.address)
        };

        // Effects are committed and the guard is dropped: the callee may
        // re-enter the proxy and will pass the same gates everyone else does.
        match self
            .ledger
            .execute_call(origin, &request, limits.gas_limit)
            .await
        {
            Ok(receipt) => {
                info!(
                    "Forwarded call to {} carrying {} units ({} gas)",
                    request.target, request.value, receipt.gas_used
                );

                self.record(
                    caller,
                    role,
                    OperationKind::CallForwarded {
                        target: request.target,
                        value: request.value,
                        payload: BASE64.encode(&request.payload),
                        gas_used: receipt.gas_used,
                    },
                )
                .await?;
                self.save_state().await?;

                Ok(receipt)
            }
            Err(err) => {
                let mut state = self.state.write().await;
                forwarder::rollback(&mut state, request.value);
                warn!(
                    "Forwarded call to {} failed, debit of {} units rolled back: {}",
                    request.target, request.value, err
                );
                Err(err)
            }
        }
    }

    /// Move value directly to a receiver. Owner or client; lock scope per
    /// `PolicyConfig::transfer_lock_exempt`.
    pub async fn send(&self, caller: Address, receiver: Address, amount: u64) -> Result<()> {
        let role = {
            let mut state = self.state.write().await;
            transfer::prepare(&mut state, caller, receiver, amount, &self.policy)?
        };

        match self.ledger.deposit(receiver, amount).await {
            Ok(()) => {
                info!("Transferred {} units to {}", amount, receiver);

                self.record(caller, role, OperationKind::Transferred { receiver, amount })
                    .await?;
                self.save_state().await
            }
            Err(err) => {
                let mut state = self.state.write().await;
                transfer::rollback(&mut state, amount);
                warn!(
                    "Transfer of {} units to {} failed, debit rolled back: {}",
                    amount, receiver, err
                );
                Err(err)
            }
        }
    }

    /// Most recent audit records
    pub async fn history(&self, limit: usize) -> Vec<OperationRecord> {
        let history = self.history.read().await;
        history.records.iter().take(limit).cloned().collect()
    }

    /// Append an audit record and persist the history
    async fn record(&self, caller: Address, role: Role, operation: OperationKind) -> Result<()> {
        let record = OperationRecord {
            id: Uuid::new_v4().to_string(),
            operation,
            caller,
            role,
            timestamp: Utc::now(),
        };

        {
            let mut history = self.history.write().await;
            history.records.insert(0, record);
            history.records.truncate(self.history_limit);
        }

        self.save_history().await
    }

    /// Save the account record to file
    async fn save_state(&self) -> Result<()> {
        if let Some(path) = &self.state_path {
            let json = {
                let state = self.state.read().await;
                serde_json::to_string_pretty(&*state)
                    .map_err(|e| Error::Persistence(format!("Failed to serialize account: {}", e)))?
            };

            tokio::fs::write(path, json)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to write account: {}", e)))?;

            debug!("Saved account record");
        }
        Ok(())
    }

    /// Save the audit history to file
    async fn save_history(&self) -> Result<()> {
        if let Some(path) = &self.history_path {
            let json = {
                let history = self.history.read().await;
                serde_json::to_string_pretty(&*history)
                    .map_err(|e| Error::Persistence(format!("Failed to serialize history: {}", e)))?
            };

            tokio::fs::write(path, json)
                .await
                .map_err(|e| Error::Persistence(format!("Failed to write history: {}", e)))?;

            debug!("Saved audit history");
        }
        Ok(())
    }
}
