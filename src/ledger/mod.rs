//! Host ledger abstraction
//!
//! The environment the proxy lives in: it executes outbound calls against
//! opaque external parties and moves value atomically. The proxy only
//! relies on the call/return contract - a failed call leaves no balance
//! change on the ledger side.
//!
//! `InMemoryLedger` is the standalone implementation used by the CLI and
//! the test suite. External parties without a registered handler behave
//! like plain accounts that accept value; registered handlers run
//! arbitrary async code, report the gas they consumed, and may re-enter
//! the proxy.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::BoxFuture;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::proxy::types::{Address, CallRequest};

/// Receipt from a completed outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallReceipt {
    /// Computational budget the callee reported consuming
    pub gas_used: u64,
}

/// Context handed to a registered call handler
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Account on whose behalf the call is made
    pub origin: Address,

    /// Invoked party
    pub target: Address,

    /// Opaque payload
    pub payload: Vec<u8>,

    /// Value carried by the call
    pub value: u64,

    /// Gas ceiling the caller imposed, if any
    pub gas_limit: Option<u64>,
}

/// What a handler reports back: gas consumed on success, or a rejection
/// reason
pub type HandlerResult = std::result::Result<u64, String>;

/// Registered callee code
pub type CallHandler = Arc<dyn Fn(CallContext) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Value-transfer and call-execution primitives of the host environment
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Execute an outbound call carrying value
    ///
    /// On success the target has been credited with the call's value. Any
    /// failure (rejection by the callee or a blown gas ceiling) is
    /// `ForwardedCallFailed` and leaves ledger balances untouched.
    async fn execute_call(
        &self,
        origin: Address,
        request: &CallRequest,
        gas_limit: Option<u64>,
    ) -> Result<CallReceipt>;

    /// Credit value to a receiver atomically
    async fn deposit(&self, receiver: Address, amount: u64) -> Result<()>;
}

/// Standalone ledger backed by in-process maps
#[derive(Default)]
pub struct InMemoryLedger {
    /// External party balances
    balances: DashMap<Address, u64>,

    /// Registered callee code by target address
    handlers: DashMap<Address, CallHandler>,
}

impl InMemoryLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Register callee code for a target address
    pub fn register_handler(&self, target: Address, handler: CallHandler) {
        self.handlers.insert(target, handler);
    }

    /// Balance of an external party
    pub fn balance_of(&self, address: Address) -> u64 {
        self.balances.get(&address).map(|b| *b).unwrap_or(0)
    }

    /// Credit an external party
    pub fn credit(&self, address: Address, amount: u64) -> Result<()> {
        let mut balance = self.balances.entry(address).or_insert(0);
        *balance = balance.checked_add(amount).ok_or(Error::BalanceOverflow)?;
        Ok(())
    }

    /// Load external balances from a JSON file
    ///
    /// Missing file means an empty ledger.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let ledger = Self::new();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| Error::Persistence(format!("Failed to read {}: {}", path.display(), e)))?;
            let balances: BTreeMap<Address, u64> = serde_json::from_str(&content)
                .map_err(|e| Error::Persistence(format!("Failed to parse {}: {}", path.display(), e)))?;

            for (address, amount) in balances {
                ledger.balances.insert(address, amount);
            }
            info!("Loaded {} ledger balances", ledger.balances.len());
        }

        Ok(ledger)
    }

    /// Save external balances to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let snapshot: BTreeMap<Address, u64> = self
            .balances
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect();

        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| Error::Persistence(format!("Failed to serialize ledger: {}", e)))?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| Error::Persistence(format!("Failed to write ledger: {}", e)))?;

        debug!("Saved ledger balances");
        Ok(())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn execute_call(
        &self,
        origin: Address,
        request: &CallRequest,
        gas_limit: Option<u64>,
    ) -> Result<CallReceipt> {
        // Clone the handler out so no map guard is held across the await;
        // the callee may re-enter this ledger.
        let handler = self
            .handlers
            .get(&request.target)
            .map(|entry| Arc::clone(entry.value()));

        let gas_used = match handler {
            Some(handler) => {
                let context = CallContext {
                    origin,
                    target: request.target,
                    payload: request.payload.clone(),
                    value: request.value,
                    gas_limit,
                };
                handler(context).await.map_err(Error::ForwardedCallFailed)?
            }
            // A target with no code is a plain account: it accepts value
            None => 0,
        };

        if let Some(limit) = gas_limit {
            if gas_used > limit {
                return Err(Error::ForwardedCallFailed(format!(
                    "gas ceiling exceeded: used {} of {}",
                    gas_used, limit
                )));
            }
        }

        self.credit(request.target, request.value)?;

        debug!(
            "Call executed: {} -> {} ({} units, {} gas)",
            origin, request.target, request.value, gas_used
        );

        Ok(CallReceipt { gas_used })
    }

    async fn deposit(&self, receiver: Address, amount: u64) -> Result<()> {
        self.credit(receiver, amount)?;
        debug!("Deposited {} units to {}", amount, receiver);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(value: u64) -> CallRequest {
        CallRequest::new(Address::derive("target"), vec![], value)
    }

    #[tokio::test]
    async fn test_plain_target_accepts_value() {
        let ledger = InMemoryLedger::new();

        let receipt = ledger
            .execute_call(Address::derive("account"), &request(100), None)
            .await
            .unwrap();

        assert_eq!(receipt.gas_used, 0);
        assert_eq!(ledger.balance_of(Address::derive("target")), 100);
    }

    #[tokio::test]
    async fn test_rejecting_handler_leaves_balances_untouched() {
        let ledger = InMemoryLedger::new();
        ledger.register_handler(
            Address::derive("target"),
            Arc::new(|_ctx| Box::pin(async { Err("reverted".to_string()) })),
        );

        let err = ledger
            .execute_call(Address::derive("account"), &request(100), None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ForwardedCallFailed(_)));
        assert_eq!(ledger.balance_of(Address::derive("target")), 0);
    }

    #[tokio::test]
    async fn test_gas_ceiling_turns_into_failure() {
        let ledger = InMemoryLedger::new();
        ledger.register_handler(
            Address::derive("target"),
            Arc::new(|_ctx| Box::pin(async { Ok(30_000) })),
        );

        let err = ledger
            .execute_call(Address::derive("account"), &request(10), Some(21_000))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ForwardedCallFailed(_)));
        assert_eq!(ledger.balance_of(Address::derive("target")), 0);

        // Within the ceiling the same callee succeeds
        let receipt = ledger
            .execute_call(Address::derive("account"), &request(10), Some(40_000))
            .await
            .unwrap();
        assert_eq!(receipt.gas_used, 30_000);
        assert_eq!(ledger.balance_of(Address::derive("target")), 10);
    }

    #[tokio::test]
    async fn test_handler_sees_call_context() {
        let ledger = InMemoryLedger::new();
        ledger.register_handler(
            Address::derive("target"),
            Arc::new(|ctx| {
                Box::pin(async move {
                    if ctx.payload == vec![0x01] && ctx.value == 7 {
                        Ok(42)
                    } else {
                        Err("unexpected context".to_string())
                    }
                })
            }),
        );

        let receipt = ledger
            .execute_call(
                Address::derive("account"),
                &CallRequest::new(Address::derive("target"), vec![0x01], 7),
                None,
            )
            .await
            .unwrap();

        assert_eq!(receipt.gas_used, 42);
    }

    #[tokio::test]
    async fn test_deposit_overflow() {
        let ledger = InMemoryLedger::new();
        ledger.credit(Address::derive("rich"), u64::MAX).unwrap();

        assert!(matches!(
            ledger.deposit(Address::derive("rich"), 1).await,
            Err(Error::BalanceOverflow)
        ));
    }

    #[test]
    fn test_persistence_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");

        let ledger = InMemoryLedger::new();
        ledger.credit(Address::derive("a"), 100).unwrap();
        ledger.credit(Address::derive("b"), 250).unwrap();
        ledger.save(&path).unwrap();

        let loaded = InMemoryLedger::load(&path).unwrap();
        assert_eq!(loaded.balance_of(Address::derive("a")), 100);
        assert_eq!(loaded.balance_of(Address::derive("b")), 250);
        assert_eq!(loaded.balance_of(Address::derive("c")), 0);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ledger = InMemoryLedger::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(ledger.balance_of(Address::derive("a")), 0);
    }
}
