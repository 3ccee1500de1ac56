//! Call forwarding validation and effects
//!
//! The checks-effects half of the forwarding path: authorize the caller,
//! gate on the lock, enforce the optional spending cap, and commit the
//! balance debit. The interaction (the actual outbound call) happens in
//! `Guardian::forward` AFTER these effects are committed, so a reentrant
//! call from the target never observes a half-updated account.

use tracing::debug;

use crate::error::{Error, Result};
use crate::proxy::roles::{self, Requirement, Role};
use crate::proxy::types::{AccountState, Address, CallRequest};

/// Per-call bounds for the capped forwarding variant
///
/// The plain `exec` uses `CallLimits::unbounded()`; `exec_custom` carries
/// an explicit gas ceiling and spending cap.
#[derive(Debug, Clone, Copy)]
pub struct CallLimits {
    /// Ceiling on the computational budget handed to the callee
    pub gas_limit: Option<u64>,

    /// Ceiling on the value a single call may carry
    pub value_cap: Option<u64>,
}

impl CallLimits {
    /// No per-call bounds (plain `exec`)
    pub fn unbounded() -> Self {
        Self {
            gas_limit: None,
            value_cap: None,
        }
    }

    /// Explicit bounds (`exec_custom`)
    pub fn bounded(gas_limit: u64, value_cap: u64) -> Self {
        Self {
            gas_limit: Some(gas_limit),
            value_cap: Some(value_cap),
        }
    }
}

/// Validate a forwarding request and commit the value debit
///
/// Check order: role, lock, spending cap, balance. The debit is the last
/// effect before the outbound call; a failure on any check leaves the
/// account untouched.
pub fn prepare(
    state: &mut AccountState,
    caller: Address,
    request: &CallRequest,
    limits: &CallLimits,
) -> Result<Role> {
    let role = roles::authorize(state, caller, Requirement::OwnerOrClient, "exec")?;

    if state.locked {
        return Err(Error::LockedState);
    }

    if let Some(cap) = limits.value_cap {
        if request.value > cap {
            return Err(Error::SpendingCapExceeded {
                value: request.value,
                cap,
            });
        }
    }

    state.balance = state
        .balance
        .checked_sub(request.value)
        .ok_or(Error::InsufficientBalance {
            requested: request.value,
            available: state.balance,
        })?;

    debug!(
        "Forwarding debit committed: {} units to {} (balance now {})",
        request.value, request.target, state.balance
    );

    Ok(role)
}

/// Restore the debit after a failed outbound call
pub fn rollback(state: &mut AccountState, value: u64) {
    // The debit was checked_sub'd from this same balance; adding it back
    // cannot overflow past the pre-call value.
    state.balance = state.balance.saturating_add(value);
    debug!("Forwarding debit rolled back: {} units (balance now {})", value, state.balance);
}
