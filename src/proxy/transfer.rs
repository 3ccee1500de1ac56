//! Direct value transfer out of the account
//!
//! Moves value to a receiver with no payload execution. Whether the
//! emergency lock also gates this path is a deliberate policy switch
//! (`PolicyConfig::transfer_lock_exempt`) rather than a hard-coded rule.

use tracing::debug;

use crate::config::PolicyConfig;
use crate::error::{Error, Result};
use crate::proxy::roles::{self, Requirement, Role};
use crate::proxy::types::{AccountState, Address};

/// Validate a direct transfer and commit the debit
///
/// Check order: role, lock (unless the policy exempts transfers), balance.
pub fn prepare(
    state: &mut AccountState,
    caller: Address,
    receiver: Address,
    amount: u64,
    policy: &PolicyConfig,
) -> Result<Role> {
    let role = roles::authorize(state, caller, Requirement::OwnerOrClient, "send")?;

    if state.locked && !policy.transfer_lock_exempt {
        return Err(Error::LockedState);
    }

    state.balance = state
        .balance
        .checked_sub(amount)
        .ok_or(Error::InsufficientBalance {
            requested: amount,
            available: state.balance,
        })?;

    debug!(
        "Transfer debit committed: {} units to {} (balance now {})",
        amount, receiver, state.balance
    );

    Ok(role)
}

/// Restore the debit after a failed ledger credit
pub fn rollback(state: &mut AccountState, amount: u64) {
    state.balance = state.balance.saturating_add(amount);
    debug!("Transfer debit rolled back: {} units (balance now {})", amount, state.balance);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn funded_account(balance: u64) -> AccountState {
        let mut account = AccountState::new(
            Address::derive("account"),
            Address::derive("owner"),
            Address::derive("client"),
        )
        .unwrap();
        account.balance = balance;
        account
    }

    #[test]
    fn test_transfer_debits_exactly() {
        let mut account = funded_account(100);

        let role = prepare(
            &mut account,
            Address::derive("client"),
            Address::derive("receiver"),
            50,
            &PolicyConfig::default(),
        )
        .unwrap();

        assert_eq!(role, Role::Client);
        assert_eq!(account.balance, 50);
    }

    #[test]
    fn test_transfer_refuses_stranger() {
        let mut account = funded_account(100);

        assert!(matches!(
            prepare(
                &mut account,
                Address::derive("intruder"),
                Address::derive("receiver"),
                50,
                &PolicyConfig::default(),
            ),
            Err(Error::Unauthorized { .. })
        ));
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn test_transfer_insufficient_balance() {
        let mut account = funded_account(100);

        assert!(matches!(
            prepare(
                &mut account,
                Address::derive("owner"),
                Address::derive("receiver"),
                101,
                &PolicyConfig::default(),
            ),
            Err(Error::InsufficientBalance {
                requested: 101,
                available: 100,
            })
        ));
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn test_locked_gates_transfer_by_default() {
        let mut account = funded_account(100);
        account.locked = true;

        for caller in ["owner", "client"] {
            assert!(matches!(
                prepare(
                    &mut account,
                    Address::derive(caller),
                    Address::derive("receiver"),
                    10,
                    &PolicyConfig::default(),
                ),
                Err(Error::LockedState)
            ));
        }
        assert_eq!(account.balance, 100);
    }

    #[test]
    fn test_lock_exempt_policy_lets_transfer_through() {
        let mut account = funded_account(100);
        account.locked = true;

        let policy = PolicyConfig {
            transfer_lock_exempt: true,
            ..PolicyConfig::default()
        };

        prepare(
            &mut account,
            Address::derive("owner"),
            Address::derive("receiver"),
            10,
            &policy,
        )
        .unwrap();
        assert_eq!(account.balance, 90);

        // Even when exempt from the lock, the role gate still holds
        assert!(matches!(
            prepare(
                &mut account,
                Address::derive("intruder"),
                Address::derive("receiver"),
                10,
                &policy,
            ),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_rollback_restores_debit() {
        let mut account = funded_account(100);

        prepare(
            &mut account,
            Address::derive("owner"),
            Address::derive("receiver"),
            60,
            &PolicyConfig::default(),
        )
        .unwrap();
        rollback(&mut account, 60);

        assert_eq!(account.balance, 100);
    }
}
