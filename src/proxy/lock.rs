//! Lock state machine
//!
//! The lock is a dual-key brake with a single-key release: either
//! controlling key can freeze the account, but only the recovery key can
//! re-open it. A compromised operating key can therefore never undo a
//! freeze.

use tracing::warn;

use crate::error::Result;
use crate::proxy::roles::{self, Requirement, Role};
use crate::proxy::types::{AccountState, Address};

/// Engage the lock
///
/// Callable by owner or client in either state; idempotent.
pub fn engage(state: &mut AccountState, caller: Address) -> Result<Role> {
    let role = roles::authorize(state, caller, Requirement::OwnerOrClient, "lock")?;

    if !state.locked {
        state.locked = true;
        warn!("Account {} locked by {} ({})", state.address, caller, role);
    }

    Ok(role)
}

/// Release the lock
///
/// Callable only by the client. The owner is refused even immediately
/// after its own `engage`.
pub fn release(state: &mut AccountState, caller: Address) -> Result<Role> {
    let role = roles::authorize(state, caller, Requirement::ClientOnly, "unlock")?;

    if state.locked {
        state.locked = false;
        warn!("Account {} unlocked by {}", state.address, caller);
    }

    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn test_account() -> AccountState {
        AccountState::new(
            Address::derive("account"),
            Address::derive("owner"),
            Address::derive("client"),
        )
        .unwrap()
    }

    #[test]
    fn test_engage_by_owner_and_client() {
        let mut account = test_account();

        engage(&mut account, Address::derive("owner")).unwrap();
        assert!(account.locked);

        account.locked = false;
        engage(&mut account, Address::derive("client")).unwrap();
        assert!(account.locked);
    }

    #[test]
    fn test_engage_is_idempotent() {
        let mut account = test_account();

        engage(&mut account, Address::derive("owner")).unwrap();
        engage(&mut account, Address::derive("client")).unwrap();
        assert!(account.locked);
    }

    #[test]
    fn test_engage_refuses_stranger() {
        let mut account = test_account();

        assert!(matches!(
            engage(&mut account, Address::derive("intruder")),
            Err(Error::Unauthorized { .. })
        ));
        assert!(!account.locked);
    }

    #[test]
    fn test_release_is_client_only() {
        let mut account = test_account();
        engage(&mut account, Address::derive("owner")).unwrap();

        // The owner locked the account, yet may not release it
        assert!(matches!(
            release(&mut account, Address::derive("owner")),
            Err(Error::Unauthorized { .. })
        ));
        assert!(account.locked);

        release(&mut account, Address::derive("client")).unwrap();
        assert!(!account.locked);
    }

    #[test]
    fn test_release_refuses_stranger() {
        let mut account = test_account();
        engage(&mut account, Address::derive("client")).unwrap();

        assert!(matches!(
            release(&mut account, Address::derive("intruder")),
            Err(Error::Unauthorized { .. })
        ));
        assert!(account.locked);
    }

    #[test]
    fn test_round_trip_leaves_rest_untouched() {
        let mut account = test_account();
        account.balance = 75;

        engage(&mut account, Address::derive("owner")).unwrap();
        release(&mut account, Address::derive("client")).unwrap();

        assert!(!account.locked);
        assert_eq!(account.owner, Address::derive("owner"));
        assert_eq!(account.client, Address::derive("client"));
        assert_eq!(account.balance, 75);
    }
}
