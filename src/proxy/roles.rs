//! Role enforcement for account operations
//!
//! Every state-changing operation consults this gate before touching any
//! state. The predicates are pure; refusal carries the caller and the
//! operation name for the audit trail.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::proxy::types::{AccountState, Address};

/// Role held by an authorized caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Operating key
    Owner,

    /// Recovery key
    Client,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Owner => write!(f, "owner"),
            Role::Client => write!(f, "client"),
        }
    }
}

/// Caller constraint an operation imposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Only the operating key may call
    OwnerOnly,

    /// Only the recovery key may call
    ClientOnly,

    /// Either controlling key may call
    OwnerOrClient,
}

/// Authorize a caller against the account's current keys
///
/// Returns the role the caller holds, or `Unauthorized`. When the same key
/// holds both roles, the role matching the requirement is reported
/// (OwnerOrClient resolves to Owner).
pub fn authorize(
    state: &AccountState,
    caller: Address,
    requirement: Requirement,
    operation: &'static str,
) -> Result<Role> {
    let role = match requirement {
        Requirement::OwnerOnly if state.is_owner(caller) => Some(Role::Owner),
        Requirement::ClientOnly if state.is_client(caller) => Some(Role::Client),
        Requirement::OwnerOrClient if state.is_owner(caller) => Some(Role::Owner),
        Requirement::OwnerOrClient if state.is_client(caller) => Some(Role::Client),
        _ => None,
    };

    match role {
        Some(role) => {
            debug!("{} authorized as {} for {}", caller, role, operation);
            Ok(role)
        }
        None => Err(Error::Unauthorized { caller, operation }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_account() -> AccountState {
        AccountState::new(
            Address::derive("account"),
            Address::derive("owner"),
            Address::derive("client"),
        )
        .unwrap()
    }

    #[test]
    fn test_owner_only() {
        let account = test_account();

        assert_eq!(
            authorize(&account, Address::derive("owner"), Requirement::OwnerOnly, "op").unwrap(),
            Role::Owner
        );
        assert!(matches!(
            authorize(&account, Address::derive("client"), Requirement::OwnerOnly, "op"),
            Err(Error::Unauthorized { .. })
        ));
        assert!(matches!(
            authorize(&account, Address::derive("intruder"), Requirement::OwnerOnly, "op"),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_client_only() {
        let account = test_account();

        assert_eq!(
            authorize(&account, Address::derive("client"), Requirement::ClientOnly, "op").unwrap(),
            Role::Client
        );
        assert!(matches!(
            authorize(&account, Address::derive("owner"), Requirement::ClientOnly, "op"),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_owner_or_client() {
        let account = test_account();

        assert_eq!(
            authorize(&account, Address::derive("owner"), Requirement::OwnerOrClient, "op").unwrap(),
            Role::Owner
        );
        assert_eq!(
            authorize(&account, Address::derive("client"), Requirement::OwnerOrClient, "op").unwrap(),
            Role::Client
        );
        assert!(matches!(
            authorize(&account, Address::derive("intruder"), Requirement::OwnerOrClient, "op"),
            Err(Error::Unauthorized { .. })
        ));
    }

    #[test]
    fn test_unauthorized_carries_context() {
        let account = test_account();
        let err = authorize(
            &account,
            Address::derive("intruder"),
            Requirement::OwnerOrClient,
            "exec",
        )
        .unwrap_err();

        match err {
            Error::Unauthorized { caller, operation } => {
                assert_eq!(caller, Address::derive("intruder"));
                assert_eq!(operation, "exec");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_dual_role_key_resolves() {
        let key = Address::derive("solo");
        let account = AccountState::new(Address::derive("account"), key, key).unwrap();

        assert_eq!(
            authorize(&account, key, Requirement::OwnerOrClient, "op").unwrap(),
            Role::Owner
        );
        assert_eq!(
            authorize(&account, key, Requirement::ClientOnly, "op").unwrap(),
            Role::Client
        );
    }
}
