//! Mutual key rotation
//!
//! Each controlling key can only replace the OTHER key: the client
//! reassigns the owner, the owner reassigns the client. No key can rotate
//! itself, so neither holder can lock the other out of recovery. Rotation
//! stays available while the account is locked; it is the intended
//! recovery path for a frozen account.

use tracing::warn;

use crate::error::{Error, Result};
use crate::proxy::roles::{self, Requirement, Role};
use crate::proxy::types::{AccountState, Address};

/// Replace the operating key. Client only.
pub fn rotate_owner(state: &mut AccountState, caller: Address, new_owner: Address) -> Result<Role> {
    let role = roles::authorize(state, caller, Requirement::ClientOnly, "rotate_owner")?;

    if new_owner.is_zero() {
        return Err(Error::NullIdentity("owner"));
    }

    let previous = state.owner;
    state.owner = new_owner;
    warn!(
        "Account {} owner rotated {} -> {} by client {}",
        state.address, previous, new_owner, caller
    );

    Ok(role)
}

/// Replace the recovery key. Owner only.
pub fn rotate_client(state: &mut AccountState, caller: Address, new_client: Address) -> Result<Role> {
    let role = roles::authorize(state, caller, Requirement::OwnerOnly, "rotate_client")?;

    if new_client.is_zero() {
        return Err(Error::NullIdentity("client"));
    }

    let previous = state.client;
    state.client = new_client;
    warn!(
        "Account {} client rotated {} -> {} by owner {}",
        state.address, previous, new_client, caller
    );

    Ok(role)
}
