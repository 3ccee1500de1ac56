//! Core types for the guardian proxy
//!
//! Defines identities, the guarded account record, call requests, and
//! audit records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::proxy::roles::Role;

/// 32-byte identity, rendered as base58
///
/// Identities are opaque: the proxy never interprets them beyond equality
/// against the stored owner/client keys.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 32]);

impl Address {
    /// The null identity. Rejected for owner/client slots.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Wrap raw bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Address(bytes)
    }

    /// Raw byte view
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check for the null identity
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Derive a deterministic address from a label (SHA-256)
    ///
    /// Useful for reproducible fixtures and named test identities.
    pub fn derive(label: &str) -> Self {
        let bytes: [u8; 32] = Sha256::digest(label.as_bytes()).into();
        Address(bytes)
    }

    /// Generate a random address
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill(&mut bytes[..]);
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", bs58::encode(&self.0).into_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = bs58::decode(s)
            .into_vec()
            .map_err(|e| Error::InvalidAddress(format!("{}: {}", s, e)))?;

        if bytes.len() != 32 {
            return Err(Error::InvalidAddress(format!(
                "{}: expected 32 bytes, got {}",
                s,
                bytes.len()
            )));
        }

        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes);
        Ok(Address(array))
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The guarded account record
///
/// One instance per proxy, created once at construction and mutated in
/// place by the component operations for the lifetime of the proxy.
/// `locked` changes only through the lock transitions, `owner`/`client`
/// only through governance, `balance` only through deposits, forwarding,
/// and direct transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountState {
    /// Address under which the ledger knows this account
    pub address: Address,

    /// Operating key for day-to-day use
    pub owner: Address,

    /// Recovery key empowered to unlock and replace the owner
    pub client: Address,

    /// Emergency circuit-breaker gating forwarding operations
    pub locked: bool,

    /// Held value in ledger units
    pub balance: u64,
}

impl AccountState {
    /// Construct a fresh account with the given controlling keys
    ///
    /// Null identities are rejected; `owner == client` is permitted.
    pub fn new(address: Address, owner: Address, client: Address) -> Result<Self> {
        if owner.is_zero() {
            return Err(Error::NullIdentity("owner"));
        }
        if client.is_zero() {
            return Err(Error::NullIdentity("client"));
        }

        Ok(Self {
            address,
            owner,
            client,
            locked: false,
            balance: 0,
        })
    }

    /// Check whether the caller holds the operating key
    pub fn is_owner(&self, caller: Address) -> bool {
        caller == self.owner
    }

    /// Check whether the caller holds the recovery key
    pub fn is_client(&self, caller: Address) -> bool {
        caller == self.client
    }

    /// Check whether the caller holds either controlling key
    pub fn is_owner_or_client(&self, caller: Address) -> bool {
        self.is_owner(caller) || self.is_client(caller)
    }
}

/// An outbound call to be forwarded on the account's behalf
///
/// Ephemeral: assembled per invocation, never persisted. The target is an
/// untrusted black box; the payload is opaque bytes.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// External party to invoke
    pub target: Address,

    /// Opaque payload handed to the target
    pub payload: Vec<u8>,

    /// Value transferred out of the account balance
    pub value: u64,
}

impl CallRequest {
    /// Build a call request
    pub fn new(target: Address, payload: Vec<u8>, value: u64) -> Self {
        Self {
            target,
            payload,
            value,
        }
    }
}

/// Audit record for a successful governed operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationRecord {
    /// Unique record ID
    pub id: String,

    /// What happened
    pub operation: OperationKind,

    /// Key that invoked the operation
    pub caller: Address,

    /// Role the caller held at invocation time
    pub role: Role,

    /// When the operation committed
    pub timestamp: DateTime<Utc>,
}

/// Kind of governed operation, with its commit-time parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Circuit-breaker engaged
    Locked,

    /// Circuit-breaker released
    Unlocked,

    /// Operating key replaced by the recovery key
    OwnerRotated {
        /// The new operating key
        new_owner: Address,
    },

    /// Recovery key replaced by the operating key
    ClientRotated {
        /// The new recovery key
        new_client: Address,
    },

    /// Outbound call forwarded with value
    CallForwarded {
        /// Call target
        target: Address,

        /// Value carried by the call
        value: u64,

        /// Forwarded payload, base64-encoded for the audit trail
        payload: String,

        /// Computational budget the callee reported consuming
        gas_used: u64,
    },

    /// Direct value transfer out of the account
    Transferred {
        /// Receiving party
        receiver: Address,

        /// Amount moved
        amount: u64,
    },
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Locked => write!(f, "lock"),
            OperationKind::Unlocked => write!(f, "unlock"),
            OperationKind::OwnerRotated { new_owner } => {
                write!(f, "rotate-owner -> {}", new_owner)
            }
            OperationKind::ClientRotated { new_client } => {
                write!(f, "rotate-client -> {}", new_client)
            }
            OperationKind::CallForwarded { target, value, .. } => {
                write!(f, "exec {} ({} units)", target, value)
            }
            OperationKind::Transferred { receiver, amount } => {
                write!(f, "send {} ({} units)", receiver, amount)
            }
        }
    }
}

/// Operation history file structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OperationHistory {
    /// Audit records (newest first)
    pub records: Vec<OperationRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip() {
        let addr = Address::derive("owner");
        let encoded = addr.to_string();
        let decoded: Address = encoded.parse().unwrap();
        assert_eq!(addr, decoded);
    }

    #[test]
    fn test_address_rejects_garbage() {
        assert!(matches!(
            "not-base58-!!".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
        // Valid base58 but wrong length
        assert!(matches!(
            "3yZe7d".parse::<Address>(),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_address_serde_as_string() {
        let addr = Address::derive("client");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr));

        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(addr, back);
    }

    #[test]
    fn test_zero_address() {
        assert!(Address::ZERO.is_zero());
        assert!(!Address::derive("owner").is_zero());
    }

    #[test]
    fn test_account_construction() {
        let account = AccountState::new(
            Address::derive("account"),
            Address::derive("owner"),
            Address::derive("client"),
        )
        .unwrap();

        assert_eq!(account.owner, Address::derive("owner"));
        assert_eq!(account.client, Address::derive("client"));
        assert!(!account.locked);
        assert_eq!(account.balance, 0);
    }

    #[test]
    fn test_account_rejects_null_keys() {
        assert!(matches!(
            AccountState::new(Address::derive("account"), Address::ZERO, Address::derive("client")),
            Err(Error::NullIdentity("owner"))
        ));
        assert!(matches!(
            AccountState::new(Address::derive("account"), Address::derive("owner"), Address::ZERO),
            Err(Error::NullIdentity("client"))
        ));
    }

    #[test]
    fn test_same_key_for_both_roles_is_permitted() {
        let key = Address::derive("solo");
        let account = AccountState::new(Address::derive("account"), key, key).unwrap();
        assert!(account.is_owner(key));
        assert!(account.is_client(key));
    }

    #[test]
    fn test_role_predicates() {
        let account = AccountState::new(
            Address::derive("account"),
            Address::derive("owner"),
            Address::derive("client"),
        )
        .unwrap();

        assert!(account.is_owner(Address::derive("owner")));
        assert!(!account.is_owner(Address::derive("client")));
        assert!(account.is_client(Address::derive("client")));
        assert!(!account.is_client(Address::derive("owner")));
        assert!(account.is_owner_or_client(Address::derive("owner")));
        assert!(account.is_owner_or_client(Address::derive("client")));
        assert!(!account.is_owner_or_client(Address::derive("intruder")));
    }

    #[test]
    fn test_operation_record_serialization() {
        let record = OperationRecord {
            id: "test".to_string(),
            operation: OperationKind::Transferred {
                receiver: Address::derive("receiver"),
                amount: 50,
            },
            caller: Address::derive("owner"),
            role: Role::Owner,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"transferred\""));
        assert!(json.contains("\"amount\":50"));
    }
}
