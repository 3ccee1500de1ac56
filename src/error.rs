//! Error types for the guardian proxy

use thiserror::Error;

use crate::proxy::types::Address;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the guardian proxy
#[derive(Error, Debug)]
pub enum Error {
    // Identity errors
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Null identity not allowed for {0}")]
    NullIdentity(&'static str),

    // Authorization errors
    #[error("Unauthorized: {caller} may not call {operation}")]
    Unauthorized {
        caller: Address,
        operation: &'static str,
    },

    // Lock errors
    #[error("Account is locked")]
    LockedState,

    // Spending errors
    #[error("Spending cap exceeded: value {value} > cap {cap}")]
    SpendingCapExceeded { value: u64, cap: u64 },

    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: u64, available: u64 },

    #[error("Balance overflow")]
    BalanceOverflow,

    // Forwarding errors
    #[error("Forwarded call failed: {0}")]
    ForwardedCallFailed(String),

    // Persistence errors
    #[error("Persistence error: {0}")]
    Persistence(String),
}
