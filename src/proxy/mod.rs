//! Account guardian module
//!
//! Provides two-key account custody with:
//! - Role enforcement (operating key + recovery key)
//! - An emergency lock (dual-key engage, recovery-only release)
//! - Mutual key rotation (each key replaces only the other)
//! - Arbitrary call forwarding with optional spending cap and gas ceiling
//! - Direct value transfer
//!
//! # Architecture
//!
//! ```text
//! roles (authorize) → lock / governance / forwarder / transfer → Guardian → Ledger
//! ```
//!
//! # Security
//!
//! Every mutating operation is gated by the same `authorize` check before
//! any state is touched. Forwarding follows checks-effects-interactions:
//! the balance debit commits and the account guard drops before the
//! outbound call, so a reentrant callee observes only consistent state
//! and faces the same role and lock gates.

pub mod forwarder;
pub mod governance;
pub mod guardian;
pub mod lock;
pub mod roles;
pub mod transfer;
pub mod types;

pub use forwarder::CallLimits;
pub use guardian::Guardian;
pub use roles::{Requirement, Role};
pub use types::{
    AccountState, Address, CallRequest, OperationHistory, OperationKind, OperationRecord,
};
