//! Guardian Proxy Library
//!
//! Two-key account custody: an operating key for day-to-day use and a
//! recovery key that can freeze activity, rotate a compromised key, and
//! restore control.

pub mod cli;
pub mod config;
pub mod error;
pub mod ledger;
pub mod proxy;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
pub use proxy::{AccountState, Address, CallRequest, Guardian};
