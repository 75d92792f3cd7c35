//! REST API client module for the CoinBlesk admin backend.
//!
//! This module provides the `ConsoleApi` for the account, relation, history
//! and payout-rule screens. Every call goes through the session gateway, so
//! an expired session suspends the call until the user logs in again.

pub mod client;
pub mod error;

pub use client::ConsoleApi;
pub use error::ApiError;
