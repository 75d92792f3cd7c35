//! Data models for CoinBlesk server entities.
//!
//! This module contains the data structures returned by the admin backend:
//!
//! - `UserAccount`: Console users and administrators
//! - `ServerAccount`, `TrustLevel`: Trust relations with other servers
//! - `ServerTransaction`: Server-to-server transaction history
//! - `Activity`, `Message`: Audit log entries and relation requests
//! - `PayOutRule`, `PayOutRules`: Scheduled payouts per server account
//!
//! Dates arrive as epoch milliseconds.

pub mod account;
pub mod activity;
pub mod payout;
pub mod transaction;
pub mod user;

pub use account::{ServerAccount, TrustLevel};
pub use activity::{Activity, Message};
pub use payout::{PayOutRule, PayOutRules};
pub use transaction::ServerTransaction;
pub use user::UserAccount;
