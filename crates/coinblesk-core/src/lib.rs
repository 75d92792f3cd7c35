//! Core library for the CoinBlesk console.
//!
//! This crate provides:
//! - `gateway`: the session gateway (request interceptor, replay queue, auth event bus)
//! - `api`: typed wrappers over the CoinBlesk server's admin endpoints
//! - `auth`: session state, credentials and session persistence
//! - `models`: data structures returned by the backend
//! - `config`: application configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod gateway;
pub mod models;

pub use api::{ApiError, ConsoleApi};
pub use auth::{AuthState, Credentials, Route, Session, SessionKeys, SessionStore, SharedSession};
pub use config::Config;
pub use gateway::{AuthEvent, EventBus, GatewayConfig, SessionGateway, Subscription, TokenMode};
