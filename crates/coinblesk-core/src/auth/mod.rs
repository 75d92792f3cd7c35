//! Authentication module for managing the console session.
//!
//! This module provides:
//! - `Session`: In-memory session state shared by the gateway and the front end
//! - `SessionStore`: Persisted session identifier with automatic expiry
//! - `Credentials`: Transient username/password pair for a login attempt
//!
//! Persisted sessions expire after 10 minutes without use, matching the server's idle timeout.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::Credentials;
pub use session::{AuthState, Route, Session, SessionKeys, SharedSession};
pub use store::{SessionData, SessionStore};
