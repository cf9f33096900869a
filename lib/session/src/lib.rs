//! Session lifecycle for the portal.
//!
//! [`SessionManager`] is the single owner of the authentication state. It
//! drives the identity provider, writes the token store, opens and closes
//! the notification hub's connection, and publishes [`AuthState`] changes
//! through a watch channel that route guards and views subscribe to.
//!
//! [`CoreConfig`] loads settings from a file and `PORTAL__*` environment
//! variables and wires a manager from them.
//!
//! [`AuthState`]: portal_platform_access::AuthState

pub mod config;
pub mod error;
pub mod manager;

pub use config::{CoreConfig, SessionConfig};
pub use error::{ErrorKind, SessionError};
pub use manager::{
    LoginOutcome, LogoutOutcome, SessionManager, SessionManagerBuilder, SessionSettings,
};
