//! Core types and utilities shared by the portal session core.
//!
//! This crate provides the foundational pieces used by every other crate in
//! the workspace: the rootcause-backed `Result` alias, strongly-typed ULID
//! identifiers, and the `Clock` abstraction used for expiry decisions.

pub mod clock;
pub mod error;
pub mod id;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::Result;
pub use id::{ConnectionId, ParseIdError, SessionId};
