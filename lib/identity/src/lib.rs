//! Identity provider boundary for the portal session core.
//!
//! The [`IdentityProvider`] trait is the only way the session manager
//! reaches the remote account authority. [`HttpIdentityProvider`] is the
//! JSON-over-HTTP implementation.

pub mod error;
pub mod http;
pub mod provider;
pub mod types;

pub use error::{IdentityError, ValidationError};
pub use http::{HttpIdentityProvider, IdentityConfig};
pub use provider::{IdentityProvider, SocialAssertion, SocialHandshake};
pub use types::{Credentials, Grant, Registration, SocialProvider};
