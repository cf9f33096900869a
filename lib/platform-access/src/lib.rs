//! Platform access for the portal: tokens, roles, permissions, and route
//! guarding.
//!
//! This crate provides:
//! - The token store and validator (`TokenStore`, `AccessToken`, `TokenSlot`)
//! - The static permission catalog (`Role`, `Permission`, `PermissionCatalog`)
//! - The authorization engine (`authz::has_permission`, `authz::has_role`, ...)
//! - The session record and observable auth state (`Session`, `AuthState`)
//! - The route guard (`RouteGuard`, `RouteRequirement`, `GuardDecision`)
//!
//! Everything here is synchronous and free of network I/O. Decode and parse
//! problems are converted to "invalid"/"denied" at the crate boundary.
//!
//! # Example
//!
//! ```
//! use chrono::Duration;
//! use portal_platform_access::{
//!     AuthState, GuardDecision, Role, RouteGuard, RouteRequirement, Session, TokenStore,
//!     UserRecord,
//! };
//!
//! let tokens = TokenStore::in_memory();
//! let record = tokens
//!     .set_token("opaque-token".into(), Duration::hours(1))
//!     .expect("lifetime in range");
//! assert!(tokens.is_valid());
//!
//! let user = UserRecord::new("u-1", "hr@acme.test", "Acme HR", Role::Company);
//! let state = AuthState::Authenticated(Session::new(user, &record));
//!
//! let decision = RouteGuard::decide(&state, &RouteRequirement::role(Role::Company), "/company/jobs");
//! assert_eq!(decision, GuardDecision::Render);
//! ```

pub mod authz;
pub mod error;
pub mod guard;
pub mod permission;
pub mod role;
pub mod session;
pub mod slot;
pub mod state;
pub mod token;
pub mod user;

pub use error::{
    AuthorizationError, MalformedToken, TokenLifetimeOutOfRange, TokenSlotError,
    UnknownPermission, UnknownRole,
};
pub use guard::{GuardDecision, LOGIN_ROUTE, RouteGuard, RouteRequirement, UNAUTHORIZED_ROUTE};
pub use permission::{Permission, PermissionCatalog, PermissionSet};
pub use role::{Role, RoleQuery};
pub use session::Session;
pub use slot::{FileTokenSlot, MemoryTokenSlot, TokenSlot};
pub use state::AuthState;
pub use token::{AccessToken, StoredToken, TokenStore};
pub use user::{UserId, UserRecord};
