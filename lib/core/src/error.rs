//! Error handling foundation for the portal session core.
//!
//! Only the `Result` alias lives here. Every crate owns its error enums in
//! its own `error` module; they travel as `rootcause::Report<E>` so callers
//! can attach context while keeping the typed root available through
//! `Report::current_context`.

use rootcause::Report;

/// A Result type alias using rootcause's Report, typed on the error context.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
