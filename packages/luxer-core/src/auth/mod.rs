//! Authentication module.
//!
//! Provides the e-mail one-time-code login that yields an API token.

mod session;

pub use session::AuthSession;
