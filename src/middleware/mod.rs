//! Middleware for Chute.

mod token_auth;

pub use token_auth::require_token;
