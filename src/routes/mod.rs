//! Router Module Index
//!
//! Splits the HTTP surface by purpose. Neither group authenticates: the guard
//! decides where a visitor may go, and a token is only checked for presence.

/// Liveness and route table lookups.
pub mod public;

/// Guard evaluation with explicit credentials.
pub mod navigation;
